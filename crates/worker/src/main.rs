use std::process::ExitCode;

use clap::Parser;
use storyloom_worker::app;
use storyloom_worker::cli::{Cli, Command};
use storyloom_worker::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();

    let result = match cli.subcommand() {
        Command::Run => app::run().await.map(|outcome| outcome.is_success()),
        Command::Status => app::status(&app::checkpoint_path()).map(|rendered| {
            println!("{rendered}");
            true
        }),
        Command::Publish { file, title } => app::publish(&file, title).await.map(|document_id| {
            println!("{document_id}");
            true
        }),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "storyloom-worker failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
