//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// storyloom-worker - generate, illustrate, and publish one story episode
#[derive(Debug, Parser)]
#[command(name = "storyloom-worker")]
#[command(about = "Checkpointed story and illustration pipeline publishing to Notion")]
#[command(long_about = r#"
Runs one iteration of the story pipeline: generate the next episode, derive an
illustration prompt, render the image, and publish both to Notion. Progress is
checkpointed after every step; a failed run resumes where it stopped.

EXAMPLES:
  # Produce and publish the next episode (same as no subcommand)
  storyloom-worker run

  # Show the current checkpoint
  storyloom-worker status

  # Publish a markdown summary as today's daily document
  storyloom-worker publish --file summary.md

Configuration is read from the environment (and a .env file if present).
"#)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run; `run` when none is given.
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run one pipeline iteration
    Run,

    /// Print the current checkpoint as JSON
    Status,

    /// Replace the body of a document with the contents of a markup file
    Publish {
        /// Markup file to publish
        #[arg(long)]
        file: PathBuf,

        /// Document title (default: today's date, YYYY-MM-DD)
        #[arg(long)]
        title: Option<String>,
    },
}
