//! Batch entry point for the story pipeline: CLI, logging bootstrap, and
//! wiring of the concrete clients.

pub mod app;
pub mod cli;
pub mod logging;
