//! Pure domain logic for the storyloom episode pipeline.
//!
//! This crate has no internal dependencies and performs no network I/O.
//! It owns the durable checkpoint record, the episode data model, the
//! markup-to-block translation used by document sync, and the naming
//! rules for generated documents.

pub mod checkpoint;
pub mod episode;
pub mod error;
pub mod markup;
pub mod naming;
pub mod report;
