//! Run orchestration
//!
//! A run crawls the table of contents (or reloads it from the snapshot),
//! persists it, then fans the entries out over a bounded [`WorkerPool`].
//! Per-entry failures are collected into the [`RunReport`]; only
//! configuration and crawl-level problems end a run early.

mod orchestrator;
mod pool;

pub use orchestrator::{Chapter, EntryOutcome, EntryStatus, Pipeline, RunMode, RunReport};
pub use pool::{Completion, WorkerPool};
