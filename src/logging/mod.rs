//! Event journal.

mod jsonl;

pub use jsonl::JsonlLogger;
