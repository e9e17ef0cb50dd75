//! Per-customer conversation memory.
//!
//! Components:
//! - `types`: turns, context records and the read views built from them
//! - `store`: file-backed log and context persistence
//! - `summary`: windowed summaries and sentiment aggregation
//! - `report`: Markdown history report
//! - `samples`: demo data for three customers

pub mod report;
pub mod samples;
pub mod store;
pub mod summary;
pub mod types;

pub use store::MemoryStore;
pub use types::*;
