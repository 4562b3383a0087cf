//! Graph layer — SQLite-backed edge store, traversal, and impact analysis.

pub mod impact;
pub mod store;
pub mod traversal;
