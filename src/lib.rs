//! FieldLineage — column-level data lineage library.
//!
//! Provides an SQLite-backed lineage edge store, upstream/downstream graph
//! traversal, and downstream impact analysis for data warehouse tooling.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod observability;
pub mod types;
