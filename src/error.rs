//! Error taxonomy for the lineage engine.
//!
//! Empty traversal results are not errors: a start node with no matching
//! edges yields a well-formed empty result. Errors cover invalid input,
//! invalid edge data on write, and store failures — a broken store must
//! never look like an empty graph.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Debug, Error)]
pub enum LineageError {
    /// Traversal depth must be at least 1.
    #[error("max_depth must be at least 1 (got {0})")]
    DepthOutOfRange(u32),

    /// A node identity is missing one or more of namespace/dataset/field.
    #[error("malformed field reference '{0}': namespace, dataset, and field are all required")]
    MalformedFieldRef(String),

    /// An edge failed validation on write.
    #[error("invalid edge '{id}': {reason}")]
    InvalidEdge { id: String, reason: String },

    /// The edge store itself failed (I/O, schema, SQL).
    #[error("edge store failure: {0}")]
    Store(#[from] rusqlite::Error),

    /// A criticality pattern failed to compile.
    #[error("invalid criticality pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
