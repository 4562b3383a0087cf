//! SQLite schema initialization for the lineage edge store.
//!
//! A single `lineage_edges` table holds every lineage fact. Fields (the
//! graph's nodes) have no table of their own; node identities are derived
//! from edge endpoints at query time.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants — kept as separate strings so each statement can be executed
// individually, which makes error reporting clearer.
// ---------------------------------------------------------------------------

const CREATE_LINEAGE_EDGES: &str = "\
CREATE TABLE IF NOT EXISTS lineage_edges (
  id TEXT PRIMARY KEY,
  source_namespace TEXT NOT NULL,
  source_dataset TEXT NOT NULL,
  source_field TEXT NOT NULL,
  target_namespace TEXT NOT NULL,
  target_dataset TEXT NOT NULL,
  target_field TEXT NOT NULL,
  transformation_type TEXT NOT NULL DEFAULT 'UNKNOWN',
  confidence REAL NOT NULL DEFAULT 1.0,
  active INTEGER NOT NULL DEFAULT 1,
  created_at TEXT
)";

// Indexes ----------------------------------------------------------------

// The two composite indexes back the directional point-lookups that drive
// traversal; active and transformation_type cover management queries.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON lineage_edges(source_namespace, source_dataset, source_field)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON lineage_edges(target_namespace, target_dataset, target_field)",
    "CREATE INDEX IF NOT EXISTS idx_edges_active ON lineage_edges(active)",
    "CREATE INDEX IF NOT EXISTS idx_edges_type ON lineage_edges(transformation_type)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the lineage
/// schema.
///
/// The returned connection has WAL mode and synchronous NORMAL already
/// configured.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let fresh = db_path != ":memory:" && !std::path::Path::new(db_path).exists();

    let conn = Connection::open(db_path)?;

    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // -- Tables -----------------------------------------------------------
    conn.execute_batch(CREATE_LINEAGE_EDGES)?;

    // -- Indexes ----------------------------------------------------------
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    if fresh {
        tracing::info!(path = db_path, "created new lineage database");
    }

    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
