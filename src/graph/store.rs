//! SQLite CRUD layer for the lineage edge relation.
//!
//! Uses `rusqlite` with `prepare_cached` so the first call compiles each
//! statement and subsequent calls reuse it from the connection's internal
//! cache. The frontier lookups (`edges_out_of_any` / `edges_into_any`) are
//! the hot path of traversal: one round-trip per expansion round, however
//! many branches are live.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::converters::row_to_lineage_edge;
use crate::db::schema::initialize_database;
use crate::error::{LineageError, Result};
use crate::types::{FieldRef, LineageEdge};

// ---------------------------------------------------------------------------
// StoreStats
// ---------------------------------------------------------------------------

/// Aggregate statistics about the stored relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub edges: usize,
    pub active_edges: usize,
    pub source_fields: usize,
    pub target_fields: usize,
}

// ---------------------------------------------------------------------------
// EdgeStore
// ---------------------------------------------------------------------------

/// Typed CRUD wrapper around the lineage SQLite database.
pub struct EdgeStore {
    pub conn: Connection,
}

impl std::fmt::Debug for EdgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeStore").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const UPSERT_EDGE_SQL: &str = "\
INSERT INTO lineage_edges (id, source_namespace, source_dataset, source_field, target_namespace, target_dataset, target_field, transformation_type, confidence, active, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT(id) DO UPDATE SET
  source_namespace = excluded.source_namespace,
  source_dataset = excluded.source_dataset,
  source_field = excluded.source_field,
  target_namespace = excluded.target_namespace,
  target_dataset = excluded.target_dataset,
  target_field = excluded.target_field,
  transformation_type = excluded.transformation_type,
  confidence = excluded.confidence,
  active = excluded.active,
  created_at = excluded.created_at";

const EDGES_OUT_OF_SQL: &str = "\
SELECT * FROM lineage_edges
WHERE source_namespace = ?1 AND source_dataset = ?2 AND source_field = ?3 AND active = 1";

const EDGES_INTO_SQL: &str = "\
SELECT * FROM lineage_edges
WHERE target_namespace = ?1 AND target_dataset = ?2 AND target_field = ?3 AND active = 1";

/// Identities per chunk in batched lookups. Three bound parameters per
/// identity keeps each statement well under SQLite's variable limit.
const LOOKUP_CHUNK: usize = 400;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject edges that would corrupt the relation: blank ids, incomplete
/// endpoint identities, confidence outside [0.0, 1.0].
fn validate_edge(edge: &LineageEdge) -> Result<()> {
    if edge.id.trim().is_empty() {
        return Err(LineageError::InvalidEdge {
            id: edge.id.clone(),
            reason: "blank id".to_string(),
        });
    }
    if !edge.source.is_complete() {
        return Err(LineageError::InvalidEdge {
            id: edge.id.clone(),
            reason: format!("incomplete source identity '{}'", edge.source),
        });
    }
    if !edge.target.is_complete() {
        return Err(LineageError::InvalidEdge {
            id: edge.id.clone(),
            reason: format!("incomplete target identity '{}'", edge.target),
        });
    }
    if !(0.0..=1.0).contains(&edge.confidence) {
        return Err(LineageError::InvalidEdge {
            id: edge.id.clone(),
            reason: format!("confidence {} outside [0.0, 1.0]", edge.confidence),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl EdgeStore {
    /// Open (or create) the database at `db_path`, apply the schema, and
    /// return a ready-to-use store.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = initialize_database(db_path)?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection. Useful in tests where the caller
    /// has already called `initialize_database(":memory:")`.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Insert or update a single edge, keyed by id.
    pub fn upsert_edge(&self, edge: &LineageEdge) -> Result<()> {
        validate_edge(edge)?;
        let mut stmt = self.conn.prepare_cached(UPSERT_EDGE_SQL)?;
        stmt.execute(params![
            edge.id,
            edge.source.namespace,
            edge.source.dataset,
            edge.source.field,
            edge.target.namespace,
            edge.target.dataset,
            edge.target.field,
            edge.transformation_type.as_str(),
            edge.confidence,
            edge.active,
            edge.created_at.map(|t| t.to_rfc3339()),
        ])?;
        Ok(())
    }

    /// Batch-upsert edges inside a single transaction. Validation runs
    /// before any row is written, so a bad edge rejects the whole batch.
    pub fn upsert_edges(&self, edges: &[LineageEdge]) -> Result<()> {
        for edge in edges {
            validate_edge(edge)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_EDGE_SQL)?;
            for edge in edges {
                stmt.execute(params![
                    edge.id,
                    edge.source.namespace,
                    edge.source.dataset,
                    edge.source.field,
                    edge.target.namespace,
                    edge.target.dataset,
                    edge.target.field,
                    edge.transformation_type.as_str(),
                    edge.confidence,
                    edge.active,
                    edge.created_at.map(|t| t.to_rfc3339()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Flip an edge's active flag. Returns `false` when no such edge exists.
    pub fn set_active(&self, id: &str, active: bool) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE lineage_edges SET active = ?2 WHERE id = ?1")?;
        let changed = stmt.execute(params![id, active])?;
        Ok(changed > 0)
    }

    /// Delete an edge by id. Returns `false` when no such edge exists.
    pub fn delete_edge(&self, id: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM lineage_edges WHERE id = ?1")?;
        let changed = stmt.execute(params![id])?;
        Ok(changed > 0)
    }

    // -------------------------------------------------------------------
    // Queries — single edge
    // -------------------------------------------------------------------

    /// Retrieve a single edge by id, or `None` if it doesn't exist.
    pub fn get_edge(&self, id: &str) -> Result<Option<LineageEdge>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM lineage_edges WHERE id = ?1")?;
        let mut rows = stmt.query_and_then(params![id], row_to_lineage_edge)?;
        match rows.next() {
            Some(Ok(edge)) => Ok(Some(edge)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------
    // Queries — directional point lookups (active edges only)
    // -------------------------------------------------------------------

    /// Active edges whose source is `node` (downstream neighbors).
    pub fn edges_out_of(&self, node: &FieldRef) -> Result<Vec<LineageEdge>> {
        let mut stmt = self.conn.prepare_cached(EDGES_OUT_OF_SQL)?;
        let rows = stmt.query_and_then(
            params![node.namespace, node.dataset, node.field],
            row_to_lineage_edge,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Active edges whose target is `node` (upstream neighbors).
    pub fn edges_into(&self, node: &FieldRef) -> Result<Vec<LineageEdge>> {
        let mut stmt = self.conn.prepare_cached(EDGES_INTO_SQL)?;
        let rows = stmt.query_and_then(
            params![node.namespace, node.dataset, node.field],
            row_to_lineage_edge,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Active edges whose source is any of `nodes`, in one query per chunk.
    pub fn edges_out_of_any(&self, nodes: &[FieldRef]) -> Result<Vec<LineageEdge>> {
        self.edges_touching_any(nodes, "source")
    }

    /// Active edges whose target is any of `nodes`, in one query per chunk.
    pub fn edges_into_any(&self, nodes: &[FieldRef]) -> Result<Vec<LineageEdge>> {
        self.edges_touching_any(nodes, "target")
    }

    /// Shared implementation of the batched frontier lookups. `end` is one
    /// of the internal column prefixes `"source"` / `"target"`.
    fn edges_touching_any(&self, nodes: &[FieldRef], end: &str) -> Result<Vec<LineageEdge>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for chunk in nodes.chunks(LOOKUP_CHUNK) {
            let placeholders: String = chunk
                .iter()
                .map(|_| "(?, ?, ?)")
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT * FROM lineage_edges \
                 WHERE active = 1 AND ({end}_namespace, {end}_dataset, {end}_field) \
                 IN (VALUES {placeholders})"
            );
            let mut param_values: Vec<&dyn rusqlite::types::ToSql> =
                Vec::with_capacity(chunk.len() * 3);
            for node in chunk {
                param_values.push(&node.namespace);
                param_values.push(&node.dataset);
                param_values.push(&node.field);
            }
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_and_then(param_values.as_slice(), row_to_lineage_edge)?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    // -------------------------------------------------------------------
    // Queries — bulk
    // -------------------------------------------------------------------

    /// Every edge in the relation, active or not, ordered by id.
    pub fn all_edges(&self) -> Result<Vec<LineageEdge>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM lineage_edges ORDER BY id")?;
        let rows = stmt.query_and_then([], row_to_lineage_edge)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // -------------------------------------------------------------------
    // Queries — aggregate counts
    // -------------------------------------------------------------------

    /// Total number of edges, active or not.
    pub fn count_edges(&self) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT count(*) FROM lineage_edges")?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of active edges.
    pub fn count_active_edges(&self) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT count(*) FROM lineage_edges WHERE active = 1")?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of distinct source identities.
    pub fn count_source_fields(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT count(*) FROM (SELECT DISTINCT source_namespace, source_dataset, source_field FROM lineage_edges)",
        )?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of distinct target identities.
    pub fn count_target_fields(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT count(*) FROM (SELECT DISTINCT target_namespace, target_dataset, target_field FROM lineage_edges)",
        )?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Aggregate statistics over the whole relation.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            edges: self.count_edges()?,
            active_edges: self.count_active_edges()?,
            source_fields: self.count_source_fields()?,
            target_fields: self.count_target_fields()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
