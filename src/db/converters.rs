//! Row-to-domain conversion helpers shared by the edge store queries.

use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::types::{FieldRef, LineageEdge, TransformationType};

/// Convert a `SELECT *` row from `lineage_edges` into a [`LineageEdge`].
///
/// Lenient on stored data quality: an unrecognized transformation label
/// falls back to UNKNOWN and an unparseable timestamp becomes `None`, rather
/// than failing the whole query.
pub fn row_to_lineage_edge(row: &Row<'_>) -> rusqlite::Result<LineageEdge> {
    let tt_raw: String = row.get("transformation_type")?;
    let transformation_type = TransformationType::from_str_loose(&tt_raw).unwrap_or_default();

    let created_at = row
        .get::<_, Option<String>>("created_at")?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(LineageEdge {
        id: row.get("id")?,
        source: FieldRef {
            namespace: row.get("source_namespace")?,
            dataset: row.get("source_dataset")?,
            field: row.get("source_field")?,
        },
        target: FieldRef {
            namespace: row.get("target_namespace")?,
            dataset: row.get("target_dataset")?,
            field: row.get("target_field")?,
        },
        transformation_type,
        confidence: row.get("confidence")?,
        active: row.get("active")?,
        created_at,
    })
}
