//! Core domain types: field identities, lineage edges, and the categorical
//! enums shared across the store, the traversal engine, and impact analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// FieldRef
// ---------------------------------------------------------------------------

/// Identity of a column: `(namespace, dataset, field)`.
///
/// Nodes have no storage of their own; every `FieldRef` in a result is
/// derived from edge endpoints (or is the traversal start itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub namespace: String,
    pub dataset: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(
        namespace: impl Into<String>,
        dataset: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            dataset: dataset.into(),
            field: field.into(),
        }
    }

    /// All three identity components present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.namespace.trim().is_empty()
            && !self.dataset.trim().is_empty()
            && !self.field.trim().is_empty()
    }

    /// Dotted form used in CLI arguments, logs, and id digests.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.dataset, self.field)
    }

    /// Parse a dotted `namespace.dataset.field` triple. The first two dots
    /// split the triple; any further dots belong to the field component.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '.');
        let namespace = parts.next()?;
        let dataset = parts.next()?;
        let field = parts.next()?;
        let fr = Self::new(namespace, dataset, field);
        if fr.is_complete() {
            Some(fr)
        } else {
            None
        }
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.namespace, self.dataset, self.field)
    }
}

// ---------------------------------------------------------------------------
// TransformationType
// ---------------------------------------------------------------------------

/// How the target field is derived from the source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransformationType {
    Direct,
    Calculation,
    Aggregation,
    Join,
    Filter,
    Unknown,
}

impl TransformationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformationType::Direct => "DIRECT",
            TransformationType::Calculation => "CALCULATION",
            TransformationType::Aggregation => "AGGREGATION",
            TransformationType::Join => "JOIN",
            TransformationType::Filter => "FILTER",
            TransformationType::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive parse; unrecognized labels map to `None`.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Some(TransformationType::Direct),
            "calculation" => Some(TransformationType::Calculation),
            "aggregation" => Some(TransformationType::Aggregation),
            "join" => Some(TransformationType::Join),
            "filter" => Some(TransformationType::Filter),
            "unknown" => Some(TransformationType::Unknown),
            _ => None,
        }
    }
}

impl Default for TransformationType {
    fn default() -> Self {
        TransformationType::Unknown
    }
}

impl std::fmt::Display for TransformationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Traversal direction relative to the start field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward producers: edges whose target is on the frontier.
    Upstream,
    /// Toward consumers: edges whose source is on the frontier.
    Downstream,
    /// Union of two independent upstream and downstream runs.
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
            Direction::Both => "both",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upstream" | "up" => Some(Direction::Upstream),
            "downstream" | "down" => Some(Direction::Downstream),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ImpactType
// ---------------------------------------------------------------------------

/// Classification of an impacted node by how it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactType {
    /// Reached by a single edge from the start (depth 1).
    Direct,
    /// Reached through at least one intermediate field.
    Indirect,
}

impl ImpactType {
    pub fn from_depth(depth: u32) -> Self {
        if depth <= 1 {
            ImpactType::Direct
        } else {
            ImpactType::Indirect
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactType::Direct => "direct",
            ImpactType::Indirect => "indirect",
        }
    }
}

impl std::fmt::Display for ImpactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LineageEdge
// ---------------------------------------------------------------------------

/// A directed, typed, weighted lineage fact: `source` feeds `target`.
///
/// Multi-edges are allowed: two edges between the same endpoints with
/// different ids (e.g. a JOIN and a FILTER relationship) are distinct facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    /// Opaque unique id. Fixture files may omit it; loaders fill it in with
    /// [`make_edge_id`].
    #[serde(default)]
    pub id: String,
    pub source: FieldRef,
    pub target: FieldRef,
    #[serde(default)]
    pub transformation_type: TransformationType,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// Deterministic content-derived edge id: repeated extraction of the same
/// lineage fact converges on the same id across runs.
pub fn make_edge_id(
    source: &FieldRef,
    target: &FieldRef,
    transformation_type: TransformationType,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.qualified_name().as_bytes());
    hasher.update(b">");
    hasher.update(target.qualified_name().as_bytes());
    hasher.update(b"#");
    hasher.update(transformation_type.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("e_{}", &digest[..16])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // -------------------------------------------------------------------
    // 1. FieldRef
    // -------------------------------------------------------------------

    #[test]
    fn field_ref_display_is_dotted_triple() {
        let fr = FieldRef::new("warehouse", "orders", "total");
        assert_eq!(fr.to_string(), "warehouse.orders.total");
        assert_eq!(fr.qualified_name(), "warehouse.orders.total");
    }

    #[test]
    fn field_ref_parse_round_trips() {
        let fr = FieldRef::parse("warehouse.orders.total").unwrap();
        assert_eq!(fr, FieldRef::new("warehouse", "orders", "total"));
    }

    #[test]
    fn field_ref_parse_keeps_extra_dots_in_field() {
        let fr = FieldRef::parse("wh.events.payload.user.id").unwrap();
        assert_eq!(fr.namespace, "wh");
        assert_eq!(fr.dataset, "events");
        assert_eq!(fr.field, "payload.user.id");
    }

    #[test_case("orders.total" ; "two_components")]
    #[test_case("orders" ; "one_component")]
    #[test_case("wh..total" ; "blank_dataset")]
    #[test_case(".orders.total" ; "blank_namespace")]
    #[test_case("" ; "empty")]
    fn field_ref_parse_rejects_incomplete(input: &str) {
        assert!(FieldRef::parse(input).is_none());
    }

    #[test]
    fn field_ref_completeness_requires_all_components() {
        assert!(FieldRef::new("wh", "orders", "total").is_complete());
        assert!(!FieldRef::new("wh", "orders", "").is_complete());
        assert!(!FieldRef::new("wh", "  ", "total").is_complete());
        assert!(!FieldRef::new("", "orders", "total").is_complete());
    }

    // -------------------------------------------------------------------
    // 2. Enums
    // -------------------------------------------------------------------

    #[test_case("direct", TransformationType::Direct ; "lower_direct")]
    #[test_case("DIRECT", TransformationType::Direct ; "upper_direct")]
    #[test_case("Calculation", TransformationType::Calculation ; "mixed_calculation")]
    #[test_case("AGGREGATION", TransformationType::Aggregation ; "upper_aggregation")]
    #[test_case("join", TransformationType::Join ; "lower_join")]
    #[test_case("filter", TransformationType::Filter ; "lower_filter")]
    #[test_case("unknown", TransformationType::Unknown ; "lower_unknown")]
    fn transformation_type_parses_loosely(input: &str, expected: TransformationType) {
        assert_eq!(TransformationType::from_str_loose(input), Some(expected));
    }

    #[test]
    fn transformation_type_rejects_unrecognized_labels() {
        assert_eq!(TransformationType::from_str_loose("copy"), None);
        assert_eq!(TransformationType::from_str_loose(""), None);
    }

    #[test]
    fn transformation_type_as_str_round_trips() {
        for tt in [
            TransformationType::Direct,
            TransformationType::Calculation,
            TransformationType::Aggregation,
            TransformationType::Join,
            TransformationType::Filter,
            TransformationType::Unknown,
        ] {
            assert_eq!(TransformationType::from_str_loose(tt.as_str()), Some(tt));
        }
    }

    #[test_case("upstream", Direction::Upstream ; "full_upstream")]
    #[test_case("up", Direction::Upstream ; "short_upstream")]
    #[test_case("DOWNSTREAM", Direction::Downstream ; "upper_downstream")]
    #[test_case("down", Direction::Downstream ; "short_downstream")]
    #[test_case("Both", Direction::Both ; "mixed_both")]
    fn direction_parses_loosely(input: &str, expected: Direction) {
        assert_eq!(Direction::from_str_loose(input), Some(expected));
    }

    #[test]
    fn impact_type_depth_boundary() {
        assert_eq!(ImpactType::from_depth(1), ImpactType::Direct);
        assert_eq!(ImpactType::from_depth(2), ImpactType::Indirect);
        assert_eq!(ImpactType::from_depth(10), ImpactType::Indirect);
    }

    // -------------------------------------------------------------------
    // 3. Edges and ids
    // -------------------------------------------------------------------

    #[test]
    fn edge_serde_defaults_apply() {
        let json = r#"{
            "source": {"namespace": "wh", "dataset": "orders", "field": "amount"},
            "target": {"namespace": "wh", "dataset": "daily", "field": "revenue"}
        }"#;
        let edge: LineageEdge = serde_json::from_str(json).unwrap();
        assert_eq!(edge.id, "");
        assert_eq!(edge.transformation_type, TransformationType::Unknown);
        assert_eq!(edge.confidence, 1.0);
        assert!(edge.active);
        assert!(edge.created_at.is_none());
    }

    #[test]
    fn edge_serialization_uses_uppercase_transformation_type() {
        let edge = LineageEdge {
            id: "e1".into(),
            source: FieldRef::new("wh", "orders", "amount"),
            target: FieldRef::new("wh", "daily", "revenue"),
            transformation_type: TransformationType::Aggregation,
            confidence: 0.9,
            active: true,
            created_at: None,
        };
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"AGGREGATION\""));
        assert!(!json.contains("created_at"));
    }

    #[test]
    fn make_edge_id_is_deterministic() {
        let a = FieldRef::new("wh", "orders", "amount");
        let b = FieldRef::new("wh", "daily", "revenue");
        let first = make_edge_id(&a, &b, TransformationType::Aggregation);
        let second = make_edge_id(&a, &b, TransformationType::Aggregation);
        assert_eq!(first, second);
    }

    #[test]
    fn make_edge_id_distinguishes_type_and_direction() {
        let a = FieldRef::new("wh", "orders", "amount");
        let b = FieldRef::new("wh", "daily", "revenue");
        let agg = make_edge_id(&a, &b, TransformationType::Aggregation);
        let join = make_edge_id(&a, &b, TransformationType::Join);
        let reversed = make_edge_id(&b, &a, TransformationType::Aggregation);
        assert_ne!(agg, join);
        assert_ne!(agg, reversed);
    }

    // -------------------------------------------------------------------
    // 4. Property-based checks
    // -------------------------------------------------------------------

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_component() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9_]{0,8}".prop_map(|s| s)
        }

        proptest! {
            #[test]
            fn edge_id_shape_is_stable(
                ns in arb_component(),
                ds in arb_component(),
                f1 in arb_component(),
                f2 in arb_component(),
            ) {
                let src = FieldRef::new(ns.clone(), ds.clone(), f1);
                let tgt = FieldRef::new(ns, ds, f2);
                let id = make_edge_id(&src, &tgt, TransformationType::Direct);
                prop_assert!(id.starts_with("e_"));
                prop_assert_eq!(id.len(), 18);
                prop_assert!(id[2..].chars().all(|c| c.is_ascii_hexdigit()));
            }

            #[test]
            fn parse_inverts_qualified_name(
                ns in arb_component(),
                ds in arb_component(),
                f in arb_component(),
            ) {
                let fr = FieldRef::new(ns, ds, f);
                let parsed = FieldRef::parse(&fr.qualified_name());
                prop_assert_eq!(parsed, Some(fr));
            }
        }
    }
}
