//! Downstream impact analysis over the lineage graph.
//!
//! A change to one field ripples to every field downstream of it. This
//! module classifies each reached field by how it was reached (directly or
//! through intermediates), groups the blast radius by namespace and depth,
//! and optionally tags fields a caller-supplied criticality predicate
//! flags. The engine itself carries no criticality policy; the bundled
//! [`CriticalityPolicy`] is one ready-made predicate, not a requirement.

use std::collections::BTreeMap;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::store::EdgeStore;
use crate::graph::traversal::LineageTraversal;
use crate::types::{FieldRef, ImpactType};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One impacted field with the minimum depth at which it was first reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactedNode {
    pub node: FieldRef,
    pub depth: u32,
    pub impact_type: ImpactType,
    /// Present only when the caller supplied a criticality predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
}

/// Blast radius of a change to `start`, grouped for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub start: FieldRef,
    pub max_depth: u32,
    /// Ordered by depth, then identity.
    pub impacted: Vec<ImpactedNode>,
    pub by_namespace: BTreeMap<String, usize>,
    pub by_depth: BTreeMap<u32, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_count: Option<usize>,
}

// ---------------------------------------------------------------------------
// CriticalityPolicy
// ---------------------------------------------------------------------------

/// Built-in dataset-name markers for warehouse tables that usually carry
/// business-facing numbers.
const DEFAULT_CRITICAL_PATTERNS: &[&str] = &[
    "(?i)^fact_",
    "(?i)^dim_",
    "(?i)^agg_",
    "(?i)_kpi",
    "(?i)report",
];

/// Dataset-name based criticality predicate backed by a [`RegexSet`].
///
/// Criticality is judged on the dataset component only; field and
/// namespace play no part.
#[derive(Debug, Clone)]
pub struct CriticalityPolicy {
    markers: RegexSet,
}

impl CriticalityPolicy {
    /// Compile a policy from caller-supplied patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            markers: RegexSet::new(patterns)?,
        })
    }

    pub fn is_critical(&self, node: &FieldRef) -> bool {
        self.markers.is_match(&node.dataset)
    }
}

impl Default for CriticalityPolicy {
    /// The built-in markers; falls back to an empty set (nothing critical)
    /// should a built-in pattern ever fail to compile.
    fn default() -> Self {
        let markers =
            RegexSet::new(DEFAULT_CRITICAL_PATTERNS).unwrap_or_else(|_| RegexSet::empty());
        Self { markers }
    }
}

// ---------------------------------------------------------------------------
// ImpactAnalysis
// ---------------------------------------------------------------------------

/// Impact analysis bound to an [`EdgeStore`].
pub struct ImpactAnalysis<'a> {
    store: &'a EdgeStore,
}

impl<'a> ImpactAnalysis<'a> {
    pub fn new(store: &'a EdgeStore) -> Self {
        Self { store }
    }

    /// Downstream blast radius of `start`, without criticality tagging.
    pub fn impact(&self, start: &FieldRef, max_depth: u32) -> Result<ImpactReport> {
        self.build(start, max_depth, None)
    }

    /// Downstream blast radius with per-node criticality from the caller's
    /// predicate, e.g. `|node| policy.is_critical(node)`.
    pub fn impact_classified<F>(
        &self,
        start: &FieldRef,
        max_depth: u32,
        is_critical: F,
    ) -> Result<ImpactReport>
    where
        F: Fn(&FieldRef) -> bool,
    {
        self.build(start, max_depth, Some(&is_critical))
    }

    fn build(
        &self,
        start: &FieldRef,
        max_depth: u32,
        is_critical: Option<&dyn Fn(&FieldRef) -> bool>,
    ) -> Result<ImpactReport> {
        let traversal = LineageTraversal::new(self.store);
        let result = traversal.downstream(start, max_depth)?;

        // Minimum first-reached depth per impacted field. A field counts as
        // impacted when it appears as the target of a traversed edge; that
        // includes the start itself when a cycle feeds back into it.
        let mut depths: BTreeMap<FieldRef, u32> = BTreeMap::new();
        for hit in &result.edges {
            let entry = depths.entry(hit.edge.target.clone()).or_insert(hit.depth);
            if hit.depth < *entry {
                *entry = hit.depth;
            }
        }

        let mut impacted: Vec<ImpactedNode> = depths
            .into_iter()
            .map(|(node, depth)| ImpactedNode {
                critical: is_critical.map(|f| f(&node)),
                impact_type: ImpactType::from_depth(depth),
                node,
                depth,
            })
            .collect();
        impacted.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.node.cmp(&b.node)));

        let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_depth: BTreeMap<u32, usize> = BTreeMap::new();
        for item in &impacted {
            *by_namespace.entry(item.node.namespace.clone()).or_insert(0) += 1;
            *by_depth.entry(item.depth).or_insert(0) += 1;
        }

        let critical_count = is_critical
            .map(|_| impacted.iter().filter(|i| i.critical == Some(true)).count());

        Ok(ImpactReport {
            start: start.clone(),
            max_depth,
            impacted,
            by_namespace,
            by_depth,
            critical_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
