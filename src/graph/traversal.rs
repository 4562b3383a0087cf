//! Lineage traversal over the edge store.
//!
//! Iterative frontier expansion: each round issues one batched point-lookup
//! covering every live branch, then extends branches in memory. Cycle
//! safety is per branch — an edge id may not repeat on the path that
//! reached it — so diamonds converge while cycles terminate. Depth is
//! bounded by `max_depth`, which also bounds the number of rounds.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};
use crate::graph::store::EdgeStore;
use crate::types::{Direction, FieldRef, LineageEdge};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// An edge annotated with the minimum depth at which traversal reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeWithDepth {
    #[serde(flatten)]
    pub edge: LineageEdge,
    pub depth: u32,
}

/// Full traversal output: deduplicated edges plus every identity touched.
///
/// `nodes` always contains the start field, even when no edge matched.
/// Ordering is deterministic (edges by depth then id, nodes by identity)
/// but callers that need a different order sort for themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    pub start: FieldRef,
    pub direction: Direction,
    pub max_depth: u32,
    pub nodes: Vec<FieldRef>,
    pub edges: Vec<EdgeWithDepth>,
}

/// Scalar statistics, computed from the same expansion that would have
/// produced the full result. `node_count` is the exact number of distinct
/// identities the full result would carry, start included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalSummary {
    pub edge_count: usize,
    pub node_count: usize,
    pub max_depth_reached: u32,
}

// ---------------------------------------------------------------------------
// Internal expansion state
// ---------------------------------------------------------------------------

/// One live branch: the endpoint it stopped at, the hops taken to get
/// there, and the ids of the edges on its path.
struct Branch {
    node: FieldRef,
    depth: u32,
    path: HashSet<String>,
}

/// Per-run accumulator. Edges dedupe by id keeping the minimum depth;
/// nodes collect every endpoint of every recorded edge.
#[derive(Default)]
struct Reached {
    edges: HashMap<String, (LineageEdge, u32)>,
    nodes: HashSet<FieldRef>,
}

impl Reached {
    fn record(&mut self, edge: &LineageEdge, depth: u32) {
        self.nodes.insert(edge.source.clone());
        self.nodes.insert(edge.target.clone());
        self.edges
            .entry(edge.id.clone())
            .and_modify(|(_, d)| {
                if depth < *d {
                    *d = depth;
                }
            })
            .or_insert_with(|| (edge.clone(), depth));
    }

    fn max_depth_reached(&self) -> u32 {
        self.edges.values().map(|(_, d)| *d).max().unwrap_or(0)
    }

    fn node_count_with(&self, start: &FieldRef) -> usize {
        if self.nodes.contains(start) {
            self.nodes.len()
        } else {
            self.nodes.len() + 1
        }
    }

    fn into_result(
        mut self,
        start: &FieldRef,
        direction: Direction,
        max_depth: u32,
    ) -> TraversalResult {
        self.nodes.insert(start.clone());
        let mut nodes: Vec<FieldRef> = self.nodes.into_iter().collect();
        nodes.sort_unstable();

        let mut edges: Vec<EdgeWithDepth> = self
            .edges
            .into_values()
            .map(|(edge, depth)| EdgeWithDepth { edge, depth })
            .collect();
        edges.sort_unstable_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| a.edge.id.cmp(&b.edge.id))
        });

        TraversalResult {
            start: start.clone(),
            direction,
            max_depth,
            nodes,
            edges,
        }
    }
}

fn validate_request(start: &FieldRef, max_depth: u32) -> Result<()> {
    if max_depth == 0 {
        return Err(LineageError::DepthOutOfRange(max_depth));
    }
    if !start.is_complete() {
        return Err(LineageError::MalformedFieldRef(start.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LineageTraversal
// ---------------------------------------------------------------------------

/// Traversal engine bound to an [`EdgeStore`].
///
/// Every call is independent: path state and the result accumulator live
/// on the call stack, so concurrent traversals over separate stores (or
/// sequential ones over the same store) never interfere.
pub struct LineageTraversal<'a> {
    store: &'a EdgeStore,
}

impl<'a> LineageTraversal<'a> {
    /// Create a new traversal bound to the given store.
    pub fn new(store: &'a EdgeStore) -> Self {
        Self { store }
    }

    /// Upstream lineage: which fields feed `start`, transitively.
    pub fn upstream(&self, start: &FieldRef, max_depth: u32) -> Result<TraversalResult> {
        self.traverse(start, Direction::Upstream, max_depth)
    }

    /// Downstream lineage: which fields `start` feeds, transitively.
    pub fn downstream(&self, start: &FieldRef, max_depth: u32) -> Result<TraversalResult> {
        self.traverse(start, Direction::Downstream, max_depth)
    }

    /// Traverse from `start` in `direction`, following active edges only,
    /// to at most `max_depth` hops (`max_depth = 1` means directly
    /// touching edges only).
    ///
    /// A start with no matching edges yields `{nodes: [start], edges: []}`
    /// — an empty result is never an error. Errors are reserved for
    /// invalid input (`max_depth` 0, incomplete start identity) and store
    /// failures.
    pub fn traverse(
        &self,
        start: &FieldRef,
        direction: Direction,
        max_depth: u32,
    ) -> Result<TraversalResult> {
        let reached = self.collect(start, direction, max_depth)?;
        let result = reached.into_result(start, direction, max_depth);
        tracing::debug!(
            start = %start,
            direction = %direction,
            max_depth,
            edges = result.edges.len(),
            nodes = result.nodes.len(),
            "lineage traversal complete"
        );
        Ok(result)
    }

    /// Statistics-only variant of [`traverse`](Self::traverse); runs the
    /// same expansion without building the ordered result vectors. The
    /// numbers always agree with what the full result would report.
    pub fn traverse_summary(
        &self,
        start: &FieldRef,
        direction: Direction,
        max_depth: u32,
    ) -> Result<TraversalSummary> {
        let reached = self.collect(start, direction, max_depth)?;
        Ok(TraversalSummary {
            edge_count: reached.edges.len(),
            node_count: reached.node_count_with(start),
            max_depth_reached: reached.max_depth_reached(),
        })
    }

    fn collect(&self, start: &FieldRef, direction: Direction, max_depth: u32) -> Result<Reached> {
        validate_request(start, max_depth)?;
        let mut reached = Reached::default();
        match direction {
            Direction::Upstream | Direction::Downstream => {
                self.walk(start, direction, max_depth, &mut reached)?;
            }
            Direction::Both => {
                // Two independent runs with separate path state; the
                // accumulator unions edge sets by id at minimum depth.
                self.walk(start, Direction::Upstream, max_depth, &mut reached)?;
                self.walk(start, Direction::Downstream, max_depth, &mut reached)?;
            }
        }
        Ok(reached)
    }

    /// Round-by-round frontier expansion in a single direction.
    /// `direction` is Upstream or Downstream here, never Both.
    fn walk(
        &self,
        start: &FieldRef,
        direction: Direction,
        max_depth: u32,
        reached: &mut Reached,
    ) -> Result<()> {
        debug_assert!(direction != Direction::Both);
        let upstream = direction == Direction::Upstream;

        let mut frontier = vec![Branch {
            node: start.clone(),
            depth: 0,
            path: HashSet::new(),
        }];

        while !frontier.is_empty() {
            // One batched lookup per round, however many branches share
            // the frontier.
            let mut lookup: Vec<FieldRef> = Vec::new();
            {
                let mut seen: HashSet<&FieldRef> = HashSet::new();
                for branch in &frontier {
                    if seen.insert(&branch.node) {
                        lookup.push(branch.node.clone());
                    }
                }
            }

            let hits = if upstream {
                self.store.edges_into_any(&lookup)?
            } else {
                self.store.edges_out_of_any(&lookup)?
            };

            // Group hits by the endpoint they touch on the frontier side.
            let mut by_near: HashMap<&FieldRef, Vec<&LineageEdge>> = HashMap::new();
            for edge in &hits {
                let near = if upstream { &edge.target } else { &edge.source };
                by_near.entry(near).or_default().push(edge);
            }

            let mut next: Vec<Branch> = Vec::new();
            for branch in &frontier {
                if let Some(candidates) = by_near.get(&branch.node) {
                    for edge in candidates {
                        if branch.path.contains(&edge.id) {
                            continue; // this branch already walked this edge
                        }
                        let depth = branch.depth + 1;
                        reached.record(edge, depth);
                        if depth < max_depth {
                            let far = if upstream { &edge.source } else { &edge.target };
                            let mut path = branch.path.clone();
                            path.insert(edge.id.clone());
                            next.push(Branch {
                                node: far.clone(),
                                depth,
                                path,
                            });
                        }
                    }
                }
            }
            frontier = next;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
