//! Route discovery and self-heal.
//!
//! Given a set of failed/removed node IDs, finds replacement link targets for
//! every node that pointed at a failed node. Search is breadth-first over the
//! link graph, excluding failed nodes, bounded by `max_depth` and capped at
//! `max_routes` candidates per query.
//!
//! ## Behavior
//!
//! - Direct (depth-1) non-failed neighbors are preferred and returned
//!   immediately without deeper search.
//! - No reachable candidate → empty route set, not an error.
//! - Results are cached per `(failed_id, source_id)` for the lifetime of the
//!   engine; entries touching gold-standard anchors are pinned outside the
//!   LRU so they can never be evicted mid-run.
//! - Each query is timed against a caller-supplied budget. A late result is
//!   still returned — the overrun is reported, and the caller decides.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::registry::AnchorSet;

use super::link_graph::LinkGraph;

// ============================================================================
// Configuration & result types
// ============================================================================

/// Tuning for route discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteDiscoveryConfig {
    /// Maximum BFS depth (default 3).
    pub max_depth: usize,
    /// Maximum candidate routes per query (default 5).
    pub max_routes: usize,
    /// Default per-query time budget in milliseconds (default 50).
    pub time_budget_ms: u64,
    /// LRU capacity for the per-run result cache (default 1024).
    pub cache_capacity: usize,
}

impl Default for RouteDiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_routes: 5,
            time_budget_ms: 50,
            cache_capacity: 1024,
        }
    }
}

/// One replacement route candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Suggested replacement link target.
    pub target: String,
    /// Full node path from the source to the target (source first).
    pub path: Vec<String>,
    /// Hops from the source to the target.
    pub depth: usize,
}

/// Result of a single replacement query.
#[derive(Debug, Clone)]
pub struct RouteQueryResult {
    pub routes: Vec<Route>,
    pub elapsed: Duration,
    /// False when the query exceeded its time budget.
    pub within_budget: bool,
    pub from_cache: bool,
}

/// One healed edge in a [`HealReport`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealEntry {
    pub failed_id: String,
    pub source_id: String,
    pub routes: Vec<Route>,
    pub within_budget: bool,
}

/// Aggregate result of healing a set of failed nodes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealReport {
    pub entries: Vec<HealEntry>,
    pub queries: u64,
    pub cache_hits: u64,
    pub budget_overruns: u64,
}

// ============================================================================
// Engine
// ============================================================================

type CacheKey = (String, String); // (failed_id, source_id)

/// Route discovery engine over a built link graph.
///
/// All caches live on the instance — constructed per run, dropped with it.
pub struct RouteDiscovery {
    graph: LinkGraph,
    config: RouteDiscoveryConfig,
    anchors: AnchorSet,
    cache: LruCache<CacheKey, Vec<Route>>,
    /// Anchor-touching entries, exempt from LRU eviction.
    pinned: HashMap<CacheKey, Vec<Route>>,
}

impl RouteDiscovery {
    pub fn new(graph: LinkGraph, config: RouteDiscoveryConfig, anchors: AnchorSet) -> Self {
        let capacity =
            NonZeroUsize::new(config.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            graph,
            config,
            anchors,
            cache: LruCache::new(capacity),
            pinned: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Default budget from configuration.
    pub fn default_budget(&self) -> Duration {
        Duration::from_millis(self.config.time_budget_ms)
    }

    /// Find replacement routes for `source_id`'s broken edge to `failed_id`.
    ///
    /// `failed` is the complete failed set excluded from traversal. The query
    /// is answered from cache when possible; otherwise BFS runs to completion
    /// and the elapsed time is compared against `budget`.
    pub fn query(
        &mut self,
        source_id: &str,
        failed_id: &str,
        failed: &HashSet<String>,
        budget: Duration,
    ) -> RouteQueryResult {
        let key: CacheKey = (failed_id.to_string(), source_id.to_string());
        if let Some(routes) = self.cached(&key) {
            return RouteQueryResult {
                routes,
                elapsed: Duration::ZERO,
                within_budget: true,
                from_cache: true,
            };
        }

        let start = Instant::now();
        let routes = self.search(source_id, failed);
        let elapsed = start.elapsed();
        let within_budget = elapsed <= budget;
        if !within_budget {
            tracing::warn!(
                source = source_id,
                failed = failed_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "route query exceeded time budget"
            );
        }

        self.store(key, routes.clone());
        RouteQueryResult {
            routes,
            elapsed,
            within_budget,
            from_cache: false,
        }
    }

    /// Heal a set of failed node IDs: for every inbound edge to a failed
    /// node, find replacement routes for the edge's source.
    pub fn heal(&mut self, failed_ids: &[String]) -> HealReport {
        let failed: HashSet<String> = failed_ids.iter().cloned().collect();
        let budget = self.default_budget();
        let mut report = HealReport::default();

        for failed_id in failed_ids {
            let Some(failed_idx) = self.graph.get_index(failed_id) else {
                tracing::debug!(failed = %failed_id, "failed node not in link graph, skipped");
                continue;
            };
            let sources: Vec<String> = self
                .graph
                .incoming(failed_idx)
                .map(|i| self.graph.id_of(i).to_string())
                .filter(|id| !failed.contains(id))
                .collect();

            for source_id in sources {
                let result = self.query(&source_id, failed_id, &failed, budget);
                report.queries += 1;
                if result.from_cache {
                    report.cache_hits += 1;
                }
                if !result.within_budget {
                    report.budget_overruns += 1;
                }
                report.entries.push(HealEntry {
                    failed_id: failed_id.clone(),
                    source_id,
                    routes: result.routes,
                    within_budget: result.within_budget,
                });
            }
        }
        report
    }

    // ------------------------------------------------------------------
    // BFS
    // ------------------------------------------------------------------

    /// Bounded BFS from `source_id` for replacement targets.
    ///
    /// The failed set is excluded from traversal entirely: a failed node is
    /// neither a candidate nor an intermediate hop, so a route exists only
    /// when the surviving subgraph reaches it. Depth-1 surviving neighbors
    /// short-circuit the search; otherwise candidates are collected in BFS
    /// order up to `max_routes`, no deeper than `max_depth`. No surviving
    /// path → empty route set.
    fn search(&self, source_id: &str, failed: &HashSet<String>) -> Vec<Route> {
        let Some(start) = self.graph.get_index(source_id) else {
            return Vec::new();
        };

        // Depth-1 preference: direct surviving neighbors win outright.
        let direct: Vec<Route> = self
            .graph
            .outgoing(start)
            .filter(|&n| !failed.contains(self.graph.id_of(n)))
            .take(self.config.max_routes)
            .map(|n| {
                let target = self.graph.id_of(n).to_string();
                Route {
                    path: vec![source_id.to_string(), target.clone()],
                    target,
                    depth: 1,
                }
            })
            .collect();
        if !direct.is_empty() {
            return direct;
        }

        let mut routes = Vec::new();
        let mut visited: HashSet<_> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<(petgraph::graph::NodeIndex, Vec<String>, usize)> =
            VecDeque::new();
        queue.push_back((start, vec![source_id.to_string()], 0));

        while let Some((idx, path, depth)) = queue.pop_front() {
            if depth >= self.config.max_depth {
                continue;
            }
            for next in self.graph.outgoing(idx) {
                let id = self.graph.id_of(next);
                if failed.contains(id) {
                    continue;
                }
                if !visited.insert(next) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(id.to_string());
                routes.push(Route {
                    target: id.to_string(),
                    path: next_path.clone(),
                    depth: depth + 1,
                });
                if routes.len() >= self.config.max_routes {
                    return routes;
                }
                queue.push_back((next, next_path, depth + 1));
            }
        }
        routes
    }

    // ------------------------------------------------------------------
    // Cache (anchored keys pinned outside the LRU)
    // ------------------------------------------------------------------

    fn is_pinned_key(&self, key: &CacheKey) -> bool {
        self.anchors.contains(&key.0) || self.anchors.contains(&key.1)
    }

    fn cached(&mut self, key: &CacheKey) -> Option<Vec<Route>> {
        if let Some(routes) = self.pinned.get(key) {
            return Some(routes.clone());
        }
        self.cache.get(key).cloned()
    }

    fn store(&mut self, key: CacheKey, routes: Vec<Route>) {
        if self.is_pinned_key(&key) {
            self.pinned.insert(key, routes);
        } else {
            self.cache.put(key, routes);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Node, NodeKind, Registry};

    fn node(id: &str, links: &[&str]) -> Node {
        let mut n = Node::new(id, NodeKind::Tool, id, format!("/tools/{}", id));
        n.links = links.iter().map(|s| s.to_string()).collect();
        n
    }

    fn discovery(nodes: Vec<Node>) -> RouteDiscovery {
        let registry = Registry::from_nodes(nodes);
        let graph = LinkGraph::build(&registry, &[]);
        RouteDiscovery::new(graph, RouteDiscoveryConfig::default(), AnchorSet::default())
    }

    fn failed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direct_neighbors_returned_immediately() {
        // a → {dead, b, c}; b → d. Direct survivors b and c win; d is never
        // reached because the depth-1 preference short-circuits.
        let mut d = discovery(vec![
            node("a", &["dead", "b", "c"]),
            node("b", &["d"]),
            node("c", &[]),
            node("d", &[]),
            node("dead", &[]),
        ]);
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::from_millis(50));
        assert!(!result.from_cache);
        assert_eq!(result.routes.len(), 2);
        assert!(result.routes.iter().all(|r| r.depth == 1));
        let targets: Vec<&str> = result.routes.iter().map(|r| r.target.as_str()).collect();
        assert!(targets.contains(&"b") && targets.contains(&"c"));
    }

    #[test]
    fn test_failed_node_is_not_a_traversable_hop() {
        // a → dead → {c, e}: the failed node's own targets are only reachable
        // through it, so they are not valid replacements and the route set is
        // empty.
        let mut d = discovery(vec![
            node("a", &["dead"]),
            node("dead", &["c", "e"]),
            node("c", &[]),
            node("e", &[]),
        ]);
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::from_millis(50));
        assert!(
            result.routes.is_empty(),
            "targets behind a failed node must not be offered, got {:?}",
            result.routes
        );

        // With a surviving sibling, only the sibling is offered and no route
        // path ever contains the failed node.
        let mut d = discovery(vec![
            node("a", &["dead", "b"]),
            node("dead", &["c"]),
            node("b", &[]),
            node("c", &[]),
        ]);
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::from_millis(50));
        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].target, "b");
        for route in &result.routes {
            assert!(!route.path.iter().any(|hop| hop == "dead"));
        }
    }

    #[test]
    fn test_no_path_around_failure_returns_empty() {
        // a → dead, dead → nothing: no route around the failure exists.
        let mut d = discovery(vec![node("a", &["dead"]), node("dead", &[])]);
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::from_millis(50));
        assert!(result.routes.is_empty(), "empty route set, not an error");
    }

    #[test]
    fn test_chained_failures_block_deeper_targets() {
        // a → f1 → f2 → survivor with f1 and f2 failed: every path to the
        // survivor runs through failed nodes, so nothing is reachable.
        let mut d = discovery(vec![
            node("a", &["f1"]),
            node("f1", &["f2"]),
            node("f2", &["survivor"]),
            node("survivor", &[]),
        ]);
        let set = failed(&["f1", "f2"]);
        let result = d.query("a", "f1", &set, Duration::from_millis(50));
        assert!(
            result.routes.is_empty(),
            "a failure chain leaves no surviving path"
        );
    }

    #[test]
    fn test_max_routes_cap() {
        let mut links: Vec<String> = vec!["dead".to_string()];
        links.extend((0..10).map(|i| format!("n{}", i)));
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

        let mut nodes = vec![node("a", &link_refs), node("dead", &[])];
        for i in 0..10 {
            nodes.push(node(&format!("n{}", i), &[]));
        }
        let mut d = discovery(nodes);
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::from_millis(50));
        assert_eq!(result.routes.len(), 5, "capped at max_routes");
    }

    #[test]
    fn test_query_cached_for_run_lifetime() {
        let mut d = discovery(vec![
            node("a", &["dead", "b"]),
            node("b", &[]),
            node("dead", &[]),
        ]);
        let set = failed(&["dead"]);
        let first = d.query("a", "dead", &set, Duration::from_millis(50));
        let second = d.query("a", "dead", &set, Duration::from_millis(50));
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.routes, second.routes);
    }

    #[test]
    fn test_heal_walks_inbound_edges() {
        // a → dead, b → dead, dead → nothing. Both a and b get queries;
        // each has a surviving alternative via their other links.
        let mut d = discovery(vec![
            node("a", &["dead", "x"]),
            node("b", &["dead", "y"]),
            node("x", &[]),
            node("y", &[]),
            node("dead", &[]),
        ]);
        let report = d.heal(&["dead".to_string()]);
        assert_eq!(report.queries, 2);
        assert_eq!(report.entries.len(), 2);
        for entry in &report.entries {
            assert_eq!(entry.failed_id, "dead");
            assert_eq!(entry.routes.len(), 1);
        }
    }

    #[test]
    fn test_heal_unknown_failed_id_is_noop() {
        let mut d = discovery(vec![node("a", &[])]);
        let report = d.heal(&["ghost".to_string()]);
        assert_eq!(report.queries, 0);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_isolated_failure_returns_empty_not_error() {
        // Only edge in the graph points at the failed node.
        let mut d = discovery(vec![node("a", &["dead"]), node("dead", &[])]);
        let report = d.heal(&["dead".to_string()]);
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].routes.is_empty());
    }

    #[test]
    fn test_anchor_entries_survive_lru_pressure() {
        // Tiny LRU (capacity 1) + anchored source: the anchored entry must
        // stay cached while non-anchored entries churn.
        let registry = Registry::from_nodes(vec![
            node("anchored", &["dead", "x"]),
            node("other1", &["dead", "x"]),
            node("other2", &["dead", "x"]),
            node("x", &[]),
            node("dead", &[]),
        ]);
        let graph = LinkGraph::build(&registry, &[]);
        let config = RouteDiscoveryConfig {
            cache_capacity: 1,
            ..RouteDiscoveryConfig::default()
        };
        let anchors = AnchorSet::new("gold", vec!["anchored".to_string()]);
        let mut d = RouteDiscovery::new(graph, config, anchors);

        let set = failed(&["dead"]);
        let budget = Duration::from_millis(50);
        d.query("anchored", "dead", &set, budget);
        // Churn the 1-slot LRU
        d.query("other1", "dead", &set, budget);
        d.query("other2", "dead", &set, budget);

        let again = d.query("anchored", "dead", &set, budget);
        assert!(again.from_cache, "anchored entry must never be evicted");
    }

    #[test]
    fn test_budget_overrun_reported_not_swallowed() {
        let mut d = discovery(vec![
            node("a", &["dead", "b"]),
            node("b", &[]),
            node("dead", &[]),
        ]);
        // Zero budget: any real search overruns, result still returned.
        let result = d.query("a", "dead", &failed(&["dead"]), Duration::ZERO);
        assert!(!result.within_budget);
        assert_eq!(result.routes.len(), 1);
    }
}
