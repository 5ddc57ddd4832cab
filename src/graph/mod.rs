//! Link graph and route discovery.
//!
//! ```text
//! Registry + LinkRecommendations ──► LinkGraph (petgraph::DiGraph)
//!                                         │
//!                                  RouteDiscovery (bounded BFS)
//!                                         │
//!                                     HealReport
//! ```
//!
//! - [`link_graph`] — petgraph wrapper built from registry adjacency plus
//!   link recommendations
//! - [`discovery`] — bounded BFS self-heal for failed nodes, with a per-run
//!   result cache and anchor pinning

pub mod discovery;
pub mod link_graph;

pub use discovery::{HealReport, Route, RouteDiscovery, RouteDiscoveryConfig, RouteQueryResult};
pub use link_graph::{LinkGraph, RouteEdge, RouteNode};
