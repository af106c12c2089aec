//! Depth-first route enumeration over "next hop" relations.
//!
//! Both layers of the graph use the same search: callbacks linked by
//! scheduling edges inside one node, and node paths linked by matching
//! topics across nodes. A search space exposes its successor relation and a
//! target predicate; `search` returns every route from the root to a target,
//! in discovery order. A node can sit in the middle of one route and
//! terminate another, so reaching a target records the route and the
//! traversal keeps going.
//!
//! The traversal carries the set of keys on the current route. Meeting one
//! of them again is a declared-architecture defect and fails the search
//! instead of recursing forever.
//!
//! # Example
//!
//! ```
//! use cadena::path_search::{search, SearchSpace};
//!
//! struct Chain;
//!
//! impl SearchSpace for Chain {
//!     type Key = u32;
//!     fn successors(&self, key: u32) -> Vec<u32> {
//!         if key < 2 { vec![key + 1] } else { Vec::new() }
//!     }
//!     fn is_target(&self, key: u32) -> bool {
//!         key == 2
//!     }
//!     fn label(&self, key: u32) -> String {
//!         key.to_string()
//!     }
//! }
//!
//! let routes = search(&Chain, 0).unwrap();
//! assert_eq!(routes, vec![vec![0, 1, 2]]);
//! ```

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A successor already sits on the current route.
    #[error("cycle detected: route [{route}] revisits {node}")]
    CycleDetected { route: String, node: String },
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// A graph the enumerator can walk: keys, successor edges, and the
/// predicate marking route termini.
pub trait SearchSpace {
    type Key: Copy + Eq + Hash + Debug;

    /// Keys reachable from `key` in one hop.
    fn successors(&self, key: Self::Key) -> Vec<Self::Key>;

    /// Whether a route ending at `key` should be recorded.
    fn is_target(&self, key: Self::Key) -> bool;

    /// Human-readable name for diagnostics.
    fn label(&self, key: Self::Key) -> String;
}

/// Enumerate every route from `root` to a target key.
///
/// A root that is itself a target yields a one-element route.
///
/// # Errors
///
/// `CycleDetected` when the successor relation loops back onto the current
/// route.
pub fn search<S: SearchSpace>(space: &S, root: S::Key) -> Result<Vec<Vec<S::Key>>> {
    let mut routes = Vec::new();
    let mut route = vec![root];
    let mut on_route = HashSet::new();
    on_route.insert(root);
    recurse(space, root, &mut route, &mut on_route, &mut routes)?;
    Ok(routes)
}

fn recurse<S: SearchSpace>(
    space: &S,
    node: S::Key,
    route: &mut Vec<S::Key>,
    on_route: &mut HashSet<S::Key>,
    routes: &mut Vec<Vec<S::Key>>,
) -> Result<()> {
    if space.is_target(node) {
        routes.push(route.clone());
    }
    for next in space.successors(node) {
        if !on_route.insert(next) {
            return Err(SearchError::CycleDetected {
                route: route
                    .iter()
                    .map(|k| space.label(*k))
                    .collect::<Vec<_>>()
                    .join(" -> "),
                node: space.label(next),
            });
        }
        route.push(next);
        recurse(space, next, route, on_route, routes)?;
        route.pop();
        on_route.remove(&next);
    }
    Ok(())
}
