// Typed graph model of the declared application.
//
// All entities live in flat vectors owned by `Application` and reference
// each other through typed integer keys, so path segments can point back at
// callbacks and nodes without ownership cycles. Construction resolves the
// declared architecture into callbacks, scheduling edges, publish edges and
// communication edges, then derives every intra-node and end-to-end path.

mod application;
mod callback;
mod comm;
mod names;
mod node;
mod path;
mod sched;

pub use application::{Application, PathRef};
pub use callback::{Callback, CallbackKind, Publish};
pub use comm::{Comm, TransportLink};
pub use names::NameRegistry;
pub use node::Node;
pub use path::{EndToEndPath, NodePath, NodeSegment, PathSegment};
pub use sched::Sched;

use thiserror::Error;

use crate::path_search::SearchError;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Key into `Application::nodes`.
    NodeId
);
entity_id!(
    /// Key into `Application::callbacks`.
    CallbackId
);
entity_id!(
    /// Key into `Application::scheds`.
    SchedId
);
entity_id!(
    /// Key into `Application::comms`.
    CommId
);
entity_id!(
    /// Key into `Application::node_paths`.
    NodePathId
);
entity_id!(
    /// Key into `Application::end_to_end_paths`.
    EndToEndId
);

/// Failures while resolving a declared architecture into a graph.
///
/// All of these are fatal for the run; nothing is correlated against a graph
/// that failed to construct.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("node '{node}' declared more than once")]
    DuplicateNode { node: String },

    #[error("node '{node}': no callback with symbol '{symbol}'")]
    UnknownSymbol { node: String, symbol: String },

    #[error("node '{node}': more than one timer callback with period {period}")]
    DuplicateTimerPeriod { node: String, period: f64 },

    #[error("node '{node}': more than one subscription on topic '{topic}'")]
    DuplicateSubscription { node: String, topic: String },

    #[error(transparent)]
    Search(#[from] SearchError),
}

pub type Result<T> = std::result::Result<T, ConstructionError>;

#[cfg(test)]
mod tests;
