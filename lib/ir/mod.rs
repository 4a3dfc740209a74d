//! The reference-graph data model.
//!
//! A host frontend lowers the analyzed program into a
//! [`ReferenceGraph`]: an arena of [`Node`]s and a table of
//! [`FlowEdge`]s, one edge per data-flow construct of the source.
//!
//! Typable locations are [`ReferenceSite`]s. Expressions the frontend
//! cannot type directly (casts, chained accesses, calls used as values)
//! are intermediate nodes; the solver resolves them to the sites they
//! stand for before applying any rule. Methods appear twice: as a
//! [`Method`] table entry describing receiver/parameters/return and
//! overrides, and as a `Method`-kind site carrying the method's
//! static-state qualifier.
//!
//! The graph is deliberately dumb. Everything the solver learns goes
//! into its own store; only final [`Mutability`] tags come back, through
//! [`ReferenceGraph::set_tag`].

mod flow;
mod graph;
mod method;
mod node;
mod site;

pub use self::flow::*;
pub use self::graph::*;
pub use self::method::*;
pub use self::node::*;
pub use self::site::*;
