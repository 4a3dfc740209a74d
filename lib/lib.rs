//! Reim: Reference Immutability and Method Purity Inference in Rust.
//!
//! Reim infers, for every value-producing location of a host program
//! (locals, fields, parameters, method returns, receivers), a reference
//! immutability qualifier from the three-point lattice
//! `MUTABLE ⊑ POLYREAD ⊑ READONLY`, and derives method purity from the
//! result.
//!
//! The crate does not parse programs. A host frontend builds an
//! [`ir::ReferenceGraph`](crate::ir::ReferenceGraph), a graph of reference
//! sites connected by data-flow edges, one edge per source construct
//! (assignment, field access, call, array access). The solver in
//! [`analysis`](crate::analysis) then runs every construct's inference
//! rule over monotonically shrinking candidate sets until a global fixed
//! point is reached, extracts the maximal qualifier per site, and
//! classifies each method as pure or impure.
//!
//! A typical run:
//!
//! * build or deserialize a `ReferenceGraph`,
//! * optionally seed candidate sets from a previously emitted
//!   [`summary::Summary`](crate::summary::Summary),
//! * call [`analysis::infer`](crate::analysis::infer),
//! * read tags back through
//!   [`ReferenceGraph::tag`](crate::ir::ReferenceGraph::tag) and purity
//!   through [`Inference::is_pure`](crate::analysis::Inference::is_pure).

pub mod analysis;
mod error;
pub mod ir;
pub mod summary;

#[cfg(test)]
mod tests;

pub use crate::error::Error;
