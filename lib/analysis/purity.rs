//! Method purity derivation over final tags.

use crate::ir::{Method, Mutability, ReferenceGraph};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Native methods treated as trivially side-effect free.
const TRIVIAL_NATIVES: [&str; 4] = ["getClass", "hashCode", "clone", "getComponentType"];

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Purity {
    Pure,
    Impure,
}

impl fmt::Display for Purity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Purity::Pure => write!(f, "PURE"),
            Purity::Impure => write!(f, "IMPURE"),
        }
    }
}

fn method_is_pure(graph: &ReferenceGraph, method: &Method) -> bool {
    if method.is_native() {
        return TRIVIAL_NATIVES.contains(&method.simple_name());
    }
    if let Some(receiver) = method.receiver() {
        if graph.tag(receiver) != Some(Mutability::Readonly) {
            return false;
        }
    }
    for &parameter in method.parameters() {
        if graph.tag(parameter) != Some(Mutability::Readonly) {
            return false;
        }
    }
    // static state: anything short of a READONLY or POLYREAD method
    // tag means the method cannot be replayed
    matches!(
        graph.tag(method.index()),
        Some(Mutability::Readonly) | Some(Mutability::Polyread)
    )
}

/// Classify every method from the tags extraction wrote back. Run this
/// after extraction; untagged inputs classify IMPURE.
pub(crate) fn derive(graph: &ReferenceGraph) -> BTreeMap<usize, Purity> {
    let mut purity = BTreeMap::new();
    for method in graph.methods() {
        let class = if method_is_pure(graph, method) {
            Purity::Pure
        } else {
            Purity::Impure
        };
        purity.insert(method.index(), class);
    }
    let pure = purity.values().filter(|&&p| p == Purity::Pure).count();
    debug!("{} of {} methods derived pure", pure, purity.len());
    purity
}
