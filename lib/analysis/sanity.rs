//! Post-run checks over extracted tags.
//!
//! Nothing here aborts a run. The report exists so callers can tell a
//! clean inference from one that hit conflicting seeds or a malformed
//! graph, without trawling the warning log.

use crate::analysis::{CandidateSet, Qualifier};
use crate::ir::{Mutability, ReferenceGraph};
use log::warn;
use std::fmt;

/// What a finished run left behind that it should not have.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SanityReport {
    untyped: Vec<usize>,
    out_of_kind: Vec<usize>,
    placeholder_tags: Vec<usize>,
}

impl SanityReport {
    pub(crate) fn check(graph: &ReferenceGraph) -> SanityReport {
        let mut report = SanityReport::default();
        for site in graph.sites() {
            let index = site.index();
            let tag = match graph.tag(index) {
                Some(tag) => tag,
                None => continue,
            };
            let qualifier = match tag {
                Mutability::Mutable => Qualifier::Mutable,
                Mutability::Polyread => Qualifier::Polyread,
                Mutability::Readonly => Qualifier::Readonly,
                Mutability::Untyped => {
                    report.untyped.push(index);
                    continue;
                }
            };
            if !CandidateSet::default_for(site.kind()).has(qualifier) {
                warn!("site {} tagged {} outside its kind range", site, tag);
                report.out_of_kind.push(index);
            }
        }
        for node in 0..graph.num_nodes() {
            if graph.is_placeholder(node) && graph.tags().contains_key(&node) {
                warn!("placeholder n{} still carries a tag", node);
                report.placeholder_tags.push(node);
            }
        }
        if !report.untyped.is_empty() {
            warn!("{} sites finished UNTYPED", report.untyped.len());
        }
        report
    }

    /// Sites whose candidate sets were emptied by conflicting
    /// constraints.
    pub fn untyped(&self) -> &[usize] {
        &self.untyped
    }

    /// Sites tagged outside their kind's candidate range.
    pub fn out_of_kind(&self) -> &[usize] {
        &self.out_of_kind
    }

    /// Placeholders that were never retired.
    pub fn placeholder_tags(&self) -> &[usize] {
        &self.placeholder_tags
    }

    pub fn is_sane(&self) -> bool {
        self.untyped.is_empty() && self.out_of_kind.is_empty() && self.placeholder_tags.is_empty()
    }
}

impl fmt::Display for SanityReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} untyped, {} out of kind range, {} placeholder tags",
            self.untyped.len(),
            self.out_of_kind.len(),
            self.placeholder_tags.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_inside_kind_ranges_are_sane() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let x = graph.new_local(m, "x").unwrap();
        let c = graph.new_instantiation(m, "new C()").unwrap();
        graph.set_tag(x, Mutability::Readonly).unwrap();
        graph.set_tag(c, Mutability::Mutable).unwrap();
        graph.set_tag(m, Mutability::Readonly).unwrap();
        let this = graph.method(m).unwrap().receiver().unwrap();
        graph.set_tag(this, Mutability::Polyread).unwrap();

        assert!(SanityReport::check(&graph).is_sane());
    }

    #[test]
    fn untyped_tags_are_reported() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let x = graph.new_local(m, "x").unwrap();
        graph.set_tag(x, Mutability::Untyped).unwrap();

        let report = SanityReport::check(&graph);
        assert_eq!(report.untyped(), &[x]);
        assert!(!report.is_sane());
    }

    #[test]
    fn creation_sites_must_tag_mutable() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let c = graph.new_instantiation(m, "new C()").unwrap();
        graph.set_tag(c, Mutability::Readonly).unwrap();

        let report = SanityReport::check(&graph);
        assert_eq!(report.out_of_kind(), &[c]);
    }

    #[test]
    fn unretired_placeholders_are_reported() {
        let mut graph = ReferenceGraph::new();
        let callee = graph.new_method("A.poke()V", false);
        let recv = graph.new_local(callee, "a").unwrap();
        let call = graph
            .new_call("A.poke()V", Some(recv), vec![], vec![callee])
            .unwrap();
        graph.call(callee, None, call).unwrap();
        graph.normalize();
        let ret = graph.method(callee).unwrap().return_value().unwrap();
        graph.set_tag(ret, Mutability::Readonly).unwrap();

        let report = SanityReport::check(&graph);
        assert!(report.placeholder_tags().contains(&ret));

        graph.retire_placeholders();
        assert!(SanityReport::check(&graph).is_sane());
    }
}
