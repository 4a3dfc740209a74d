//! Maximal-type extraction.

use crate::analysis::QualifierStore;
use crate::ir::{Mutability, ReferenceGraph};
use crate::Error;
use log::{debug, warn};

/// Collapse candidate sets onto final tags, written back to the graph.
///
/// A touched site takes the greatest qualifier its set retains; a set
/// emptied by conflicting constraints tags UNTYPED and is reported in
/// the returned list. Untouched creation sites tag MUTABLE, every other
/// untouched site READONLY.
pub(crate) fn extract(
    graph: &mut ReferenceGraph,
    store: &QualifierStore,
) -> Result<Vec<usize>, Error> {
    let mut untyped = Vec::new();
    let sites: Vec<(usize, bool)> = graph
        .sites()
        .map(|site| (site.index(), site.kind().is_creation()))
        .collect();
    for (index, creation) in sites {
        let tag = match store.set(index) {
            Some(set) => match set.maximal() {
                Some(qualifier) => Mutability::from(qualifier),
                None => {
                    warn!("site n{} kept no candidates, tagging UNTYPED", index);
                    untyped.push(index);
                    Mutability::Untyped
                }
            },
            None if creation => Mutability::Mutable,
            None => Mutability::Readonly,
        };
        graph.set_tag(index, tag)?;
    }
    debug!(
        "extracted {} tags, {} untyped",
        graph.tags().len(),
        untyped.len()
    );
    Ok(untyped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CandidateSet, Qualifier};

    #[test]
    fn touched_sites_take_their_maximum() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let x = graph.new_local(m, "x").unwrap();
        let mut store = QualifierStore::new();
        store.strip(&graph, x, Qualifier::Readonly);

        extract(&mut graph, &store).unwrap();
        assert_eq!(graph.tag(x), Some(Mutability::Polyread));
    }

    #[test]
    fn untouched_sites_default_by_kind() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let x = graph.new_local(m, "x").unwrap();
        let c = graph.new_instantiation(m, "new C()").unwrap();
        let store = QualifierStore::new();

        extract(&mut graph, &store).unwrap();
        assert_eq!(graph.tag(x), Some(Mutability::Readonly));
        assert_eq!(graph.tag(c), Some(Mutability::Mutable));
    }

    #[test]
    fn emptied_sites_tag_untyped() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let x = graph.new_local(m, "x").unwrap();
        let mut store = QualifierStore::new();
        store.restrict(&graph, x, CandidateSet::empty());

        let untyped = extract(&mut graph, &store).unwrap();
        assert_eq!(untyped, vec![x]);
        assert_eq!(graph.tag(x), Some(Mutability::Untyped));
    }

    #[test]
    fn retired_placeholders_are_not_tagged() {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("A.foo()V", false);
        let recv = graph.method(m).unwrap().receiver().unwrap();
        let call = graph
            .new_call("A.foo()V", Some(recv), vec![], vec![m])
            .unwrap();
        graph.call(m, None, call).unwrap();
        graph.normalize();
        let ret = graph.method(m).unwrap().return_value().unwrap();

        let store = QualifierStore::new();
        graph.retire_placeholders();
        extract(&mut graph, &store).unwrap();
        assert_eq!(graph.tag(ret), None);
    }
}
