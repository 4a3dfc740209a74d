//! The candidate-set store.
//!
//! All solver state lives here: one shrink-only [`CandidateSet`] per
//! touched site. The store is owned by the solver and written by nothing
//! else; the reference graph itself is never mutated while rules run.

use crate::analysis::{CandidateSet, Qualifier};
use crate::ir::ReferenceGraph;
use log::{trace, warn};
use rustc_hash::FxHashMap;

/// Candidate sets for every touched site, installed lazily with the
/// site kind's default on first touch.
#[derive(Clone, Debug, Default)]
pub struct QualifierStore {
    sets: FxHashMap<usize, CandidateSet>,
    shrink_events: usize,
}

impl QualifierStore {
    pub fn new() -> QualifierStore {
        QualifierStore::default()
    }

    fn default_for(graph: &ReferenceGraph, site: usize) -> CandidateSet {
        match graph.site(site) {
            Ok(site) => CandidateSet::default_for(site.kind()),
            Err(_) => {
                warn!("candidate lookup for non-site node n{}", site);
                CandidateSet::full()
            }
        }
    }

    /// The site's current candidate set, installing the kind default on
    /// first touch.
    pub fn candidates(&mut self, graph: &ReferenceGraph, site: usize) -> CandidateSet {
        if let Some(set) = self.sets.get(&site) {
            return *set;
        }
        let set = Self::default_for(graph, site);
        self.sets.insert(site, set);
        set
    }

    /// Intersect the site's set with `keep`. Returns whether the set
    /// shrank. An emptied set is reported and kept; extraction will tag
    /// the site UNTYPED.
    pub fn restrict(&mut self, graph: &ReferenceGraph, site: usize, keep: CandidateSet) -> bool {
        let old = self.candidates(graph, site);
        let new = old & keep;
        if new == old {
            return false;
        }
        self.shrink_events += (old.bits().count_ones() - new.bits().count_ones()) as usize;
        trace!("n{}: {} -> {}", site, old, new);
        if new.is_empty() {
            warn!("candidate set for n{} is empty", site);
        }
        self.sets.insert(site, new);
        true
    }

    /// Remove one qualifier from the site's set.
    pub fn strip(&mut self, graph: &ReferenceGraph, site: usize, qualifier: Qualifier) -> bool {
        self.restrict(graph, site, !CandidateSet::from(qualifier))
    }

    /// True when the site's kind starts with READONLY but the current
    /// set no longer has it. Only mutation side effects remove READONLY
    /// from such sites, so this is the "referent is mutated somewhere"
    /// signal the alias-aware rules consult. Creation sites, which never
    /// start with READONLY, never trigger it.
    pub fn mutation_forced(&mut self, graph: &ReferenceGraph, site: usize) -> bool {
        if !Self::default_for(graph, site).has(Qualifier::Readonly) {
            return false;
        }
        !self.candidates(graph, site).has(Qualifier::Readonly)
    }

    /// Narrow a site before the run starts, from an imported summary.
    pub fn seed(&mut self, graph: &ReferenceGraph, site: usize, set: CandidateSet) -> bool {
        self.restrict(graph, site, set)
    }

    /// Read a site's set without touching it.
    pub fn set(&self, site: usize) -> Option<CandidateSet> {
        self.sets.get(&site).cloned()
    }

    /// Every touched site and its current set.
    pub fn touched(&self) -> impl Iterator<Item = (usize, CandidateSet)> + '_ {
        self.sets.iter().map(|(site, set)| (*site, *set))
    }

    /// Total qualifiers removed across all sites so far. Bounded by
    /// three per site, which is what terminates the solver.
    pub fn shrink_events(&self) -> usize {
        self.shrink_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_local_and_literal() -> (ReferenceGraph, usize, usize) {
        let mut graph = ReferenceGraph::new();
        let m = graph.new_method("com.example.A.foo()V", false);
        let local = graph.new_local(m, "x").unwrap();
        let literal = graph.new_literal(m, "1").unwrap();
        (graph, local, literal)
    }

    #[test]
    fn lazy_defaults() {
        let (graph, local, literal) = graph_with_local_and_literal();
        let mut store = QualifierStore::new();
        assert!(store.set(local).is_none());
        assert_eq!(store.candidates(&graph, local), CandidateSet::full());
        assert_eq!(store.candidates(&graph, literal), CandidateSet::MUTABLE);
        assert!(store.set(local).is_some());
    }

    #[test]
    fn restrict_is_monotone_and_counted() {
        let (graph, local, _) = graph_with_local_and_literal();
        let mut store = QualifierStore::new();

        assert!(store.strip(&graph, local, Qualifier::Readonly));
        assert_eq!(store.shrink_events(), 1);
        // stripping again changes nothing
        assert!(!store.strip(&graph, local, Qualifier::Readonly));
        assert_eq!(store.shrink_events(), 1);
        // restrict never grows a set
        assert!(!store.restrict(&graph, local, CandidateSet::full()));
        assert_eq!(
            store.candidates(&graph, local),
            CandidateSet::MUTABLE | CandidateSet::POLYREAD
        );
    }

    #[test]
    fn mutation_forced_needs_a_default_with_readonly() {
        let (graph, local, literal) = graph_with_local_and_literal();
        let mut store = QualifierStore::new();

        assert!(!store.mutation_forced(&graph, local));
        store.strip(&graph, local, Qualifier::Readonly);
        assert!(store.mutation_forced(&graph, local));

        // a literal starts without READONLY and never counts as mutated
        assert!(!store.mutation_forced(&graph, literal));
    }

    #[test]
    fn emptied_sets_stay_and_report() {
        let (graph, _, literal) = graph_with_local_and_literal();
        let mut store = QualifierStore::new();
        store.strip(&graph, literal, Qualifier::Mutable);
        assert_eq!(store.set(literal).unwrap(), CandidateSet::empty());
        // still answers, still shrink-only
        assert!(!store.strip(&graph, literal, Qualifier::Mutable));
    }

    #[test]
    fn untouched_sites_never_enter_iteration() {
        let (graph, local, _) = graph_with_local_and_literal();
        let mut store = QualifierStore::new();
        store.candidates(&graph, local);
        assert_eq!(store.touched().count(), 1);
    }
}
