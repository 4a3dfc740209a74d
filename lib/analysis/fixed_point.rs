//! The whole-graph fixed point.
//!
//! Inference items are the flow destinations of the graph's edges. Each
//! round walks the items in index order and dispatches every incident
//! edge through [`Checkers::check`] at most once; rounds repeat until a
//! full round shrinks nothing. Candidate sets only ever shrink and each
//! holds at most three qualifiers, so the round count is bounded by the
//! site count and termination needs no cap.

use crate::analysis::{Checkers, QualifierStore, Resolver};
use crate::ir::ReferenceGraph;
use crate::Error;
use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Knobs for one inference run.
#[derive(Clone, Debug, Default)]
pub struct Options {
    cancel: Option<Arc<AtomicBool>>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Install a cooperative cancellation flag. The driver polls it
    /// between rounds and abandons the run once it reads true.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Options {
        self.cancel = Some(cancel);
        self
    }

    pub fn cancel(&self) -> Option<&Arc<AtomicBool>> {
        self.cancel.as_ref()
    }
}

/// Run rule checking to quiescence. Returns the number of rounds taken,
/// counting the final quiet round.
pub(crate) fn fixed_point(
    graph: &ReferenceGraph,
    resolver: &Resolver,
    store: &mut QualifierStore,
    options: &Options,
) -> Result<usize, Error> {
    let mut edges_of: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    let mut orphans: Vec<usize> = Vec::new();
    for edge in graph.edges() {
        match edge.construct().destination() {
            Some(destination) => edges_of.entry(destination).or_default().push(edge.index()),
            None => orphans.push(edge.index()),
        }
    }
    let mut items: Vec<usize> = edges_of.keys().copied().collect();
    items.sort_unstable();

    let checkers = Checkers::new(graph, resolver);
    let mut rounds = 0;
    loop {
        if let Some(cancel) = options.cancel() {
            if cancel.load(Ordering::Relaxed) {
                debug!("inference cancelled after {} rounds", rounds);
                return Err(Error::Cancelled);
            }
        }
        rounds += 1;
        let mut changed = false;
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        for &item in &items {
            for &index in &edges_of[&item] {
                if !seen.insert(index) {
                    continue;
                }
                changed |= checkers.check(store, graph.edge(index)?);
            }
        }
        for &index in &orphans {
            if seen.insert(index) {
                changed |= checkers.check(store, graph.edge(index)?);
            }
        }
        trace!(
            "round {}: {} shrink events so far",
            rounds,
            store.shrink_events()
        );
        if !changed {
            break;
        }
    }
    debug!(
        "fixed point after {} rounds, {} shrink events",
        rounds,
        store.shrink_events()
    );
    Ok(rounds)
}
