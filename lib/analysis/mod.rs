//! Reference immutability inference over a reference graph.
//!
//! [`infer`] runs the full pipeline: normalize the graph, resolve
//! compound nodes, shrink candidate sets to a fixed point, extract
//! tags, retire placeholders and derive purity. Everything the run
//! learned lands as tags on the graph; the returned [`Inference`]
//! carries the rest.

mod checkers;
mod fixed_point;
mod purity;
mod qualifier;
mod resolve;
mod sanity;
mod store;
pub(crate) mod typing;

pub use self::checkers::Checkers;
pub(crate) use self::fixed_point::fixed_point;
pub use self::fixed_point::Options;
pub use self::purity::Purity;
pub use self::qualifier::{adapt_field, adapt_method, CandidateSet, Qualifier};
pub use self::resolve::{ContainerChain, Resolver};
pub use self::sanity::SanityReport;
pub use self::store::QualifierStore;

use crate::ir::ReferenceGraph;
use crate::summary::Summary;
use crate::Error;
use log::info;
use std::collections::BTreeMap;

/// What one finished run produced, beyond the tags written to the
/// graph itself.
#[derive(Clone, Debug)]
pub struct Inference {
    rounds: usize,
    untyped: Vec<usize>,
    purity: BTreeMap<usize, Purity>,
    summary: Summary,
    sanity: SanityReport,
}

impl Inference {
    /// Rounds the driver ran, the final quiet round included.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Sites whose candidate sets were emptied by conflicting
    /// constraints.
    pub fn untyped(&self) -> &[usize] {
        &self.untyped
    }

    pub fn purity(&self) -> &BTreeMap<usize, Purity> {
        &self.purity
    }

    pub fn is_pure(&self, method: usize) -> bool {
        self.purity.get(&method) == Some(&Purity::Pure)
    }

    /// The final candidate sets of the method and field surfaces, in
    /// the textual seed format.
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn sanity(&self) -> &SanityReport {
        &self.sanity
    }

    pub fn is_sane(&self) -> bool {
        self.sanity.is_sane()
    }
}

/// Run inference with no seeds and default options.
pub fn infer(graph: &mut ReferenceGraph) -> Result<Inference, Error> {
    infer_with(graph, &[], &Options::new())
}

/// Run inference, seeding candidate sets from the given summaries
/// first. Tags from an earlier run are discarded.
pub fn infer_with(
    graph: &mut ReferenceGraph,
    seeds: &[Summary],
    options: &Options,
) -> Result<Inference, Error> {
    graph.clear_tags();
    graph.normalize();
    let resolver = Resolver::build(graph);
    let mut store = QualifierStore::new();
    for seed in seeds {
        seed.seed(graph, &mut store);
    }

    let rounds = fixed_point(graph, &resolver, &mut store, options)?;
    let untyped = typing::extract(graph, &store)?;
    let summary = Summary::collect(graph, &store);
    graph.retire_placeholders();
    let purity = purity::derive(graph);
    let sanity = SanityReport::check(graph);

    info!(
        "inference finished: {} rounds, {} shrink events, {} untyped",
        rounds,
        store.shrink_events(),
        untyped.len()
    );
    Ok(Inference {
        rounds,
        untyped,
        purity,
        summary,
        sanity,
    })
}
