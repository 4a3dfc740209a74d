//! Per-construct inference rules.
//!
//! Each rule enforces its construct's subtyping inequality by existential
//! search: a qualifier stays in a participant's candidate set only if
//! some choice of the other participants' qualifiers satisfies the
//! inequality. The search is generic over 2-, 3- and 4-ary participant
//! tuples; with three qualifiers the largest cross product is 81 rows.
//!
//! Besides the inequalities, write-shaped rules apply their mutation side
//! effects first: a write strips READONLY from its receiver, from the
//! receiver's syntactic containers, and (for static chains) from the
//! enclosing method. The alias-aware couplings consult
//! [`QualifierStore::mutation_forced`] so that a reference whose referent
//! is mutated anywhere drags READONLY off the fields and actuals it
//! aliases.

use crate::analysis::{
    adapt_field, adapt_method, CandidateSet, Qualifier, QualifierStore, Resolver,
};
use crate::ir::{Construct, FlowEdge, ReferenceGraph};
use log::warn;

/// Keep, in each of two participants' sets, the qualifiers some choice
/// of the partner satisfies `sat` for. Returns whether a set shrank.
fn solve2<F>(
    store: &mut QualifierStore,
    graph: &ReferenceGraph,
    a: usize,
    b: usize,
    sat: F,
) -> bool
where
    F: Fn(Qualifier, Qualifier) -> bool,
{
    let sa = store.candidates(graph, a);
    let sb = store.candidates(graph, b);
    let mut keep_a = CandidateSet::empty();
    let mut keep_b = CandidateSet::empty();
    for qa in sa.qualifiers() {
        for qb in sb.qualifiers() {
            if sat(qa, qb) {
                keep_a |= CandidateSet::from(qa);
                keep_b |= CandidateSet::from(qb);
            }
        }
    }
    let changed_a = store.restrict(graph, a, keep_a);
    let changed_b = store.restrict(graph, b, keep_b);
    changed_a || changed_b
}

fn solve3<F>(
    store: &mut QualifierStore,
    graph: &ReferenceGraph,
    a: usize,
    b: usize,
    c: usize,
    sat: F,
) -> bool
where
    F: Fn(Qualifier, Qualifier, Qualifier) -> bool,
{
    let sa = store.candidates(graph, a);
    let sb = store.candidates(graph, b);
    let sc = store.candidates(graph, c);
    let mut keep_a = CandidateSet::empty();
    let mut keep_b = CandidateSet::empty();
    let mut keep_c = CandidateSet::empty();
    for qa in sa.qualifiers() {
        for qb in sb.qualifiers() {
            for qc in sc.qualifiers() {
                if sat(qa, qb, qc) {
                    keep_a |= CandidateSet::from(qa);
                    keep_b |= CandidateSet::from(qb);
                    keep_c |= CandidateSet::from(qc);
                }
            }
        }
    }
    let changed_a = store.restrict(graph, a, keep_a);
    let changed_b = store.restrict(graph, b, keep_b);
    let changed_c = store.restrict(graph, c, keep_c);
    changed_a || changed_b || changed_c
}

fn solve4<F>(
    store: &mut QualifierStore,
    graph: &ReferenceGraph,
    a: usize,
    b: usize,
    c: usize,
    d: usize,
    sat: F,
) -> bool
where
    F: Fn(Qualifier, Qualifier, Qualifier, Qualifier) -> bool,
{
    let sa = store.candidates(graph, a);
    let sb = store.candidates(graph, b);
    let sc = store.candidates(graph, c);
    let sd = store.candidates(graph, d);
    let mut keep_a = CandidateSet::empty();
    let mut keep_b = CandidateSet::empty();
    let mut keep_c = CandidateSet::empty();
    let mut keep_d = CandidateSet::empty();
    for qa in sa.qualifiers() {
        for qb in sb.qualifiers() {
            for qc in sc.qualifiers() {
                for qd in sd.qualifiers() {
                    if sat(qa, qb, qc, qd) {
                        keep_a |= CandidateSet::from(qa);
                        keep_b |= CandidateSet::from(qb);
                        keep_c |= CandidateSet::from(qc);
                        keep_d |= CandidateSet::from(qd);
                    }
                }
            }
        }
    }
    let changed_a = store.restrict(graph, a, keep_a);
    let changed_b = store.restrict(graph, b, keep_b);
    let changed_c = store.restrict(graph, c, keep_c);
    let changed_d = store.restrict(graph, d, keep_d);
    changed_a || changed_b || changed_c || changed_d
}

/// The rule dispatcher for one graph: pairs the graph with its resolver
/// and applies the matching rule to any edge.
pub struct Checkers<'a> {
    graph: &'a ReferenceGraph,
    resolver: &'a Resolver,
}

impl<'a> Checkers<'a> {
    pub fn new(graph: &'a ReferenceGraph, resolver: &'a Resolver) -> Checkers<'a> {
        Checkers { graph, resolver }
    }

    /// Apply the rule for one edge. Returns whether any candidate set
    /// shrank. Unresolvable participants make the affected constraint
    /// applications vacuous; they never abort the run.
    pub fn check(&self, store: &mut QualifierStore, edge: &FlowEdge) -> bool {
        match *edge.construct() {
            Construct::Assign { dst, src } => self.check_assign(store, dst, src),
            Construct::FieldWrite { object, field, src } => {
                self.check_field_write(store, edge.method(), object, field, src)
            }
            Construct::FieldRead { dst, object, field } => {
                self.check_field_read(store, dst, object, field)
            }
            Construct::StaticWrite { field, src } => {
                self.check_static_write(store, edge.method(), field, src)
            }
            Construct::StaticRead { dst, field } => {
                self.check_static_read(store, edge.method(), dst, field)
            }
            Construct::Call { dst, call } => self.check_call(store, dst, call),
            Construct::ArrayWrite { array, src } => {
                self.check_array_write(store, edge.method(), array, src)
            }
            Construct::ArrayRead { dst, array } => self.check_array_read(store, dst, array),
        }
    }

    /// Strip READONLY from every site a node resolves to.
    fn strip_resolved(&self, store: &mut QualifierStore, node: usize) -> bool {
        let mut changed = false;
        for &site in self.resolver.sites(node) {
            changed |= store.strip(self.graph, site, Qualifier::Readonly);
        }
        changed
    }

    /// Strip READONLY from every container member below a node.
    fn strip_containers(&self, store: &mut QualifierStore, node: usize) -> bool {
        let mut changed = false;
        for &member in self.resolver.container_members(node) {
            changed |= store.strip(self.graph, member, Qualifier::Readonly);
        }
        changed
    }

    /// Whether any site a node resolves to is mutation-forced.
    fn forced(&self, store: &mut QualifierStore, node: usize) -> bool {
        self.resolver
            .sites(node)
            .iter()
            .any(|&site| store.mutation_forced(self.graph, site))
    }

    // x = y
    fn check_assign(&self, store: &mut QualifierStore, dst: usize, src: usize) -> bool {
        let mut changed = false;
        for &x in self.resolver.sites(dst) {
            for &y in self.resolver.sites(src) {
                changed |= solve2(store, self.graph, y, x, |qy, qx| qy <= qx);
            }
        }
        changed
    }

    // x.f = y
    fn check_field_write(
        &self,
        store: &mut QualifierStore,
        method: usize,
        object: usize,
        field: usize,
        src: usize,
    ) -> bool {
        // a write always mutates its receiver and its receiver's chain
        let mut changed = self.strip_resolved(store, object);
        changed |= self.strip_containers(store, object);
        if self.resolver.chain_has_static(object) {
            changed |= store.strip(self.graph, method, Qualifier::Readonly);
        }

        for &x in self.resolver.sites(object) {
            for &y in self.resolver.sites(src) {
                changed |= solve3(store, self.graph, y, x, field, |qy, qx, qf| {
                    qy <= adapt_field(qx, qf)
                });
            }
        }

        // a mutated value aliases the member's referent
        if self.forced(store, src) {
            changed |= store.strip(self.graph, field, Qualifier::Readonly);
        }
        changed
    }

    // x = y.f
    fn check_field_read(
        &self,
        store: &mut QualifierStore,
        dst: usize,
        object: usize,
        field: usize,
    ) -> bool {
        let mut changed = false;
        for &x in self.resolver.sites(dst) {
            for &y in self.resolver.sites(object) {
                changed |= solve3(store, self.graph, x, y, field, |qx, qy, qf| {
                    adapt_field(qy, qf) <= qx
                });
            }
        }

        // a mutated read target aliases the member's referent
        if self.forced(store, dst) {
            changed |= store.strip(self.graph, field, Qualifier::Readonly);
            changed |= self.strip_containers(store, object);
        }
        changed
    }

    // F = y
    fn check_static_write(
        &self,
        store: &mut QualifierStore,
        method: usize,
        field: usize,
        src: usize,
    ) -> bool {
        // static state is mutated no matter the context
        let mut changed = store.restrict(self.graph, method, CandidateSet::MUTABLE);
        for &y in self.resolver.sites(src) {
            changed |= solve2(store, self.graph, y, field, |qy, qf| qy <= qf);
        }
        changed
    }

    // x = F, tied to the enclosing method's static-state qualifier
    fn check_static_read(
        &self,
        store: &mut QualifierStore,
        method: usize,
        dst: usize,
        field: usize,
    ) -> bool {
        let mut changed = false;
        for &x in self.resolver.sites(dst) {
            changed |= solve3(store, self.graph, x, method, field, |qx, qm, qf| {
                adapt_field(qm, qf) <= qx
            });
        }
        changed
    }

    // x = y.m(z...) and x = C.m(z...)
    fn check_call(&self, store: &mut QualifierStore, dst: Option<usize>, call: usize) -> bool {
        let call_site = match self.graph.call_site(call) {
            Ok(call_site) => call_site,
            Err(_) => {
                warn!("call edge names non-call node n{}, skipping", call);
                return false;
            }
        };
        let xs: Vec<usize> = dst
            .map(|dst| self.resolver.sites(dst).to_vec())
            .unwrap_or_default();

        let mut changed = false;
        for &target in call_site.targets() {
            let method = match self.graph.method(target) {
                Ok(method) => method,
                Err(_) => {
                    warn!("call target {} is not a method, skipping", target);
                    continue;
                }
            };
            let ret = match method.return_value() {
                Some(ret) => ret,
                None => {
                    warn!("call target {} has no return value, skipping", target);
                    continue;
                }
            };

            // fast path: a degenerate non-READONLY destination mutates
            // whatever the call returns and whatever its chain reaches
            for &x in &xs {
                match store.candidates(self.graph, x).singleton() {
                    Some(q) if q != Qualifier::Readonly => {
                        changed |= store.strip(self.graph, ret, Qualifier::Readonly);
                        changed |= self.strip_containers(store, call);
                    }
                    _ => {}
                }
            }

            match (call_site.receiver(), method.receiver()) {
                (Some(receiver), Some(this)) => {
                    // receiver and return, one joint group per (x, y)
                    for &x in &xs {
                        for &y in self.resolver.sites(receiver) {
                            changed |=
                                solve4(store, self.graph, x, y, this, ret, |qx, qy, qt, qr| {
                                    adapt_method(qx, qr) <= qx && qy <= adapt_method(qx, qt)
                                });
                        }
                    }
                    // a callee that mutates its receiver mutates ours
                    if store.mutation_forced(self.graph, this) {
                        changed |= self.strip_resolved(store, receiver);
                        changed |= self.strip_containers(store, receiver);
                    }
                }
                (receiver, _) => {
                    if receiver.is_some() {
                        warn!(
                            "instance call dispatches to receiverless method {}",
                            method.signature()
                        );
                    }
                    for &x in &xs {
                        changed |=
                            solve2(store, self.graph, x, ret, |qx, qr| adapt_method(qx, qr) <= qx);
                    }
                }
            }

            // actual/formal pairs
            for (position, &argument) in call_site.arguments().iter().enumerate() {
                let parameter = match method.parameters().get(position) {
                    Some(&parameter) => parameter,
                    None => {
                        warn!(
                            "call to {} passes argument {} beyond its arity",
                            method.signature(),
                            position
                        );
                        continue;
                    }
                };
                for &x in &xs {
                    for &z in self.resolver.sites(argument) {
                        changed |= solve3(store, self.graph, z, x, parameter, |qz, qx, qp| {
                            qz <= adapt_method(qx, qp)
                        });
                    }
                }
                // a callee that mutates the formal mutates the actual
                if store.mutation_forced(self.graph, parameter) {
                    changed |= self.strip_resolved(store, argument);
                    changed |= self.strip_containers(store, argument);
                }
            }

            // overriding keeps supertype callers sound
            if call_site.receiver().is_some() {
                for &overridden in method.overrides() {
                    changed |= self.check_override(store, target, overridden);
                }
            }
        }
        changed
    }

    fn check_override(
        &self,
        store: &mut QualifierStore,
        method: usize,
        overridden: usize,
    ) -> bool {
        let (method, overridden) = match (self.graph.method(method), self.graph.method(overridden))
        {
            (Ok(method), Ok(overridden)) => (method, overridden),
            _ => {
                warn!("override pair ({}, {}) is malformed", method, overridden);
                return false;
            }
        };
        let mut changed = false;
        if let (Some(o_ret), Some(ret)) = (overridden.return_value(), method.return_value()) {
            changed |= solve2(store, self.graph, o_ret, ret, |qo, qr| qo <= qr);
        }
        if let (Some(this), Some(o_this)) = (method.receiver(), overridden.receiver()) {
            changed |= solve2(store, self.graph, this, o_this, |qt, qo| qt <= qo);
        }
        for (&parameter, &o_parameter) in method
            .parameters()
            .iter()
            .zip(overridden.parameters().iter())
        {
            changed |= solve2(store, self.graph, parameter, o_parameter, |qp, qo| qp <= qo);
        }
        changed
    }

    fn array_identity_for(&self, node: usize) -> Option<usize> {
        if let Some(identity) = self.graph.array_identity(node) {
            return Some(identity);
        }
        self.resolver
            .sites(node)
            .iter()
            .find_map(|&site| self.graph.array_identity(site))
    }

    // a[_] = y
    fn check_array_write(
        &self,
        store: &mut QualifierStore,
        method: usize,
        array: usize,
        src: usize,
    ) -> bool {
        let identity = match self.array_identity_for(array) {
            Some(identity) => identity,
            None => {
                warn!("array write through n{} has no array identity", array);
                return self.strip_resolved(store, array);
            }
        };
        let (component, aliases) = match self.graph.array(identity) {
            Ok(identity) => (identity.component(), identity.aliases()),
            Err(_) => return false,
        };

        // a write through any alias mutates every alias
        let mut changed = false;
        for &alias in aliases {
            changed |= self.strip_resolved(store, alias);
            changed |= self.strip_containers(store, alias);
        }
        changed |= self.strip_resolved(store, array);
        changed |= self.strip_containers(store, array);
        if self.resolver.chain_has_static(array) {
            changed |= store.strip(self.graph, method, Qualifier::Readonly);
        }

        for &x in self.resolver.sites(array) {
            for &y in self.resolver.sites(src) {
                changed |= solve3(store, self.graph, y, x, component, |qy, qx, qc| {
                    qy <= adapt_field(qx, qc)
                });
            }
        }

        if self.forced(store, src) {
            changed |= store.strip(self.graph, component, Qualifier::Readonly);
        }
        changed
    }

    // x = a[_]
    fn check_array_read(&self, store: &mut QualifierStore, dst: usize, array: usize) -> bool {
        let identity = match self.array_identity_for(array) {
            Some(identity) => identity,
            None => {
                warn!("array read through n{} has no array identity", array);
                return false;
            }
        };
        let (component, aliases) = match self.graph.array(identity) {
            Ok(identity) => (identity.component(), identity.aliases()),
            Err(_) => return false,
        };

        let mut changed = false;
        for &x in self.resolver.sites(dst) {
            for &y in self.resolver.sites(array) {
                changed |= solve3(store, self.graph, x, y, component, |qx, qy, qc| {
                    adapt_field(qy, qc) <= qx
                });
            }
        }

        // mutating the read element mutates the array through this alias
        if self.forced(store, dst) {
            changed |= store.strip(self.graph, component, Qualifier::Readonly);
            changed |= self.strip_containers(store, array);
            for &alias in aliases {
                changed |= self.strip_resolved(store, alias);
            }
        }
        changed
    }
}
