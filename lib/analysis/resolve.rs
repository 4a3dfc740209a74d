//! Resolution of intermediate nodes to typable sites.
//!
//! Rules only reason about typable sites, but a frontend hands us edges
//! whose endpoints may be casts, chained accesses or calls used as
//! values. The resolver maps every node to the set of sites it stands
//! for: a cast goes through its operand, an access stands for its member
//! site, a call stands for each dispatch target's return value. The
//! fan-out is a set; checkers iterate the cross product per edge.
//!
//! Everything is precomputed in one deferral loop over the arena, so
//! cyclic or dangling intermediates degrade to an empty resolution (the
//! affected constraint applications become vacuous) instead of hanging
//! the solver.

use crate::ir::{Node, ReferenceGraph, SiteKind};
use log::warn;

/// The syntactic container chain below a node: every field or
/// array-component site in the access path, and whether a static field
/// occurs in it.
#[derive(Clone, Debug, Default)]
pub struct ContainerChain {
    members: Vec<usize>,
    has_static: bool,
}

impl ContainerChain {
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn has_static(&self) -> bool {
        self.has_static
    }
}

/// Precomputed resolution tables for one graph.
#[derive(Clone, Debug)]
pub struct Resolver {
    sites: Vec<Vec<usize>>,
    containers: Vec<ContainerChain>,
}

impl Resolver {
    /// Build the tables. Run after [`ReferenceGraph::normalize`] so call
    /// values can resolve through return placeholders.
    pub fn build(graph: &ReferenceGraph) -> Resolver {
        let n = graph.num_nodes();
        let mut sites: Vec<Option<Vec<usize>>> = vec![None; n];

        loop {
            let mut progress = false;
            for index in 0..n {
                if sites[index].is_some() {
                    continue;
                }
                let resolved = match graph.node(index) {
                    Ok(Node::Site(_)) => Some(vec![index]),
                    Ok(Node::Access { member, .. }) => Some(vec![*member]),
                    Ok(Node::Cast { operand }) => sites
                        .get(*operand)
                        .and_then(|resolved| resolved.clone()),
                    Ok(Node::CallValue(call)) => {
                        let mut returns = Vec::new();
                        for &target in call.targets() {
                            match graph.method(target).ok().and_then(|m| m.return_value()) {
                                Some(ret) => returns.push(ret),
                                None => warn!(
                                    "call target {} has no return value, skipping",
                                    target
                                ),
                            }
                        }
                        Some(returns)
                    }
                    Err(_) => Some(Vec::new()),
                };
                if let Some(resolved) = resolved {
                    sites[index] = Some(resolved);
                    progress = true;
                }
            }
            if !progress {
                break;
            }
        }

        let sites: Vec<Vec<usize>> = sites
            .into_iter()
            .enumerate()
            .map(|(index, resolved)| match resolved {
                Some(resolved) => {
                    if resolved.is_empty() {
                        warn!("node n{} resolves to no typable site", index);
                    }
                    resolved
                }
                None => {
                    warn!("node n{} never resolved (cycle or dangling operand)", index);
                    Vec::new()
                }
            })
            .collect();

        let containers = (0..n).map(|index| Self::walk_chain(graph, index)).collect();

        Resolver { sites, containers }
    }

    fn walk_chain(graph: &ReferenceGraph, node: usize) -> ContainerChain {
        let mut chain = ContainerChain::default();
        let mut current = node;
        let mut steps = 0;
        loop {
            // chains are acyclic in well-formed graphs; the step bound
            // keeps hostile input from looping us
            steps += 1;
            if steps > graph.num_nodes() + 1 {
                warn!("container chain below n{} is cyclic, truncating", node);
                break;
            }
            match graph.node(current) {
                Ok(Node::Access { base, member }) => {
                    chain.members.push(*member);
                    if let Ok(site) = graph.site(*member) {
                        if site.kind() == SiteKind::StaticField {
                            chain.has_static = true;
                        }
                    }
                    current = *base;
                }
                Ok(Node::Cast { operand }) => current = *operand,
                Ok(Node::CallValue(call)) => match call.receiver() {
                    Some(receiver) => current = receiver,
                    None => break,
                },
                Ok(Node::Site(site)) => {
                    // a chain rooted at a static field is static state
                    if site.kind() == SiteKind::StaticField {
                        chain.has_static = true;
                    }
                    break;
                }
                Err(_) => break,
            }
        }
        chain
    }

    /// The typable sites a node stands for. Empty when unresolvable.
    pub fn sites(&self, node: usize) -> &[usize] {
        self.sites.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The container members below a node.
    pub fn container_members(&self, node: usize) -> &[usize] {
        self.containers
            .get(node)
            .map(|chain| chain.members())
            .unwrap_or(&[])
    }

    /// Whether a static field occurs in the container chain below a node.
    pub fn chain_has_static(&self, node: usize) -> bool {
        self.containers
            .get(node)
            .map(|chain| chain.has_static())
            .unwrap_or(false)
    }
}
