use crate::ir::{
    CallSite, Construct, ConstructKind, FlowEdge, Method, Mutability, Node, ReferenceSite, SiteKind,
};
use crate::Error;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One array identity: the synthetic component site all aliases of the
/// array share, plus the alias nodes the upstream points-to facts
/// assigned to it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ArrayIdentity {
    index: usize,
    component: usize,
    aliases: Vec<usize>,
}

impl ArrayIdentity {
    /// This identity's index in the graph's array table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The shared ArrayComponent site.
    pub fn component(&self) -> usize {
        self.component
    }

    /// Every node known to alias this array.
    pub fn aliases(&self) -> &[usize] {
        &self.aliases
    }
}

/// The reference graph a frontend hands to the solver: an arena of nodes
/// (typable sites and intermediate expressions), flow edges tagged by
/// construct, the method table, and array identities.
///
/// The graph is the whole provider surface. The solver only reads it,
/// except for tag writes and placeholder retirement at the end of a run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReferenceGraph {
    nodes: Vec<Node>,
    edges: Vec<FlowEdge>,
    methods: BTreeMap<usize, Method>,
    arrays: Vec<ArrayIdentity>,
    array_of: BTreeMap<usize, usize>,
    placeholders: BTreeSet<usize>,
    retired: BTreeSet<usize>,
    tags: BTreeMap<usize, Mutability>,
}

impl ReferenceGraph {
    pub fn new() -> ReferenceGraph {
        ReferenceGraph::default()
    }

    fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn check_node(&self, index: usize) -> Result<(), Error> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::NodeNotFound(index))
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    /// Fetch a node by index.
    pub fn node(&self, index: usize) -> Result<&Node, Error> {
        self.nodes.get(index).ok_or(Error::NodeNotFound(index))
    }

    /// Fetch a node which must be a typable site.
    pub fn site(&self, index: usize) -> Result<&ReferenceSite, Error> {
        self.node(index)?.site().ok_or(Error::NotASite(index))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every live (non-retired) typable site.
    pub fn sites(&self) -> impl Iterator<Item = &ReferenceSite> {
        self.nodes
            .iter()
            .filter_map(|node| node.site())
            .filter(move |site| !self.retired.contains(&site.index()))
    }

    /// Every live site of the given kind.
    pub fn sites_of_kind(&self, kind: SiteKind) -> Vec<&ReferenceSite> {
        self.sites().filter(|site| site.kind() == kind).collect()
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> Result<&FlowEdge, Error> {
        self.edges
            .get(index)
            .ok_or_else(|| Error::Analysis(format!("flow edge {} out of range", index)))
    }

    /// The construct kind of an edge. Calls are split into instance and
    /// static by the call node's receiver.
    pub fn edge_kind(&self, edge: &FlowEdge) -> Result<ConstructKind, Error> {
        let kind = match *edge.construct() {
            Construct::Assign { .. } => ConstructKind::Assignment,
            Construct::FieldWrite { .. } => ConstructKind::FieldWrite,
            Construct::FieldRead { .. } => ConstructKind::FieldRead,
            Construct::StaticWrite { .. } => ConstructKind::StaticWrite,
            Construct::StaticRead { .. } => ConstructKind::StaticRead,
            Construct::Call { call, .. } => {
                if self.call_site(call)?.is_static() {
                    ConstructKind::StaticCall
                } else {
                    ConstructKind::InstanceCall
                }
            }
            Construct::ArrayWrite { .. } => ConstructKind::ArrayWrite,
            Construct::ArrayRead { .. } => ConstructKind::ArrayRead,
        };
        Ok(kind)
    }

    /// Every edge of the given construct kind.
    pub fn edges_of_kind(&self, kind: ConstructKind) -> Vec<&FlowEdge> {
        self.edges
            .iter()
            .filter(|edge| self.edge_kind(edge).ok() == Some(kind))
            .collect()
    }

    pub fn method(&self, index: usize) -> Result<&Method, Error> {
        self.methods.get(&index).ok_or(Error::MethodNotFound(index))
    }

    fn method_mut(&mut self, index: usize) -> Result<&mut Method, Error> {
        self.methods
            .get_mut(&index)
            .ok_or(Error::MethodNotFound(index))
    }

    /// Every method, in Method-site index order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    /// The Method site of the method a site belongs to, if any.
    pub fn containing_method(&self, site: usize) -> Option<usize> {
        self.nodes
            .get(site)
            .and_then(|node| node.site())
            .and_then(|site| site.method())
    }

    /// Fetch a node which must be a call expression.
    pub fn call_site(&self, index: usize) -> Result<&CallSite, Error> {
        self.node(index)?
            .call()
            .ok_or_else(|| Error::Analysis(format!("node {} is not a call", index)))
    }

    // site constructors

    /// Create a plain site. Parameters, receivers, return values, Method
    /// sites and array components are wired into their owning tables and
    /// have dedicated constructors.
    pub fn new_site<S: Into<String>>(
        &mut self,
        kind: SiteKind,
        method: Option<usize>,
        name: S,
    ) -> Result<usize, Error> {
        match kind {
            SiteKind::Parameter
            | SiteKind::Receiver
            | SiteKind::ReturnValue
            | SiteKind::Method
            | SiteKind::ArrayComponent => {
                return Err(Error::Analysis(format!(
                    "site kind {} has a dedicated constructor",
                    kind
                )))
            }
            _ => {}
        }
        if let Some(method) = method {
            self.method(method)?;
        }
        let index = self.nodes.len();
        Ok(self.add_node(Node::Site(ReferenceSite::new(index, kind, name, method))))
    }

    pub fn new_local<S: Into<String>>(&mut self, method: usize, name: S) -> Result<usize, Error> {
        self.new_site(SiteKind::Local, Some(method), name)
    }

    pub fn new_literal<S: Into<String>>(&mut self, method: usize, name: S) -> Result<usize, Error> {
        self.new_site(SiteKind::Literal, Some(method), name)
    }

    pub fn new_instantiation<S: Into<String>>(
        &mut self,
        method: usize,
        name: S,
    ) -> Result<usize, Error> {
        self.new_site(SiteKind::Instantiation, Some(method), name)
    }

    /// Create a method and its Method site. Instance methods get their
    /// Receiver site immediately.
    pub fn new_method<S: Into<String>>(&mut self, signature: S, is_static: bool) -> usize {
        let signature = signature.into();
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::Method,
            signature.clone(),
            None,
        )));
        let mut method = Method::new(index, signature, is_static);
        if !is_static {
            let receiver = self.nodes.len();
            self.add_node(Node::Site(ReferenceSite::new(
                receiver,
                SiteKind::Receiver,
                "this",
                Some(index),
            )));
            method.set_receiver(receiver);
        }
        self.methods.insert(index, method);
        index
    }

    /// Append a parameter to a method.
    pub fn new_parameter<S: Into<String>>(
        &mut self,
        method: usize,
        name: S,
    ) -> Result<usize, Error> {
        self.method(method)?;
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::Parameter,
            name,
            Some(method),
        )));
        self.method_mut(method)?.push_parameter(index);
        Ok(index)
    }

    /// Give a method its ReturnValue site. Void methods skip this and
    /// receive a placeholder during normalization.
    pub fn new_return<S: Into<String>>(&mut self, method: usize, name: S) -> Result<usize, Error> {
        if self.method(method)?.return_value().is_some() {
            return Err(Error::Analysis(format!(
                "method {} already has a return value",
                method
            )));
        }
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::ReturnValue,
            name,
            Some(method),
        )));
        self.method_mut(method)?.set_return_value(index);
        Ok(index)
    }

    /// Create an instance field site. `name` should be the fully
    /// qualified field name; summaries key on it.
    pub fn new_field<S: Into<String>>(&mut self, name: S) -> usize {
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::InstanceField,
            name,
            None,
        )))
    }

    /// Create a static field site, keyed like [`new_field`](Self::new_field).
    pub fn new_static_field<S: Into<String>>(&mut self, name: S) -> usize {
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::StaticField,
            name,
            None,
        )))
    }

    /// Record that `method` overrides `overridden`.
    pub fn add_override(&mut self, method: usize, overridden: usize) -> Result<(), Error> {
        self.method(overridden)?;
        self.method_mut(method)?.push_override(overridden);
        Ok(())
    }

    /// Mark a method as native (no analyzable body).
    pub fn set_native(&mut self, method: usize) -> Result<(), Error> {
        self.method_mut(method)?.set_native();
        Ok(())
    }

    // intermediate nodes

    /// A cast of another node.
    pub fn new_cast(&mut self, operand: usize) -> Result<usize, Error> {
        self.check_node(operand)?;
        Ok(self.add_node(Node::Cast { operand }))
    }

    /// A field or array access used as a value. `member` must be a field
    /// or array-component site.
    pub fn new_access(&mut self, base: usize, member: usize) -> Result<usize, Error> {
        self.check_node(base)?;
        let kind = self.site(member)?.kind();
        if !kind.is_field() && kind != SiteKind::ArrayComponent {
            return Err(Error::Analysis(format!(
                "access member n{} is neither a field nor an array component",
                member
            )));
        }
        Ok(self.add_node(Node::Access { base, member }))
    }

    /// A call expression. `targets` are the Method sites the upstream
    /// call graph resolved the call to.
    pub fn new_call<S: Into<String>>(
        &mut self,
        signature: S,
        receiver: Option<usize>,
        arguments: Vec<usize>,
        targets: Vec<usize>,
    ) -> Result<usize, Error> {
        if let Some(receiver) = receiver {
            self.check_node(receiver)?;
        }
        for &argument in &arguments {
            self.check_node(argument)?;
        }
        for &target in &targets {
            self.method(target)?;
        }
        Ok(self.add_node(Node::CallValue(CallSite::new(
            signature, receiver, arguments, targets,
        ))))
    }

    // arrays

    /// Create an array identity and its shared ArrayComponent site.
    /// Returns the identity's index.
    pub fn new_array<S: Into<String>>(&mut self, name: S) -> usize {
        let component = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            component,
            SiteKind::ArrayComponent,
            name,
            None,
        )));
        let index = self.arrays.len();
        self.arrays.push(ArrayIdentity {
            index,
            component,
            aliases: Vec::new(),
        });
        index
    }

    pub fn array(&self, identity: usize) -> Result<&ArrayIdentity, Error> {
        self.arrays
            .get(identity)
            .ok_or_else(|| Error::Analysis(format!("array identity {} out of range", identity)))
    }

    pub fn arrays(&self) -> &[ArrayIdentity] {
        &self.arrays
    }

    /// Register `node` as an alias of the array identity.
    pub fn alias_array(&mut self, identity: usize, node: usize) -> Result<(), Error> {
        self.check_node(node)?;
        self.array(identity)?;
        self.array_of.insert(node, identity);
        self.arrays[identity].aliases.push(node);
        Ok(())
    }

    /// The array identity a node aliases, if any.
    pub fn array_identity(&self, node: usize) -> Option<usize> {
        self.array_of.get(&node).cloned()
    }

    /// The shared component site behind an array-valued node.
    pub fn array_component_of(&self, node: usize) -> Option<usize> {
        self.array_identity(node)
            .map(|identity| self.arrays[identity].component)
    }

    // edges

    fn add_edge(&mut self, method: usize, construct: Construct) -> Result<usize, Error> {
        self.method(method)?;
        for participant in construct.participants() {
            self.check_node(participant)?;
        }
        let index = self.edges.len();
        self.edges.push(FlowEdge::new(index, method, construct));
        Ok(index)
    }

    /// `dst = src`
    pub fn assign(&mut self, method: usize, dst: usize, src: usize) -> Result<usize, Error> {
        self.add_edge(method, Construct::Assign { dst, src })
    }

    /// `object.field = src`
    pub fn field_write(
        &mut self,
        method: usize,
        object: usize,
        field: usize,
        src: usize,
    ) -> Result<usize, Error> {
        if self.site(field)?.kind() != SiteKind::InstanceField {
            return Err(Error::Analysis(format!(
                "field-write member n{} is not an instance field",
                field
            )));
        }
        self.add_edge(method, Construct::FieldWrite { object, field, src })
    }

    /// `dst = object.field`
    pub fn field_read(
        &mut self,
        method: usize,
        dst: usize,
        object: usize,
        field: usize,
    ) -> Result<usize, Error> {
        if self.site(field)?.kind() != SiteKind::InstanceField {
            return Err(Error::Analysis(format!(
                "field-read member n{} is not an instance field",
                field
            )));
        }
        self.add_edge(method, Construct::FieldRead { dst, object, field })
    }

    /// `field = src` for a static field.
    pub fn static_write(&mut self, method: usize, field: usize, src: usize) -> Result<usize, Error> {
        if self.site(field)?.kind() != SiteKind::StaticField {
            return Err(Error::Analysis(format!(
                "static-write member n{} is not a static field",
                field
            )));
        }
        self.add_edge(method, Construct::StaticWrite { field, src })
    }

    /// `dst = field` for a static field.
    pub fn static_read(&mut self, method: usize, dst: usize, field: usize) -> Result<usize, Error> {
        if self.site(field)?.kind() != SiteKind::StaticField {
            return Err(Error::Analysis(format!(
                "static-read member n{} is not a static field",
                field
            )));
        }
        self.add_edge(method, Construct::StaticRead { dst, field })
    }

    /// `dst = call` or a bare call statement. Unassigned calls get a
    /// placeholder destination during normalization.
    pub fn call(&mut self, method: usize, dst: Option<usize>, call: usize) -> Result<usize, Error> {
        self.call_site(call)?;
        self.add_edge(method, Construct::Call { dst, call })
    }

    /// `array[_] = src`
    pub fn array_write(&mut self, method: usize, array: usize, src: usize) -> Result<usize, Error> {
        self.add_edge(method, Construct::ArrayWrite { array, src })
    }

    /// `dst = array[_]`
    pub fn array_read(&mut self, method: usize, dst: usize, array: usize) -> Result<usize, Error> {
        self.add_edge(method, Construct::ArrayRead { dst, array })
    }

    // placeholders

    fn new_placeholder(&mut self, method: usize, name: String) -> usize {
        let index = self.nodes.len();
        self.add_node(Node::Site(ReferenceSite::new(
            index,
            SiteKind::Placeholder,
            name,
            Some(method),
        )));
        self.placeholders.insert(index);
        index
    }

    /// Repair the graph before a run: every method gets a ReturnValue
    /// (void methods receive a placeholder) and every call construct gets
    /// a destination. Idempotent; each repair is logged.
    pub fn normalize(&mut self) {
        let methods: Vec<usize> = self.methods.keys().cloned().collect();
        for method in methods {
            if self.methods[&method].return_value().is_none() {
                let name = format!("{}#return", self.methods[&method].signature());
                let placeholder = self.new_placeholder(method, name);
                if let Some(method) = self.methods.get_mut(&method) {
                    method.set_return_value(placeholder);
                }
                warn!(
                    "method {} has no return value, injected placeholder n{}",
                    method, placeholder
                );
            }
        }
        for index in 0..self.edges.len() {
            let repaired = match *self.edges[index].construct() {
                Construct::Call { dst: None, call } => {
                    let method = self.edges[index].method();
                    let placeholder =
                        self.new_placeholder(method, format!("call@{}#result", index));
                    warn!(
                        "call edge {} has no destination, injected placeholder n{}",
                        index, placeholder
                    );
                    Some(Construct::Call {
                        dst: Some(placeholder),
                        call,
                    })
                }
                _ => None,
            };
            if let Some(construct) = repaired {
                *self.edges[index].construct_mut() = construct;
            }
        }
    }

    pub fn is_placeholder(&self, node: usize) -> bool {
        self.placeholders.contains(&node)
    }

    pub fn is_retired(&self, node: usize) -> bool {
        self.retired.contains(&node)
    }

    /// Drop every placeholder from enumeration and tagging. Their nodes
    /// stay in the arena so edge indices remain valid.
    pub fn retire_placeholders(&mut self) {
        for &placeholder in &self.placeholders {
            self.tags.remove(&placeholder);
            self.retired.insert(placeholder);
        }
    }

    // tags

    /// Write a site's final tag. The one externally visible mutation a
    /// run performs.
    pub fn set_tag(&mut self, site: usize, tag: Mutability) -> Result<(), Error> {
        self.site(site)?;
        self.tags.insert(site, tag);
        Ok(())
    }

    pub fn tag(&self, site: usize) -> Option<Mutability> {
        if self.retired.contains(&site) {
            return None;
        }
        self.tags.get(&site).cloned()
    }

    pub fn tags(&self) -> &BTreeMap<usize, Mutability> {
        &self.tags
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    // interop

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<ReferenceGraph, Error> {
        Ok(serde_json::from_str(json)?)
    }
}
