use crate::ir::ReferenceSite;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A call expression. Stored in the node arena so a call can appear both
/// as a statement (through a `Call` flow edge) and as a value feeding
/// another construct.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CallSite {
    signature: String,
    receiver: Option<usize>,
    arguments: Vec<usize>,
    targets: Vec<usize>,
}

impl CallSite {
    pub(crate) fn new<S: Into<String>>(
        signature: S,
        receiver: Option<usize>,
        arguments: Vec<usize>,
        targets: Vec<usize>,
    ) -> CallSite {
        CallSite {
            signature: signature.into(),
            receiver,
            arguments,
            targets,
        }
    }

    /// The statically named callee signature. Diagnostic only; dispatch
    /// goes through `targets`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The receiver node, or `None` for a static call.
    pub fn receiver(&self) -> Option<usize> {
        self.receiver
    }

    /// Argument nodes in declaration order.
    pub fn arguments(&self) -> &[usize] {
        &self.arguments
    }

    /// Method sites this call may dispatch to. More than one under
    /// dynamic dispatch; the upstream call graph decides.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// True when the call has no receiver.
    pub fn is_static(&self) -> bool {
        self.receiver.is_none()
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.receiver {
            Some(receiver) => write!(f, "n{}.{}", receiver, self.signature),
            None => write!(f, "{}", self.signature),
        }
    }
}

/// One entry of a reference graph's node arena.
///
/// Only `Site` nodes are typable. The other variants stand for the
/// intermediate expressions a frontend cannot type directly; resolution
/// maps them to the typable sites they stand for.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Node {
    /// A typable reference site.
    Site(ReferenceSite),
    /// A cast wrapping another node; types through its operand.
    Cast { operand: usize },
    /// A field or array access used as a value. `member` is the
    /// InstanceField, StaticField or ArrayComponent site reached through
    /// `base`.
    Access { base: usize, member: usize },
    /// A call used as a value; types through its targets' return sites.
    CallValue(CallSite),
}

impl Node {
    /// The typable site held by this node, if it is one.
    pub fn site(&self) -> Option<&ReferenceSite> {
        match self {
            Node::Site(site) => Some(site),
            _ => None,
        }
    }

    /// The call expression held by this node, if it is one.
    pub fn call(&self) -> Option<&CallSite> {
        match self {
            Node::CallValue(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_site(&self) -> bool {
        matches!(self, Node::Site(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Site(site) => site.fmt(f),
            Node::Cast { operand } => write!(f, "cast(n{})", operand),
            Node::Access { base, member } => write!(f, "n{}.n{}", base, member),
            Node::CallValue(call) => call.fmt(f),
        }
    }
}
