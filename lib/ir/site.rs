use serde::{Deserialize, Serialize};
use std::fmt;

/// The program construct a [`ReferenceSite`] stands for.
///
/// The kind decides the site's default candidate set and how untouched
/// sites are tagged after a run.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SiteKind {
    /// A local variable.
    Local,
    /// An instance field declaration.
    InstanceField,
    /// A static field declaration.
    StaticField,
    /// A formal parameter declaration.
    Parameter,
    /// A method's receiver.
    Receiver,
    /// A method's declared return value.
    ReturnValue,
    /// A literal, `null` included.
    Literal,
    /// An object instantiation.
    Instantiation,
    /// An array instantiation.
    ArrayInstantiation,
    /// The synthetic component site shared by every alias of one array
    /// identity.
    ArrayComponent,
    /// The result of an operator expression.
    OperatorResult,
    /// A caught exception binding.
    Caught,
    /// A method's static-state summary.
    Method,
    /// A synthetic site injected for void returns and unassigned call
    /// results, retired once the run is over.
    Placeholder,
}

impl SiteKind {
    /// True for the kinds which create their referent. Untouched creation
    /// sites are tagged MUTABLE instead of READONLY.
    pub fn is_creation(&self) -> bool {
        matches!(
            self,
            SiteKind::Instantiation | SiteKind::ArrayInstantiation | SiteKind::Literal
        )
    }

    /// True for the kinds representing a field declaration.
    pub fn is_field(&self) -> bool {
        matches!(self, SiteKind::InstanceField | SiteKind::StaticField)
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SiteKind::Local => "local",
            SiteKind::InstanceField => "field",
            SiteKind::StaticField => "static-field",
            SiteKind::Parameter => "parameter",
            SiteKind::Receiver => "this",
            SiteKind::ReturnValue => "return",
            SiteKind::Literal => "literal",
            SiteKind::Instantiation => "new",
            SiteKind::ArrayInstantiation => "new-array",
            SiteKind::ArrayComponent => "array-component",
            SiteKind::OperatorResult => "operator",
            SiteKind::Caught => "caught",
            SiteKind::Method => "method",
            SiteKind::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

/// A site's final tag, written back into the graph after a run.
///
/// `Untyped` records a site whose candidate set emptied out: the result
/// of conflicting constraints, reported rather than fatal.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Mutability {
    Mutable,
    Polyread,
    Readonly,
    Untyped,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Mutability::Mutable => "MUTABLE",
            Mutability::Polyread => "POLYREAD",
            Mutability::Readonly => "READONLY",
            Mutability::Untyped => "UNTYPED",
        };
        f.write_str(s)
    }
}

/// A typable reference site: one value-producing location of the host
/// program.
///
/// Sites are arena entries of a
/// [`ReferenceGraph`](crate::ir::ReferenceGraph); the index is stable for
/// the graph's lifetime and is how the rest of the crate names the site.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ReferenceSite {
    index: usize,
    kind: SiteKind,
    name: String,
    method: Option<usize>,
}

impl ReferenceSite {
    pub(crate) fn new<S: Into<String>>(
        index: usize,
        kind: SiteKind,
        name: S,
        method: Option<usize>,
    ) -> ReferenceSite {
        ReferenceSite {
            index,
            kind,
            name: name.into(),
            method,
        }
    }

    /// This site's arena index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// This site's kind.
    pub fn kind(&self) -> SiteKind {
        self.kind
    }

    /// The site's display name. Diagnostic only; never used as a key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Method site of the method this site belongs to, if any.
    /// Fields and array components belong to no method.
    pub fn method(&self) -> Option<usize> {
        self.method
    }
}

impl fmt::Display for ReferenceSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}({})", self.index, self.kind, self.name)
    }
}
