use serde::{Deserialize, Serialize};
use std::fmt;

/// The construct kinds a [`FlowEdge`] can carry. Instance and static
/// calls share the `Call` construct; the graph tells them apart through
/// the call node's receiver.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ConstructKind {
    Assignment,
    FieldWrite,
    FieldRead,
    StaticWrite,
    StaticRead,
    InstanceCall,
    StaticCall,
    ArrayWrite,
    ArrayRead,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConstructKind::Assignment => "assignment",
            ConstructKind::FieldWrite => "field-write",
            ConstructKind::FieldRead => "field-read",
            ConstructKind::StaticWrite => "static-write",
            ConstructKind::StaticRead => "static-read",
            ConstructKind::InstanceCall => "instance-call",
            ConstructKind::StaticCall => "static-call",
            ConstructKind::ArrayWrite => "array-write",
            ConstructKind::ArrayRead => "array-read",
        };
        f.write_str(s)
    }
}

/// One data-flow construct. Fields hold node-arena indices.
///
/// `field` participants must be InstanceField/StaticField sites, `array`
/// participants must resolve to an array identity, and `call` must name a
/// `CallValue` node; the graph builder enforces all of this.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Construct {
    /// `x = y`
    Assign { dst: usize, src: usize },
    /// `x.f = y`
    FieldWrite {
        object: usize,
        field: usize,
        src: usize,
    },
    /// `x = y.f`
    FieldRead {
        dst: usize,
        object: usize,
        field: usize,
    },
    /// `F = y`
    StaticWrite { field: usize, src: usize },
    /// `x = F`
    StaticRead { dst: usize, field: usize },
    /// `x = y.m(z...)` or `x = C.m(z...)`. `dst` is `None` until a
    /// placeholder is injected for an unassigned call.
    Call { dst: Option<usize>, call: usize },
    /// `a[_] = y`
    ArrayWrite { array: usize, src: usize },
    /// `x = a[_]`
    ArrayRead { dst: usize, array: usize },
}

impl Construct {
    /// The node receiving flow: the assignment destination, or the
    /// written field/array for write constructs.
    pub fn destination(&self) -> Option<usize> {
        match *self {
            Construct::Assign { dst, .. } => Some(dst),
            Construct::FieldWrite { field, .. } => Some(field),
            Construct::FieldRead { dst, .. } => Some(dst),
            Construct::StaticWrite { field, .. } => Some(field),
            Construct::StaticRead { dst, .. } => Some(dst),
            Construct::Call { dst, .. } => dst,
            Construct::ArrayWrite { array, .. } => Some(array),
            Construct::ArrayRead { dst, .. } => Some(dst),
        }
    }

    /// Every node index the construct mentions, for validation walks.
    pub fn participants(&self) -> Vec<usize> {
        match *self {
            Construct::Assign { dst, src } => vec![dst, src],
            Construct::FieldWrite { object, field, src } => vec![object, field, src],
            Construct::FieldRead { dst, object, field } => vec![dst, object, field],
            Construct::StaticWrite { field, src } => vec![field, src],
            Construct::StaticRead { dst, field } => vec![dst, field],
            Construct::Call { dst, call } => match dst {
                Some(dst) => vec![dst, call],
                None => vec![call],
            },
            Construct::ArrayWrite { array, src } => vec![array, src],
            Construct::ArrayRead { dst, array } => vec![dst, array],
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Construct::Assign { dst, src } => write!(f, "n{} = n{}", dst, src),
            Construct::FieldWrite { object, field, src } => {
                write!(f, "n{}.n{} = n{}", object, field, src)
            }
            Construct::FieldRead { dst, object, field } => {
                write!(f, "n{} = n{}.n{}", dst, object, field)
            }
            Construct::StaticWrite { field, src } => write!(f, "n{} = n{}", field, src),
            Construct::StaticRead { dst, field } => write!(f, "n{} = n{}", dst, field),
            Construct::Call { dst, call } => match dst {
                Some(dst) => write!(f, "n{} = call n{}", dst, call),
                None => write!(f, "call n{}", call),
            },
            Construct::ArrayWrite { array, src } => write!(f, "n{}[] = n{}", array, src),
            Construct::ArrayRead { dst, array } => write!(f, "n{} = n{}[]", dst, array),
        }
    }
}

/// A [`Construct`] installed in a graph, with its edge index and the
/// Method site of the method body it came from.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FlowEdge {
    index: usize,
    method: usize,
    construct: Construct,
}

impl FlowEdge {
    pub(crate) fn new(index: usize, method: usize, construct: Construct) -> FlowEdge {
        FlowEdge {
            index,
            method,
            construct,
        }
    }

    /// This edge's index in the graph's edge table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The Method site of the enclosing method body.
    pub fn method(&self) -> usize {
        self.method
    }

    pub fn construct(&self) -> &Construct {
        &self.construct
    }

    pub(crate) fn construct_mut(&mut self) -> &mut Construct {
        &mut self.construct
    }
}

impl fmt::Display for FlowEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.construct)
    }
}
