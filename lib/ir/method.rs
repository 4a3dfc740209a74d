use serde::{Deserialize, Serialize};
use std::fmt;

/// A method of the host program.
///
/// A method is keyed by its Method site, the site carrying the method's
/// static-state qualifier. The receiver, parameters and return value are
/// ordinary sites; the upstream type hierarchy supplies the override
/// relation as precomputed Method-site indices.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Method {
    index: usize,
    signature: String,
    receiver: Option<usize>,
    parameters: Vec<usize>,
    return_value: Option<usize>,
    overrides: Vec<usize>,
    is_static: bool,
    native: bool,
}

impl Method {
    pub(crate) fn new<S: Into<String>>(index: usize, signature: S, is_static: bool) -> Method {
        Method {
            index,
            signature: signature.into(),
            receiver: None,
            parameters: Vec::new(),
            return_value: None,
            overrides: Vec::new(),
            is_static,
            native: false,
        }
    }

    /// The Method site's node index, which also keys this method in the
    /// graph's method table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The fully qualified signature, e.g. `com.example.Foo.bar(I)V`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The simple name portion of the signature: the text between the
    /// last `.` before the argument list and the `(`.
    pub fn simple_name(&self) -> &str {
        let head = match self.signature.find('(') {
            Some(paren) => &self.signature[..paren],
            None => &self.signature[..],
        };
        match head.rfind('.') {
            Some(dot) => &head[dot + 1..],
            None => head,
        }
    }

    /// The Receiver site, or `None` for a static method.
    pub fn receiver(&self) -> Option<usize> {
        self.receiver
    }

    /// Parameter sites in declaration order.
    pub fn parameters(&self) -> &[usize] {
        &self.parameters
    }

    /// The ReturnValue site. `None` for a void method until normalization
    /// injects a placeholder.
    pub fn return_value(&self) -> Option<usize> {
        self.return_value
    }

    /// Method sites of the supertype methods this method overrides.
    pub fn overrides(&self) -> &[usize] {
        &self.overrides
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True when the method has no analyzable body. Native methods are
    /// pure only if they are on the trivially-pure allow list.
    pub fn is_native(&self) -> bool {
        self.native
    }

    pub(crate) fn set_receiver(&mut self, receiver: usize) {
        self.receiver = Some(receiver);
    }

    pub(crate) fn push_parameter(&mut self, parameter: usize) {
        self.parameters.push(parameter);
    }

    pub(crate) fn set_return_value(&mut self, return_value: usize) {
        self.return_value = Some(return_value);
    }

    pub(crate) fn push_override(&mut self, overridden: usize) {
        self.overrides.push(overridden);
    }

    pub(crate) fn set_native(&mut self) {
        self.native = true;
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.signature)
    }
}
