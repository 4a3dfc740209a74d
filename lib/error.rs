//! Error type for the Reim library.

/// Error for every Reim operation that can fail.
///
/// Degraded-but-recoverable conditions inside the solver (unresolvable
/// nodes, untypable sites) are reported through `log` and the sanity
/// report instead; `Error` is reserved for failures the host must see.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error occurred while running the inference itself.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The run was cancelled between solver rounds. No tags were written.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A custom error
    #[error("Custom error: {0}")]
    Custom(String),

    /// An error occurred while serializing or deserializing a graph.
    #[error("serde_json error")]
    Json(#[from] serde_json::Error),

    /// A method index was not present in the reference graph.
    #[error("Method {0} not found in reference graph")]
    MethodNotFound(usize),

    /// A node index was not present in the reference graph.
    #[error("Node {0} not found in reference graph")]
    NodeNotFound(usize),

    /// A node index named a node which is not a typable reference site.
    #[error("Node {0} is not a reference site")]
    NotASite(usize),

    /// A textual summary failed to parse. Carries the 1-based line number.
    #[error("Summary parse error at line {0}: {1}")]
    SummaryParse(usize, String),
}

impl From<&str> for Error {
    fn from(error: &str) -> Error {
        Error::Custom(error.to_string())
    }
}

impl From<String> for Error {
    fn from(error: String) -> Error {
        Error::Custom(error)
    }
}
