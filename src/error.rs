use thiserror::Error;

/// Boxed source error carried by [`Error::ReadFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can occur while searching a graph.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A vector or adjacency read failed in the backing store.
    #[error("read failure: {context} ({source})")]
    ReadFailure {
        #[source]
        source: BoxError,
        context: String,
    },

    /// A neighbor ordinal points outside the graph.
    #[error("corrupt graph at level {level}: node {node} links to {neighbor}, graph size is {size}")]
    CorruptGraph {
        level: usize,
        node: u32,
        neighbor: u32,
        size: usize,
    },

    /// The graph's entry node lies outside the graph.
    #[error("corrupt graph: entry node {entry} outside graph of size {size}")]
    CorruptEntryNode { entry: u32, size: usize },

    /// Invalid argument provided.
    #[error("invalid argument for field '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    /// Vector dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    WrongDimension { expected: usize, got: usize },

    /// A vector was requested for an ordinal the source does not hold.
    #[error("ordinal {ordinal} out of range for {size} vectors")]
    OrdinalOutOfRange { ordinal: u32, size: usize },
}

impl Error {
    /// Create a read failure with context.
    ///
    /// Meant for `map_err` at the boundary of a storage-backed
    /// [`VectorSource`](crate::VectorSource) or [`GraphView`](crate::GraphView).
    pub fn read_failure<E>(context: impl Into<String>) -> impl FnOnce(E) -> Self
    where
        E: Into<BoxError>,
    {
        move |e: E| Error::ReadFailure {
            source: e.into(),
            context: context.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_arg(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error signals structural graph corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptGraph { .. } | Error::CorruptEntryNode { .. })
    }
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;
