use arrow::error::ArrowError;
use cdatakit_core::NodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// A record batch can only be imported from a struct root.
    #[error("expected a struct ('+s') root, found '{format}'")]
    NotAStruct { format: String },
    /// Record batches have no row-level validity; a struct root with null
    /// rows cannot become one.
    #[error("struct root has {null_count} null rows")]
    NullRootRows { null_count: usize },
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
