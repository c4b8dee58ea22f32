use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No handler for type [{type_name}] declared on field [{field}]")]
    UnknownType { field: String, type_name: String },

    #[error("Unknown similarity [{name}] declared on field [{field}]")]
    UnknownSimilarity { field: String, name: String },

    #[error("Unknown parameter [{key}] on mapper [{field}]")]
    UnknownParameter { field: String, key: String },

    #[error("Mapper for [{field}] conflicts with existing mapping:\n{}", conflicts.join("\n"))]
    MergeConflict { field: String, conflicts: Vec<String> },

    #[error("Mapping validation failed for field [{field}] referencing [{referenced}]: {reason}")]
    MappingValidation {
        field: String,
        referenced: String,
        reason: String,
    },

    #[error("Failed to parse field [{field}] of type [{type_name}]: {reason}")]
    MalformedGeometry {
        field: String,
        type_name: String,
        reason: String,
    },

    #[error("Unsupported operation on field [{field}]: {reason}")]
    UnsupportedOperation { field: String, reason: String },

    #[error("[{relation}] query relation not supported by [{strategy}] strategy on field \
             [{field}]")]
    UnsupportedRelation {
        field: String,
        relation: String,
        strategy: String,
    },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for a single-reason merge conflict
    pub fn conflict(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MergeConflict {
            field: field.into(),
            conflicts: vec![reason.into()],
        }
    }

    pub fn unsupported(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnsupportedOperation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
