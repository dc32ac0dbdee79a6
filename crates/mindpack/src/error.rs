//! Error types for bundle operations.

use std::path::PathBuf;

/// Bundle errors.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// One or more problems with caller input. All messages are reported together.
    #[error("invalid bundle options:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// A file in the source does not belong to the bundle layout.
    #[error("found unexpected entry in mindpack source: {path:?}")]
    StructuralViolation { path: String },

    /// Filesystem or archive I/O failed.
    #[error("{context} {path:?}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest JSON could not be decoded.
    #[error("decoding manifest")]
    Decode(#[source] serde_json::Error),

    /// Manifest JSON could not be encoded.
    #[error("encoding bundle manifest")]
    Encode(#[source] serde_json::Error),

    /// A manifest file entry carries no sha-256 digest.
    #[error("manifest entry {name:?} has no {algorithm} hash")]
    MissingHash {
        name: String,
        algorithm: &'static str,
    },

    /// Verification needs a declared manifest and none was found.
    #[error("bundle has no manifest.json")]
    MissingManifest,

    /// Operation needs a filesystem source and the bundle has none.
    #[error("unable to read bundle, data source not defined")]
    NoSource,
}

impl PackError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Caller input / bundle content
            Self::Validation(_) => 2,
            Self::StructuralViolation { .. } => 2,
            Self::Decode(_) => 2,
            Self::MissingHash { .. } => 2,
            Self::MissingManifest => 2,

            // Environment
            Self::Io { .. } => 3,
            Self::Encode(_) => 3,
            Self::NoSource => 3,
        }
    }
}

/// Result type for bundle operations.
pub type PackResult<T> = Result<T, PackError>;
