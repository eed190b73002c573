use std::path::PathBuf;

use crate::reference::HduSelector;

/// All errors that can occur while resolving or reading an external FITS array.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reference is structurally unusable (for example an empty file URI).
    #[error("invalid external array reference: {reason}")]
    InvalidReference { reason: String },
    /// The file could not be opened or read.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was opened but could not be understood, even after header fix-up.
    #[error("malformed FITS file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    /// No HDU in the file matches the reference's target.
    #[error("no HDU matching {target} in {}", .path.display())]
    TargetNotFound { path: PathBuf, target: HduSelector },
    /// The selected HDU exists but does not hold an image array.
    #[error("HDU {target} in {} is not an image", .path.display())]
    NotAnImage { path: PathBuf, target: HduSelector },
    /// A slice expression does not fit the array it was applied to.
    #[error("invalid slice: {reason}")]
    InvalidSlice { reason: String },
    /// An element type name that does not map to a FITS pixel type.
    #[error("unknown element type: {0}")]
    UnknownElementType(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
