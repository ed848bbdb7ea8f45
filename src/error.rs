//! Error types for FAMOS operations.
//!
//! This module defines the [`Error`] enum which represents all possible failures
//! that can occur when reading, validating or writing FAMOS `.dat` files.
//!
//! Every error is fatal for the operation that produced it: a failed `open`
//! or `save` leaves no partially usable document behind.
//!
//! # Example
//!
//! ```no_run
//! use famos_rs::{FamosFile, Error, Result};
//!
//! fn load(path: &str) -> Result<()> {
//!     match FamosFile::open(path) {
//!         Ok(file) => {
//!             println!("Loaded {} fields", file.header().fields.len());
//!             Ok(())
//!         }
//!         Err(Error::UnterminatedKeyGroup) => {
//!             eprintln!("{path} was truncated while being written");
//!             Err(Error::UnterminatedKeyGroup)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use thiserror::Error;

/// Errors that can occur during FAMOS file operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A key had the wrong type, an unsupported version or broken grammar.
    #[error("Malformed key at byte {position}: {message}")]
    MalformedKey {
        /// Absolute stream offset where the problem was detected
        position: u64,
        /// Human readable description
        message: String,
    },

    /// The stream ended in the middle of a key.
    #[error("Unexpected end of stream at byte {position}")]
    TruncatedStream {
        /// Absolute stream offset where more bytes were expected
        position: u64,
    },

    /// The `CK` key group is not flagged as closed.
    ///
    /// Writers set the flag only after all data has been written, so an unset
    /// flag means the file was truncated mid-write.
    #[error("Key group is not closed: the file was not completely written")]
    UnterminatedKeyGroup,

    /// An index points to an entity that does not exist.
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// A whole-document consistency check failed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The input is well formed but uses a feature this crate does not implement.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A caller-supplied argument is out of range or of the wrong type.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A string could not be converted with the active code page.
    #[error("Text encoding error: {0}")]
    Encoding(String),

    /// An I/O error occurred while reading or writing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON metadata export or import failed.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        Error::MalformedKey {
            position,
            message: message.into(),
        }
    }
}

/// A specialized Result type for FAMOS operations.
///
/// This is defined as `core::result::Result<T, Error>` for convenience.
pub type Result<T> = core::result::Result<T, Error>;
