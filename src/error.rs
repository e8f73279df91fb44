//! Error types for the index

use crate::bsi::Operation;
use thiserror::Error;

/// Main error type for the index
#[derive(Error, Debug)]
pub enum Error {
    /// Bitmap (de)serialization failed
    ///
    /// The context string identifies which framed bitmap was being processed,
    /// e.g. "reading existence bitmap" or "reading bit slice 12".
    #[error("{context}: {source}")]
    Serialization {
        /// Which bitmap was being read or written when the failure occurred
        context: String,
        /// The underlying bitmap I/O error
        #[source]
        source: std::io::Error,
    },

    /// Operation is not valid for the invoked query
    ///
    /// `compare_value` accepts only the comparison operations; `min_max`
    /// accepts only `Min` and `Max`. Passing anything else is a caller bug.
    #[error("operation {0:?} not supported here")]
    UnsupportedOperation(Operation),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
