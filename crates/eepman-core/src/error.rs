//! Error taxonomy for the replicated storage engine.
//!
//! Every fallible entry point returns [`Result`], a tagged result rather than
//! a raw error code: see the "Exceptions / error codes -> tagged result"
//! design note. OS errors wrap [`std::io::Error`] directly instead of
//! threading a thread-local errno through the call graph.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EepmanError>;

/// The stable error taxonomy of the replicated storage engine.
#[derive(Debug, thiserror::Error)]
pub enum EepmanError {
    /// An OS-level I/O error (open, read, write, seek, fsync, flock, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Quorum selection found no replica whose digest verified.
    #[error("no replica in the pool produced a digest-verified quorum")]
    NoGoodDevices,

    /// A replica's footer magic is absent or does not match `eepman`.
    #[error("replica footer magic is absent or invalid")]
    MetadataBadMagic,

    /// A replica's stored digest did not match its content.
    #[error("replica content digest did not match its stored footer digest")]
    ChecksumFailed,

    /// The authoritative document failed to parse as JSON.
    #[error("authoritative document failed to parse as JSON: {0}")]
    JsonParseFail(#[source] serde_json::Error),

    /// The authoritative document parsed, but its root is not a JSON object.
    #[error("authoritative document root is not a JSON object")]
    JsonRootNotObject,

    /// Any other JSON codec failure (e.g. serialisation).
    #[error("JSON codec error: {0}")]
    JsonError(#[source] serde_json::Error),

    /// The requested key is absent from the document.
    #[error("key {0:?} not found")]
    JsonKeyNotFound(String),

    /// The requested key is present but its value is not a JSON string.
    #[error("key {0:?} is present but its value is not a string")]
    JsonKeyNotString(String),

    /// The serialised document would exceed the pool's capacity.
    #[error("serialised document ({len} bytes) exceeds pool capacity ({capacity} bytes)")]
    WriteJsonTooLong { len: usize, capacity: usize },

    /// Reserved: a read-after-write verification failed.
    #[error("read-after-write verification failed")]
    WriteVerifyFailed,

    /// A replica's write counter is already at its maximum representable value.
    #[error("replica write counter is already at its maximum representable value")]
    CounterExhausted,

    /// An operation was attempted with invalid or inconsistent internal state.
    #[error("invalid operation: {0}")]
    Invalid(String),

    /// The configuration file could not be loaded or yielded no usable replicas.
    #[error("configuration error: {context}: {source}")]
    Config {
        context: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EepmanError {
    /// Maps a taxonomy variant to the stable negative exit code used by the
    /// CLI (see spec `6. EXTERNAL INTERFACES` / `7. ERROR HANDLING DESIGN`).
    ///
    /// OS errors map to `-1` ("errno surfaced") per the CLI contract; the
    /// underlying `errno` is available separately via [`EepmanError::raw_os_error`].
    pub fn exit_code(&self) -> i32 {
        match self {
            EepmanError::Io(_) | EepmanError::Config { .. } => -1,
            EepmanError::NoGoodDevices => -2,
            EepmanError::MetadataBadMagic => -3,
            EepmanError::ChecksumFailed => -4,
            EepmanError::JsonParseFail(_) => -5,
            EepmanError::JsonRootNotObject => -6,
            EepmanError::JsonError(_) => -7,
            EepmanError::JsonKeyNotFound(_) => -8,
            EepmanError::JsonKeyNotString(_) => -9,
            EepmanError::WriteJsonTooLong { .. } => -10,
            EepmanError::WriteVerifyFailed => -11,
            EepmanError::CounterExhausted => -12,
            EepmanError::Invalid(_) => -13,
        }
    }

    /// The underlying OS error code, if this is an I/O-flavoured error.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            EepmanError::Io(e) => e.raw_os_error(),
            EepmanError::Config { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
