//! Error types for picotttr-core.

use thiserror::Error;

/// Result type alias for picotttr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for TTTR decoding and encoding.
///
/// Every variant is terminal for the current file or pass.
#[derive(Error, Debug)]
pub enum Error {
    /// The leading magic is not `PQTTTR` (or a recognised PT3 ident).
    #[error("not a PTU file: bad magic {0:?}")]
    NotAPtuFile(String),

    /// A tag carries a type magic outside the known set.
    #[error("unrecognized tag type: {0:#010x}")]
    UnrecognizedTagType(u32),

    /// The record type code is not a supported PicoHarp/HydraHarp code.
    #[error("unsupported record type: {0:#010x}")]
    UnsupportedRecordType(u32),

    /// The byte cursor ran out in the middle of a structure.
    #[error("truncated stream while reading {context}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// A requested absolute sync target lies before the current time.
    #[error("time regression: requested sync {target} is before current sync {current}")]
    TimeRegression { current: u64, target: u64 },

    /// The legacy imaging header size is zero.
    #[error("not an imaging file: imaging header is empty")]
    NotAnImagingFile,

    /// A required header tag is absent.
    #[error("missing header tag: {0}")]
    MissingTag(String),

    /// A tag could not be encoded or has the wrong value type.
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    /// A structurally valid header with unusable contents.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Image dimensions or lifetime bins that cannot be encoded.
    #[error("invalid scan geometry: {0}")]
    InvalidGeometry(String),

    /// Encoder settings that cannot be written, such as an out-of-range
    /// photon channel or overlapping marker channels.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller stopped an encode pass.
    #[error("encoding cancelled")]
    Cancelled,

    /// I/O error from the output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::TruncatedStream`].
    #[must_use]
    pub fn truncated(context: &'static str, needed: usize, available: usize) -> Self {
        Self::TruncatedStream {
            context,
            needed,
            available,
        }
    }
}
