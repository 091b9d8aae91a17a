//! Error types for the persistence layer.

/// Errors that can occur while writing or reading a save stream.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// An I/O operation on the save stream failed.
    #[error("save stream I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Encoding a subsystem section failed.
    #[error("failed to encode save section: {source}")]
    Encode {
        /// The underlying codec error.
        source: bincode::Error,
    },

    /// Decoding a subsystem section failed.
    #[error("failed to decode save section '{section}': {source}")]
    Decode {
        /// The section that failed to decode.
        section: &'static str,
        /// The underlying codec error.
        source: bincode::Error,
    },

    /// The stream does not begin with the save magic.
    #[error("not a save stream (bad magic)")]
    BadMagic,

    /// The stream was written by an incompatible format version.
    #[error("save version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// The version found in the stream.
        found: u32,
        /// The version this build expects.
        expected: u32,
    },

    /// The stream ended before all sections were read.
    #[error("save stream truncated")]
    Truncated,
}
