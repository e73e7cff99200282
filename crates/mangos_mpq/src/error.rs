//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is not an mpq archive
    #[error("file is not an mpq archive")]
    InvalidFormat,

    /// {what} ends at byte {end} but the archive is only {len} bytes
    #[error("{what} ends at byte {end} but the archive is only {len} bytes")]
    Truncated {
        /// The region that does not fit
        what: &'static str,
        /// Absolute end offset of the region
        end: u64,
        /// Length of the container
        len: u64,
    },

    /// member {member} is corrupt: {reason}
    #[error("member {member} is corrupt: {reason}")]
    #[diagnostic(help("discard anything already read from this member"))]
    CorruptMember {
        /// Name of the member, or `#index` when it has none
        member: String,
        /// What went wrong while decoding
        reason: String,
    },

    /// sector compression {0:#04x} is not supported
    #[error("sector compression {0:#04x} is not supported")]
    UnsupportedCompression(u8),

    /// member #{0} is encrypted and its name is unknown
    #[error("member #{0} is encrypted and its name is unknown")]
    #[diagnostic(help("the decryption key is derived from the file name, supply it with add_names"))]
    MissingKey(usize),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::IOError(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
