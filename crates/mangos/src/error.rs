//! Error types that can be emitted from the extraction commands

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the extraction commands
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`mangos_mpq::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Archive(#[from] mangos_mpq::error::Error),

    /// Transparent wrapper for [`mangos_dbc::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] mangos_dbc::error::Error),

    /// no data folder found at {0}
    #[error("no data folder found at {0}")]
    #[diagnostic(help(
        "run the extractor from your World of Warcraft directory or point --data at its Data folder"
    ))]
    MissingDataDir(PathBuf),

    /// missing archive {0}
    #[error("missing archive {0}")]
    #[diagnostic(help("every archive passed with --archive has to exist in the data folder"))]
    MissingArchive(PathBuf),

    /// unable to open archive {path}
    #[error("unable to open archive {path}")]
    OpenArchive {
        /// Location of the archive
        path: PathBuf,
        /// What went wrong
        #[source]
        #[diagnostic_source]
        source: mangos_mpq::error::Error,
    },

    /// unable to create {path}, permission denied
    #[error("unable to create {path}, permission denied")]
    #[diagnostic(help("choose an --output directory you are allowed to write to"))]
    PermissionDenied {
        /// Location that could not be created
        path: PathBuf,
    },

    /// {path} already exists
    #[error("{path} already exists")]
    #[diagnostic(help("pass --overwrite to replace existing files"))]
    AlreadyExists {
        /// Location that already exists
        path: PathBuf,
    },

    /// unable to create {path}
    #[error("unable to create {path}")]
    Create {
        /// Location that could not be created
        path: PathBuf,
        /// What went wrong
        #[source]
        source: std::io::Error,
    },

    /// member name {0} would leave the output directory
    #[error("member name {0} would leave the output directory")]
    UnsafeName(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
