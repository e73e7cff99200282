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

    /// Transparent wrapper for [`std::str::Utf8Error`]
    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),

    /// file is not a dbc table
    #[error("file is not a dbc table")]
    InvalidFormat,

    /// table should be {expected} bytes but is {actual}
    #[error("table should be {expected} bytes but is {actual}")]
    Truncated {
        /// Size implied by the header
        expected: u64,
        /// Size of the buffer
        actual: u64,
    },

    /// Transparent wrapper for [`OutOfRangeError`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    OutOfRange(#[from] OutOfRangeError),

    /// string at offset {offset} is not terminated
    #[error("string at offset {offset} is not terminated")]
    CorruptMember {
        /// Offset of the string inside the string block
        offset: u32,
    },
}

/// Error type to provide further information when a read falls outside the table
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum OutOfRangeError {
    /// row {row} is past the last of {rows} rows
    #[error("row {row} is past the last of {rows} rows")]
    Row {
        /// Requested row
        row: usize,
        /// Number of rows in the table
        rows: usize,
    },

    /// column {column} does not fit a {stride} byte record
    #[error("column {column} does not fit a {stride} byte record")]
    Column {
        /// Requested column
        column: usize,
        /// Size of one record
        stride: usize,
    },

    /// string at row {row}, column {column} is empty
    #[error("string at row {row}, column {column} is empty")]
    EmptyString {
        /// Requested row
        row: usize,
        /// Requested column
        column: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
