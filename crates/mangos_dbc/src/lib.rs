//! This library handles reading **DBC** tables, the client database files of *World of Warcraft*.
//!
//! # DBC Table Format Documentation
//!
//! A DBC file stores one table of fixed width records. Every field is four bytes wide and holds an
//! integer, a float, or an offset into the string block that follows the records. DBC files are
//! typically identified with the `.dbc` extension and live in `DBFilesClient\` inside the client
//! archives.
//!
//! ## File Structure
//!
//! A DBC file consists of a header, the records and a string block.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "WDBC"                                            |
//! | 0x0004         | Record Count           | 4 bytes: Number of records (rows)                          |
//! | 0x0008         | Field Count            | 4 bytes: Number of fields (columns) in each record         |
//! | 0x000C         | Record Size            | 4 bytes: Size of one record in bytes                       |
//! | 0x0010         | String Block Size      | 4 bytes: Size of the string block in bytes                 |
//!
//! ### Records
//!
//! `record_count * record_size` bytes of records follow the header. Field `c` of a record is stored
//! in bytes `c * 4 .. c * 4 + 4` of that record. The table does not say what a field means, that
//! knowledge belongs to whoever reads it.
//!
//! ### String Block
//!
//! The string block holds null terminated strings. A string field stores the offset of its first
//! byte from the start of the block, offset 0 stands for the empty string.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.dbc`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Size**: always exactly `20 + record_count * record_size + string_block_size` bytes
//!

pub mod error;
pub mod read;
pub mod types;

pub use read::{DbcTable, Row};
pub use types::DbcHeader;
