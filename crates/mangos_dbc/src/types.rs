//! Base types for structure of DBC file.

use binrw::{BinRead, BinWrite};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Signature every table starts with
pub const MAGIC: [u8; 4] = *b"WDBC";

/// Size of [`DbcHeader`] including the signature
pub const HEADER_SIZE: usize = 20;

/// Size of one field
pub const FIELD_SIZE: usize = 4;

/// DBC table header
///
/// Defines the header of the DBC file which always starts with "WDBC".
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[brw(magic = b"WDBC", little)]
pub struct DbcHeader {
    /// Number of records
    pub record_count: u32,

    /// Number of fields in each record
    pub field_count: u32,

    /// Size of one record in bytes
    pub record_size: u32,

    /// Size of the string block in bytes
    pub string_block_size: u32,
}

impl DbcHeader {
    /// Size of the whole file this header describes
    pub fn file_size(&self) -> u64 {
        HEADER_SIZE as u64
            + self.record_count as u64 * self.record_size as u64
            + self.string_block_size as u64
    }

    /// Whether a record has room for every field, and rows take up space.
    pub fn has_valid_layout(&self) -> bool {
        let fields = self.field_count as u64 * FIELD_SIZE as u64;
        self.record_size as u64 >= fields && (self.record_count == 0 || self.record_size != 0)
    }

    /// Offset of the string block from the start of the file
    pub fn string_block_offset(&self) -> usize {
        HEADER_SIZE + self.record_count as usize * self.record_size as usize
    }
}
