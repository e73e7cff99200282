//! Base types for structure of MPQ file.

use binrw::{BinRead, BinWrite};
use std::fmt;

/// Signature of the archive header, "MPQ\x1A"
pub const HEADER_MAGIC: [u8; 4] = *b"MPQ\x1A";

/// Signature of the optional user data block in front of the header, "MPQ\x1B"
pub const USER_DATA_MAGIC: [u8; 4] = *b"MPQ\x1B";

/// Headers only ever start on this boundary
pub const HEADER_ALIGNMENT: u64 = 0x200;

/// Size of the original header, without the version 1 extension
pub const HEADER_SIZE_V0: u64 = 0x20;

/// Hash entry marking a slot that has never been used
pub const HASH_ENTRY_EMPTY: u32 = 0xFFFF_FFFF;

/// Hash entry marking a slot whose file has been deleted
pub const HASH_ENTRY_DELETED: u32 = 0xFFFF_FFFE;

/// MPQ archive header
///
/// Defines the header of the MPQ file which always starts with "MPQ\x1A".
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"MPQ\x1A", little)]
pub struct MpqHeader {
    /// Size of the header in bytes
    pub header_size: u32,

    /// Size of the whole archive, unreliable in the wild
    pub archive_size: u32,

    /// 0 for the original format, 1 for the extended one
    pub format_version: u16,

    /// Sector size as a power of two times 512
    pub sector_size_shift: u16,

    /// Offset of the hash table from the start of the header
    pub hash_table_pos: u32,

    /// Offset of the block table from the start of the header
    pub block_table_pos: u32,

    /// Number of entries in the hash table
    pub hash_table_entries: u32,

    /// Number of entries in the block table
    pub block_table_entries: u32,

    /// Fields added with format version 1
    #[br(if(format_version >= 1))]
    pub extended: Option<MpqHeaderExt>,
}

impl Default for MpqHeader {
    fn default() -> Self {
        Self {
            header_size: HEADER_SIZE_V0 as u32,
            archive_size: Default::default(),
            format_version: 0,
            sector_size_shift: 3,
            hash_table_pos: Default::default(),
            block_table_pos: Default::default(),
            hash_table_entries: Default::default(),
            block_table_entries: Default::default(),
            extended: None,
        }
    }
}

impl MpqHeader {
    /// Size of a sector in bytes
    pub fn sector_size(&self) -> u64 {
        512u64 << self.sector_size_shift
    }

    /// Full 48-bit offset of the hash table
    pub fn hash_table_offset(&self) -> u64 {
        let hi = self.extended.map_or(0, |e| e.hash_table_pos_hi);
        (hi as u64) << 32 | self.hash_table_pos as u64
    }

    /// Full 48-bit offset of the block table
    pub fn block_table_offset(&self) -> u64 {
        let hi = self.extended.map_or(0, |e| e.block_table_pos_hi);
        (hi as u64) << 32 | self.block_table_pos as u64
    }

    /// Offset of the hi-block table, if the archive has one
    pub fn hi_block_table_offset(&self) -> Option<u64> {
        self.extended
            .map(|e| e.hi_block_table_pos)
            .filter(|pos| *pos != 0)
    }
}

/// Header fields present from format version 1 onwards
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct MpqHeaderExt {
    /// Offset of the table holding the upper 16 bits of each block's position
    pub hi_block_table_pos: u64,

    /// Upper 16 bits of the hash table offset
    pub hash_table_pos_hi: u16,

    /// Upper 16 bits of the block table offset
    pub block_table_pos_hi: u16,
}

/// Block placed in front of the header by some distributions
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"MPQ\x1B", little)]
pub struct UserDataHeader {
    /// Size of the user data
    pub user_data_size: u32,

    /// Offset of the archive header from the start of this block
    pub header_offset: u32,

    /// Size of this block's own header
    pub user_data_header_size: u32,
}

/// MPQ hash table entry
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct HashEntry {
    /// `hash(name, NAME_A)`
    pub name_a: u32,

    /// `hash(name, NAME_B)`
    pub name_b: u32,

    /// Windows LANGID of the file, 0 for neutral
    pub locale: u16,

    /// Always 0
    pub platform: u16,

    /// Index into the block table, or one of the empty/deleted markers
    pub block_index: u32,
}

impl Default for HashEntry {
    fn default() -> Self {
        Self {
            name_a: HASH_ENTRY_EMPTY,
            name_b: HASH_ENTRY_EMPTY,
            locale: 0xFFFF,
            platform: 0xFFFF,
            block_index: HASH_ENTRY_EMPTY,
        }
    }
}

impl HashEntry {
    /// Whether this slot has never held a file
    pub fn is_empty(&self) -> bool {
        self.block_index == HASH_ENTRY_EMPTY
    }

    /// Whether this slot held a file that has since been deleted
    pub fn is_deleted(&self) -> bool {
        self.block_index == HASH_ENTRY_DELETED
    }
}

/// MPQ block table entry
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct BlockEntry {
    /// Offset of the data from the start of the header, lower 32 bits
    pub file_pos: u32,

    /// Size of the data inside the archive
    pub compressed_size: u32,

    /// Size of the data once extracted
    pub file_size: u32,

    /// How the data is stored
    pub flags: BlockFlags,
}

/// Storage flags of a block
#[derive(BinRead, BinWrite, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct BlockFlags(pub u32);

impl BlockFlags {
    /// Sectors are compressed with PKWare DCL
    pub const IMPLODE: BlockFlags = BlockFlags(0x0000_0100);
    /// Sectors are compressed, the first byte of each names the method
    pub const COMPRESS: BlockFlags = BlockFlags(0x0000_0200);
    /// Data is encrypted with a key derived from the file name
    pub const ENCRYPTED: BlockFlags = BlockFlags(0x0001_0000);
    /// Encryption key is adjusted by position and size
    pub const FIX_KEY: BlockFlags = BlockFlags(0x0002_0000);
    /// Data is a patch against another archive
    pub const PATCH_FILE: BlockFlags = BlockFlags(0x0010_0000);
    /// Data is one unit rather than split into sectors
    pub const SINGLE_UNIT: BlockFlags = BlockFlags(0x0100_0000);
    /// Entry marks a file deleted by a patch archive
    pub const DELETE_MARKER: BlockFlags = BlockFlags(0x0200_0000);
    /// Sector checksums follow the sector offset table
    pub const SECTOR_CRC: BlockFlags = BlockFlags(0x0400_0000);
    /// Entry describes a file
    pub const EXISTS: BlockFlags = BlockFlags(0x8000_0000);

    const NAMES: [(&'static str, BlockFlags); 9] = [
        ("IMPLODE", Self::IMPLODE),
        ("COMPRESS", Self::COMPRESS),
        ("ENCRYPTED", Self::ENCRYPTED),
        ("FIX_KEY", Self::FIX_KEY),
        ("PATCH_FILE", Self::PATCH_FILE),
        ("SINGLE_UNIT", Self::SINGLE_UNIT),
        ("DELETE_MARKER", Self::DELETE_MARKER),
        ("SECTOR_CRC", Self::SECTOR_CRC),
        ("EXISTS", Self::EXISTS),
    ];

    /// Raw value of the flags
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set
    pub fn contains(&self, other: BlockFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the data goes through a decompressor
    pub fn is_compressed(&self) -> bool {
        self.0 & (Self::IMPLODE.0 | Self::COMPRESS.0) != 0
    }
}

impl std::ops::BitOr for BlockFlags {
    type Output = BlockFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        BlockFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockFlags({:#010x}: {})", self.0, self)
    }
}

impl fmt::Display for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, flag) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{BlockEntry, BlockFlags, HashEntry, MpqHeader, MpqHeaderExt};

    #[test]
    fn read_v0_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x4D, 0x50, 0x51, 0x1A,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x10, 0x00, 0x00,
            0x00, 0x00,
            0x03, 0x00,
            0x00, 0x0C, 0x00, 0x00,
            0x00, 0x0E, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
        ]);

        let expected = MpqHeader {
            archive_size: 0x1000,
            hash_table_pos: 0xC00,
            block_table_pos: 0xE00,
            hash_table_entries: 16,
            block_table_entries: 2,
            ..Default::default()
        };

        let header = MpqHeader::read(&mut input)?;
        assert_eq!(header, expected);
        assert_eq!(header.sector_size(), 4096);
        assert_eq!(header.hi_block_table_offset(), None);

        Ok(())
    }

    #[test]
    fn read_v1_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x4D, 0x50, 0x51, 0x1A,
            0x2C, 0x00, 0x00, 0x00,
            0x00, 0x10, 0x00, 0x00,
            0x01, 0x00,
            0x03, 0x00,
            0x00, 0x0C, 0x00, 0x00,
            0x00, 0x0E, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00,
            0x02, 0x00,
        ]);

        let header = MpqHeader::read(&mut input)?;
        assert_eq!(
            header.extended,
            Some(MpqHeaderExt {
                hi_block_table_pos: 0xF00,
                hash_table_pos_hi: 1,
                block_table_pos_hi: 2,
            })
        );
        assert_eq!(header.hash_table_offset(), 0x1_0000_0C00);
        assert_eq!(header.block_table_offset(), 0x2_0000_0E00);
        assert_eq!(header.hi_block_table_offset(), Some(0xF00));

        Ok(())
    }

    #[test]
    fn read_invalid_magic() {
        let mut input = Cursor::new(vec![0x4D, 0x50, 0x51, 0x1B, 0x00, 0x00, 0x00, 0x00]);
        assert!(MpqHeader::read(&mut input).is_err());
    }

    #[test]
    fn write_v0_header() -> Result<()> {
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0x4D, 0x50, 0x51, 0x1A,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x03, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x60, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ];

        let header = MpqHeader {
            hash_table_pos: 0x20,
            block_table_pos: 0x60,
            hash_table_entries: 4,
            block_table_entries: 1,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn read_hash_entry() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x78, 0x56, 0x34, 0x12,
            0xEF, 0xCD, 0xAB, 0x89,
            0x00, 0x00,
            0x00, 0x00,
            0x05, 0x00, 0x00, 0x00,
        ]);

        let entry = HashEntry::read(&mut input)?;
        assert_eq!(
            entry,
            HashEntry {
                name_a: 0x1234_5678,
                name_b: 0x89AB_CDEF,
                locale: 0,
                platform: 0,
                block_index: 5,
            }
        );
        assert!(!entry.is_empty());
        assert!(!entry.is_deleted());
        assert!(HashEntry::default().is_empty());

        Ok(())
    }

    #[test]
    fn read_block_entry() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x20, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x81,
        ]);

        let entry = BlockEntry::read(&mut input)?;
        assert_eq!(entry.file_pos, 0x20);
        assert_eq!(entry.compressed_size, 10);
        assert_eq!(entry.file_size, 10);
        assert!(entry.flags.contains(BlockFlags::EXISTS));
        assert!(entry.flags.contains(BlockFlags::SINGLE_UNIT));
        assert!(!entry.flags.is_compressed());

        Ok(())
    }

    #[test]
    fn display_flags() {
        assert_eq!(
            (BlockFlags::EXISTS | BlockFlags::COMPRESS).to_string(),
            "COMPRESS|EXISTS"
        );
        assert_eq!(BlockFlags::default().to_string(), "-");
    }
}
