//! This library handles reading **MPQ** archives shipped with the *World of Warcraft* client.
//!
//! # MPQ Archive Format Documentation
//!
//! The MPQ format bundles game assets (tables, maps, models) into a single container. Files inside
//! the archive are not addressed by name directly: every name is hashed and the hash is used to
//! find a slot in a hash table, which in turn points at a block describing where the data lives.
//! MPQ files are typically identified with the `.MPQ` extension.
//!
//! ## File Structure
//!
//! An MPQ file consists of a header, the member data, a hash table and a block table. The header
//! may be preceded by arbitrary data (for example an installer executable), in which case it starts
//! on the first 512 byte boundary carrying the signature.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "MPQ\x1A"                                         |
//! | 0x0004         | Header Size            | 4 bytes: Size of this header                               |
//! | 0x0008         | Archive Size           | 4 bytes: Size of the whole archive                         |
//! | 0x000C         | Format Version         | 2 bytes: 0 for the original format, 1 for extended        |
//! | 0x000E         | Sector Size Shift      | 2 bytes: Sector size is `512 << shift`                     |
//! | 0x0010         | Hash Table Offset      | 4 bytes: Offset of the hash table from the header          |
//! | 0x0014         | Block Table Offset     | 4 bytes: Offset of the block table from the header         |
//! | 0x0018         | Hash Table Entries     | 4 bytes: Number of hash table entries, a power of two      |
//! | 0x001C         | Block Table Entries    | 4 bytes: Number of block table entries                     |
//!
//! Version 1 archives extend the header with a 64-bit offset to the hi-block table and the upper
//! 16 bits of both table offsets.
//!
//! ### Hash Table
//!
//! The hash table is encrypted with the key `hash("(hash table)", FILE_KEY)`. Each entry has the
//! following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name A                 | 4 bytes: `hash(name, NAME_A)`                           |
//! | 0x0004         | Name B                 | 4 bytes: `hash(name, NAME_B)`                           |
//! | 0x0008         | Locale                 | 2 bytes: Locale of the file, 0 for neutral              |
//! | 0x000A         | Platform               | 2 bytes: Always 0                                       |
//! | 0x000C         | Block Index            | 4 bytes: Index into the block table                     |
//!
//! A block index of `0xFFFFFFFF` marks a slot that has never been used and stops a lookup, while
//! `0xFFFFFFFE` marks a deleted slot that a lookup skips over.
//!
//! ### Block Table
//!
//! The block table is encrypted with the key `hash("(block table)", FILE_KEY)`.
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | File Position          | 4 bytes: Offset of the data from the header             |
//! | 0x0004         | Compressed Size        | 4 bytes: Size of the data in the archive                |
//! | 0x0008         | File Size              | 4 bytes: Size of the data once extracted                |
//! | 0x000C         | Flags                  | 4 bytes: See [`types::BlockFlags`]                      |
//!
//! ### Member Data
//!
//! Compressed members are split into sectors of a fixed size. The data starts with a table of
//! `sectors + 1` offsets, each sector is compressed on its own and starts with a byte naming the
//! compression used. A sector that did not shrink is stored as is.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.MPQ`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression Methods**: see [`CompressionMethod`], Zlib, BZip2 and PKWare DCL are decoded
//! - **Names**: recovered from the `(listfile)` member, see [`listfile`]
//!

pub mod compression;
pub mod crypto;
pub mod error;
pub mod listfile;
pub mod read;
pub mod types;

pub use compression::CompressionMethod;
pub use read::{MemberRef, MpqArchive, MpqFile};
