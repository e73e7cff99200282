//! Types for reading MPQ archives
//!

use binrw::BinRead;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use parking_lot::Mutex;
use std::{
    borrow::Cow,
    fmt::{self, Debug},
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek, SeekFrom},
    iter,
    path::Path,
};
use tracing::{debug, instrument, trace};

use crate::{
    compression,
    crypto::{self, HashType},
    error::{Error, FileNotFoundError, Result},
    listfile,
    types::{
        BlockEntry, BlockFlags, HashEntry, MpqHeader, UserDataHeader, HEADER_ALIGNMENT,
        HEADER_MAGIC, HEADER_SIZE_V0, USER_DATA_MAGIC,
    },
};

const TABLE_ENTRY_SIZE: u64 = 16;
const MAX_SECTOR_SIZE_SHIFT: u16 = 20;

/// Structure representing one member of an MPQ archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    index: usize,
    name: Option<Box<str>>,
    file_pos: u64,
    data_start: u64,
    compressed_size: u64,
    file_size: u64,
    flags: BlockFlags,
}

impl MemberRef {
    /// Position of the member in the block table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the name of the member, if the archive lists it.
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this name directly when extracting an archive.
    /// It may contain an absolute path, or break out of the current directory
    /// (`..\runtime`). Carelessly writing to these paths allows an attacker to
    /// craft an archive that will overwrite critical files.
    ///
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the name of the member, or `#index` when it has none
    pub fn display_name(&self) -> Cow<'_, str> {
        match self.name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("#{}", self.index)),
        }
    }

    /// Offset of the data from the start of the archive header
    pub fn file_pos(&self) -> u64 {
        self.file_pos
    }

    /// Offset of the data from the start of the container
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Get the size of the member, in bytes, in the archive
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Get the size of the member, in bytes, when extracted
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// Get the storage flags of the member
    pub fn flags(&self) -> BlockFlags {
        self.flags
    }

    /// Whether the member goes through a decompressor
    pub fn is_compressed(&self) -> bool {
        self.flags.is_compressed()
    }

    /// Whether the member is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// Whether the block describes a file at all
    pub fn exists(&self) -> bool {
        self.flags.contains(BlockFlags::EXISTS) && !self.flags.contains(BlockFlags::DELETE_MARKER)
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::CorruptMember {
            member: self.display_name().into_owned(),
            reason: reason.into(),
        }
    }
}

/// MPQ archive reader
///
/// The archive is read-only once opened. Physical reads are serialized behind a lock while
/// decryption and decompression run on the calling thread, so a shared reference can stream
/// several members at once.
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_mpq_contents(reader: impl Read + Seek) -> mangos_mpq::error::Result<()> {
///     let mpq = mangos_mpq::MpqArchive::new(reader)?;
///
///     for member in mpq.list_members(|name| name.ends_with(".dbc")) {
///         println!("Filename: {}", member.display_name());
///         std::io::copy(&mut mpq.open_member(member)?, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct MpqArchive<R> {
    reader: Mutex<R>,
    len: u64,
    archive_offset: u64,
    header: MpqHeader,
    hash_table: Vec<HashEntry>,
    blocks: Vec<MemberRef>,
}

impl<R> Debug for MpqArchive<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MpqArchive")
            .field("archive_offset", &self.archive_offset)
            .field("header", &self.header)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl<R> MpqArchive<R> {
    /// Total size of the members in the archive, if it can be known.
    pub fn decompressed_size(&self) -> Option<u128> {
        let mut total = 0u128;
        for member in self.members() {
            total = total.checked_add(member.file_size as u128)?;
        }
        Some(total)
    }

    /// The parsed archive header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Offset of the archive header inside the container
    pub fn archive_offset(&self) -> u64 {
        self.archive_offset
    }

    /// Size of the sectors members are split into
    pub fn sector_size(&self) -> u64 {
        self.header.sector_size()
    }

    /// Number of entries in the block table, existing or not.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over every existing member, in block table order.
    ///
    /// Members whose name could not be recovered are included.
    pub fn members(&self) -> impl Iterator<Item = &MemberRef> + Clone + '_ {
        self.blocks.iter().filter(|m| m.exists())
    }

    /// Returns an iterator over the named members whose name satisfies `predicate`.
    ///
    /// The iterator is lazy and can be cloned to start over.
    pub fn list_members<'a, P>(
        &'a self,
        predicate: P,
    ) -> impl Iterator<Item = &'a MemberRef> + Clone + 'a
    where
        P: Fn(&str) -> bool + Clone + 'a,
    {
        self.members()
            .filter(move |m| m.name().is_some_and(|name| predicate(name)))
    }

    /// Returns an iterator over all the member names known for this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.members().filter_map(|m| m.name())
    }

    /// Get a member by its block table index
    pub fn member(&self, index: usize) -> Option<&MemberRef> {
        self.blocks.get(index)
    }

    /// Get a member by name, using the archive's hash table
    pub fn member_by_name(&self, name: &str) -> Option<&MemberRef> {
        self.find_block(name).map(|index| &self.blocks[index])
    }

    /// Whether the hash table holds an entry for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.find_block(name).is_some()
    }

    /// Teach the archive names that its listfile lacks.
    ///
    /// Returns how many of the names were found in the hash table.
    pub fn add_names<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = 0;
        for name in names {
            let name = name.as_ref();
            if let Some(index) = self.find_block(name) {
                let member = &mut self.blocks[index];
                if member.name.is_none() {
                    member.name = Some(name.into());
                }
                resolved += 1;
            }
        }
        resolved
    }

    /// Unwrap and return the inner reader object, closing the archive.
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn find_block(&self, name: &str) -> Option<usize> {
        let size = self.hash_table.len();
        if size == 0 {
            return None;
        }

        let mask = size - 1;
        let start = crypto::hash_name(name, HashType::TableOffset) as usize & mask;
        let name_a = crypto::hash_name(name, HashType::NameA);
        let name_b = crypto::hash_name(name, HashType::NameB);

        let mut found = None;
        for probe in 0..size {
            let entry = &self.hash_table[(start + probe) & mask];
            if entry.is_empty() {
                break;
            }
            if entry.is_deleted() || entry.name_a != name_a || entry.name_b != name_b {
                continue;
            }

            let block = entry.block_index as usize;
            if block >= self.blocks.len() {
                continue;
            }
            if entry.locale == 0 {
                return Some(block);
            }
            found = found.or(Some(block));
        }

        found
    }

    fn check_region(&self, offset: u64, size: u64, what: &'static str) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.len => Ok(()),
            end => Err(Error::Truncated {
                what,
                end: end.unwrap_or(u64::MAX),
                len: self.len,
            }),
        }
    }
}

impl MpqArchive<BufReader<File>> {
    /// Open the MPQ archive at `path`.
    ///
    /// The file handle is held until the archive is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> MpqArchive<R> {
    /// Read an MPQ archive, indexing the members it contains.
    pub fn new(mut reader: R) -> Result<MpqArchive<R>> {
        let len = reader.seek(SeekFrom::End(0))?;
        let (archive_offset, header) = Self::find_header(&mut reader, len)?;
        debug!(
            archive_offset,
            version = header.format_version,
            hash_entries = header.hash_table_entries,
            block_entries = header.block_table_entries,
            "found mpq header"
        );

        if header.sector_size_shift > MAX_SECTOR_SIZE_SHIFT {
            return Err(Error::InvalidFormat);
        }
        if header.hash_table_entries != 0 && !header.hash_table_entries.is_power_of_two() {
            return Err(Error::InvalidFormat);
        }

        let hash_table = Self::get_hash_table(&mut reader, len, archive_offset, &header)?;
        let block_table = Self::get_block_table(&mut reader, len, archive_offset, &header)?;
        let hi_positions = Self::get_hi_block_table(&mut reader, len, archive_offset, &header)?;

        let blocks = block_table
            .into_iter()
            .enumerate()
            .map(|(index, block)| {
                let hi = hi_positions.get(index).copied().unwrap_or(0) as u64;
                let file_pos = hi << 32 | block.file_pos as u64;
                MemberRef {
                    index,
                    name: None,
                    file_pos,
                    data_start: archive_offset + file_pos,
                    compressed_size: block.compressed_size as u64,
                    file_size: block.file_size as u64,
                    flags: block.flags,
                }
            })
            .collect();

        let mut archive = MpqArchive {
            reader: Mutex::new(reader),
            len,
            archive_offset,
            header,
            hash_table,
            blocks,
        };

        archive.add_names(listfile::INTERNAL_NAMES);
        archive.load_listfile();

        Ok(archive)
    }

    /// Search for a member by name
    pub fn by_name(&self, name: &str) -> Result<MpqFile<'_, R>> {
        let Some(index) = self.find_block(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a member by its block table index
    pub fn by_index(&self, index: usize) -> Result<MpqFile<'_, R>> {
        let member = self
            .blocks
            .get(index)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))?;
        MpqFile::new(self, member)
    }

    /// Open a stream over the extracted contents of `member`.
    ///
    /// The stream yields exactly [`MemberRef::size`] bytes or fails. Anything read from a stream
    /// that failed must be discarded.
    pub fn open_member(&self, member: &MemberRef) -> Result<MpqFile<'_, R>> {
        let own = self
            .blocks
            .get(member.index)
            .filter(|m| *m == member)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(member.index)))?;
        MpqFile::new(self, own)
    }

    /// Extract `member` into memory
    pub fn read_member(&self, member: &MemberRef) -> Result<Vec<u8>> {
        self.open_member(member)?.read_all()
    }

    fn read_at(&self, offset: u64, size: u64, what: &'static str) -> Result<Vec<u8>> {
        self.check_region(offset, size, what)?;

        let mut buffer = vec![0u8; size as usize];
        let mut reader = self.reader.lock();
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn load_listfile(&mut self) {
        let Some(index) = self.find_block(listfile::LISTFILE_NAME) else {
            debug!("archive has no listfile");
            return;
        };

        let data = match self.by_index(index).and_then(MpqFile::read_all) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "unable to read listfile, members stay unnamed");
                return;
            }
        };

        let names: Vec<String> = listfile::parse_listfile(&data)
            .map(Cow::into_owned)
            .collect();
        let resolved = self.add_names(&names);
        debug!(listed = names.len(), resolved, "applied listfile");
    }

    fn find_header(reader: &mut R, len: u64) -> Result<(u64, MpqHeader)> {
        let mut offset = 0u64;
        while offset + 4 <= len {
            reader.seek(SeekFrom::Start(offset))?;
            let mut magic = [0u8; 4];
            reader.read_exact(&mut magic)?;

            if magic == HEADER_MAGIC {
                return Ok((offset, Self::get_header(reader, offset, len)?));
            }

            if magic == USER_DATA_MAGIC {
                reader.seek(SeekFrom::Start(offset))?;
                let user_data = UserDataHeader::read(reader).map_err(|_| Error::Truncated {
                    what: "user data header",
                    end: offset + 16,
                    len,
                })?;

                let header_offset = offset + user_data.header_offset as u64;
                if header_offset + 4 > len {
                    return Err(Error::Truncated {
                        what: "header",
                        end: header_offset + 4,
                        len,
                    });
                }
                reader.seek(SeekFrom::Start(header_offset))?;
                reader.read_exact(&mut magic)?;
                if magic != HEADER_MAGIC {
                    return Err(Error::InvalidFormat);
                }
                return Ok((header_offset, Self::get_header(reader, header_offset, len)?));
            }

            offset += HEADER_ALIGNMENT;
        }

        Err(Error::InvalidFormat)
    }

    fn get_header(reader: &mut R, offset: u64, len: u64) -> Result<MpqHeader> {
        let truncated = |end: u64| Error::Truncated {
            what: "header",
            end,
            len,
        };

        if offset + HEADER_SIZE_V0 > len {
            return Err(truncated(offset + HEADER_SIZE_V0));
        }

        reader.seek(SeekFrom::Start(offset))?;
        MpqHeader::read(reader).map_err(|e| match e {
            binrw::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                truncated(offset + HEADER_SIZE_V0 + 12)
            }
            other => Error::from(other),
        })
    }

    fn get_table(
        reader: &mut R,
        len: u64,
        start: u64,
        entries: u32,
        key: u32,
        what: &'static str,
    ) -> Result<Cursor<Vec<u8>>> {
        let size = entries as u64 * TABLE_ENTRY_SIZE;
        let end = start.saturating_add(size);
        if end > len {
            return Err(Error::Truncated { what, end, len });
        }

        let mut buffer = vec![0u8; size as usize];
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut buffer)?;
        crypto::decrypt_bytes(&mut buffer, key);

        Ok(Cursor::new(buffer))
    }

    fn get_hash_table(
        reader: &mut R,
        len: u64,
        archive_offset: u64,
        header: &MpqHeader,
    ) -> Result<Vec<HashEntry>> {
        let mut table = Self::get_table(
            reader,
            len,
            archive_offset + header.hash_table_offset(),
            header.hash_table_entries,
            crypto::HASH_TABLE_KEY,
            "hash table",
        )?;

        (0..header.hash_table_entries)
            .map(|_| HashEntry::read(&mut table).map_err(Error::from))
            .collect()
    }

    fn get_block_table(
        reader: &mut R,
        len: u64,
        archive_offset: u64,
        header: &MpqHeader,
    ) -> Result<Vec<BlockEntry>> {
        let mut table = Self::get_table(
            reader,
            len,
            archive_offset + header.block_table_offset(),
            header.block_table_entries,
            crypto::BLOCK_TABLE_KEY,
            "block table",
        )?;

        (0..header.block_table_entries)
            .map(|_| BlockEntry::read(&mut table).map_err(Error::from))
            .collect()
    }

    fn get_hi_block_table(
        reader: &mut R,
        len: u64,
        archive_offset: u64,
        header: &MpqHeader,
    ) -> Result<Vec<u16>> {
        let Some(pos) = header.hi_block_table_offset() else {
            return Ok(Vec::new());
        };

        let start = archive_offset.saturating_add(pos);
        let end = start.saturating_add(header.block_table_entries as u64 * 2);
        if end > len {
            return Err(Error::Truncated {
                what: "hi-block table",
                end,
                len,
            });
        }

        reader.seek(SeekFrom::Start(start))?;
        (0..header.block_table_entries)
            .map(|_| reader.read_u16::<LittleEndian>().map_err(Error::from))
            .collect()
    }
}

/// A stream over the extracted contents of one member.
///
/// Sectors are read and decompressed only as the stream is consumed, dropping the stream early
/// has no side effects.
pub struct MpqFile<'a, R> {
    archive: &'a MpqArchive<R>,
    member: &'a MemberRef,
    key: Option<u32>,
    sector_size: u64,
    offsets: Vec<u64>,
    next_sector: usize,
    buffer: Vec<u8>,
    position: usize,
    failed: bool,
}

impl<R> Debug for MpqFile<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MpqFile({:#?})", self.member)
    }
}

/// Methods for retrieving information on member streams
impl<'a, R> MpqFile<'a, R> {
    /// The member this stream extracts
    pub fn member(&self) -> &'a MemberRef {
        self.member
    }

    /// Get the name of the member, if known
    pub fn name(&self) -> Option<&'a str> {
        self.member.name()
    }

    /// Get the size of the member, in bytes, in the archive
    pub fn compressed_size(&self) -> u64 {
        self.member.compressed_size
    }

    /// Get the size of the member, in bytes, when extracted
    pub fn size(&self) -> u64 {
        self.member.file_size
    }

    fn sector_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn expected_len(&self, sector: usize) -> u64 {
        let consumed = sector as u64 * self.sector_size;
        self.sector_size.min(self.member.file_size - consumed)
    }
}

impl<'a, R: Read + Seek> MpqFile<'a, R> {
    fn new(archive: &'a MpqArchive<R>, member: &'a MemberRef) -> Result<Self> {
        if !member.exists() {
            return Err(Error::FileNotFound(FileNotFoundError::Index(member.index)));
        }

        let flags = member.flags;
        let key = if member.is_encrypted() {
            let name = member.name().ok_or(Error::MissingKey(member.index))?;
            Some(crypto::file_key(
                name,
                member.file_pos as u32,
                member.file_size as u32,
                flags.contains(BlockFlags::FIX_KEY),
            ))
        } else {
            None
        };

        archive.check_region(member.data_start, member.compressed_size, "member data")?;

        if !flags.is_compressed() && member.compressed_size != member.file_size {
            return Err(member.corrupt(format!(
                "stored size {} differs from file size {}",
                member.compressed_size, member.file_size
            )));
        }

        let single_unit = flags.contains(BlockFlags::SINGLE_UNIT);
        let sector_size = if single_unit {
            member.file_size.max(1)
        } else {
            archive.sector_size()
        };
        let count = member.file_size.div_ceil(sector_size);

        let offsets = if member.file_size == 0 {
            vec![0]
        } else if single_unit {
            vec![0, member.compressed_size]
        } else if !flags.is_compressed() {
            (0..count)
                .map(|i| i * sector_size)
                .chain(iter::once(member.file_size))
                .collect()
        } else {
            Self::get_sector_offsets(archive, member, key, count)?
        };

        Ok(MpqFile {
            archive,
            member,
            key,
            sector_size,
            offsets,
            next_sector: 0,
            buffer: Vec::new(),
            position: 0,
            failed: false,
        })
    }

    fn get_sector_offsets(
        archive: &MpqArchive<R>,
        member: &MemberRef,
        key: Option<u32>,
        count: u64,
    ) -> Result<Vec<u64>> {
        let table_len = (count + 1) * 4;
        if table_len > member.compressed_size {
            return Err(member.corrupt("sector offset table does not fit the member"));
        }

        let mut raw = archive.read_at(member.data_start, table_len, "sector offset table")?;
        if let Some(key) = key {
            crypto::decrypt_bytes(&mut raw, key.wrapping_sub(1));
        }

        let offsets: Vec<u64> = raw
            .chunks_exact(4)
            .map(|word| LittleEndian::read_u32(word) as u64)
            .collect();

        let ordered = offsets.windows(2).all(|pair| pair[0] <= pair[1]);
        let first = offsets.first().copied().unwrap_or(0);
        let last = offsets.last().copied().unwrap_or(0);
        if !ordered || first < table_len || last > member.compressed_size {
            return Err(member.corrupt("sector offset table is inconsistent"));
        }

        Ok(offsets)
    }

    #[instrument(level = "trace", skip(self), fields(member = %self.member.display_name(), sector = self.next_sector))]
    fn load_next_sector(&mut self) -> Result<()> {
        let sector = self.next_sector;
        let start = self.offsets[sector];
        let end = self.offsets[sector + 1];
        let expected = self.expected_len(sector);

        let mut raw = self.archive.read_at(
            self.member.data_start + start,
            end - start,
            "member data",
        )?;
        if let Some(key) = self.key {
            crypto::decrypt_bytes(&mut raw, key.wrapping_add(sector as u32));
        }

        let stored = raw.len() as u64;
        let data = if stored == expected {
            raw
        } else if stored > expected {
            return Err(self.member.corrupt(format!(
                "sector {sector} stores {stored} bytes for {expected} bytes of data"
            )));
        } else {
            let result = if self.member.flags.contains(BlockFlags::IMPLODE) {
                compression::explode_sector(&raw)
            } else {
                compression::decompress_sector(&raw, expected as usize)
            };
            result.map_err(|e| match e {
                Error::IOError(io) => self.member.corrupt(format!("sector {sector}: {io}")),
                other => other,
            })?
        };

        if data.len() as u64 != expected {
            return Err(self.member.corrupt(format!(
                "sector {sector} decompressed to {} bytes, expected {expected}",
                data.len()
            )));
        }

        trace!(stored, expected, "loaded sector");
        self.buffer = data;
        self.position = 0;
        self.next_sector += 1;
        Ok(())
    }

    /// Extract the rest of the member into memory
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let reserve = self.member.file_size.min(self.archive.sector_size());
        let mut out = Vec::with_capacity(reserve as usize);
        out.extend_from_slice(&self.buffer[self.position..]);

        while self.next_sector < self.sector_count() {
            self.load_next_sector()?;
            out.extend_from_slice(&self.buffer);
        }
        self.position = self.buffer.len();

        Ok(out)
    }
}

impl<R: Read + Seek> Read for MpqFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "member stream already failed",
            ));
        }

        while self.position == self.buffer.len() {
            if self.next_sector >= self.sector_count() {
                return Ok(0);
            }
            if let Err(e) = self.load_next_sector() {
                self.failed = true;
                return Err(e.into());
            }
        }

        let available = &self.buffer[self.position..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}
