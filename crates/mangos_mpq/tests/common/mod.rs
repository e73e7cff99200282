//! Assembles small archives in memory so the tests do not depend on game data.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use binrw::BinWrite;
use bzip2::write::BzEncoder;
use flate2::{write::ZlibEncoder, Compression};
use mangos_mpq::{
    crypto::{self, HashType},
    types::{BlockEntry, BlockFlags, HashEntry, MpqHeader, MpqHeaderExt, UserDataHeader},
    CompressionMethod,
};

/// How the sectors of a compressed member are packed
#[derive(Clone)]
pub enum Codec {
    Zlib,
    Bzip2,
    /// The stored bytes of the only sector, as given
    Packed(Vec<u8>),
}

impl Codec {
    fn pack(&self, plain: &[u8]) -> Vec<u8> {
        match self {
            Codec::Zlib => compress_sector(plain),
            Codec::Bzip2 => bzip2_sector(plain),
            Codec::Packed(stored) => stored.clone(),
        }
    }
}

struct Member {
    name: String,
    data: Vec<u8>,
    flags: BlockFlags,
    listed: bool,
    locale: u16,
    codec: Codec,
}

pub struct ArchiveBuilder {
    sector_size_shift: u16,
    hash_table_entries: u32,
    format_version: u16,
    prefix: usize,
    user_data: bool,
    listfile: bool,
    members: Vec<Member>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            sector_size_shift: 0,
            hash_table_entries: 16,
            format_version: 0,
            prefix: 0,
            user_data: false,
            listfile: true,
            members: Vec::new(),
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sector_size_shift(mut self, shift: u16) -> Self {
        self.sector_size_shift = shift;
        self
    }

    pub fn hash_table_entries(mut self, entries: u32) -> Self {
        self.hash_table_entries = entries;
        self
    }

    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    /// Put `len` bytes of junk in front of the header
    pub fn prefix(mut self, len: usize) -> Self {
        self.prefix = len;
        self
    }

    /// Put a user data block pointing at the header in front of it
    pub fn user_data(mut self, len: usize) -> Self {
        self.prefix = len;
        self.user_data = true;
        self
    }

    pub fn without_listfile(mut self) -> Self {
        self.listfile = false;
        self
    }

    pub fn add(self, name: &str, data: &[u8], flags: BlockFlags) -> Self {
        self.push(name, data, flags, true, 0)
    }

    /// Add a member that the listfile does not mention
    pub fn add_unlisted(self, name: &str, data: &[u8], flags: BlockFlags) -> Self {
        self.push(name, data, flags, false, 0)
    }

    pub fn add_localized(self, name: &str, data: &[u8], flags: BlockFlags, locale: u16) -> Self {
        self.push(name, data, flags, true, locale)
    }

    /// Add a member whose sectors are packed with `codec`
    pub fn add_packed(mut self, name: &str, data: &[u8], flags: BlockFlags, codec: Codec) -> Self {
        self = self.push(name, data, flags, true, 0);
        if let Some(member) = self.members.last_mut() {
            member.codec = codec;
        }
        self
    }

    fn push(mut self, name: &str, data: &[u8], flags: BlockFlags, listed: bool, locale: u16) -> Self {
        self.members.push(Member {
            name: name.to_owned(),
            data: data.to_vec(),
            flags: flags | BlockFlags::EXISTS,
            listed,
            locale,
            codec: Codec::Zlib,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with(|_| {})
    }

    /// Build the archive, letting `tweak` damage the block table before it is encrypted
    pub fn build_with(self, tweak: impl FnOnce(&mut Vec<BlockEntry>)) -> Vec<u8> {
        let mut members = self.members;
        if self.listfile {
            let mut names: Vec<&str> = Vec::new();
            for member in members.iter().filter(|m| m.listed) {
                if !names.contains(&member.name.as_str()) {
                    names.push(&member.name);
                }
            }
            let text = names.join("\r\n").into_bytes();
            members.push(Member {
                name: "(listfile)".to_owned(),
                data: text,
                flags: BlockFlags::COMPRESS | BlockFlags::EXISTS,
                listed: true,
                locale: 0,
                codec: Codec::Zlib,
            });
        }

        let header_size: u32 = if self.format_version >= 1 { 0x2C } else { 0x20 };
        let sector_size = 512usize << self.sector_size_shift;

        let mut body = Vec::new();
        let mut blocks = Vec::new();
        for member in &members {
            let file_pos = header_size + body.len() as u32;
            let stored = encode_member(member, file_pos, sector_size);
            blocks.push(BlockEntry {
                file_pos,
                compressed_size: stored.len() as u32,
                file_size: member.data.len() as u32,
                flags: member.flags,
            });
            body.extend_from_slice(&stored);
        }

        let mut hash_table = vec![HashEntry::default(); self.hash_table_entries as usize];
        let mask = hash_table.len() - 1;
        for (index, member) in members.iter().enumerate() {
            let mut slot = crypto::hash_name(&member.name, HashType::TableOffset) as usize & mask;
            while !hash_table[slot].is_empty() {
                slot = (slot + 1) & mask;
            }
            hash_table[slot] = HashEntry {
                name_a: crypto::hash_name(&member.name, HashType::NameA),
                name_b: crypto::hash_name(&member.name, HashType::NameB),
                locale: member.locale,
                platform: 0,
                block_index: index as u32,
            };
        }

        tweak(&mut blocks);

        let hash_table_pos = header_size + body.len() as u32;
        let mut table = Cursor::new(Vec::new());
        hash_table.write_le(&mut table).unwrap();
        let mut table = table.into_inner();
        crypto::encrypt_bytes(&mut table, crypto::HASH_TABLE_KEY);
        body.extend_from_slice(&table);

        let block_table_pos = header_size + body.len() as u32;
        let mut table = Cursor::new(Vec::new());
        blocks.write_le(&mut table).unwrap();
        let mut table = table.into_inner();
        crypto::encrypt_bytes(&mut table, crypto::BLOCK_TABLE_KEY);
        body.extend_from_slice(&table);

        let extended = (self.format_version >= 1).then(|| {
            let hi_block_table_pos = (header_size + body.len() as u32) as u64;
            body.extend(std::iter::repeat(0u8).take(blocks.len() * 2));
            MpqHeaderExt {
                hi_block_table_pos,
                ..Default::default()
            }
        });

        let header = MpqHeader {
            header_size,
            archive_size: header_size + body.len() as u32,
            format_version: self.format_version,
            sector_size_shift: self.sector_size_shift,
            hash_table_pos,
            block_table_pos,
            hash_table_entries: self.hash_table_entries,
            block_table_entries: blocks.len() as u32,
            extended,
        };

        let mut out = Cursor::new(vec![0xA5u8; self.prefix]);
        if self.user_data {
            UserDataHeader {
                user_data_size: self.prefix as u32 - 16,
                header_offset: self.prefix as u32,
                user_data_header_size: 16,
            }
            .write(&mut out)
            .unwrap();
        }
        out.set_position(self.prefix as u64);
        header.write(&mut out).unwrap();
        out.write_all(&body).unwrap();
        out.into_inner()
    }
}

fn encode_member(member: &Member, file_pos: u32, sector_size: usize) -> Vec<u8> {
    let compress = member.flags.is_compressed();
    let key = member.flags.contains(BlockFlags::ENCRYPTED).then(|| {
        crypto::file_key(
            &member.name,
            file_pos,
            member.data.len() as u32,
            member.flags.contains(BlockFlags::FIX_KEY),
        )
    });

    if member.flags.contains(BlockFlags::SINGLE_UNIT) {
        let mut unit = if compress {
            member.codec.pack(&member.data)
        } else {
            member.data.clone()
        };
        if let Some(key) = key {
            crypto::encrypt_bytes(&mut unit, key);
        }
        return unit;
    }

    let mut sectors: Vec<Vec<u8>> = member
        .data
        .chunks(sector_size)
        .map(|chunk| {
            if compress {
                member.codec.pack(chunk)
            } else {
                chunk.to_vec()
            }
        })
        .collect();
    if let Some(key) = key {
        for (i, sector) in sectors.iter_mut().enumerate() {
            crypto::encrypt_bytes(sector, key.wrapping_add(i as u32));
        }
    }

    if !compress {
        return sectors.concat();
    }

    let mut offset = (sectors.len() as u32 + 1) * 4;
    let mut table = offset.to_le_bytes().to_vec();
    for sector in &sectors {
        offset += sector.len() as u32;
        table.extend_from_slice(&offset.to_le_bytes());
    }
    if let Some(key) = key {
        crypto::encrypt_bytes(&mut table, key.wrapping_sub(1));
    }

    table.extend_from_slice(&sectors.concat());
    table
}

/// Compress one sector, keeping it as is when that does not make it smaller
pub fn compress_sector(plain: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(vec![CompressionMethod::Zlib.mask()], Compression::best());
    encoder.write_all(plain).unwrap();
    let compressed = encoder.finish().unwrap();

    if compressed.len() < plain.len() {
        compressed
    } else {
        plain.to_vec()
    }
}

/// Compress one sector with bzip2, keeping it as is when that does not make it smaller
pub fn bzip2_sector(plain: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(
        vec![CompressionMethod::Bzip2.mask()],
        bzip2::Compression::best(),
    );
    encoder.write_all(plain).unwrap();
    let compressed = encoder.finish().unwrap();

    if compressed.len() < plain.len() {
        compressed
    } else {
        plain.to_vec()
    }
}

/// Bytes that do not compress
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Bytes that compress well
pub fn text(len: usize) -> Vec<u8> {
    b"MaNGOS extracts the client tables. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
