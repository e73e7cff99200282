//! Writes the small archives and tables the command tests run against.
#![allow(dead_code)]

use std::{
    io::{Cursor, Write},
    path::Path,
};

use binrw::BinWrite;
use clap::Parser;
use flate2::{write::ZlibEncoder, Compression};
use mangos::commands::Commands;
use mangos_mpq::{
    crypto::{self, HashType},
    types::{BlockEntry, BlockFlags, HashEntry, MpqHeader},
    CompressionMethod,
};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the command line as the binary would
pub fn run(args: &[&str]) -> miette::Result<()> {
    let cli = Cli::try_parse_from(std::iter::once("mangos").chain(args.iter().copied()))
        .map_err(|e| miette::miette!("{e}"))?;
    cli.command.handle()
}

/// Sector size of the archives written here, the header's default
pub const SECTOR_SIZE: usize = 4096;

/// A member as it is laid out inside an archive
pub struct Stored {
    data: Vec<u8>,
    file_size: u32,
    flags: BlockFlags,
}

impl Stored {
    /// The member kept as is
    pub fn plain(data: &[u8]) -> Self {
        Stored {
            data: data.to_vec(),
            file_size: data.len() as u32,
            flags: BlockFlags::EXISTS,
        }
    }

    /// The member split into zlib compressed sectors behind an offset table
    pub fn compressed(data: &[u8]) -> Self {
        let sectors: Vec<Vec<u8>> = data
            .chunks(SECTOR_SIZE)
            .map(|chunk| {
                let mut encoder = ZlibEncoder::new(
                    vec![CompressionMethod::Zlib.mask()],
                    Compression::best(),
                );
                encoder.write_all(chunk).unwrap();
                let packed = encoder.finish().unwrap();
                if packed.len() < chunk.len() {
                    packed
                } else {
                    chunk.to_vec()
                }
            })
            .collect();

        let mut offset = (sectors.len() as u32 + 1) * 4;
        let mut stored = offset.to_le_bytes().to_vec();
        for sector in &sectors {
            offset += sector.len() as u32;
            stored.extend_from_slice(&offset.to_le_bytes());
        }
        stored.extend(sectors.concat());

        Stored {
            data: stored,
            file_size: data.len() as u32,
            flags: BlockFlags::EXISTS | BlockFlags::COMPRESS,
        }
    }

    /// Break the zlib header of sector `index`, the sectors before it still decode
    pub fn damage_sector(mut self, index: usize) -> Self {
        let at = 4 * index;
        let start = u32::from_le_bytes(self.data[at..at + 4].try_into().unwrap()) as usize;
        // the byte after the compression mask
        self.data[start + 1] ^= 0xFF;
        self
    }
}

/// An archive of stored members, listed in its listfile
pub fn archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let members: Vec<(&str, Stored)> = members
        .iter()
        .map(|(name, data)| (*name, Stored::plain(data)))
        .collect();
    archive_of(members)
}

/// An archive of members laid out by the caller, listed in its listfile
pub fn archive_of(members: Vec<(&str, Stored)>) -> Vec<u8> {
    let listfile = members
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join("\r\n");
    let mut all = members;
    all.push(("(listfile)", Stored::plain(listfile.as_bytes())));

    let hash_entries = (all.len() * 2).next_power_of_two().max(4);
    let mut hash_table = vec![HashEntry::default(); hash_entries];
    let mut blocks = Vec::new();
    let mut body = Vec::new();

    for (index, (name, stored)) in all.iter().enumerate() {
        blocks.push(BlockEntry {
            file_pos: 0x20 + body.len() as u32,
            compressed_size: stored.data.len() as u32,
            file_size: stored.file_size,
            flags: stored.flags,
        });
        body.extend_from_slice(&stored.data);

        let mut slot = crypto::hash_name(name, HashType::TableOffset) as usize & (hash_entries - 1);
        while !hash_table[slot].is_empty() {
            slot = (slot + 1) & (hash_entries - 1);
        }
        hash_table[slot] = HashEntry {
            name_a: crypto::hash_name(name, HashType::NameA),
            name_b: crypto::hash_name(name, HashType::NameB),
            locale: 0,
            platform: 0,
            block_index: index as u32,
        };
    }

    let hash_table_pos = 0x20 + body.len() as u32;
    let mut table = Cursor::new(Vec::new());
    hash_table.write_le(&mut table).unwrap();
    let mut table = table.into_inner();
    crypto::encrypt_bytes(&mut table, crypto::HASH_TABLE_KEY);
    body.extend_from_slice(&table);

    let block_table_pos = 0x20 + body.len() as u32;
    let mut table = Cursor::new(Vec::new());
    blocks.write_le(&mut table).unwrap();
    let mut table = table.into_inner();
    crypto::encrypt_bytes(&mut table, crypto::BLOCK_TABLE_KEY);
    body.extend_from_slice(&table);

    let header = MpqHeader {
        archive_size: 0x20 + body.len() as u32,
        hash_table_pos,
        block_table_pos,
        hash_table_entries: hash_entries as u32,
        block_table_entries: blocks.len() as u32,
        ..Default::default()
    };

    let mut out = Cursor::new(Vec::new());
    header.write(&mut out).unwrap();
    out.write_all(&body).unwrap();
    out.into_inner()
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

/// A table with four fields per row
pub fn table(rows: &[[u32; 4]], strings: &[u8]) -> Vec<u8> {
    let mut out = b"WDBC".to_vec();
    for value in [rows.len() as u32, 4, 16, strings.len() as u32] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for row in rows {
        for value in row {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(strings);
    out
}

pub fn write(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}
