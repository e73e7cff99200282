//! Sector decompression handling.

use std::io::{self, Read};

use bzip2::read::BzDecoder;
use flate2::read::ZlibDecoder;
use tracing::instrument;

use crate::error::{Error, Result};

/// Identifies the compression named by the first byte of a compressed sector
///
/// Archives may combine several methods in one sector by or-ing their masks together, those
/// combinations are reported through [`Error::UnsupportedCompression`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Huffman coding, used for WAVE files
    Huffman,

    /// Compress the data using Zlib
    Zlib,

    /// PKWare Data Compression Library
    Implode,

    /// Compress the data using BZip2
    Bzip2,

    /// Run length encoding of zero bytes
    Sparse,

    /// Lossy ADPCM for mono audio
    AdpcmMono,

    /// Lossy ADPCM for stereo audio
    AdpcmStereo,

    /// LZMA, only ever used on its own
    Lzma,
}

impl CompressionMethod {
    /// The mask byte written in front of a sector compressed with this method
    pub fn mask(&self) -> u8 {
        match self {
            CompressionMethod::Huffman => 0x01,
            CompressionMethod::Zlib => 0x02,
            CompressionMethod::Implode => 0x08,
            CompressionMethod::Bzip2 => 0x10,
            CompressionMethod::Lzma => 0x12,
            CompressionMethod::Sparse => 0x20,
            CompressionMethod::AdpcmMono => 0x40,
            CompressionMethod::AdpcmStereo => 0x80,
        }
    }
}

impl TryFrom<u8> for CompressionMethod {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0x01 => CompressionMethod::Huffman,
            0x02 => CompressionMethod::Zlib,
            0x08 => CompressionMethod::Implode,
            0x10 => CompressionMethod::Bzip2,
            0x12 => CompressionMethod::Lzma,
            0x20 => CompressionMethod::Sparse,
            0x40 => CompressionMethod::AdpcmMono,
            0x80 => CompressionMethod::AdpcmStereo,
            other => return Err(Error::UnsupportedCompression(other)),
        })
    }
}

/// Most bytes reserved up front for a decompressed sector, larger sectors grow as they decode
const MAX_RESERVE: usize = 0x1_0000;

/// Decompress one sector of a member flagged as compressed.
///
/// `data` is the sector as stored, including the leading mask byte, and `expected` the number of
/// bytes the sector has to produce. Decoder failures come back as [`Error::IOError`] and a
/// length mismatch is left for the caller to judge.
#[instrument(level = "trace", skip(data), fields(len = data.len()))]
pub(crate) fn decompress_sector(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let (&mask, payload) = data
        .split_first()
        .ok_or_else(|| Error::IOError(io::ErrorKind::UnexpectedEof.into()))?;

    match CompressionMethod::try_from(mask)? {
        CompressionMethod::Zlib => read_limited(ZlibDecoder::new(payload), expected),
        CompressionMethod::Bzip2 => read_limited(BzDecoder::new(payload), expected),
        CompressionMethod::Implode => explode(payload),
        method => Err(Error::UnsupportedCompression(method.mask())),
    }
}

/// Decompress one sector of a member flagged as imploded.
///
/// These sectors carry no mask byte, the whole sector is PKWare DCL data.
#[instrument(level = "trace", skip(data), fields(len = data.len()))]
pub(crate) fn explode_sector(data: &[u8]) -> Result<Vec<u8>> {
    explode(data)
}

fn read_limited(decoder: impl Read, expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected.min(MAX_RESERVE));
    // one byte past the expected size is enough to notice an overlong sector
    decoder.take(expected as u64 + 1).read_to_end(&mut out)?;
    Ok(out)
}

fn explode(payload: &[u8]) -> Result<Vec<u8>> {
    pklib::explode_bytes(payload)
        .map_err(|e| Error::IOError(io::Error::new(io::ErrorKind::InvalidData, e.to_string())))
}
