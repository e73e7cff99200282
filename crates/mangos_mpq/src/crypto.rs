//! Name hashing and table encryption.
//!
//! Every lookup in an archive goes through [`hash_name`], so it has to match the game's own
//! implementation bit for bit. Names are folded to ASCII upper case and `/` is treated as `\`
//! before hashing. Bytes outside the ASCII range are hashed unchanged.

use byteorder::{ByteOrder, LittleEndian};

/// Selects which of the four hash functions sharing the crypt table to use
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum HashType {
    /// Start slot inside the hash table
    TableOffset = 0,
    /// First verification hash stored in the hash entry
    NameA = 1,
    /// Second verification hash stored in the hash entry
    NameB = 2,
    /// Encryption key for tables and members
    FileKey = 3,
}

/// Key of the encrypted hash table, `hash_name("(hash table)", HashType::FileKey)`
pub const HASH_TABLE_KEY: u32 = 0xC3AF_3770;

/// Key of the encrypted block table, `hash_name("(block table)", HashType::FileKey)`
pub const BLOCK_TABLE_KEY: u32 = 0xEC83_B3A3;

const CRYPT_TABLE_LEN: usize = 0x500;

static CRYPT_TABLE: [u32; CRYPT_TABLE_LEN] = build_crypt_table();

const fn build_crypt_table() -> [u32; CRYPT_TABLE_LEN] {
    let mut table = [0u32; CRYPT_TABLE_LEN];
    let mut seed: u32 = 0x0010_0001;

    let mut index1 = 0;
    while index1 < 0x100 {
        let mut index2 = index1;
        let mut i = 0;
        while i < 5 {
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let high = (seed & 0xFFFF) << 0x10;
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let low = seed & 0xFFFF;

            table[index2] = high | low;
            index2 += 0x100;
            i += 1;
        }
        index1 += 1;
    }

    table
}

#[inline(always)]
fn fold(byte: u8) -> u8 {
    match byte {
        b'/' => b'\\',
        b => b.to_ascii_uppercase(),
    }
}

/// Hash a member name the way the archive's hash table expects it
pub fn hash_name(name: &str, hash_type: HashType) -> u32 {
    hash_bytes(name.as_bytes(), hash_type)
}

/// Hash a raw member name, see [`hash_name`]
pub fn hash_bytes(name: &[u8], hash_type: HashType) -> u32 {
    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;
    let base = (hash_type as usize) << 8;

    for &byte in name {
        let ch = fold(byte) as u32;
        seed1 = CRYPT_TABLE[base + ch as usize] ^ seed1.wrapping_add(seed2);
        seed2 = ch
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Derive the key a member is encrypted with.
///
/// Only the part after the last path separator contributes. Members flagged with
/// [`crate::types::BlockFlags::FIX_KEY`] additionally mix in their position and size.
pub fn file_key(name: &str, file_pos: u32, file_size: u32, fix_key: bool) -> u32 {
    let base = name.rsplit(['\\', '/']).next().unwrap_or(name);
    let key = hash_name(base, HashType::FileKey);
    if fix_key {
        key.wrapping_add(file_pos) ^ file_size
    } else {
        key
    }
}

#[inline(always)]
fn next_key(key: u32) -> u32 {
    ((!key << 0x15).wrapping_add(0x1111_1111)) | (key >> 0x0B)
}

/// Decrypt a run of little endian words in place
pub fn decrypt_words(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;
    for value in data.iter_mut() {
        seed = seed.wrapping_add(CRYPT_TABLE[0x400 + (key & 0xFF) as usize]);
        let plain = *value ^ key.wrapping_add(seed);
        key = next_key(key);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
        *value = plain;
    }
}

/// Encrypt a run of little endian words in place
pub fn encrypt_words(data: &mut [u32], mut key: u32) {
    let mut seed: u32 = 0xEEEE_EEEE;
    for value in data.iter_mut() {
        seed = seed.wrapping_add(CRYPT_TABLE[0x400 + (key & 0xFF) as usize]);
        let plain = *value;
        *value = plain ^ key.wrapping_add(seed);
        key = next_key(key);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Decrypt a byte buffer in place.
///
/// Only whole words are encrypted, trailing bytes are left untouched.
pub fn decrypt_bytes(data: &mut [u8], key: u32) {
    transform_bytes(data, key, decrypt_words)
}

/// Encrypt a byte buffer in place, see [`decrypt_bytes`]
pub fn encrypt_bytes(data: &mut [u8], key: u32) {
    transform_bytes(data, key, encrypt_words)
}

fn transform_bytes(data: &mut [u8], key: u32, transform: fn(&mut [u32], u32)) {
    let whole = data.len() / 4 * 4;
    let mut words = vec![0u32; whole / 4];
    LittleEndian::read_u32_into(&data[..whole], &mut words);
    transform(&mut words, key);
    LittleEndian::write_u32_into(&words, &mut data[..whole]);
}
