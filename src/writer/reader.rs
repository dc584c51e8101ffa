//! A minimal reader that can parse back exactly what [`super::Writer`] produces.
//!
//! This is deliberately not a general ROOT reader: it understands only the fixed header,
//! begin-key, directory, streamer table and key-list shapes this crate's writer emits, and is
//! used by this crate's own round-trip tests.

use std::io::{Read, Seek, SeekFrom};

use crate::errors::ParseError;
use crate::io::ReadExt;

use super::layout::{HEADER_SIZE, KEY_VERSION, MAGIC};

fn read_tstring<S: Read>(storage: &mut S) -> Result<String, ParseError> {
    let len = storage.read_u8()?;
    let len = if len == 0xFF {
        storage.read_u32_be()? as usize
    } else {
        len as usize
    };
    let mut buf = vec![0u8; len];
    storage.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| ParseError::InvalidUtf8 { offset: 0 })
}

#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub f_begin: u32,
    pub f_end: u64,
    pub f_seek_free: u64,
    pub f_seek_info: u64,
    pub f_nbytes_info: u32,
    pub f_nbytes_name: u32,
}

#[derive(Debug, Clone)]
pub struct ParsedKey {
    pub offset: u64,
    pub f_nbytes: i32,
    pub f_objlen: i32,
    pub f_keylen: i16,
    pub f_seek_key: u64,
    pub f_seek_pdir: u64,
    pub class_name: String,
    pub object_name: String,
    pub title: String,
}

pub fn read_header<S: Read + Seek>(storage: &mut S) -> Result<ParsedHeader, ParseError> {
    storage.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    storage.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ParseError::MismatchedMagic);
    }
    let _version = storage.read_i32_be()?;
    let f_begin = storage.read_u32_be()?;
    let f_end = storage.read_u64_be()?;
    let f_seek_free = storage.read_u64_be()?;
    let f_seek_info = storage.read_u64_be()?;
    let f_nbytes_info = storage.read_u32_be()?;
    let f_nbytes_name = storage.read_u32_be()?;
    let _f_compress = storage.read_u32_be()?;
    let mut uuid = [0u8; 16];
    storage.read_exact(&mut uuid)?;

    debug_assert_eq!(storage.stream_position()?, HEADER_SIZE);

    Ok(ParsedHeader {
        f_begin,
        f_end,
        f_seek_free,
        f_seek_info,
        f_nbytes_info,
        f_nbytes_name,
    })
}

/// Reads one key at `offset`, validating the `fNbytes == fKeylen + fObjlen` invariant.
pub fn read_key<S: Read + Seek>(storage: &mut S, offset: u64) -> Result<ParsedKey, ParseError> {
    storage.seek(SeekFrom::Start(offset))?;

    let f_nbytes = storage.read_i32_be()?;
    let version = storage.read_i16_be()?;
    let f_objlen = storage.read_i32_be()?;
    let _f_datetime = storage.read_i32_be()?;
    let f_keylen = storage.read_i16_be()?;
    let _f_cycle = storage.read_i16_be()?;
    let f_seek_key = storage.read_u64_be()?;
    let f_seek_pdir = storage.read_u64_be()?;
    let class_name = read_tstring(storage)?;
    let object_name = read_tstring(storage)?;
    let title = read_tstring(storage)?;

    debug_assert_eq!(version, KEY_VERSION);

    let sum = f_keylen as i64 + f_objlen as i64;
    if f_nbytes as i64 != sum {
        return Err(ParseError::KeySizeMismatch {
            offset,
            fnbytes: f_nbytes,
            fkeylen: f_keylen,
            fobjlen: f_objlen,
            sum,
        });
    }

    Ok(ParsedKey {
        offset,
        f_nbytes,
        f_objlen,
        f_keylen,
        f_seek_key,
        f_seek_pdir,
        class_name,
        object_name,
        title,
    })
}

/// Reads the `TObjString` payload immediately following a junk-key's header.
pub fn read_object_string<S: Read + Seek>(storage: &mut S, key: &ParsedKey) -> Result<String, ParseError> {
    storage.seek(SeekFrom::Start(key.offset + key.f_keylen as u64))?;
    let _version = storage.read_i16_be()?;
    read_tstring(storage)
}

/// Reads the directory's `fNbytesKeys`/`fSeekKeys` pair, following the fixed layout in
/// [`super::layout::DirectoryInfo`].
pub fn read_directory_seek_keys<S: Read + Seek>(storage: &mut S, directory_offset: u64) -> Result<u64, ParseError> {
    storage.seek(SeekFrom::Start(directory_offset + 2 + 4 + 4 + 4 + 4 + 8 + 8))?;
    Ok(storage.read_u64_be()?)
}

/// Reads the number of keys recorded just after the head-key at `fSeekKeys`.
pub fn read_nkeys<S: Read + Seek>(storage: &mut S, seek_keys: u64) -> Result<i32, ParseError> {
    let head_key = read_key(storage, seek_keys)?;
    storage.seek(SeekFrom::Start(seek_keys + head_key.f_keylen as u64))?;
    Ok(storage.read_i32_be()?)
}

/// Reads every string-key entry in the key list, in on-disk order.
pub fn read_string_keys<S: Read + Seek>(storage: &mut S, seek_keys: u64) -> Result<Vec<ParsedKey>, ParseError> {
    let head_key = read_key(storage, seek_keys)?;
    let mut offset = seek_keys + head_key.f_keylen as u64;

    storage.seek(SeekFrom::Start(offset))?;
    let nkeys = storage.read_i32_be()?;
    offset += 4;

    let mut keys = Vec::with_capacity(nkeys.max(0) as usize);
    for _ in 0..nkeys {
        let key = read_key(storage, offset)?;
        offset += key.f_keylen as u64;
        keys.push(key);
    }
    Ok(keys)
}
