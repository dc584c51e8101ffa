//! The byte sink: serializes individual records into storage at a cursor position.
//!
//! Every function here seeks `storage` to `cursor`'s current offset, writes one record, and
//! advances `cursor` by however many bytes it wrote. Calling a function again with a `Cursor` set
//! back to a record's start offset patches that record in place — this is how the writer
//! discovers `fKeylen`/`fObjlen`/`fNbytes` for keys (see [`write_key`]).

use std::io::{self, Seek, SeekFrom, Write};

use crate::io::WriteExt;

use super::layout::{Cursor, DirectoryInfo, Header, Key, DIRECTORY_INFO_SIZE, HEADER_SIZE, KEY_VERSION, MAGIC};
use super::object::TObjString;

fn write_tstring<S: Write>(storage: &mut S, s: &str) -> io::Result<u64> {
    let bytes = s.as_bytes();
    if bytes.len() < 255 {
        storage.write_u8(bytes.len() as u8)?;
        storage.write_all(bytes)?;
        Ok(1 + bytes.len() as u64)
    } else {
        storage.write_u8(0xFF)?;
        storage.write_u32_be(bytes.len() as u32)?;
        storage.write_all(bytes)?;
        Ok(5 + bytes.len() as u64)
    }
}

pub fn set_header<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, header: &Header) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;

    storage.write_all(MAGIC)?;
    storage.write_i32_be(super::layout::VERSION)?;
    storage.write_u32_be(header.f_begin)?;
    storage.write_u64_be(header.f_end)?;
    storage.write_u64_be(header.f_seek_free)?;
    storage.write_u64_be(header.f_seek_info)?;
    storage.write_u32_be(header.f_nbytes_info)?;
    storage.write_u32_be(header.f_nbytes_name)?;
    storage.write_u32_be(header.f_compress)?;
    storage.write_all(&header.uuid)?;

    cursor.0 += HEADER_SIZE;
    Ok(())
}

/// Serializes any key variant. On first call at a fresh offset this reserves space using
/// whatever size fields `key` currently holds (typically zero); the caller is expected to patch
/// the key afterwards once `fObjlen`/`fKeylen`/`fNbytes` are known, by calling this again with a
/// `Cursor` reset to the key's start offset.
pub fn set_key<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, key: &Key) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;

    storage.write_i32_be(key.f_nbytes)?;
    storage.write_i16_be(KEY_VERSION)?;
    storage.write_i32_be(key.f_objlen)?;
    storage.write_i32_be(0)?; // fDatetime: fixed for determinism, not load-bearing
    storage.write_i16_be(key.f_keylen)?;
    storage.write_i16_be(key.f_cycle)?;
    storage.write_u64_be(key.f_seek_key)?;
    storage.write_u64_be(key.f_seek_pdir)?;
    write_tstring(storage, &key.class_name)?;
    write_tstring(storage, &key.object_name)?;
    write_tstring(storage, &key.title)?;

    cursor.0 = storage.stream_position()?;
    Ok(())
}

pub fn set_directoryinfo<S: Write + Seek>(
    storage: &mut S,
    cursor: &mut Cursor,
    info: &DirectoryInfo,
) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;

    storage.write_i16_be(info.f_version)?;
    storage.write_i32_be(info.f_datime_c)?;
    storage.write_i32_be(info.f_datime_m)?;
    storage.write_i32_be(info.f_nbytes_keys)?;
    storage.write_i32_be(info.f_nbytes_name)?;
    storage.write_u64_be(info.f_seek_dir)?;
    storage.write_u64_be(info.f_seek_parent)?;
    storage.write_u64_be(info.f_seek_keys)?;

    cursor.0 += DIRECTORY_INFO_SIZE;
    Ok(())
}

/// Writes the file-name "junk" string following the begin-key, accounting for `fNbytesName`.
pub fn set_strings<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, name: &str) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;
    let written = write_tstring(storage, name)?;
    cursor.0 += written;
    Ok(())
}

pub fn set_object<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, object: &TObjString) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;
    storage.write_i16_be(1)?; // object streamer version
    let written = write_tstring(storage, &object.string)?;
    cursor.0 += 2 + written;
    Ok(())
}

/// Writes a big-endian `i32`, e.g. the `nkeys` counter.
pub fn set_numbers<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, value: i32) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;
    storage.write_i32_be(value)?;
    cursor.0 += 4;
    Ok(())
}

/// Appends one streamer-info descriptor (a type name plus a fixed version number) to the
/// streamer table at `cursor`.
pub fn set_streamer_entry<S: Write + Seek>(storage: &mut S, cursor: &mut Cursor, type_name: &str) -> io::Result<()> {
    storage.seek(SeekFrom::Start(cursor.0))?;
    let written = write_tstring(storage, type_name)?;
    storage.write_i32_be(1)?; // streamer version
    cursor.0 += written + 4;
    Ok(())
}
