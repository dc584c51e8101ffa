//! Core A: a minimal, byte-level self-consistent ROOT `TFile` writer.
//!
//! A [`Writer`] owns a single growable buffer and the web of offsets described in the crate's
//! design notes (`fBEGIN`, `fEND`, `fSeekFree`, `fSeekInfo`, `fSeekKeys`, per-key `fNbytes` /
//! `fKeylen` / `fObjlen`). Every [`insert`](Writer::insert) call mutates that buffer in place,
//! relocating the streamer table or key list when their preallocated headroom runs out.

pub mod layout;
pub mod object;
pub mod reader;
pub mod sink;

use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use crate::errors::{CreateError, InsertError};
use crate::io::{ReadSeekWriteExt, Truncate};

use layout::{Cursor, DirectoryInfo, Header, Key, EXPANDER, EXPANDER_POW};
use object::TObjString;

fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

fn expander_pow() -> u64 {
    EXPANDER.pow(EXPANDER_POW)
}

/// Owns the buffer, cursor bookkeeping and layout records of one ROOT archive being written.
///
/// `S` is typically an in-memory `std::io::Cursor<Vec<u8>>` or a `std::fs::File`; anything
/// implementing `Read + Write + Seek` plus this crate's [`Truncate`] extension works, mirroring
/// the teacher's `Pkg<S>` storage parameter.
pub struct Writer<S> {
    storage: S,

    header: Header,

    directory: DirectoryInfo,
    directory_offset: u64,

    streamers: HashSet<String>,
    streamer_start: u64,
    streamer_end: Cursor,
    streamer_limit: u64,

    head_key: Key,
    head_key_offset: u64,
    head_key_end: u64,

    key_end: Cursor,
    key_limit: u64,

    nkeys: i32,
}

impl<S: Read + Write + Seek + Truncate> Writer<S> {
    /// Creates a brand new, empty archive. On return the file already satisfies every writer
    /// invariant: it contains a valid header, begin-key, directory, empty streamer table and an
    /// empty key list (`nkeys == 0`).
    pub fn create(filename: &str, mut storage: S) -> Result<Self, CreateError> {
        let bytename = basename(filename);

        let mut cursor = Cursor::at(0);
        let mut header = Header::new(layout::tstring_len(bytename) as u32);
        sink::set_header(&mut storage, &mut cursor, &header)?;

        // Begin-Key
        let mut cursor = Cursor::at(header.f_begin as u64);
        let pointcheck = cursor.index();
        let mut begin_key = Key::begin(bytename, pointcheck);
        sink::set_key(&mut storage, &mut cursor, &begin_key)?;
        begin_key.f_keylen = (cursor.index() - pointcheck) as i16;

        // The junk "name" strings serve as the begin-key's logical payload.
        let payload_start = cursor.index();
        sink::set_strings(&mut storage, &mut cursor, bytename)?;
        begin_key.f_objlen = (cursor.index() - payload_start) as i32;
        begin_key.f_nbytes = begin_key.f_keylen as i32 + begin_key.f_objlen;
        sink::set_key(&mut storage, &mut Cursor::at(pointcheck), &begin_key)?;

        // DirectoryInfo
        let directory_offset = cursor.index();
        let mut directory = DirectoryInfo::new(header.f_nbytes_name as i32, directory_offset);
        sink::set_directoryinfo(&mut storage, &mut cursor, &directory)?;

        header.f_seek_info = cursor.index();

        // Streamer Key
        let pointcheck = cursor.index();
        let mut streamer_key = Key::streamer(pointcheck, directory_offset);
        sink::set_key(&mut storage, &mut cursor, &streamer_key)?;
        streamer_key.f_keylen = (cursor.index() - pointcheck) as i16;
        streamer_key.f_nbytes = streamer_key.f_keylen as i32 + streamer_key.f_objlen;
        sink::set_key(&mut storage, &mut Cursor::at(pointcheck), &streamer_key)?;

        header.f_nbytes_info = streamer_key.f_nbytes as u32;
        sink::set_header(&mut storage, &mut Cursor::at(0), &header)?;

        // Allocate space for the streamer table: a 4-byte descriptor count followed by headroom.
        let streamer_start = cursor.index();
        storage.truncate(streamer_start + EXPANDER)?;
        let mut streamer_cursor = Cursor::at(streamer_start);
        sink::set_numbers(&mut storage, &mut streamer_cursor, 0)?;
        let streamer_end = streamer_cursor;
        let streamer_limit = streamer_start + EXPANDER;

        let mut cursor = Cursor::at(streamer_start + EXPANDER);

        directory.f_seek_keys = cursor.index();
        sink::set_directoryinfo(&mut storage, &mut Cursor::at(directory_offset), &directory)?;

        // Allocate space for the key list.
        let key_start = cursor.index();
        storage.truncate(key_start + EXPANDER)?;
        let key_limit = key_start + EXPANDER;

        // Head Key
        let head_key_offset = cursor.index();
        let mut head_key = Key::head(bytename, directory.f_seek_keys, directory_offset);
        head_key.f_nbytes = directory.f_nbytes_keys;
        sink::set_key(&mut storage, &mut cursor, &head_key)?;
        let head_key_end = cursor.index();

        let nkeys = 0;
        sink::set_numbers(&mut storage, &mut cursor, nkeys)?;

        let key_end = cursor;

        header.f_seek_free = cursor.index();
        header.f_end = header.f_seek_free + EXPANDER;
        sink::set_header(&mut storage, &mut Cursor::at(0), &header)?;

        storage.flush()?;

        Ok(Writer {
            storage,
            header,
            directory,
            directory_offset,
            streamers: HashSet::new(),
            streamer_start,
            streamer_end,
            streamer_limit,
            head_key,
            head_key_offset,
            head_key_end,
            key_end,
            key_limit,
            nkeys,
        })
    }

    /// Inserts a named `TObjString`, growing the streamer table and key list as needed.
    ///
    /// Offsets are updated in the order described in the design notes: the object is appended at
    /// `fEND` first, then the key list (relocating if headroom is low), then the streamer table
    /// (relocating if headroom is low and this is a previously-unseen type), then `nkeys`, the
    /// directory, the head-key and finally the header are repatched.
    pub fn insert(&mut self, name: &str, value: &TObjString) -> Result<(), InsertError> {
        let mut cursor = Cursor::at(self.header.f_end);

        // Place the object: a junk-key immediately followed by its payload.
        let pointcheck = cursor.index();
        let mut junk_key = Key::junk(name, pointcheck, self.directory_offset);
        sink::set_key(&mut self.storage, &mut cursor, &junk_key)?;
        junk_key.f_keylen = (cursor.index() - pointcheck) as i16;

        let payload_start = cursor.index();
        sink::set_object(&mut self.storage, &mut cursor, value)?;
        junk_key.f_objlen = (cursor.index() - payload_start) as i32;
        junk_key.f_nbytes = junk_key.f_keylen as i32 + junk_key.f_objlen;
        sink::set_key(&mut self.storage, &mut Cursor::at(pointcheck), &junk_key)?;

        // Key-list capacity check: relocate if fewer than 200 bytes of headroom remain.
        if self.key_limit - self.key_end.index() < 200 {
            // The relocated copy must land past the object just written above, not at the stale
            // pre-insert `fEND` (which is exactly where that object starts).
            let old_end = cursor.index().max(self.header.f_end);
            self.storage.truncate(old_end + expander_pow())?;
            self.storage
                .copy_within(self.directory.f_seek_keys, EXPANDER, old_end)?;
            self.key_end = Cursor::at(old_end + self.key_end.index() - self.directory.f_seek_keys);
            self.head_key_offset = old_end + (self.head_key_offset - self.directory.f_seek_keys);
            self.head_key_end = old_end + (self.head_key_end - self.directory.f_seek_keys);
            self.directory.f_seek_keys = old_end;
            self.key_limit = old_end + expander_pow();
            self.header.f_end = self.key_limit;
            self.header.f_seek_free = self.key_limit;
            sink::set_directoryinfo(&mut self.storage, &mut Cursor::at(self.directory_offset), &self.directory)?;
        }

        let key_pointcheck = self.key_end.index();
        let mut string_key = Key::string(name, pointcheck, self.directory_offset);
        sink::set_key(&mut self.storage, &mut self.key_end, &string_key)?;
        string_key.f_keylen = (self.key_end.index() - key_pointcheck) as i16;
        string_key.f_nbytes = string_key.f_keylen as i32 + string_key.f_objlen;
        sink::set_key(&mut self.storage, &mut Cursor::at(key_pointcheck), &string_key)?;

        // Streamer capacity & type check: emit a descriptor the first time a type is seen.
        if self.streamers.insert(TObjString::type_name().to_string()) {
            if self.streamer_limit - self.streamer_end.index() < 500 {
                // Same reasoning as the key-list relocation above: land past whatever is already
                // written (the object, and possibly an already-relocated key-list region).
                let old_end = cursor.index().max(self.header.f_end);
                self.storage.truncate(old_end + expander_pow())?;
                self.storage
                    .copy_within(self.header.f_seek_info, EXPANDER, old_end)?;
                self.streamer_start = old_end + (self.streamer_start - self.header.f_seek_info);
                self.streamer_end =
                    Cursor::at(old_end + self.streamer_end.index() - self.header.f_seek_info);
                self.header.f_seek_info = old_end;
                self.streamer_limit = old_end + expander_pow();
                self.header.f_end = self.streamer_limit;
                self.header.f_seek_free = self.streamer_limit;
            }

            sink::set_streamer_entry(&mut self.storage, &mut self.streamer_end, TObjString::type_name())?;

            let count = self.streamers.len() as i32;
            sink::set_numbers(&mut self.storage, &mut Cursor::at(self.streamer_start), count)?;
        }

        // Number of keys.
        self.nkeys += 1;
        sink::set_numbers(&mut self.storage, &mut Cursor::at(self.head_key_end), self.nkeys)?;

        // DirectoryInfo.
        self.directory.f_nbytes_keys = (self.header.f_end - self.key_end.index()) as i32;
        sink::set_directoryinfo(&mut self.storage, &mut Cursor::at(self.directory_offset), &self.directory)?;

        // Head-Key.
        self.head_key.f_nbytes = self.directory.f_nbytes_keys;
        self.head_key.f_keylen = (self.head_key_end - self.head_key_offset) as i16;
        self.head_key.f_objlen = self.head_key.f_nbytes - self.head_key.f_keylen as i32;
        sink::set_key(&mut self.storage, &mut Cursor::at(self.head_key_offset), &self.head_key)?;

        // The object tail may have pushed past fEND even after any relocation.
        if cursor.index() > self.header.f_end {
            self.header.f_seek_free = cursor.index();
            self.header.f_end = cursor.index();
        }

        sink::set_header(&mut self.storage, &mut Cursor::at(0), &self.header)?;
        self.storage.flush()?;

        Ok(())
    }

    /// Forwards to the underlying storage.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.storage.flush()
    }

    /// Number of objects inserted so far.
    pub fn len(&self) -> i32 {
        self.nkeys
    }

    pub fn is_empty(&self) -> bool {
        self.nkeys == 0
    }

    /// Gives back the underlying storage, consuming the writer.
    pub fn into_inner(self) -> S {
        self.storage
    }

    pub fn get_ref(&self) -> &S {
        &self.storage
    }
}
