use std::io::{self, Read, Seek, Write};

macro_rules! define_read_be_methods {
    { $($name:ident -> $ret:ty;)* } => {
        $(fn $name(&mut self) -> io::Result<$ret> {
            let mut buf = [0u8; ::std::mem::size_of::<$ret>()];
            self.read_exact(&mut buf)?;
            Ok(<$ret>::from_be_bytes(buf))
        })*
    };
}

macro_rules! define_write_be_methods {
    { $($name:ident($type:ty);)* } => {
        $(fn $name(&mut self, value: $type) -> io::Result<()> {
            self.write_all(&value.to_be_bytes())
        })*
    };
}

pub trait ReadExt: Read {
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    define_read_be_methods! {
        read_u16_be -> u16;
        read_u32_be -> u32;
        read_u64_be -> u64;

        read_i16_be -> i16;
        read_i32_be -> i32;
        read_i64_be -> i64;
    }
}

impl<R: Read> ReadExt for R {}

pub trait WriteExt: Write {
    fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.write_all(&[value])
    }

    define_write_be_methods! {
        write_u16_be(u16);
        write_u32_be(u32);
        write_u64_be(u64);

        write_i16_be(i16);
        write_i32_be(i32);
        write_i64_be(i64);
    }

    /// Writes `count` repetitions of `value`.
    fn fill(&mut self, value: u8, count: u64) -> io::Result<()> {
        let zeros = [value; 1024];
        let mut remaining = count;
        while remaining > 0 {
            let chunk_size = zeros.len().min(remaining as usize);
            self.write_all(&zeros[..chunk_size])?;
            remaining -= chunk_size as u64;
        }

        Ok(())
    }
}

impl<W: Write> WriteExt for W {}

pub trait ReadSeekWriteExt: Read + Write + Seek {
    /// Copies `count` bytes starting at `input_offset` to `output_offset`, leaving the cursor
    /// position unspecified afterwards.
    fn copy_within(&mut self, input_offset: u64, count: u64, output_offset: u64) -> io::Result<()> {
        if input_offset == output_offset {
            return Ok(());
        }

        // TODO: Optimise the overlapping case, this always round-trips through a full copy.
        let mut buf = vec![0; count as usize];
        self.seek(io::SeekFrom::Start(input_offset))?;
        self.read_exact(&mut buf)?;

        self.seek(io::SeekFrom::Start(output_offset))?;
        self.write_all(&buf)?;

        Ok(())
    }
}

impl<S: Read + Write + Seek> ReadSeekWriteExt for S {}

/// Objects that may be extended or shrunk to an exact byte length.
///
/// The standard library has no such trait, so this crate provides its own and implements it for
/// [`File`](std::fs::File) and [`Vec<u8>`].
pub trait Truncate {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Truncate for Vec<u8> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.resize(len as usize, 0);
        Ok(())
    }
}

impl Truncate for io::Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}
