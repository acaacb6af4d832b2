// I/O helpers that keep track of which side of a copy failed

use std::io::{ErrorKind, Read, Write};

use crate::error::{Error, Result};

/// Chunk size used when forwarding block bodies and audio frames
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Fill `buf` from the source, turning a premature end of stream into `on_eof`
pub fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], on_eof: impl FnOnce() -> Error) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(on_eof()),
        Err(e) => Err(Error::Source(e)),
    }
}

/// Write the whole buffer to the sink
pub fn write_all<W: Write>(writer: &mut W, buf: &[u8]) -> Result<()> {
    writer.write_all(buf).map_err(Error::Sink)
}

/// Read exactly `len` bytes into memory
pub fn read_vec<R: Read>(reader: &mut R, len: usize, on_eof: impl FnOnce() -> Error) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let copied = (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut data)
        .map_err(Error::Source)?;
    if copied < len {
        return Err(on_eof());
    }
    Ok(data)
}

/// Forward exactly `len` bytes from source to sink.
///
/// Returns `on_eof(copied)` if the source ends early.
pub fn copy_exact<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    len: u64,
    on_eof: impl FnOnce(u64) -> Error,
) -> Result<()> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE.min(len as usize)];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        let read = read_some(reader, &mut buffer[..want])?;
        if read == 0 {
            return Err(on_eof(len - remaining));
        }
        write_all(writer, &buffer[..read])?;
        remaining -= read as u64;
    }

    Ok(())
}

/// Read and throw away exactly `len` bytes
pub fn skip_exact<R: Read>(reader: &mut R, len: u64, on_eof: impl FnOnce(u64) -> Error) -> Result<()> {
    let skipped = std::io::copy(&mut (&mut *reader).take(len), &mut std::io::sink()).map_err(Error::Source)?;
    if skipped < len {
        return Err(on_eof(skipped));
    }
    Ok(())
}

/// Write `len` zero bytes
pub fn write_zeros<W: Write>(writer: &mut W, len: u64) -> Result<()> {
    let zeros = [0u8; 4096];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(zeros.len() as u64) as usize;
        write_all(writer, &zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Forward everything left in the source, returning the byte count
pub fn copy_to_end<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = read_some(reader, &mut buffer)?;
        if read == 0 {
            return Ok(total);
        }
        write_all(writer, &buffer[..read])?;
        total += read as u64;
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Source(e)),
        }
    }
}

/// Read a little-endian u32 from the front of `data`, advancing it
pub fn take_le_u32(data: &mut &[u8]) -> Option<u32> {
    let (head, rest) = data.split_first_chunk::<4>()?;
    *data = rest;
    Some(u32::from_le_bytes(*head))
}

/// Split `len` bytes off the front of `data`, advancing it
pub fn take_bytes<'a>(data: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    if data.len() < len {
        return None;
    }
    let (head, rest) = data.split_at(len);
    *data = rest;
    Some(head)
}
