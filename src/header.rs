//! File header: optional outer archive wrapper, inner header, declared size,
//! text count and offset table.
//!
//! # Layout
//! ```text
//! [ outer tag (8 B) | outer size u16 | reserved u16 ]   only when wrapped
//! [ inner header (16 B) | size u16 | text_count u16 | offsets u16 × text_count ]
//! ```
//! A file is wrapped when its first 16 bytes contain the ASCII tag `OMCB`.
//! The wrapper nests exactly once.  All integers are little-endian u16.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::debug;

use crate::error::{McbError, Result};

pub const INNER_HEADER_LEN: usize = 16;
pub const OUTER_HEADER_LEN: usize = 8;
/// Outer tag + outer size + reserved word.
pub const OUTER_BLOCK_LEN:  usize = OUTER_HEADER_LEN + 4;
/// Inner header + size + text count; also the smallest valid file.
pub const MIN_HEADER_LEN:   usize = INNER_HEADER_LEN + 4;
pub const OUTER_TAG: &[u8; 4] = b"OMCB";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct McbHeader {
    /// Present iff the file is wrapped in an outer archive header.
    pub outer:      Option<[u8; OUTER_HEADER_LEN]>,
    pub inner:      [u8; INNER_HEADER_LEN],
    /// Declared byte size (excluding the outer block); recomputed on save.
    pub size:       u16,
    pub text_count: u16,
    /// Byte offset of each text, relative to the start of text data.
    pub offsets:    Vec<u16>,
}

impl McbHeader {
    /// Read the header and offset table.  Leaves the stream positioned
    /// right after the offset table.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut inner = read_array::<_, INNER_HEADER_LEN>(reader, "header", stream_len)?;
        let mut outer = None;

        if contains_tag(&inner) {
            reader.seek(SeekFrom::Start(0))?;
            let tag = read_array::<_, OUTER_HEADER_LEN>(reader, "outer_header", stream_len)?;
            let outer_size = read_word(reader, "outer_size", stream_len)?;
            let _reserved  = read_word(reader, "outer_reserved", stream_len)?;
            inner = read_array::<_, INNER_HEADER_LEN>(reader, "header", stream_len)?;
            debug!(outer_size, "outer archive wrapper detected");
            outer = Some(tag);
        }

        let size       = read_word(reader, "size", stream_len)?;
        let text_count = read_word(reader, "text_count", stream_len)?;

        let mut offsets = Vec::with_capacity(text_count as usize);
        for _ in 0..text_count {
            match reader.read_u16::<LittleEndian>() {
                Ok(off) => offsets.push(off),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(McbError::OffsetTableTruncated {
                        declared: text_count,
                        found:    offsets.len(),
                        offset:   reader.stream_position()?,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(size, text_count, wrapped = outer.is_some(), "header read");
        Ok(Self { outer, inner, size, text_count, offsets })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        if let Some(tag) = &self.outer {
            writer.write_all(tag)?;
            writer.write_u16::<LittleEndian>(self.size)?;
            writer.write_u16::<LittleEndian>(0)?;
        }
        writer.write_all(&self.inner)?;
        writer.write_u16::<LittleEndian>(self.size)?;
        writer.write_u16::<LittleEndian>(self.text_count)?;
        for &off in &self.offsets {
            writer.write_u16::<LittleEndian>(off)?;
        }
        Ok(())
    }

    pub fn is_wrapped(&self) -> bool {
        self.outer.is_some()
    }

    /// Inner header as text, trailing NUL padding removed.
    pub fn inner_str(&self) -> String {
        padded_str(&self.inner)
    }

    pub fn outer_str(&self) -> Option<String> {
        self.outer.as_ref().map(|o| padded_str(o))
    }
}

fn contains_tag(bytes: &[u8]) -> bool {
    bytes.windows(OUTER_TAG.len()).any(|w| w == OUTER_TAG)
}

fn padded_str(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn malformed<R: Seek>(reader: &mut R, field: &'static str, needed: u64, stream_len: u64) -> Result<McbError> {
    let offset = reader.stream_position()?;
    Ok(McbError::MalformedHeader {
        field,
        offset,
        needed,
        available: stream_len.saturating_sub(offset),
    })
}

fn read_array<R: Read + Seek, const N: usize>(
    reader:     &mut R,
    field:      &'static str,
    stream_len: u64,
) -> Result<[u8; N]> {
    if reader.stream_position()? + N as u64 > stream_len {
        return Err(malformed(reader, field, N as u64, stream_len)?);
    }
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_word<R: Read + Seek>(reader: &mut R, field: &'static str, stream_len: u64) -> Result<u16> {
    if reader.stream_position()? + 2 > stream_len {
        return Err(malformed(reader, field, 2, stream_len)?);
    }
    Ok(reader.read_u16::<LittleEndian>()?)
}
