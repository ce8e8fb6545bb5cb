//! Filename table and layout recomputation.
//!
//! # Filename table
//! Files with extras carry one 16-byte, NUL-padded filename per text right
//! after the offset table.  The table has no count field: records are read
//! for as long as they look like filenames, and the first record that does
//! not is left unconsumed (the stream is rewound to where it started).
//! A file without extras has no table at all, so the first "record" is the
//! start of its text data and fails the check.
//!
//! # Layout
//! [`Layout::compute`] derives the declared size and offset table from the
//! entry lengths.  Offsets are relative to the start of text data; when
//! extras exist each text is preceded by its 42-byte extra block and the
//! text data start is 42 bytes past the end of the filename table.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::codec::TERMINATOR;
use crate::error::{McbError, Result};
use crate::extra::EXTRA_SIZE;
use crate::header::INNER_HEADER_LEN;

pub const FILENAME_LEN:     usize = 16;
/// Shortest string (after removing NULs) accepted as a filename.
pub const MIN_FILENAME_LEN: usize = 10;

// ── Filename predicate ───────────────────────────────────────────────────────

/// Does a 16-byte record hold a filename?  NULs are ignored; what remains
/// must be at least 10 characters of `[A-Za-z0-9_]`.
pub fn is_filename(record: &[u8]) -> bool {
    let mut len = 0usize;
    for &b in record.iter().filter(|&&b| b != 0) {
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return false;
        }
        len += 1;
    }
    len >= MIN_FILENAME_LEN
}

/// Speculatively read one record; rewinds and returns `None` when the
/// record is not a filename or the stream ends first.
fn try_read_filename<R: Read + Seek>(reader: &mut R) -> io::Result<Option<String>> {
    let start = reader.stream_position()?;
    let mut record = [0u8; FILENAME_LEN];

    let accepted = match reader.read_exact(&mut record) {
        Ok(())                                              => is_filename(&record),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e)                                              => return Err(e),
    };

    if !accepted {
        reader.seek(SeekFrom::Start(start))?;
        return Ok(None);
    }
    let end = record.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    Ok(Some(String::from_utf8_lossy(&record[..end]).into_owned()))
}

/// Read consecutive filename records starting at the current position.
pub fn read_filenames<R: Read + Seek>(reader: &mut R) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    while let Some(name) = try_read_filename(reader)? {
        files.push(name);
    }
    Ok(files)
}

/// Encode one filename as a 16-byte NUL-padded record.
pub fn filename_record(index: usize, name: &str) -> Result<[u8; FILENAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.len() > FILENAME_LEN {
        return Err(McbError::FilenameTooLong { index, len: bytes.len() });
    }
    let mut record = [0u8; FILENAME_LEN];
    record[..bytes.len()].copy_from_slice(bytes);
    if !is_filename(&record) {
        return Err(McbError::InvalidFilename { index, name: name.to_owned() });
    }
    Ok(record)
}

pub fn write_filenames<W: Write>(mut writer: W, files: &[String]) -> Result<()> {
    for (i, name) in files.iter().enumerate() {
        writer.write_all(&filename_record(i, name)?)?;
    }
    Ok(())
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Absolute position of text data, given where the offset table ends.
pub fn text_data_start(offset_table_end: u64, file_count: usize) -> u64 {
    if file_count == 0 {
        offset_table_end
    } else {
        offset_table_end + (FILENAME_LEN * file_count + EXTRA_SIZE) as u64
    }
}

/// Recomputed header fields for a set of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub size:       u16,
    pub text_count: u16,
    pub offsets:    Vec<u16>,
}

impl Layout {
    /// Running-offset layout: for each entry, record the offset, then
    /// advance past its extra (if any) and its codes plus terminator.
    ///
    /// Fails if any text contains the terminator or a field outgrows u16.
    pub fn compute(texts: &[Vec<u16>], file_count: usize, extra_count: usize) -> Result<Self> {
        let has_extras = file_count != 0;

        let mut offsets = Vec::with_capacity(texts.len());
        let mut running = 0usize;
        let mut text_bytes = 0usize;
        for (index, codes) in texts.iter().enumerate() {
            if let Some(position) = codes.iter().position(|&c| c == TERMINATOR) {
                return Err(McbError::TerminatorInText { index, position });
            }
            offsets.push(to_u16("offset", running)?);
            if has_extras {
                running += EXTRA_SIZE;
            }
            let len = (codes.len() + 1) * 2;
            running += len;
            text_bytes += len;
        }

        let size = INNER_HEADER_LEN + 2 + 2
            + texts.len() * 2
            + file_count * FILENAME_LEN
            + text_bytes
            + extra_count * EXTRA_SIZE;

        Ok(Self {
            size:       to_u16("size", size)?,
            text_count: to_u16("text_count", texts.len())?,
            offsets,
        })
    }
}

fn to_u16(field: &'static str, value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| McbError::LayoutOverflow { field, value })
}
