//! Load and save passes over a byte stream.
//!
//! # Reader
//! [`McbReader::new`] reads the header and offset table, then scans the
//! filename table (see [`crate::index`]).  The presence of any filename
//! decides whether the file has extras.  Texts are then read by seeking to
//! `text_data_start + offset` and collecting u16 codes up to the 0xFFFF
//! terminator; each text's extra block sits in the 42 bytes right before it.
//!
//! # Writer
//! [`McbWriter::write`] emits an already recomputed header, the filename
//! table, then for every entry its extra block (if any), its codes and a
//! terminator.  Layout recomputation lives in [`crate::index::Layout`].
//!
//! # Endianness
//! Every integer in the format is a little-endian u16.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

use crate::codec::TERMINATOR;
use crate::error::{McbError, Result};
use crate::extra::{ExtraBlock, EXTRA_SIZE};
use crate::header::{McbHeader, MIN_HEADER_LEN, OUTER_BLOCK_LEN};
use crate::index::{read_filenames, text_data_start, write_filenames};

/// Everything a load pass produces.
#[derive(Debug, Clone, Default)]
pub struct McbContents {
    pub header: McbHeader,
    pub files:  Vec<String>,
    pub texts:  Vec<Vec<u16>>,
    pub extras: Vec<ExtraBlock>,
}

/// Extras are either absent, or one per text with a filename each.
pub fn check_alignment(texts: usize, extras: usize, files: usize) -> Result<()> {
    let aligned = extras == files && (extras == 0 || extras == texts);
    if aligned {
        Ok(())
    } else {
        Err(McbError::ExtrasMismatch { texts, extras, files })
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct McbReader<R: Read + Seek> {
    reader:               R,
    stream_len:           u64,
    pub header:           McbHeader,
    pub files:            Vec<String>,
    pub offset_table_end: u64,
    pub text_data_start:  u64,
}

impl<R: Read + Seek> McbReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let header = McbHeader::read(&mut reader)?;
        let stream_len = reader.seek(SeekFrom::End(0))?;

        let offset_table_end = header_end(&header);
        reader.seek(SeekFrom::Start(offset_table_end))?;
        let files = read_filenames(&mut reader)?;
        if !files.is_empty() && files.len() != header.offsets.len() {
            return Err(McbError::FilenameTableMismatch {
                offset: offset_table_end,
                files:  files.len(),
                texts:  header.offsets.len(),
            });
        }
        let text_data_start = text_data_start(offset_table_end, files.len());

        let body_len = stream_len - if header.is_wrapped() { OUTER_BLOCK_LEN as u64 } else { 0 };
        if u64::from(header.size) != body_len {
            warn!(declared = header.size, actual = body_len, "declared size does not match stream length");
        }
        debug!(files = files.len(), offset_table_end, text_data_start, "filename table read");

        Ok(Self { reader, stream_len, header, files, offset_table_end, text_data_start })
    }

    pub fn has_extras(&self) -> bool {
        !self.files.is_empty()
    }

    /// Absolute offset of text `index`.
    fn text_offset(&self, index: usize) -> Result<u64> {
        let offset = self.text_data_start + u64::from(self.header.offsets[index]);
        if offset > self.stream_len {
            return Err(McbError::OffsetOutOfRange { index, offset, stream_len: self.stream_len });
        }
        Ok(offset)
    }

    /// Codes of text `index`, terminator excluded.
    pub fn read_text(&mut self, index: usize) -> Result<Vec<u16>> {
        let offset = self.text_offset(index)?;
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut codes = Vec::new();
        loop {
            match self.reader.read_u16::<LittleEndian>() {
                Ok(TERMINATOR) => return Ok(codes),
                Ok(code)       => codes.push(code),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(McbError::TruncatedText { index, offset });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Extra block stored immediately before text `index`.
    pub fn read_extra(&mut self, index: usize) -> Result<ExtraBlock> {
        let text = self.text_offset(index)?;
        let offset = text
            .checked_sub(EXTRA_SIZE as u64)
            .filter(|o| o + EXTRA_SIZE as u64 <= self.stream_len)
            .ok_or(McbError::OffsetOutOfRange { index, offset: text, stream_len: self.stream_len })?;

        self.reader.seek(SeekFrom::Start(offset))?;
        let extra = ExtraBlock::read(&mut self.reader)?;
        if extra.has_nonstandard_sentinels() {
            warn!(index, offset, "extra block has non-standard slot sentinels; save will reset them");
        }
        if extra.relocates_on_save() {
            warn!(
                index,
                offset,
                loaded = ?extra.loaded_slot(),
                placed = ?extra.slot(),
                "portrait slot disagrees with text position; save will move it",
            );
        }
        Ok(extra)
    }

    /// Read every text (and extra, when present) in index order.
    pub fn read_all(mut self) -> Result<McbContents> {
        let count = self.header.offsets.len();
        let mut texts = Vec::with_capacity(count);
        let mut extras = Vec::new();

        for i in 0..count {
            texts.push(self.read_text(i)?);
            if self.has_extras() {
                extras.push(self.read_extra(i)?);
            }
        }

        check_alignment(texts.len(), extras.len(), self.files.len())?;
        Ok(McbContents { header: self.header, files: self.files, texts, extras })
    }
}

fn header_end(header: &McbHeader) -> u64 {
    let outer = if header.is_wrapped() { OUTER_BLOCK_LEN } else { 0 };
    (outer + MIN_HEADER_LEN + header.offsets.len() * 2) as u64
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct McbWriter<W: Write> {
    writer: W,
}

impl<W: Write> McbWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize in file order.  `header` must already carry the recomputed
    /// size, count and offsets for these entries.
    pub fn write(
        &mut self,
        header: &McbHeader,
        files:  &[String],
        texts:  &[Vec<u16>],
        extras: &[ExtraBlock],
    ) -> Result<()> {
        check_alignment(texts.len(), extras.len(), files.len())?;

        header.write(&mut self.writer)?;
        write_filenames(&mut self.writer, files)?;

        for (i, codes) in texts.iter().enumerate() {
            if let Some(extra) = extras.get(i) {
                extra.write(&mut self.writer)?;
            }
            for &code in codes {
                self.writer.write_u16::<LittleEndian>(code)?;
            }
            self.writer.write_u16::<LittleEndian>(TERMINATOR)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
