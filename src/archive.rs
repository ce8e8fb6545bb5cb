//! High-level [`McbFile`] API: the in-memory container an editor works on.
//!
//! ```no_run
//! use mcbkit::archive::McbFile;
//!
//! let mut mcb = McbFile::open("ST00_MSG.mcb")?;
//! println!("{}", mcb.text(0).unwrap_or_default());
//! mcb.set_text(0, "Hello,\nX!");
//! mcb.save()?;
//! # Ok::<(), mcbkit::McbError>(())
//! ```
//!
//! The container owns the header fields, the filename table, one code
//! sequence per text and (when the file has extras) one [`ExtraBlock`] per
//! text.  Offsets, size and text count are recomputed on every save; the
//! values loaded from disk are kept only until then.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec::{decode_codes, encode_text};
use crate::error::{McbError, Result};
use crate::extra::ExtraBlock;
use crate::header::{McbHeader, INNER_HEADER_LEN, OUTER_HEADER_LEN};
use crate::index::Layout;
use crate::io_stream::{check_alignment, McbContents, McbReader, McbWriter};

// ── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Constructed empty, nothing loaded.
    Empty,
    /// Freshly loaded; memory matches the source.
    Loaded,
    /// Edited since the last load or save.
    Dirty,
    /// Flushed to a sink; memory matches what was written.
    Saved,
}

// ── Entry view ───────────────────────────────────────────────────────────────

/// Borrowed view of one text entry.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub index:    usize,
    pub codes:    &'a [u16],
    pub extra:    Option<&'a ExtraBlock>,
    pub filename: Option<&'a str>,
}

impl Entry<'_> {
    pub fn text(&self) -> String {
        decode_codes(self.codes)
    }
}

// ── McbFile ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct McbFile {
    header: McbHeader,
    files:  Vec<String>,
    texts:  Vec<Vec<u16>>,
    extras: Vec<ExtraBlock>,
    path:   Option<PathBuf>,
    state:  ContainerState,
}

impl Default for McbFile {
    fn default() -> Self {
        Self::new()
    }
}

impl McbFile {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn new() -> Self {
        Self {
            header: McbHeader::default(),
            files:  Vec::new(),
            texts:  Vec::new(),
            extras: Vec::new(),
            path:   None,
            state:  ContainerState::Empty,
        }
    }

    /// Load from disk and bind the path for [`McbFile::save`].  The file is
    /// read fully and closed before parsing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        let mut mcb = Self::from_bytes(&data)?;
        mcb.path = Some(path.to_owned());
        debug!(path = %path.display(), texts = mcb.texts.len(), "opened");
        Ok(mcb)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let contents = McbReader::new(reader)?.read_all()?;
        Ok(Self::from_contents(contents))
    }

    pub fn from_contents(contents: McbContents) -> Self {
        let McbContents { header, files, texts, extras } = contents;
        Self { header, files, texts, extras, path: None, state: ContainerState::Loaded }
    }

    // ── Save ─────────────────────────────────────────────────────────────────

    /// Recompute size, offsets and text count from the current entries.
    pub fn recalculate(&mut self) -> Result<()> {
        check_alignment(self.texts.len(), self.extras.len(), self.files.len())?;
        let layout = Layout::compute(&self.texts, self.files.len(), self.extras.len())?;
        self.header.size = layout.size;
        self.header.text_count = layout.text_count;
        self.header.offsets = layout.offsets;
        Ok(())
    }

    /// Recompute the layout, then serialize to `writer`.
    pub fn write_to<W: Write>(&mut self, writer: W) -> Result<()> {
        self.recalculate()?;
        McbWriter::new(writer).write(&self.header, &self.files, &self.texts, &self.extras)?;
        self.state = ContainerState::Saved;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Save to the bound path.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(McbError::NoPath)?;
        self.save_as(path)
    }

    /// Save to `path` and bind it.  The output is fully serialized in memory
    /// first, so a layout error never truncates an existing file.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&bytes)?;
        out.flush()?;
        self.path = Some(path.to_owned());
        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }

    /// True when saving would reproduce the loaded header fields exactly.
    pub fn is_canonical(&self) -> bool {
        match Layout::compute(&self.texts, self.files.len(), self.extras.len()) {
            Ok(layout) => {
                layout.size == self.header.size
                    && layout.text_count == self.header.text_count
                    && layout.offsets == self.header.offsets
            }
            Err(_) => false,
        }
    }

    // ── Header ───────────────────────────────────────────────────────────────

    pub fn header(&self) -> &McbHeader {
        &self.header
    }

    pub fn set_inner_header(&mut self, inner: [u8; INNER_HEADER_LEN]) {
        self.header.inner = inner;
        self.touch();
    }

    pub fn set_outer_header(&mut self, outer: Option<[u8; OUTER_HEADER_LEN]>) {
        self.header.outer = outer;
        self.touch();
    }

    // ── Collections ──────────────────────────────────────────────────────────

    pub fn has_extras(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn texts(&self) -> &[Vec<u16>] {
        &self.texts
    }

    pub fn texts_mut(&mut self) -> &mut Vec<Vec<u16>> {
        self.touch();
        &mut self.texts
    }

    pub fn extras(&self) -> &[ExtraBlock] {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Vec<ExtraBlock> {
        self.touch();
        &mut self.extras
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut Vec<String> {
        self.touch();
        &mut self.files
    }

    pub fn entry(&self, index: usize) -> Option<Entry<'_>> {
        let codes = self.texts.get(index)?;
        Some(Entry {
            index,
            codes,
            extra:    self.extras.get(index),
            filename: self.files.get(index).map(String::as_str),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        (0..self.texts.len()).filter_map(move |i| self.entry(i))
    }

    // ── Text editing ─────────────────────────────────────────────────────────

    /// Decoded text of entry `index`.
    pub fn text(&self, index: usize) -> Option<String> {
        self.texts.get(index).map(|codes| decode_codes(codes))
    }

    /// Encode and replace the text of entry `index`.  Returns false if there
    /// is no such entry.
    pub fn set_text(&mut self, index: usize, text: &str) -> bool {
        let codes = encode_text(text);
        match self.texts.get_mut(index) {
            Some(slot) => {
                *slot = codes;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Append an entry.  Files with extras need both an extra block and a
    /// filename; files without extras take neither.
    pub fn push_entry(&mut self, codes: Vec<u16>, extra: Option<(ExtraBlock, String)>) -> Result<()> {
        match extra {
            Some((block, name)) if self.extras.len() == self.texts.len() => {
                self.extras.push(block);
                self.files.push(name);
            }
            None if !self.has_extras() => {}
            extra => {
                let added = usize::from(extra.is_some());
                return Err(McbError::ExtrasMismatch {
                    texts:  self.texts.len() + 1,
                    extras: self.extras.len() + added,
                    files:  self.files.len() + added,
                });
            }
        }
        self.texts.push(codes);
        self.touch();
        Ok(())
    }

    /// Remove entry `index` together with its extra and filename.
    pub fn remove_entry(&mut self, index: usize) -> Option<Vec<u16>> {
        if index >= self.texts.len() {
            return None;
        }
        if index < self.extras.len() {
            self.extras.remove(index);
        }
        if index < self.files.len() {
            self.files.remove(index);
        }
        self.touch();
        Some(self.texts.remove(index))
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path<P: AsRef<Path>>(&mut self, path: P) {
        self.path = Some(path.as_ref().to_owned());
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    fn touch(&mut self) {
        self.state = ContainerState::Dirty;
    }
}
