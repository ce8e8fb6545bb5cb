//! Human-readable inspection output.
//!
//! # Dump
//! One line per text entry.  Files with extras print every extra field
//! (slot words as loaded), the decoded text with newlines flattened to
//! spaces and the entry's filename, separated by `|||`:
//!
//! ```text
//! IDX,VOI,BG,SM,CA,C1,M1,P1,...,AR,MugPos|||Text Message Goes Here***|||Filename
//! 0  ,12,__,__,__,3 ,1 ,0 ,__,...,1 ,Left |||Hello|||ST00_VOICE_000
//! ```
//!
//! The dump is for reading, not for parsing back.
//!
//! # Summary
//! [`Summary`] collects the header facts the `info` command prints.

use std::io::{self, Write};

use crate::archive::McbFile;
use crate::codec::{decode_codes, NEWLINE_CODE};
use crate::error::Result;
use crate::index::Layout;

const EXTRAS_HEADING: &str = "IDX,VOI,BG,SM,CA,C1,M1,P1,C2,M2,P2,C3,M3,P3,C4,M4,P4,CT,TP,18,TY,AR,MugPos\
                              |||Text Message Goes Here***|||Filename";
const PLAIN_HEADING: &str = "IDX|||Text";

/// Dump formatting switches.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Render position, typing and arrow words as `Top`/`Bot`, `Ye`/`No`.
    pub friendly:  bool,
    /// Print a `=== MCB Path:` line first.
    pub show_path: bool,
}

/// Decoded text on a single line.
fn flat_text(codes: &[u16]) -> String {
    if codes.contains(&NEWLINE_CODE) {
        decode_codes(codes).replace('\n', " ")
    } else {
        decode_codes(codes)
    }
}

pub fn write_dump<W: Write>(mcb: &McbFile, opts: &DumpOptions, mut out: W) -> io::Result<()> {
    if opts.show_path {
        let path = mcb.path().map(|p| p.display().to_string()).unwrap_or_default();
        writeln!(out, "=== MCB Path: {path}")?;
    }

    if mcb.has_extras() {
        writeln!(out, "{EXTRAS_HEADING}")?;
    } else {
        writeln!(out, "{PLAIN_HEADING}")?;
    }

    for entry in mcb.entries() {
        let idx = format!("{:<3}", entry.index);
        let text = flat_text(entry.codes);
        match entry.extra {
            Some(extra) => writeln!(
                out,
                "{idx},{}|||{text}|||{}",
                extra.to_display_row(opts.friendly).join(","),
                entry.filename.unwrap_or_default(),
            )?,
            None => writeln!(out, "{idx}|||{text}")?,
        }
    }
    Ok(())
}

pub fn dump_string(mcb: &McbFile, opts: &DumpOptions) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_dump(mcb, opts, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Summary {
    pub wrapped:        bool,
    pub outer_header:   Option<String>,
    pub header:         String,
    pub header_hex:     String,
    pub declared_size:  u16,
    /// `None` when the current entries cannot be laid out.
    pub computed_size:  Option<u16>,
    pub byte_len:       usize,
    pub text_count:     usize,
    pub file_count:     usize,
    pub crc32:          u32,
    pub canonical:      bool,
    /// Extra blocks whose inactive slots will be reset on save.
    pub reset_on_save:  usize,
    /// Extra blocks whose portrait triple will move to another slot on save.
    pub relocated_on_save: usize,
}

impl Summary {
    /// Parse `data` and summarize it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mcb = McbFile::from_bytes(data)?;
        Ok(Self::new(&mcb, data))
    }

    pub fn new(mcb: &McbFile, data: &[u8]) -> Self {
        let header = mcb.header();
        let computed_size = Layout::compute(mcb.texts(), mcb.files().len(), mcb.extras().len())
            .ok()
            .map(|l| l.size);
        Self {
            wrapped:       header.is_wrapped(),
            outer_header:  header.outer_str(),
            header:        header.inner_str(),
            header_hex:    hex::encode(header.inner),
            declared_size: header.size,
            computed_size,
            byte_len:      data.len(),
            text_count:    mcb.len(),
            file_count:    mcb.files().len(),
            crc32:         crc32fast::hash(data),
            canonical:     mcb.is_canonical(),
            reset_on_save: mcb.extras().iter().filter(|e| e.has_nonstandard_sentinels()).count(),
            relocated_on_save: mcb.extras().iter().filter(|e| e.relocates_on_save()).count(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} texts, {} filenames, {} bytes (declared {}, canonical: {}), crc32 {:08x}",
            self.text_count,
            self.file_count,
            self.byte_len,
            self.declared_size,
            self.canonical,
            self.crc32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_text;
    use crate::extra::{ExtraBlock, SlotTriple};

    fn plain() -> McbFile {
        let mut mcb = McbFile::new();
        mcb.push_entry(encode_text("Hello\nthere"), None).unwrap();
        mcb.push_entry(encode_text("[4000]"), None).unwrap();
        mcb
    }

    #[test]
    fn plain_dump() {
        let dump = dump_string(&plain(), &DumpOptions::default());
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines, vec!["IDX|||Text", "0  |||Hello there", "1  |||[4000]"]);
    }

    #[test]
    fn extras_dump() {
        let mut mcb = McbFile::new();
        let mut extra = ExtraBlock::default();
        extra.voice = 12;
        extra.active = SlotTriple { character: 3, mugshot: 1, position: 0 };
        mcb.push_entry(encode_text("Hi"), Some((extra, "ST00_VOICE_000".into()))).unwrap();
        // Reload so the slot words are the ones on disk.
        let mcb = McbFile::from_bytes(&mcb.to_bytes().unwrap()).unwrap();

        let dump = dump_string(&mcb, &DumpOptions { friendly: true, show_path: true });
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "=== MCB Path: ");
        assert_eq!(lines[1], EXTRAS_HEADING);
        assert!(lines[2].starts_with("0  ,12,__,__,__,3 ,1 ,0 ,__,"));
        assert!(lines[2].ends_with(",Top,__,No,No,Left|||Hi|||ST00_VOICE_000"));
    }

    #[test]
    fn summary_of_canonical_file() {
        let mut mcb = plain();
        let data = mcb.to_bytes().unwrap();
        let s = Summary::from_bytes(&data).unwrap();
        assert!(s.canonical);
        assert!(!s.wrapped);
        assert_eq!(s.text_count, 2);
        assert_eq!(s.declared_size as usize, data.len());
        assert_eq!(s.computed_size, Some(s.declared_size));
        assert_eq!(s.crc32, crc32fast::hash(&data));
        assert_eq!(s.header_hex, "0".repeat(32));
        assert!(s.summary().starts_with("2 texts, 0 filenames"));
    }
}
