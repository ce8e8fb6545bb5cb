//! JSON export/import of the editable model.
//!
//! The document keeps headers as hex (they are not guaranteed to be text)
//! and every entry as decoded text plus its raw codes.  On import the codes
//! win when present, so an export/import cycle is lossless; hand-written
//! documents can omit them and let the text be encoded.

use serde::{Deserialize, Serialize};

use crate::archive::McbFile;
use crate::codec::{decode_codes, encode_text};
use crate::error::{McbError, Result};
use crate::extra::{ExtraBlock, MugshotSide, SlotTriple};
use crate::header::{INNER_HEADER_LEN, OUTER_HEADER_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRecord {
    pub voice:         u16,
    pub bgm:           u16,
    pub stop_bgm:      u16,
    pub camera_angle:  u16,
    pub character:     u16,
    pub mugshot:       u16,
    pub position:      u16,
    pub mugshot_side:  MugshotSide,
    pub close_top:     u16,
    pub text_position: u16,
    pub int18:         u16,
    pub typing:        u16,
    pub show_arrow:    u16,
}

impl From<&ExtraBlock> for ExtraRecord {
    fn from(e: &ExtraBlock) -> Self {
        ExtraRecord {
            voice:         e.voice,
            bgm:           e.bgm,
            stop_bgm:      e.stop_bgm,
            camera_angle:  e.camera_angle,
            character:     e.active.character,
            mugshot:       e.active.mugshot,
            position:      e.active.position,
            mugshot_side:  e.mugshot_side,
            close_top:     e.close_top,
            text_position: e.text_position,
            int18:         e.int18,
            typing:        e.typing,
            show_arrow:    e.show_arrow,
        }
    }
}

impl From<&ExtraRecord> for ExtraBlock {
    fn from(r: &ExtraRecord) -> Self {
        let mut e = ExtraBlock::default();
        e.voice = r.voice;
        e.bgm = r.bgm;
        e.stop_bgm = r.stop_bgm;
        e.camera_angle = r.camera_angle;
        e.active = SlotTriple { character: r.character, mugshot: r.mugshot, position: r.position };
        e.mugshot_side = r.mugshot_side;
        e.close_top = r.close_top;
        e.text_position = r.text_position;
        e.int18 = r.int18;
        e.typing = r.typing;
        e.show_arrow = r.show_arrow;
        e
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub index:    usize,
    pub text:     String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes:    Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra:    Option<ExtraRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McbDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_header: Option<String>,
    pub header:       String,
    pub entries:      Vec<EntryRecord>,
}

impl McbDocument {
    pub fn from_mcb(mcb: &McbFile) -> Self {
        let header = mcb.header();
        let entries = mcb
            .entries()
            .map(|e| EntryRecord {
                index:    e.index,
                text:     decode_codes(e.codes),
                codes:    Some(e.codes.to_vec()),
                filename: e.filename.map(str::to_owned),
                extra:    e.extra.map(ExtraRecord::from),
            })
            .collect();
        McbDocument {
            outer_header: header.outer.map(hex::encode),
            header:       hex::encode(header.inner),
            entries,
        }
    }

    /// Build a container.  Entries are taken in document order; `index`
    /// is informational.
    pub fn to_mcb(&self) -> Result<McbFile> {
        let mut mcb = McbFile::new();
        mcb.set_inner_header(decode_hex::<INNER_HEADER_LEN>("header", &self.header)?);
        if let Some(outer) = &self.outer_header {
            mcb.set_outer_header(Some(decode_hex::<OUTER_HEADER_LEN>("outer_header", outer)?));
        }

        for entry in &self.entries {
            let codes = match &entry.codes {
                Some(codes) => codes.clone(),
                None        => encode_text(&entry.text),
            };
            let extra = match (&entry.extra, &entry.filename) {
                (Some(extra), Some(name)) => Some((ExtraBlock::from(extra), name.clone())),
                (None, None)              => None,
                (extra, name) => {
                    return Err(McbError::ExtrasMismatch {
                        texts:  self.entries.len(),
                        extras: usize::from(extra.is_some()),
                        files:  usize::from(name.is_some()),
                    });
                }
            };
            mcb.push_entry(codes, extra)?;
        }
        Ok(mcb)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Decode a hex header, right-padding short values with NULs.
fn decode_hex<const N: usize>(field: &'static str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|e| McbError::InvalidHex { field, reason: e.to_string() })?;
    if bytes.len() > N {
        return Err(McbError::InvalidHex {
            field,
            reason: format!("{} bytes, at most {N} allowed", bytes.len()),
        });
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::TextVerticalPos;

    fn sample() -> McbFile {
        let mut mcb = McbFile::new();
        let mut inner = [0u8; INNER_HEADER_LEN];
        inner[..4].copy_from_slice(b"MCB0");
        mcb.set_inner_header(inner);
        mcb.set_outer_header(Some(*b"OMCB\0\0\0\0"));

        let mut extra = ExtraBlock::default();
        extra.active = SlotTriple { character: 2, mugshot: 5, position: 1 };
        extra.mugshot_side = MugshotSide::Right;
        extra.set_text_vertical_pos(TextVerticalPos::Bottom);
        mcb.push_entry(encode_text("Zero![300]"), Some((extra, "ST01_TALK_0001".into()))).unwrap();
        mcb
    }

    #[test]
    fn export_import_is_lossless() {
        let mut mcb = sample();
        let doc = McbDocument::from_mcb(&mcb);
        assert_eq!(doc.header, format!("4d434230{}", "0".repeat(24)));
        assert_eq!(doc.entries[0].text, "Zero![300]");

        let json = doc.to_bytes().unwrap();
        let back = McbDocument::from_bytes(&json).unwrap().to_mcb().unwrap();
        assert_eq!(back.clone().to_bytes().unwrap(), mcb.to_bytes().unwrap());
        assert_eq!(back.extras()[0].text_vertical_pos(), TextVerticalPos::Bottom);
    }

    #[test]
    fn text_is_encoded_when_codes_are_missing() {
        let json = br#"{ "header": "4d434230", "entries": [ { "index": 0, "text": "Hi\nX" } ] }"#;
        let mcb = McbDocument::from_bytes(json).unwrap().to_mcb().unwrap();
        assert_eq!(mcb.texts()[0], encode_text("Hi\nX"));
        assert!(!mcb.has_extras());
        assert_eq!(&mcb.header().inner[..4], b"MCB0");
    }

    #[test]
    fn extra_without_filename_is_rejected() {
        let mut doc = McbDocument::from_mcb(&sample());
        doc.entries[0].filename = None;
        assert!(matches!(doc.to_mcb(), Err(McbError::ExtrasMismatch { .. })));
    }

    #[test]
    fn bad_hex_is_rejected() {
        let doc = McbDocument { outer_header: None, header: "zz".into(), entries: Vec::new() };
        assert!(matches!(doc.to_mcb(), Err(McbError::InvalidHex { field: "header", .. })));
        let doc = McbDocument { outer_header: None, header: "00".repeat(17), entries: Vec::new() };
        assert!(doc.to_mcb().is_err());
    }
}
