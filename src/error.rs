//! Error taxonomy for loading and saving MCB containers.
//!
//! Every structural variant carries the byte offset and/or field name that
//! was being processed, so a violated format assumption can be located in
//! the input without re-running under a debugger.  Text alphabet problems
//! are never errors: unknown characters and malformed escapes degrade to
//! code 0 (see [`crate::codec`]).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended before a header field could be read.
    #[error("Malformed header: `{field}` at offset {offset} needs {needed} bytes, {available} available")]
    MalformedHeader {
        field:     &'static str,
        offset:    u64,
        needed:    u64,
        available: u64,
    },

    /// The offset table is shorter than the declared text count.
    #[error("Offset table truncated at offset {offset}: text count declares {declared} entries, found {found}")]
    OffsetTableTruncated { declared: u16, found: usize, offset: u64 },

    /// A text entry (or the extra block preceding it) lies outside the stream.
    #[error("Text {index}: offset {offset} is outside the stream ({stream_len} bytes)")]
    OffsetOutOfRange { index: usize, offset: u64, stream_len: u64 },

    /// End of stream reached before the 0xFFFF terminator.
    #[error("Text {index} starting at offset {offset} has no terminator before end of stream")]
    TruncatedText { index: usize, offset: u64 },

    /// The filename table read at load time does not hold one record per text.
    #[error("Filename table at offset {offset} holds {files} records, text count declares {texts}")]
    FilenameTableMismatch { offset: u64, files: usize, texts: usize },

    /// Extras are either absent or index-aligned with texts and filenames.
    #[error("Extras mismatch: {texts} texts, {extras} extra blocks, {files} filenames")]
    ExtrasMismatch { texts: usize, extras: usize, files: usize },

    /// A text holds the terminator value and would be cut short on reload.
    #[error("Text {index} contains the terminator code 0xFFFF at position {position}")]
    TerminatorInText { index: usize, position: usize },

    /// A recomputed layout field does not fit in 16 bits.
    #[error("Layout overflow: `{field}` = {value} does not fit in a 16-bit field")]
    LayoutOverflow { field: &'static str, value: usize },

    #[error("Filename {index} is {len} bytes; the filename table holds at most 16")]
    FilenameTooLong { index: usize, len: usize },

    #[error("Filename {index} ({name:?}) would not be recognised as a filename on reload")]
    InvalidFilename { index: usize, name: String },

    #[error("Invalid hex in `{field}`: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `save()` was called on a container that was never bound to a path.
    #[error("No path bound to this container; use save_as")]
    NoPath,
}

pub type Result<T> = std::result::Result<T, McbError>;
