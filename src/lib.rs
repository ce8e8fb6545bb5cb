pub mod error;
pub mod codec;
pub mod extra;
pub mod header;
pub mod index;
pub mod io_stream;
pub mod archive;
pub mod report;
pub mod export;
pub mod batch;

pub use error::{McbError, Result};
pub use codec::{decode_code, decode_codes, encode_char, encode_text};
pub use extra::{ExtraBlock, MugshotSide, Slot, SlotTriple, TextVerticalPos};
pub use header::McbHeader;
pub use archive::{ContainerState, Entry, McbFile};
