//! Per-text control block ("extra"): audio, camera, portrait and box
//! placement directives.
//!
//! # On-disk layout (42 bytes, 21 × u16 LE)
//!
//! | Words  | Field |
//! |--------|-------|
//! | 0..4   | voice, bgm, stop_bgm, camera_angle |
//! | 4..16  | 4 slots × (character, mugshot, position) in [`Slot`] order |
//! | 16..21 | close_top, text_position, int18, typing, show_arrow |
//!
//! # Slot selection
//! Exactly one slot carries the portrait triple; the other three hold
//! sentinels (`0xFFFF`, occasionally `0xFFFE`) that compare greater than any
//! real character id.  The active slot is therefore the one whose character
//! id is smallest (first one wins on ties).  Slot order alternates
//! Left/Right inside each Top/Bottom pair, which gives the mugshot side.
//!
//! Writing always rebuilds the slot array from the active triple: the three
//! inactive slots are reset to `0xFFFF`, whatever they held on load.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Size of one extra block on disk.
pub const EXTRA_SIZE: usize = 42;
/// Number of 16-bit words in an extra block.
pub const EXTRA_WORDS: usize = EXTRA_SIZE / 2;
/// "Unset" value for directive fields and inactive slots.
pub const UNSET: u16 = 0xFFFF;
/// Alternate inactive-slot sentinel seen next to a closed top box.
pub const ALT_SENTINEL: u16 = 0xFFFE;

const SLOT_COUNT: usize = 4;
const SLOT_WORDS: usize = SLOT_COUNT * 3;
/// `text_position` raw value meaning "bottom box".
const TEXT_POS_BOTTOM: u16 = 1;

// ── Placement enums ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MugshotSide {
    Left,
    Right,
}

impl MugshotSide {
    pub fn name(self) -> &'static str {
        match self {
            MugshotSide::Left  => "Left",
            MugshotSide::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextVerticalPos {
    Top,
    Bottom,
}

/// The four portrait slots, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [Slot::TopLeft, Slot::TopRight, Slot::BottomLeft, Slot::BottomRight];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_placement(vertical: TextVerticalPos, side: MugshotSide) -> Self {
        match (vertical, side) {
            (TextVerticalPos::Top,    MugshotSide::Left)  => Slot::TopLeft,
            (TextVerticalPos::Top,    MugshotSide::Right) => Slot::TopRight,
            (TextVerticalPos::Bottom, MugshotSide::Left)  => Slot::BottomLeft,
            (TextVerticalPos::Bottom, MugshotSide::Right) => Slot::BottomRight,
        }
    }

    pub fn side(self) -> MugshotSide {
        if self.index() % 2 == 0 { MugshotSide::Left } else { MugshotSide::Right }
    }

    /// Word range of this slot inside the 12-word slot array.
    fn words(self) -> std::ops::Range<usize> {
        let start = self.index() * 3;
        start..start + 3
    }
}

/// Portrait triple stored in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTriple {
    pub character: u16,
    pub mugshot:   u16,
    pub position:  u16,
}

impl SlotTriple {
    pub const UNSET: SlotTriple = SlotTriple { character: UNSET, mugshot: UNSET, position: UNSET };

    fn from_words(words: &[u16]) -> Self {
        Self { character: words[0], mugshot: words[1], position: words[2] }
    }
}

/// Pick the active slot: smallest character id, first slot on ties.
pub fn select_active_slot(raw: &[u16; SLOT_WORDS]) -> Slot {
    let mut best = Slot::TopLeft;
    for slot in Slot::ALL {
        if raw[slot.index() * 3] < raw[best.index() * 3] {
            best = slot;
        }
    }
    best
}

// ── ExtraBlock ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExtraBlock {
    pub voice:         u16,
    pub bgm:           u16,
    pub stop_bgm:      u16,
    pub camera_angle:  u16,
    /// Triple written into the slot chosen by placement on save.
    pub active:        SlotTriple,
    pub mugshot_side:  MugshotSide,
    pub close_top:     u16,
    /// Raw box position word; see [`ExtraBlock::text_vertical_pos`].
    pub text_position: u16,
    /// Always 0xFFFF in shipped files; kept verbatim.
    pub int18:         u16,
    pub typing:        u16,
    pub show_arrow:    u16,
    /// Slot array exactly as loaded (all `UNSET` for a fresh block).
    raw_slots:         [u16; SLOT_WORDS],
}

impl Default for ExtraBlock {
    fn default() -> Self {
        Self {
            voice:         UNSET,
            bgm:           UNSET,
            stop_bgm:      UNSET,
            camera_angle:  UNSET,
            active:        SlotTriple::UNSET,
            mugshot_side:  MugshotSide::Left,
            close_top:     UNSET,
            text_position: UNSET,
            int18:         UNSET,
            typing:        UNSET,
            show_arrow:    UNSET,
            raw_slots:     [UNSET; SLOT_WORDS],
        }
    }
}

/// Blocks are equal when they serialize to the same words; loaded
/// sentinel leftovers in inactive slots do not count.
impl PartialEq for ExtraBlock {
    fn eq(&self, other: &Self) -> bool {
        self.to_words() == other.to_words()
    }
}

impl Eq for ExtraBlock {}

impl ExtraBlock {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let voice        = reader.read_u16::<LittleEndian>()?;
        let bgm          = reader.read_u16::<LittleEndian>()?;
        let stop_bgm     = reader.read_u16::<LittleEndian>()?;
        let camera_angle = reader.read_u16::<LittleEndian>()?;

        let mut raw_slots = [0u16; SLOT_WORDS];
        reader.read_u16_into::<LittleEndian>(&mut raw_slots)?;
        let slot = select_active_slot(&raw_slots);

        Ok(Self {
            voice,
            bgm,
            stop_bgm,
            camera_angle,
            active:        SlotTriple::from_words(&raw_slots[slot.words()]),
            mugshot_side:  slot.side(),
            close_top:     reader.read_u16::<LittleEndian>()?,
            text_position: reader.read_u16::<LittleEndian>()?,
            int18:         reader.read_u16::<LittleEndian>()?,
            typing:        reader.read_u16::<LittleEndian>()?,
            show_arrow:    reader.read_u16::<LittleEndian>()?,
            raw_slots,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for word in self.to_words() {
            writer.write_u16::<LittleEndian>(word)?;
        }
        Ok(())
    }

    /// The 21 words written on save.
    pub fn to_words(&self) -> [u16; EXTRA_WORDS] {
        let mut words = [UNSET; EXTRA_WORDS];
        words[..4].copy_from_slice(&[self.voice, self.bgm, self.stop_bgm, self.camera_angle]);
        words[4..16].copy_from_slice(&self.encoded_slots());
        words[16..].copy_from_slice(&[
            self.close_top,
            self.text_position,
            self.int18,
            self.typing,
            self.show_arrow,
        ]);
        words
    }

    /// Slot array as it will be written: the active triple in the slot
    /// given by the current placement, `UNSET` everywhere else.
    pub fn encoded_slots(&self) -> [u16; SLOT_WORDS] {
        let mut slots = [UNSET; SLOT_WORDS];
        let a = self.active;
        slots[self.slot().words()].copy_from_slice(&[a.character, a.mugshot, a.position]);
        slots
    }

    /// Slot array exactly as loaded.
    pub fn raw_slots(&self) -> &[u16; SLOT_WORDS] {
        &self.raw_slots
    }

    /// Slot the active triple will be written to.
    pub fn slot(&self) -> Slot {
        Slot::from_placement(self.text_vertical_pos(), self.mugshot_side)
    }

    pub fn text_vertical_pos(&self) -> TextVerticalPos {
        if self.text_position == TEXT_POS_BOTTOM {
            TextVerticalPos::Bottom
        } else {
            TextVerticalPos::Top
        }
    }

    pub fn set_text_vertical_pos(&mut self, pos: TextVerticalPos) {
        self.text_position = match pos {
            TextVerticalPos::Bottom => TEXT_POS_BOTTOM,
            TextVerticalPos::Top    => UNSET,
        };
    }

    /// Slot the triple was found in on load.
    pub fn loaded_slot(&self) -> Slot {
        select_active_slot(&self.raw_slots)
    }

    /// True when an inactive slot was loaded holding something other than
    /// `0xFFFF` (typically `0xFFFE`); save resets it.
    pub fn has_nonstandard_sentinels(&self) -> bool {
        let loaded = self.loaded_slot();
        Slot::ALL
            .iter()
            .filter(|&&s| s != loaded)
            .any(|s| self.raw_slots[s.words()].iter().any(|&w| w != UNSET))
    }

    /// True when the current placement puts the triple in a different slot
    /// than the one it was loaded from.
    pub fn relocates_on_save(&self) -> bool {
        self.loaded_slot() != self.slot()
    }

    /// One display cell per field (raw slot words as loaded, then the
    /// mugshot side).  `friendly` renders the position, typing and arrow
    /// words symbolically.
    pub fn to_display_row(&self, friendly: bool) -> Vec<String> {
        let mut cells: Vec<String> = [self.voice, self.bgm, self.stop_bgm, self.camera_angle]
            .iter()
            .chain(self.raw_slots.iter())
            .chain(std::iter::once(&self.close_top))
            .map(|&w| word_cell(w))
            .collect();

        if friendly {
            cells.push(pad(if self.text_position == TEXT_POS_BOTTOM { "Bot" } else { "Top" }));
            cells.push(word_cell(self.int18));
            cells.push(pad(if self.typing == 0 { "Ye" } else { "No" }));
            cells.push(pad(if self.show_arrow == 1 { "Ye" } else { "No" }));
        } else {
            for w in [self.text_position, self.int18, self.typing, self.show_arrow] {
                cells.push(word_cell(w));
            }
        }
        cells.push(pad(self.mugshot_side.name()));
        cells
    }
}

fn word_cell(word: u16) -> String {
    match word {
        UNSET        => pad("__"),
        ALT_SENTINEL => pad("FE"),
        w            => pad(&w.to_string()),
    }
}

fn pad(s: &str) -> String {
    format!("{s:<2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn block_bytes(slots: [u16; 12], text_position: u16) -> Vec<u8> {
        let mut words = vec![10u16, UNSET, UNSET, 2];
        words.extend_from_slice(&slots);
        words.extend_from_slice(&[UNSET, text_position, UNSET, 0, 1]);
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn sentinel_slots_with(slot: Slot, triple: [u16; 3]) -> [u16; 12] {
        let mut slots = [UNSET; 12];
        slots[slot.words()].copy_from_slice(&triple);
        slots
    }

    #[test]
    fn top_right_slot_decodes() {
        let bytes = block_bytes(sentinel_slots_with(Slot::TopRight, [7, 2, 0]), UNSET);
        let extra = ExtraBlock::read(Cursor::new(&bytes)).unwrap();
        assert_eq!(extra.active, SlotTriple { character: 7, mugshot: 2, position: 0 });
        assert_eq!(extra.mugshot_side, MugshotSide::Right);
        assert_eq!(extra.text_vertical_pos(), TextVerticalPos::Top);
        assert_eq!(extra.voice, 10);
        assert_eq!(extra.camera_angle, 2);
        assert_eq!(extra.typing, 0);
        assert_eq!(extra.show_arrow, 1);
    }

    #[test]
    fn vertical_position_comes_from_text_position_word() {
        let bytes = block_bytes(sentinel_slots_with(Slot::TopRight, [7, 2, 0]), 1);
        let extra = ExtraBlock::read(Cursor::new(&bytes)).unwrap();
        assert_eq!(extra.text_vertical_pos(), TextVerticalPos::Bottom);
        // Placement moves the triple to the bottom-right slot on write.
        assert_eq!(extra.slot(), Slot::BottomRight);
        assert_eq!(&extra.encoded_slots()[9..12], &[7, 2, 0]);
        assert!(extra.encoded_slots()[..9].iter().all(|&w| w == UNSET));
        assert!(extra.relocates_on_save());
        assert!(!extra.has_nonstandard_sentinels());
    }

    #[test]
    fn write_matches_read_for_standard_block() {
        let bytes = block_bytes(sentinel_slots_with(Slot::BottomLeft, [3, 1, 0]), 1);
        let extra = ExtraBlock::read(Cursor::new(&bytes)).unwrap();
        let mut out = Vec::new();
        extra.write(&mut out).unwrap();
        assert_eq!(out, bytes);
        assert!(!extra.has_nonstandard_sentinels());
        assert!(!extra.relocates_on_save());
    }

    #[test]
    fn fe_sentinel_is_reset_on_write() {
        let mut slots = sentinel_slots_with(Slot::TopLeft, [4, 0, 0]);
        slots[3] = ALT_SENTINEL;
        let bytes = block_bytes(slots, UNSET);
        let extra = ExtraBlock::read(Cursor::new(&bytes)).unwrap();
        assert_eq!(extra.active.character, 4);
        assert!(extra.has_nonstandard_sentinels());
        assert_eq!(extra.raw_slots()[3], ALT_SENTINEL);
        assert_eq!(extra.encoded_slots()[3], UNSET);
        assert!(!extra.relocates_on_save());
    }

    #[test]
    fn ties_pick_first_slot() {
        let slots = [5, 1, 0, 5, 2, 0, UNSET, UNSET, UNSET, UNSET, UNSET, UNSET];
        assert_eq!(select_active_slot(&slots), Slot::TopLeft);
    }

    #[test]
    fn truncated_block_is_io_error() {
        let bytes = vec![0u8; EXTRA_SIZE - 1];
        assert!(ExtraBlock::read(Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn display_row_cells() {
        let mut slots = sentinel_slots_with(Slot::BottomRight, [7, 2, 0]);
        slots[0] = ALT_SENTINEL;
        let extra = ExtraBlock::read(Cursor::new(block_bytes(slots, 1))).unwrap();

        let plain = extra.to_display_row(false);
        assert_eq!(plain.len(), 22);
        assert_eq!(plain[0], "10");
        assert_eq!(plain[1], "__");
        assert_eq!(plain[3], "2 ");
        assert_eq!(plain[4], "FE");
        assert_eq!(plain[13], "7 ");
        assert_eq!(plain[17], "1 ");
        assert_eq!(plain[21], "Right");

        let friendly = extra.to_display_row(true);
        assert_eq!(friendly[17], "Bot");
        assert_eq!(friendly[19], "Ye");
        assert_eq!(friendly[20], "Ye");
    }

    #[test]
    fn default_block_is_unset_top_left() {
        let extra = ExtraBlock::default();
        assert_eq!(extra.slot(), Slot::TopLeft);
        assert_eq!(extra.to_words(), [UNSET; EXTRA_WORDS]);
    }

    proptest! {
        #[test]
        fn selected_slot_survives_write(
            slot_idx in 0usize..4,
            character in 0u16..0xFFFE,
            mugshot in any::<u16>(),
            position in any::<u16>(),
            bottom in any::<bool>(),
        ) {
            let slot = Slot::ALL[slot_idx];
            let raw = sentinel_slots_with(slot, [character, mugshot, position]);
            prop_assert_eq!(select_active_slot(&raw), slot);

            let text_position = if bottom { 1 } else { UNSET };
            let extra = ExtraBlock::read(Cursor::new(block_bytes(raw, text_position))).unwrap();
            prop_assert_eq!(extra.mugshot_side, slot.side());

            let target = Slot::from_placement(extra.text_vertical_pos(), slot.side());
            let encoded = extra.encoded_slots();
            prop_assert_eq!(&encoded[target.words()], &[character, mugshot, position][..]);
            for other in Slot::ALL.iter().filter(|s| **s != target) {
                prop_assert!(encoded[other.words()].iter().all(|&w| w == UNSET));
            }
        }
    }
}
