//! Text codec: the game's custom alphabet <-> 16-bit character codes.
//!
//! # Code space
//! Codes `0..ALPHABET.len()` index [`ALPHABET`] directly.  Code
//! [`NEWLINE_CODE`] (65533) is a line break.  Every other code has no glyph
//! in the table and is rendered as a bracketed decimal escape, e.g. `[312]`,
//! which [`encode_text`] parses back to the same code.  Code [`TERMINATOR`]
//! (65535) ends a text entry on disk and never appears inside a stored
//! code sequence.
//!
//! # Lossy fallback
//! Encoding never fails.  A character missing from the alphabet and an
//! escape span that is not a decimal `u16` both encode as code 0.

/// Line break inside a text entry.
pub const NEWLINE_CODE: u16 = 65533;
/// End-of-text marker written after every entry's codes.
pub const TERMINATOR:   u16 = 0xFFFF;

const ESCAPE_OPEN:  char = '[';
const ESCAPE_CLOSE: char = ']';

/// Glyph table, indexed by character code.
///
/// Escape brackets are absent: `[` and `]` can only ever be
/// produced by an escape, so decoded text always re-encodes to the same codes.
pub const ALPHABET: &[char] = &[
    ' ', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    '.', ',', '!', '?', '\'', '"', '-', ':', ';', '/', '&', '(', ')',
    '%', '+', '*', '#', '~', '=', '<', '>', '_', '@', '$', '…', '♪',
    '★', '☆', '●', '○', '■', '□', '▲', '△', '▼', '▽', '→', '←', '↑',
    '↓', '×', '・', '「', '」', '『', '』', '“', '”', '‘', '’',
];

/// Render one code as text: its glyph, a newline, or a `[code]` escape.
pub fn decode_code(code: u16) -> String {
    let mut out = String::new();
    push_decoded(&mut out, code);
    out
}

/// Render a whole code sequence.
pub fn decode_codes(codes: &[u16]) -> String {
    let mut out = String::with_capacity(codes.len());
    for &code in codes {
        push_decoded(&mut out, code);
    }
    out
}

fn push_decoded(out: &mut String, code: u16) {
    if code == NEWLINE_CODE {
        out.push('\n');
    } else if let Some(&ch) = ALPHABET.get(code as usize) {
        out.push(ch);
    } else {
        out.push(ESCAPE_OPEN);
        out.push_str(&code.to_string());
        out.push(ESCAPE_CLOSE);
    }
}

/// Alphabet index of `ch`, or 0 when the alphabet has no such glyph.
pub fn encode_char(ch: char) -> u16 {
    ALPHABET.iter().position(|&c| c == ch).unwrap_or(0) as u16
}

/// Encode text to codes.  Never returns an empty vector: an empty input
/// yields `[0]`, since every entry on disk needs at least one code before
/// its terminator.
///
/// Newlines are first rewritten to the `[65533]` escape, then `[...]`
/// spans are parsed as decimal codes (anything unparsable becomes 0).  A
/// newline inside an open span therefore becomes part of that span.  An
/// escape left open at the end of the input is dropped.
pub fn encode_text(text: &str) -> Vec<u16> {
    let text = text.replace('\n', &format!("{ESCAPE_OPEN}{NEWLINE_CODE}{ESCAPE_CLOSE}"));
    let mut codes = Vec::with_capacity(text.len());
    let mut escape: Option<String> = None;

    for ch in text.chars() {
        match escape.as_mut() {
            Some(span) => {
                if ch == ESCAPE_CLOSE {
                    codes.push(parse_escape(span));
                    escape = None;
                } else {
                    span.push(ch);
                }
            }
            None => match ch {
                ESCAPE_OPEN => escape = Some(String::new()),
                _           => codes.push(encode_char(ch)),
            },
        }
    }

    if codes.is_empty() {
        codes.push(0);
    }
    codes
}

fn parse_escape(span: &str) -> u16 {
    span.trim().parse::<u16>().unwrap_or(0)
}

/// True when every code has a glyph (or is a newline), i.e. the decoded
/// text contains no `[code]` escapes.
pub fn is_escape_free(codes: &[u16]) -> bool {
    codes
        .iter()
        .all(|&c| c == NEWLINE_CODE || (c as usize) < ALPHABET.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn alphabet_has_no_duplicates_or_escape_brackets() {
        for (i, a) in ALPHABET.iter().enumerate() {
            assert!(*a != ESCAPE_OPEN && *a != ESCAPE_CLOSE && *a != '\n');
            for b in &ALPHABET[i + 1..] {
                assert_ne!(a, b, "duplicate glyph {a:?}");
            }
        }
        assert!(ALPHABET.len() < NEWLINE_CODE as usize);
    }

    #[test]
    fn decode_known_newline_and_escape() {
        assert_eq!(decode_code(0), " ");
        assert_eq!(decode_code(11), "A");
        assert_eq!(decode_code(NEWLINE_CODE), "\n");
        assert_eq!(decode_code(4000), "[4000]");
        assert_eq!(decode_code(TERMINATOR), "[65535]");
        assert_eq!(decode_codes(&[11, 0, NEWLINE_CODE, 4000]), "A \n[4000]");
    }

    #[test]
    fn encode_empty_is_single_zero() {
        assert_eq!(encode_text(""), vec![0]);
    }

    #[test]
    fn encode_escapes() {
        assert_eq!(encode_text("A[4000]B"), vec![11, 4000, 12]);
        assert_eq!(encode_text("[abc]"), vec![0]);
        assert_eq!(encode_text("[70000]"), vec![0]);
        assert_eq!(encode_text("[ 12 ]"), vec![12]);
        assert_eq!(encode_text("A\nB"), vec![11, NEWLINE_CODE, 12]);
        assert_eq!(encode_text("A[65533]B"), vec![11, NEWLINE_CODE, 12]);
    }

    #[test]
    fn newline_inside_escape_joins_the_span() {
        // "[1[65533]2]": the span "1[65533" is not a number, then "2" and a stray "]".
        assert_eq!(encode_text("[1\n2]"), vec![0, 3, 0]);
        assert_eq!(encode_text("[\n]"), vec![0, 0]);
    }

    #[test]
    fn unterminated_escape_is_dropped() {
        assert_eq!(encode_text("AB[12"), vec![11, 12]);
        assert_eq!(encode_text("[12"), vec![0]);
    }

    #[test]
    fn unknown_char_falls_back_to_zero() {
        assert_eq!(encode_char('\u{1F600}'), 0);
        assert_eq!(encode_text("A\tB"), vec![11, 0, 12]);
    }

    #[test]
    fn escape_free_check() {
        assert!(is_escape_free(&[0, 11, NEWLINE_CODE]));
        assert!(!is_escape_free(&[0, 4000]));
    }

    fn alphabet_text() -> impl Strategy<Value = String> {
        let glyphs: Vec<char> = ALPHABET.iter().copied().chain(std::iter::once('\n')).collect();
        proptest::collection::vec(proptest::sample::select(glyphs), 1..64)
            .prop_map(|v| v.into_iter().collect())
    }

    proptest! {
        #[test]
        fn text_roundtrip(s in alphabet_text()) {
            prop_assert_eq!(decode_codes(&encode_text(&s)), s);
        }

        #[test]
        fn codes_roundtrip(codes in proptest::collection::vec(0u16..0xFFFF, 1..64)) {
            prop_assert_eq!(encode_text(&decode_codes(&codes)), codes);
        }
    }
}
