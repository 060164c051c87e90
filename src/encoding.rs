//! Character encoding support for MARC records.
//!
//! MARC records can use different character encodings:
//! - **MARC-8** (legacy) — ANSEL-based mixed character sets
//! - **UTF-8** (modern) — Unicode standard encoding
//! - **ISO-8859-1** — occasionally found in records exported by non-library
//!   systems
//!
//! The encoding is indicated in position 9 of the MARC leader: space means
//! MARC-8, `'a'` means UCS/Unicode. Records in the wild frequently lie about
//! this, so [`best_guess`] decodes a sample both ways and keeps whichever
//! produced fewer replacement characters.
//!
//! The MARC-8 decoder here covers the ANSEL single-byte repertoire: the
//! special character block (0xA1–0xC8) and the combining diacritics
//! (0xE0–0xFF), which ANSEL stores *before* the base letter and Unicode
//! stores after. ISO 2022 escape sequences that switch to other graphic sets
//! are skipped; bytes with no mapping decode to U+FFFD and are counted in
//! [`Conversion::failed`].

use crate::error::{MarcError, Result};

const ESCAPE: u8 = 0x1B;
const REPLACEMENT: char = '\u{FFFD}';

/// Character encoding for MARC field data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarcEncoding {
    /// MARC-8 / ANSEL encoding (legacy)
    Marc8,
    /// UTF-8 encoding (modern standard)
    Utf8,
    /// Latin-1, for records exported by non-MARC systems
    Iso8859_1,
    /// Decode a sample both ways and keep the better result
    BestGuess,
}

impl MarcEncoding {
    /// Resolve an encoding name as used in reader configuration.
    ///
    /// Known names: `"MARC8"`, `"UTF-8"` (or `"UTF8"`), `"ISO-8859-1"`,
    /// `"BESTGUESS"`; case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::EncodingError` for an unknown name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MARC8" | "MARC-8" => Ok(MarcEncoding::Marc8),
            "UTF8" | "UTF-8" => Ok(MarcEncoding::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" => Ok(MarcEncoding::Iso8859_1),
            "BESTGUESS" => Ok(MarcEncoding::BestGuess),
            _ => Err(MarcError::EncodingError(format!(
                "Unknown encoding name: {name}"
            ))),
        }
    }

    /// Detect encoding from position 9 of the leader.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::EncodingError` if the character is not a valid
    /// coding-scheme indicator.
    pub fn from_leader_char(c: char) -> Result<Self> {
        match c {
            ' ' => Ok(MarcEncoding::Marc8),
            'a' => Ok(MarcEncoding::Utf8),
            _ => Err(MarcError::EncodingError(format!(
                "Unknown character coding scheme: {c}"
            ))),
        }
    }

    /// The leader character declaring this encoding.
    #[must_use]
    pub fn as_leader_char(&self) -> char {
        match self {
            MarcEncoding::Utf8 => 'a',
            _ => ' ',
        }
    }
}

impl std::fmt::Display for MarcEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MarcEncoding::Marc8 => "MARC8",
            MarcEncoding::Utf8 => "UTF-8",
            MarcEncoding::Iso8859_1 => "ISO-8859-1",
            MarcEncoding::BestGuess => "BESTGUESS",
        };
        write!(f, "{name}")
    }
}

/// Result of decoding a byte slice: the text plus the count of bytes that
/// could not be converted and became replacement characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Decoded text.
    pub text: String,
    /// Number of input bytes that failed to convert.
    pub failed: usize,
}

/// Decode `bytes` using the given encoding.
///
/// [`MarcEncoding::BestGuess`] delegates to [`best_guess`] and discards the
/// guessed encoding; callers that need to know which decoder won should call
/// [`best_guess`] directly.
#[must_use]
pub fn convert(bytes: &[u8], encoding: MarcEncoding) -> Conversion {
    match encoding {
        MarcEncoding::Utf8 => convert_utf8(bytes),
        MarcEncoding::Marc8 => convert_marc8(bytes),
        MarcEncoding::Iso8859_1 => Conversion {
            text: bytes.iter().map(|&b| b as char).collect(),
            failed: 0,
        },
        MarcEncoding::BestGuess => best_guess(bytes).1,
    }
}

/// Decode `bytes` as both UTF-8 and MARC-8 and keep the result with fewer
/// replacement characters, returning the winning encoding.
///
/// Ties go to UTF-8: a clean ASCII sample decodes identically either way,
/// and modern data is overwhelmingly UTF-8.
#[must_use]
pub fn best_guess(bytes: &[u8]) -> (MarcEncoding, Conversion) {
    let utf8 = convert_utf8(bytes);
    if utf8.failed == 0 {
        return (MarcEncoding::Utf8, utf8);
    }
    let marc8 = convert_marc8(bytes);
    if marc8.failed < utf8.failed {
        (MarcEncoding::Marc8, marc8)
    } else {
        (MarcEncoding::Utf8, utf8)
    }
}

fn convert_utf8(bytes: &[u8]) -> Conversion {
    match std::str::from_utf8(bytes) {
        Ok(s) => Conversion {
            text: s.to_string(),
            failed: 0,
        },
        Err(_) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            let failed = text.chars().filter(|&c| c == REPLACEMENT).count();
            Conversion { text, failed }
        },
    }
}

/// ANSEL decode. Diacritics precede their base letter in the input and are
/// re-emitted as combining marks after it.
fn convert_marc8(bytes: &[u8]) -> Conversion {
    let mut text = String::with_capacity(bytes.len());
    let mut failed = 0usize;
    let mut pending_combining: Vec<char> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];

        if byte == ESCAPE {
            i += escape_len(&bytes[i..]);
            continue;
        }

        if let Some(mark) = ansel_combining(byte) {
            pending_combining.push(mark);
            i += 1;
            continue;
        }

        let decoded = if byte < 0x80 {
            Some(byte as char)
        } else {
            ansel_special(byte)
        };

        match decoded {
            Some(c) => {
                text.push(c);
                // Combining marks follow the base character in Unicode.
                for mark in pending_combining.drain(..) {
                    text.push(mark);
                }
            },
            None => {
                text.push(REPLACEMENT);
                failed += 1;
                pending_combining.clear();
            },
        }
        i += 1;
    }

    // Diacritics with no following base character.
    failed += pending_combining.len();
    for _ in pending_combining.drain(..) {
        text.push(REPLACEMENT);
    }

    Conversion { text, failed }
}

/// Length of the ISO 2022 escape sequence starting at `bytes[0]`.
fn escape_len(bytes: &[u8]) -> usize {
    match bytes.get(1) {
        // ESC ( ) , - $ : set designation, intermediate + final byte
        Some(0x28 | 0x29 | 0x2C | 0x2D) => 3.min(bytes.len()),
        Some(0x24) => match bytes.get(2) {
            Some(0x29 | 0x2C | 0x2D) => 4.min(bytes.len()),
            _ => 3.min(bytes.len()),
        },
        // ESC s/g/b/p : single-character MARC-8 set switches
        Some(_) => 2,
        None => 1,
    }
}

/// ANSEL special character block, 0xA1–0xC8.
fn ansel_special(byte: u8) -> Option<char> {
    let c = match byte {
        0xA1 => '\u{0141}', // L with stroke
        0xA2 => '\u{00D8}', // O with stroke
        0xA3 => '\u{0110}', // D with stroke
        0xA4 => '\u{00DE}', // thorn
        0xA5 => '\u{00C6}', // AE
        0xA6 => '\u{0152}', // OE
        0xA7 => '\u{02B9}', // prime / soft sign
        0xA8 => '\u{00B7}', // middle dot
        0xA9 => '\u{266D}', // music flat
        0xAA => '\u{00AE}', // registered
        0xAB => '\u{00B1}', // plus-minus
        0xAC => '\u{01A0}', // O with horn
        0xAD => '\u{01AF}', // U with horn
        0xAE => '\u{02BC}', // alif
        0xB0 => '\u{02BB}', // ayn
        0xB1 => '\u{0142}', // l with stroke
        0xB2 => '\u{00F8}', // o with stroke
        0xB3 => '\u{0111}', // d with stroke
        0xB4 => '\u{00FE}', // thorn
        0xB5 => '\u{00E6}', // ae
        0xB6 => '\u{0153}', // oe
        0xB7 => '\u{02BA}', // double prime / hard sign
        0xB8 => '\u{0131}', // dotless i
        0xB9 => '\u{00A3}', // pound
        0xBA => '\u{00F0}', // eth
        0xBC => '\u{01A1}', // o with horn
        0xBD => '\u{01B0}', // u with horn
        0xC0 => '\u{00B0}', // degree
        0xC1 => '\u{2113}', // script l
        0xC2 => '\u{2117}', // sound recording copyright
        0xC3 => '\u{00A9}', // copyright
        0xC4 => '\u{266F}', // music sharp
        0xC5 => '\u{00BF}', // inverted question mark
        0xC6 => '\u{00A1}', // inverted exclamation mark
        0xC7 => '\u{00DF}', // sharp s
        0xC8 => '\u{20AC}', // euro
        _ => return None,
    };
    Some(c)
}

/// ANSEL combining diacritics, 0xE0–0xFE, as Unicode combining marks.
fn ansel_combining(byte: u8) -> Option<char> {
    let c = match byte {
        0xE0 => '\u{0309}', // hook above
        0xE1 => '\u{0300}', // grave
        0xE2 => '\u{0301}', // acute
        0xE3 => '\u{0302}', // circumflex
        0xE4 => '\u{0303}', // tilde
        0xE5 => '\u{0304}', // macron
        0xE6 => '\u{0306}', // breve
        0xE7 => '\u{0307}', // dot above
        0xE8 => '\u{0308}', // diaeresis
        0xE9 => '\u{030C}', // caron
        0xEA => '\u{030A}', // ring above
        0xEB => '\u{FE20}', // ligature left half
        0xEC => '\u{FE21}', // ligature right half
        0xED => '\u{0315}', // comma above right
        0xEE => '\u{030B}', // double acute
        0xEF => '\u{0310}', // candrabindu
        0xF0 => '\u{0327}', // cedilla
        0xF1 => '\u{0328}', // ogonek
        0xF2 => '\u{0323}', // dot below
        0xF3 => '\u{0324}', // double dot below
        0xF4 => '\u{0325}', // ring below
        0xF5 => '\u{0333}', // double low line
        0xF6 => '\u{0332}', // low line
        0xF7 => '\u{0326}', // comma below
        0xF8 => '\u{031C}', // left half ring below
        0xF9 => '\u{032E}', // breve below
        0xFA => '\u{FE22}', // double tilde left half
        0xFB => '\u{FE23}', // double tilde right half
        0xFE => '\u{0313}', // comma above
        _ => return None,
    };
    Some(c)
}
