//! Byte ↔ text conversion for line files.
//!
//! Provides:
//! - [`Encoding`]: the supported text encodings and their byte-order marks
//! - [`detect_bom`]: recognises a leading byte-order mark
//! - [`Decoder`]: incremental decoding that carries partial multi-byte
//!   sequences from one buffer to the next
//!
//! Decoding is lossy: malformed input becomes U+FFFD instead of an error.

use std::{fmt, mem, str, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ArgumentError, BatchError};

/// Number of leading bytes needed to recognise every supported BOM.
pub const BOM_PROBE_LEN: usize = 4;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF32LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const UTF32BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];

/// Text encoding of a line file.
///
/// `Utf8` writes no byte-order mark, `Utf8Bom` writes one. The UTF-16 and
/// UTF-32 variants always carry their BOM on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-8-bom", alias = "utf8-bom")]
    Utf8Bom,
    #[serde(rename = "utf-16le", alias = "utf-16")]
    Utf16Le,
    #[serde(rename = "utf-16be")]
    Utf16Be,
    #[serde(rename = "utf-32le", alias = "utf-32")]
    Utf32Le,
    #[serde(rename = "utf-32be")]
    Utf32Be,
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// Canonical label, as accepted by [`Encoding::from_str`].
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Bom => "utf-8-bom",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
            Encoding::Utf32Le => "utf-32le",
            Encoding::Utf32Be => "utf-32be",
            Encoding::Latin1 => "latin1",
        }
    }

    /// Bytes written at the start of a file in this encoding. Empty when the
    /// encoding has no byte-order mark.
    pub fn preamble(self) -> &'static [u8] {
        match self {
            Encoding::Utf8 | Encoding::Latin1 => &[],
            Encoding::Utf8Bom => UTF8_BOM,
            Encoding::Utf16Le => UTF16LE_BOM,
            Encoding::Utf16Be => UTF16BE_BOM,
            Encoding::Utf32Le => UTF32LE_BOM,
            Encoding::Utf32Be => UTF32BE_BOM,
        }
    }

    /// Appends the encoded form of `text` to `out`.
    ///
    /// Latin-1 cannot represent characters above U+00FF; those are written as `?`.
    pub fn encode(self, text: &str, out: &mut Vec<u8>) {
        match self {
            Encoding::Utf8 | Encoding::Utf8Bom => out.extend_from_slice(text.as_bytes()),
            Encoding::Utf16Le => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_le_bytes())),
            Encoding::Utf16Be => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_be_bytes())),
            Encoding::Utf32Le => text
                .chars()
                .for_each(|c| out.extend_from_slice(&u32::from(c).to_le_bytes())),
            Encoding::Utf32Be => text
                .chars()
                .for_each(|c| out.extend_from_slice(&u32::from(c).to_be_bytes())),
            Encoding::Latin1 => out.extend(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?'))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = BatchError;

    /// Parses an encoding label. Case, `-` and `_` are ignored, so `UTF-8`,
    /// `utf8` and `utf_8` are the same label.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.trim() {
            "" => Err(ArgumentError::Empty("encoding").into()),
            "utf8" => Ok(Encoding::Utf8),
            "utf8bom" => Ok(Encoding::Utf8Bom),
            "utf16" | "utf16le" | "unicode" => Ok(Encoding::Utf16Le),
            "utf16be" | "bigendianunicode" => Ok(Encoding::Utf16Be),
            "utf32" | "utf32le" => Ok(Encoding::Utf32Le),
            "utf32be" => Ok(Encoding::Utf32Be),
            "latin1" | "iso88591" => Ok(Encoding::Latin1),
            _ => Err(ArgumentError::Unsupported {
                name: "encoding",
                value: label.to_string(),
            }
            .into()),
        }
    }
}

/// Result of BOM detection containing the detected encoding and BOM length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomDetectionResult {
    pub encoding: Encoding,
    pub bom_length: usize,
}

/// Detect a byte-order mark at the start of `bytes`.
///
/// UTF-32 marks are checked before UTF-16 ones since `FF FE 00 00` also starts
/// with the UTF-16LE mark.
pub fn detect_bom(bytes: &[u8]) -> Option<BomDetectionResult> {
    let candidates = [
        (UTF32LE_BOM, Encoding::Utf32Le),
        (UTF32BE_BOM, Encoding::Utf32Be),
        (UTF8_BOM, Encoding::Utf8Bom),
        (UTF16LE_BOM, Encoding::Utf16Le),
        (UTF16BE_BOM, Encoding::Utf16Be),
    ];

    candidates
        .into_iter()
        .find(|(bom, _)| bytes.starts_with(bom))
        .map(|(bom, encoding)| BomDetectionResult {
            encoding,
            bom_length: bom.len(),
        })
}

/// Detect a byte-order mark for a stream expected to be in `expected`.
///
/// Latin-1 has no byte-order mark, so nothing is detected for it and bytes
/// such as `FF FE` stay text. When `expected` is UTF-16LE, `FF FE 00 00` is
/// read as the UTF-16LE mark followed by U+0000.
pub fn detect_bom_for(bytes: &[u8], expected: Encoding) -> Option<BomDetectionResult> {
    if expected == Encoding::Latin1 {
        return None;
    }

    match detect_bom(bytes)? {
        BomDetectionResult {
            encoding: Encoding::Utf32Le,
            ..
        } if expected == Encoding::Utf16Le => Some(BomDetectionResult {
            encoding: Encoding::Utf16Le,
            bom_length: UTF16LE_BOM.len(),
        }),
        detected => Some(detected),
    }
}

/// Incremental decoder for one [`Encoding`].
///
/// Bytes that end in the middle of a character are kept until the next call,
/// so input can be fed in arbitrarily sized pieces.
#[derive(Debug, Clone)]
pub struct Decoder {
    encoding: Encoding,
    pending: Vec<u8>,
}

impl Decoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decodes `bytes` and appends the text to `out`.
    ///
    /// With `last` set, any incomplete trailing sequence is flushed as U+FFFD
    /// and the decoder is left empty.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String, last: bool) {
        if self.pending.is_empty() {
            let consumed = decode_slice(self.encoding, bytes, out, last);
            self.pending.extend_from_slice(&bytes[consumed..]);
        } else {
            let mut input = mem::take(&mut self.pending);
            input.extend_from_slice(bytes);
            let consumed = decode_slice(self.encoding, &input, out, last);
            input.drain(..consumed);
            self.pending = input;
        }
    }
}

/// Returns how many bytes of `input` were consumed.
fn decode_slice(encoding: Encoding, input: &[u8], out: &mut String, last: bool) -> usize {
    match encoding {
        Encoding::Utf8 | Encoding::Utf8Bom => decode_utf8(input, out, last),
        Encoding::Utf16Le => decode_utf16(input, out, last, u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16(input, out, last, u16::from_be_bytes),
        Encoding::Utf32Le => decode_utf32(input, out, last, u32::from_le_bytes),
        Encoding::Utf32Be => decode_utf32(input, out, last, u32::from_be_bytes),
        Encoding::Latin1 => {
            out.extend(input.iter().copied().map(char::from));
            input.len()
        }
    }
}

fn decode_utf8(input: &[u8], out: &mut String, last: bool) -> usize {
    let mut rest = input;
    loop {
        match str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return input.len();
            }
            Err(error) => {
                let (valid, invalid) = rest.split_at(error.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                match error.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &invalid[len..];
                    }
                    // incomplete sequence at the end of the input
                    None if last => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        return input.len();
                    }
                    None => return input.len() - invalid.len(),
                }
            }
        }
    }
}

fn decode_utf16(
    input: &[u8],
    out: &mut String,
    last: bool,
    to_unit: fn([u8; 2]) -> u16,
) -> usize {
    let mut units: Vec<u16> = input
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    let mut consumed = units.len() * 2;

    // a high surrogate may be completed by the next buffer
    if !last && units.last().is_some_and(|unit| (0xD800..=0xDBFF).contains(unit)) {
        units.pop();
        consumed -= 2;
    }

    out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));

    if last && consumed < input.len() {
        out.push(char::REPLACEMENT_CHARACTER);
        consumed = input.len();
    }
    consumed
}

fn decode_utf32(
    input: &[u8],
    out: &mut String,
    last: bool,
    to_scalar: fn([u8; 4]) -> u32,
) -> usize {
    let mut consumed = 0;
    for quad in input.chunks_exact(4) {
        let scalar = to_scalar([quad[0], quad[1], quad[2], quad[3]]);
        out.push(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
        consumed += 4;
    }

    if last && consumed < input.len() {
        out.push(char::REPLACEMENT_CHARACTER);
        consumed = input.len();
    }
    consumed
}
