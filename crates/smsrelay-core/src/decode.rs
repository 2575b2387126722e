//! Payload decoding: raw bytes to display text.
//!
//! Decoding never fails from the caller's point of view. Under
//! [`DecodeErrorPolicy::Strict`] an invalid sequence makes [`decode`] fall
//! back to lowercase hex and emit a warning; every other policy repairs the
//! text in place.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

// ── Error policy ────────────────────────────────────────────────────

/// What to do with byte sequences that are invalid in the chosen encoding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Fail; [`decode`] then falls back to hex.
    Strict,
    /// Drop invalid sequences.
    Ignore,
    /// Substitute U+FFFD for each invalid sequence.
    #[default]
    Replace,
    /// Render each invalid byte as `\xNN`.
    BackslashReplace,
}

// ── Encoding ────────────────────────────────────────────────────────

/// Text encodings a payload can be decoded under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown text encoding '{0}' (expected utf-8, ascii, latin-1, utf-16le or utf-16be)")]
pub struct UnknownEncoding(pub String);

impl FromStr for TextEncoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(Self::Latin1),
            "utf-16le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Self::Utf16Be),
            _ => Err(UnknownEncoding(s.to_owned())),
        }
    }
}

// ── Decode result ───────────────────────────────────────────────────

/// An invalid sequence under [`DecodeErrorPolicy::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {encoding} sequence at byte {offset}")]
pub struct DecodeError {
    pub encoding: TextEncoding,
    pub offset: usize,
}

/// Display text for a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    /// `true` when `text` is the hex rendering of the raw bytes.
    pub hex_fallback: bool,
}

/// Decode `raw` for display.
///
/// `force_hex` skips decoding entirely. An empty payload is always `""`.
pub fn decode(
    raw: &[u8],
    encoding: TextEncoding,
    policy: DecodeErrorPolicy,
    force_hex: bool,
) -> DecodedPayload {
    if force_hex {
        return DecodedPayload {
            text: hex::encode(raw),
            hex_fallback: true,
        };
    }

    match decode_text(raw, encoding, policy) {
        Ok(text) => DecodedPayload {
            text,
            hex_fallback: false,
        },
        Err(err) => {
            tracing::warn!(error = %err, "Payload is not valid text, showing hex instead");
            DecodedPayload {
                text: hex::encode(raw),
                hex_fallback: true,
            }
        }
    }
}

/// Decode `raw` under `encoding`. Only [`DecodeErrorPolicy::Strict`] can fail.
pub fn decode_text(
    raw: &[u8],
    encoding: TextEncoding,
    policy: DecodeErrorPolicy,
) -> Result<String, DecodeError> {
    match encoding {
        TextEncoding::Utf8 => decode_utf8(raw, policy),
        TextEncoding::Ascii => decode_ascii(raw, policy),
        TextEncoding::Latin1 => Ok(raw.iter().copied().map(char::from).collect()),
        TextEncoding::Utf16Le => decode_utf16(raw, policy, Endian::Little),
        TextEncoding::Utf16Be => decode_utf16(raw, policy, Endian::Big),
    }
}

// ── Per-encoding decoders ───────────────────────────────────────────

/// Apply `policy` to one invalid sequence starting at byte `offset`.
fn repair(
    out: &mut String,
    bad: &[u8],
    policy: DecodeErrorPolicy,
    encoding: TextEncoding,
    offset: usize,
) -> Result<(), DecodeError> {
    match policy {
        DecodeErrorPolicy::Strict => return Err(DecodeError { encoding, offset }),
        DecodeErrorPolicy::Ignore => {}
        DecodeErrorPolicy::Replace => out.push(char::REPLACEMENT_CHARACTER),
        DecodeErrorPolicy::BackslashReplace => {
            for byte in bad {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
    Ok(())
}

fn decode_utf8(raw: &[u8], policy: DecodeErrorPolicy) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(raw.len());
    let mut offset = 0;

    for chunk in raw.utf8_chunks() {
        let valid = chunk.valid();
        out.push_str(valid);
        offset += valid.len();

        // A trailing invalid chunk may be a sequence cut off by the end of input.
        let bad = chunk.invalid();
        if !bad.is_empty() {
            repair(&mut out, bad, policy, TextEncoding::Utf8, offset)?;
            offset += bad.len();
        }
    }
    Ok(out)
}

fn decode_ascii(raw: &[u8], policy: DecodeErrorPolicy) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(raw.len());
    for (offset, &byte) in raw.iter().enumerate() {
        if byte.is_ascii() {
            out.push(char::from(byte));
        } else {
            repair(&mut out, &[byte], policy, TextEncoding::Ascii, offset)?;
        }
    }
    Ok(out)
}

#[derive(Clone, Copy)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn unit(self, pair: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(pair),
            Self::Big => u16::from_be_bytes(pair),
        }
    }

    fn bytes(self, unit: u16) -> [u8; 2] {
        match self {
            Self::Little => unit.to_le_bytes(),
            Self::Big => unit.to_be_bytes(),
        }
    }

    fn encoding(self) -> TextEncoding {
        match self {
            Self::Little => TextEncoding::Utf16Le,
            Self::Big => TextEncoding::Utf16Be,
        }
    }
}

fn decode_utf16(
    raw: &[u8],
    policy: DecodeErrorPolicy,
    endian: Endian,
) -> Result<String, DecodeError> {
    let encoding = endian.encoding();
    let chunks = raw.chunks_exact(2);
    let trailing = chunks.remainder();
    let units = chunks.map(|pair| endian.unit([pair[0], pair[1]]));

    let mut out = String::with_capacity(raw.len() / 2);
    let mut unit_index = 0;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(c) => {
                out.push(c);
                unit_index += c.len_utf16();
            }
            Err(e) => {
                let bad = endian.bytes(e.unpaired_surrogate());
                repair(&mut out, &bad, policy, encoding, unit_index * 2)?;
                unit_index += 1;
            }
        }
    }

    if !trailing.is_empty() {
        repair(&mut out, trailing, policy, encoding, raw.len() - trailing.len())?;
    }

    Ok(out)
}
