//! Decoders for the two escape alphabets used inside backup-dump text cells.
//!
//! Both decoders are pure functions over already latin-1-decoded text: each
//! `char` here corresponds 1:1 to a byte of the original dump (Latin-1 code
//! points and Unicode scalar values coincide in the 0x00-0xFF range), so the
//! multi-byte productions below reconstruct UTF-8 text from sequences of
//! escaped byte pairs.

use std::convert::TryFrom;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("escape sequence decoded to invalid UTF-8")]
    InvalidUtf8,
}

/// Decodes the "ol" (long text) escape alphabet.
///
/// Recognised productions, tried longest-first so the six-character quote/
/// ellipsis forms aren't swallowed by the shorter two-byte-pair form:
///
/// - `` `b"`"Z `` -> UTF-8 from bytes `(0xE2, 0x80, Z+0x20)`
/// - `` `b"``Z `` -> UTF-8 from bytes `(0xE2, 0x80, Z+0x80)`
/// - `` `X`Y ``   -> UTF-8 from bytes `(X+0x80, Y+0x80)`
/// - `'X`         -> `chr(X - 0x20)`
///
/// Anything else passes through unchanged.
pub fn unescape_ol(input: &str) -> Result<String, Error> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if let Some((consumed, decoded)) = try_quote_or_ellipsis(&chars[i..])? {
            out.push(decoded);
            i += consumed;
        } else if let Some((consumed, decoded)) = try_high_plane_pair(&chars[i..])? {
            out.push(decoded);
            i += consumed;
        } else if let Some((consumed, decoded)) = try_control_char(&chars[i..]) {
            out.push(decoded);
            i += consumed;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    Ok(out)
}

/// Decodes the default escape alphabet used on untagged textval cells.
///
/// - `\ ` (backslash space) -> `chr(0x00)`
/// - `\*`                   -> `chr(0x0A)` (newline)
///
/// Anything else passes through unchanged.
pub fn unescape_default(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && (chars[i + 1] == ' ' || chars[i + 1] == '*')
        {
            let decoded = (chars[i + 1] as u32).wrapping_sub(0x20);
            out.push(char::try_from(decoded).unwrap_or('\u{0}'));
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

fn try_control_char(chars: &[char]) -> Option<(usize, char)> {
    if chars.len() >= 2 && chars[0] == '\'' {
        let decoded = (chars[1] as u32).wrapping_sub(0x20);
        char::try_from(decoded).ok().map(|c| (2, c))
    } else {
        None
    }
}

fn try_high_plane_pair(chars: &[char]) -> Result<Option<(usize, char)>, Error> {
    if chars.len() >= 4 && chars[0] == '`' && chars[2] == '`' {
        let x = byte_of(chars[1]);
        let y = byte_of(chars[3]);
        let bytes = [x.wrapping_add(0x80), y.wrapping_add(0x80)];
        let decoded = decode_utf8_bytes(&bytes)?;
        Ok(Some((4, decoded)))
    } else {
        Ok(None)
    }
}

fn try_quote_or_ellipsis(chars: &[char]) -> Result<Option<(usize, char)>, Error> {
    // `b"`"Z  (opening quote / dash family)
    if chars.len() >= 6
        && chars[0] == '`'
        && chars[1] == 'b'
        && chars[2] == '"'
        && chars[3] == '`'
        && chars[4] == '"'
    {
        let z = byte_of(chars[5]);
        let bytes = [0xE2, 0x80, z.wrapping_add(0x20)];
        return Ok(Some((6, decode_utf8_bytes(&bytes)?)));
    }

    // `b"``Z  (ellipsis / closing quote family)
    if chars.len() >= 6
        && chars[0] == '`'
        && chars[1] == 'b'
        && chars[2] == '"'
        && chars[3] == '`'
        && chars[4] == '`'
    {
        let z = byte_of(chars[5]);
        let bytes = [0xE2, 0x80, z.wrapping_add(0x80)];
        return Ok(Some((6, decode_utf8_bytes(&bytes)?)));
    }

    Ok(None)
}

fn byte_of(c: char) -> u8 {
    (c as u32 & 0xFF) as u8
}

fn decode_utf8_bytes(bytes: &[u8]) -> Result<char, Error> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .ok_or(Error::InvalidUtf8)
}
