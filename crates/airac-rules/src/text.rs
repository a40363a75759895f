//! Text decoding and line-preserving assignment edits
//!
//! Settings files are usually Latin-1 on disk. A file is decoded as UTF-8
//! when valid and as Latin-1 otherwise, and written back in the same
//! encoding so bytes outside the edited values are preserved.

use std::borrow::Cow;

use crate::rule::{Assignment, Delimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8 => write!(f, "UTF-8"),
            Self::Latin1 => write!(f, "ISO-8859-1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: Encoding,
}

/// Decode file bytes, or `None` when the content is binary.
pub fn decode(bytes: &[u8]) -> Option<DecodedText> {
    if bytes.contains(&0) {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(DecodedText {
            text: text.to_string(),
            encoding: Encoding::Utf8,
        }),
        Err(_) => Some(DecodedText {
            text: bytes.iter().map(|&b| char::from(b)).collect(),
            encoding: Encoding::Latin1,
        }),
    }
}

/// Encode text for writing; fails on characters Latin-1 cannot hold.
pub fn encode(text: &str, encoding: Encoding) -> Result<Vec<u8>, char> {
    match encoding {
        Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
        Encoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| c))
            .collect(),
    }
}

/// Split a line (as yielded by `split_inclusive('\n')`) from its terminator.
fn split_line_ending(line: &str) -> (&str, &str) {
    let body = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line);
    (body, &line[body.len()..])
}

/// Rewrite the value of every line assigning `assignment.key`.
///
/// Lines that do not assign the key, and all line terminators, are kept
/// byte for byte. A key absent from the text is never added.
pub fn apply_assignment<'a>(
    text: &'a str,
    assignment: &Assignment,
    delimiter: Delimiter,
) -> Cow<'a, str> {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;

    for line in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        match delimiter.value_offset(body, &assignment.key) {
            Some(offset) if body[offset..] != *assignment.value => {
                out.push_str(&body[..offset]);
                out.push_str(&assignment.value);
                out.push_str(ending);
                changed = true;
            }
            _ => out.push_str(line),
        }
    }

    if changed { Cow::Owned(out) } else { Cow::Borrowed(text) }
}
