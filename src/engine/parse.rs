//! Line normalization and splitting into (identifier, secret).

use std::borrow::Cow;

use super::classify::classify_secret;
use crate::error::LineError;
use crate::{Credential, Delimiters};

/// Split at the first occurrence of any delimiter. Everything after it, delimiters included,
/// is the secret.
pub fn split_line<'a>(line: &'a str, delimiters: &Delimiters) -> Option<(&'a str, &'a str)> {
    let (idx, delim) = line.char_indices().find(|(_, c)| delimiters.contains(*c))?;
    Some((&line[..idx], &line[idx + delim.len_utf8()..]))
}

/// Decode, trim and strip NULs from one raw line. `Blank` for lines with nothing left.
pub fn normalize_line(raw: &[u8]) -> Result<Cow<'_, str>, LineError> {
    let text = std::str::from_utf8(raw).map_err(|_| LineError::NotText)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(LineError::Blank);
    }
    if !text.contains('\0') {
        return Ok(Cow::Borrowed(text));
    }
    let stripped = text.replace('\0', "");
    if stripped.is_empty() {
        return Err(LineError::Blank);
    }
    Ok(Cow::Owned(stripped))
}

/// Full per-line path: normalize, split, classify.
pub fn parse_line(raw: &[u8], delimiters: &Delimiters) -> Result<Credential, LineError> {
    let line = normalize_line(raw)?;
    let (identifier, secret) = split_line(&line, delimiters).ok_or(LineError::NoDelimiter)?;
    if identifier.is_empty() {
        return Err(LineError::EmptyIdentifier);
    }
    Ok(Credential {
        identifier: identifier.to_string(),
        secret: secret.to_string(),
        category: classify_secret(secret),
    })
}
