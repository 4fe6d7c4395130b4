//! Reversible obfuscation for session values kept in host storage.
//!
//! This only keeps tokens out of plain sight in storage dumps. It is not
//! encryption and must not be treated as a security boundary.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Stored value could not be decoded by any strategy.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("stored value could not be decoded")]
pub struct DecodeError;

/// Encode `plain` for storage: percent-encode, then base64.
#[must_use]
pub fn encode(plain: &str) -> String {
    STANDARD.encode(urlencoding::encode(plain).as_bytes())
}

/// Decode a stored value.
///
/// The primary strategy reverses [`encode`]. Values written by older clients
/// used `_` in place of `%` without base64; those are recovered by the
/// fallback strategy.
///
/// # Errors
///
/// Returns [`DecodeError`] when neither strategy produces valid text.
pub fn decode(stored: &str) -> Result<String, DecodeError> {
    decode_base64(stored)
        .or_else(|| decode_underscored(stored))
        .ok_or(DecodeError)
}

fn decode_base64(stored: &str) -> Option<String> {
    let bytes = STANDARD.decode(stored).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    percent_decode_strict(&text)
}

fn decode_underscored(stored: &str) -> Option<String> {
    percent_decode_strict(&stored.replace('_', "%"))
}

/// Percent-decode, rejecting malformed escapes and invalid UTF-8.
fn percent_decode_strict(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let escape = bytes.get(index + 1..index + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            index += 3;
        } else {
            index += 1;
        }
    }
    urlencoding::decode(input).ok().map(std::borrow::Cow::into_owned)
}
