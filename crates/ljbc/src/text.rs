//! Printable rendering of raw string constants

/// Decode bytes as text if they are valid UTF-8
pub fn decode_text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

/// Render bytes as a quoted literal
///
/// Valid UTF-8 prints as an escaped string literal; anything else prints as a
/// byte-string literal with non-ASCII bytes escaped as `\xNN`. Never fails.
pub fn quote_bytes(bytes: &[u8]) -> String {
    match decode_text(bytes) {
        Some(text) => format!("{text:?}"),
        None => format!("b\"{}\"", bytes.escape_ascii()),
    }
}
