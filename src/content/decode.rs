// src/content/decode.rs
// =============================================================================
// Turns raw response bytes into text.
//
// We look at the charset declared in the Content-Type header and decode with
// that encoding (encoding_rs, the same decoder reqwest uses for
// Response::text). No declaration, or a label encoding_rs doesn't know, means
// UTF-8. Bytes that are invalid for the chosen encoding become U+FFFD so the
// page still yields whatever links/title survive; the caller is told the
// result is degraded. It is never an error.
//
// The fingerprint is taken from the raw bytes, not from this text.
// =============================================================================

use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

/// Result of decoding a body.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    /// True when replacement characters were inserted
    pub lossy: bool,
}

// Extracts the charset parameter from a Content-Type value
//
// "text/html; charset=ISO-8859-1" -> Some("iso-8859-1")
pub fn declared_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

pub fn decode_body<'a>(bytes: &'a [u8], content_type: Option<&str>) -> Decoded<'a> {
    let encoding = content_type
        .and_then(declared_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    // decode() also honours a byte order mark, which wins over the header
    let (text, _, had_errors) = encoding.decode(bytes);
    Decoded {
        text,
        lossy: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_charset() {
        assert_eq!(
            declared_charset("text/html; charset=ISO-8859-1"),
            Some("iso-8859-1".to_string())
        );
        assert_eq!(
            declared_charset("text/html;charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(declared_charset("text/html"), None);
    }

    #[test]
    fn test_valid_utf8() {
        let decoded = decode_body("héllo".as_bytes(), Some("text/html; charset=utf-8"));
        assert_eq!(decoded.text, "héllo");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_invalid_utf8_degrades() {
        let bytes = [b'<', b'p', b'>', 0xff, 0xfe, b'<', b'/', b'p', b'>'];
        let decoded = decode_body(&bytes, None);
        assert!(decoded.lossy);
        assert!(decoded.text.starts_with("<p>"));
        assert!(decoded.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_latin1_body_is_transcoded() {
        let decoded = decode_body(b"<title>caf\xe9</title>", Some("text/html; charset=iso-8859-1"));
        assert_eq!(decoded.text, "<title>café</title>");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_windows_1252_body_is_transcoded() {
        // 0x93/0x94 are curly quotes in windows-1252 and invalid UTF-8
        let decoded = decode_body(b"\x93hi\x94", Some("text/html; charset=windows-1252"));
        assert_eq!(decoded.text, "\u{201C}hi\u{201D}");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        let decoded = decode_body("café".as_bytes(), Some("text/html; charset=x-made-up"));
        assert_eq!(decoded.text, "café");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_invalid_bytes_for_declared_charset_degrade() {
        // 0x81 is a Shift_JIS lead byte; a space can't follow it
        let decoded = decode_body(b"a\x81 b", Some("text/html; charset=shift_jis"));
        assert!(decoded.lossy);
        assert!(decoded.text.contains('\u{FFFD}'));
    }
}
