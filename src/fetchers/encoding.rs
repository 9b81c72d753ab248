//! Text decoding for raw response bodies
//!
//! A declared `charset` parameter is trusted. Without one the body bytes are
//! sniffed with `chardetng`, because plenty of servers serve UTF-8 (or
//! legacy encodings) without saying so.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Charset named by a Content-Type value, if it has one
pub fn declared_charset(content_type: &str) -> Option<String> {
    match content_type.parse::<mime::Mime>() {
        Ok(media_type) => media_type
            .get_param(mime::CHARSET)
            .map(|charset| charset.as_str().trim_matches('"').to_ascii_lowercase()),
        // Tolerate malformed media types that still carry a charset
        Err(_) => content_type
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
            .filter(|value| !value.is_empty()),
    }
}

/// Guess the encoding of `body` from its bytes alone
pub fn detect_encoding(body: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(body, true);
    detector.guess(None, true)
}

/// Encoding a transport applies when nothing better is known
///
/// Textual media types without a charset default to ISO-8859-1
/// (decoded as windows-1252), everything else to UTF-8.
pub fn transport_default(content_type: Option<&str>) -> &'static Encoding {
    let is_text = content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .is_some_and(|media_type| media_type.type_() == mime::TEXT);

    if is_text { WINDOWS_1252 } else { UTF_8 }
}

/// Pick the encoding for a body given its Content-Type header
pub fn resolve_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some(label) = content_type.and_then(declared_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return encoding;
        }
        tracing::debug!(charset = %label, "Unknown declared charset, sniffing body");
    }

    if body.is_empty() {
        return transport_default(content_type);
    }

    detect_encoding(body)
}

/// Decode a response body to text
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> String {
    let encoding = resolve_encoding(content_type, body);
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "Body contained undecodable bytes");
    }
    text.into_owned()
}
