//! Character encoding resolution
//!
//! Resolution order for a fetched body:
//! 1. `charset` parameter of the `Content-Type` header
//! 2. Byte-order mark
//! 3. `<meta charset>` or `<meta http-equiv="Content-Type">` in the first 1024 bytes
//! 4. UTF-8
//!
//! A UTF-16 label found in a `<meta>` tag is read as UTF-8: a page whose
//! bytes could be scanned as ASCII is not UTF-16.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

const META_SNIFF_LIMIT: usize = 1024;

/// Determines the encoding of a response body
pub fn detect_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type
        .and_then(charset_parameter)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }

    sniff_meta_charset(body).unwrap_or(UTF_8)
}

/// Decodes a body, returning the text and the encoding actually used
///
/// A byte-order mark in the body overrides `encoding`, matching what browsers
/// do.
pub fn decode_body(body: &[u8], encoding: &'static Encoding) -> (String, &'static Encoding) {
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!("Malformed {} sequences replaced while decoding", used.name());
    }
    (text.into_owned(), used)
}

/// Encoding that bytes are actually written in when persisting as `encoding`
///
/// Decode-only encodings such as UTF-16 are written as UTF-8.
pub fn persisted_encoding(encoding: &'static Encoding) -> &'static Encoding {
    encoding.output_encoding()
}

/// Encodes text for persistence in the given encoding
///
/// Characters the target encoding cannot represent become numeric character
/// references. The bytes are in [`persisted_encoding`] of `encoding`.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

fn charset_parameter(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|parameter| {
        let (name, value) = parameter.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c: char| c == '"' || c == '\''))
        } else {
            None
        }
    })
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_LIMIT)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = text.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        if let Some(encoding) = charset_in_tag(&tag[..end]) {
            return Some(if encoding == UTF_16LE || encoding == UTF_16BE {
                UTF_8
            } else {
                encoding
            });
        }
        rest = &tag[end..];
    }

    None
}

fn charset_in_tag(tag: &str) -> Option<&'static Encoding> {
    let mut rest = tag;
    while let Some(position) = rest.find("charset=") {
        let after = &rest[position + "charset=".len()..];
        let label: String = after
            .trim_start_matches(|c: char| c == '"' || c == '\'')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | ':' | '.'))
            .collect();

        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return Some(encoding);
        }
        rest = after;
    }

    None
}
