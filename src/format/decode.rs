//! String token decoding shared by the parser and the patch automaton.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing closing {quote} in quoted string")]
    UnterminatedQuote { quote: char },

    #[error("empty string token")]
    Empty,
}

/// Whitespace as understood by the file format (C `isspace`).
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Map the character after a backslash to the byte it stands for.
pub fn process_escape(byte: u8) -> u8 {
    match byte {
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0b,
        other => other,
    }
}

pub fn trim_end_space(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.is_ascii() && is_space(c as u8))
}

pub fn trim_start_space(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii() && is_space(c as u8))
}

/// Decode one string token from the start of `input`.
///
/// A token starting with `"` or `'` runs to the matching closing quote;
/// otherwise it runs to the next whitespace. Backslash escapes are processed
/// in both forms. Returns the decoded text and the number of input bytes
/// consumed.
pub fn decode_string(input: &str) -> Result<(String, usize), DecodeError> {
    let bytes = input.as_bytes();
    let Some(&first) = bytes.first() else {
        return Err(DecodeError::Empty);
    };

    let mut decoded = Vec::new();
    let mut escaped = false;

    if first == b'"' || first == b'\'' {
        for (index, &byte) in bytes.iter().enumerate().skip(1) {
            if escaped {
                decoded.push(process_escape(byte));
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == first {
                return Ok((into_string(decoded), index + 1));
            } else {
                decoded.push(byte);
            }
        }
        return Err(DecodeError::UnterminatedQuote {
            quote: first as char,
        });
    }

    let mut end = bytes.len();
    for (index, &byte) in bytes.iter().enumerate() {
        if escaped {
            decoded.push(process_escape(byte));
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if is_space(byte) {
            end = index;
            break;
        } else {
            decoded.push(byte);
        }
    }
    Ok((into_string(decoded), end))
}

fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
