//! Decoding of literal token text into host values.
//!
//! The grammar only guarantees the shape of a literal; range checks, escape decoding and
//! UTF-8 validation happen here, at evaluation time.

use thiserror::Error;

/// Problems found while decoding literal text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("integer {0} out of range")]
    IntegerOutOfRange(String),
    #[error("unsigned integer {0} cannot be negative")]
    NegativeUnsigned(String),
    #[error("invalid float {0}")]
    InvalidFloat(String),
    #[error("invalid unicode code point {0:#x}")]
    InvalidCodePoint(u32),
    #[error("invalid escape sequence \\{0}")]
    InvalidEscape(char),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

/// A decoded integer literal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Integer {
    Int(i64),
    Uint(u64),
}

/// Decodes `[+-]? (0x hex / decimal) [uU]?`, ignoring `_` separators.
///
/// The magnitude is read as a `u64` and the sign applied afterwards, so `-9223372036854775808`
/// is representable. A `-` sign on an unsigned literal is rejected; `+` is accepted.
pub fn parse_integer(text: &str) -> Result<Integer, LiteralError> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (unsigned, rest) = match rest.strip_suffix(['u', 'U']) {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, rest),
    };
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = u64::from_str_radix(&digits, radix)
        .map_err(|_| LiteralError::IntegerOutOfRange(text.to_string()))?;

    if unsigned {
        if negative {
            return Err(LiteralError::NegativeUnsigned(text.to_string()));
        }
        return Ok(Integer::Uint(magnitude));
    }

    let value = if negative {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    i64::try_from(value)
        .map(Integer::Int)
        .map_err(|_| LiteralError::IntegerOutOfRange(text.to_string()))
}

pub fn parse_float(text: &str) -> Result<f64, LiteralError> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| LiteralError::InvalidFloat(text.to_string()))
}

/// Decodes a double-quoted string literal, quotes included.
///
/// `\xHH` contributes a raw byte, so the decoded bytes are validated as UTF-8 once at the end.
pub fn unescape_string(text: &str) -> Result<String, LiteralError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut bytes, c);
            continue;
        }
        let escaped = chars.next().ok_or(LiteralError::InvalidEscape(' '))?;
        match escaped {
            'n' => bytes.push(b'\n'),
            'r' => bytes.push(b'\r'),
            't' => bytes.push(b'\t'),
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0c),
            'v' => bytes.push(0x0b),
            'a' => bytes.push(0x07),
            '\\' | '"' | '\'' => push_char(&mut bytes, escaped),
            'x' => {
                let byte = take_hex(&mut chars, 2).ok_or(LiteralError::InvalidEscape('x'))?;
                bytes.push(byte as u8);
            }
            'u' | 'U' => {
                let width = if escaped == 'u' { 4 } else { 8 };
                let code = take_hex(&mut chars, width).ok_or(LiteralError::InvalidEscape(escaped))?;
                let decoded = char::from_u32(code).ok_or(LiteralError::InvalidCodePoint(code))?;
                push_char(&mut bytes, decoded);
            }
            other => return Err(LiteralError::InvalidEscape(other)),
        }
    }

    String::from_utf8(bytes).map_err(|_| LiteralError::InvalidUtf8)
}

/// The raw body of a `"""..."""` literal.
pub fn long_string_body(text: &str) -> &str {
    text.strip_prefix("\"\"\"")
        .and_then(|t| t.strip_suffix("\"\"\""))
        .unwrap_or(text)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn take_hex(chars: &mut std::str::Chars<'_>, width: usize) -> Option<u32> {
    let mut code = 0u32;
    for _ in 0..width {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    Some(code)
}
