//! Scalar values stored in FITS header cards and CCD metadata.

use std::fmt;

/// A scalar header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// FITS logical (`T` or `F`).
    Logical(bool),
    Integer(i64),
    Float(f64),
    /// Character string, stored without quotes or trailing padding.
    String(String),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(n) => Some(*n as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Logical(true) => write!(f, "T"),
            HeaderValue::Logical(false) => write!(f, "F"),
            HeaderValue::Integer(n) => write!(f, "{n}"),
            HeaderValue::Float(v) => write!(f, "{}", format_float(*v)),
            HeaderValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        HeaderValue::Logical(b)
    }
}

impl From<i64> for HeaderValue {
    fn from(n: i64) -> Self {
        HeaderValue::Integer(n)
    }
}

impl From<i32> for HeaderValue {
    fn from(n: i32) -> Self {
        HeaderValue::Integer(n.into())
    }
}

impl From<u32> for HeaderValue {
    fn from(n: u32) -> Self {
        HeaderValue::Integer(n.into())
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<f32> for HeaderValue {
    fn from(v: f32) -> Self {
        HeaderValue::Float(v.into())
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::String(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::String(s)
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<str> for HeaderValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<i64> for HeaderValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<f64> for HeaderValue {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl PartialEq<bool> for HeaderValue {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

// ── Card value field codec ──

/// Width of the value field (card bytes 10..80).
pub const VALUE_FIELD_LEN: usize = 70;

/// Longest string value one card holds: the value field minus both quotes.
pub const MAX_STRING_LEN: usize = VALUE_FIELD_LEN - 2;

/// Numbers and logicals end at card column 30, i.e. value-field index 19.
const FIXED_FORMAT_WIDTH: usize = 20;

/// Parse the 70-byte value field of a card.
///
/// Returns the value (if the field holds a recognizable one) and the inline
/// comment. Both ` / ` and ` /` comment separators are accepted.
pub fn parse_value(field: &[u8]) -> (Option<HeaderValue>, Option<String>) {
    let start = match field.iter().position(|&b| b != b' ') {
        Some(i) => i,
        None => return (None, None),
    };
    let field = &field[start..];

    if field[0] == b'\'' {
        let (text, consumed) = parse_quoted(field);
        let comment = split_comment(&field[consumed..]).1;
        return (Some(HeaderValue::String(text)), comment);
    }

    let (raw, comment) = split_comment(field);
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    let value = match text {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => parse_number(text),
    };
    (value, comment)
}

/// Read a quoted string starting at `field[0] == '\''`.
///
/// Returns the unescaped text with trailing spaces removed and the number of
/// bytes consumed, including the closing quote. An unterminated string takes
/// the rest of the field.
fn parse_quoted(field: &[u8]) -> (String, usize) {
    let decode = |bytes: &[u8]| String::from_utf8_lossy(bytes).trim_end().to_string();
    let mut bytes = Vec::new();
    let mut i = 1;
    while i < field.len() {
        if field[i] == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                bytes.push(b'\'');
                i += 2;
                continue;
            }
            return (decode(&bytes), i + 1);
        }
        bytes.push(field[i]);
        i += 1;
    }
    (decode(&bytes), field.len())
}

/// Split `bytes` at the first `/` that starts a comment.
fn split_comment(bytes: &[u8]) -> (&[u8], Option<String>) {
    match bytes.iter().position(|&b| b == b'/') {
        Some(i) => {
            let comment = String::from_utf8_lossy(&bytes[i + 1..]).trim().to_string();
            let comment = (!comment.is_empty()).then_some(comment);
            (&bytes[..i], comment)
        }
        None => (bytes, None),
    }
}

fn parse_number(text: &str) -> Option<HeaderValue> {
    let is_float = text.contains(['.', 'E', 'e', 'D', 'd']);
    if !is_float {
        if let Ok(n) = text.parse::<i64>() {
            return Some(HeaderValue::Integer(n));
        }
    }
    // FITS allows a `D` exponent for double precision.
    text.replace(['D', 'd'], "E")
        .parse::<f64>()
        .ok()
        .map(HeaderValue::Float)
}

/// Format a value into a 70-byte field, appending ` / comment` when it fits.
pub fn format_value(value: &HeaderValue, comment: Option<&str>) -> [u8; VALUE_FIELD_LEN] {
    let mut buf = [b' '; VALUE_FIELD_LEN];
    let end = match value {
        HeaderValue::Logical(b) => {
            buf[FIXED_FORMAT_WIDTH - 1] = if *b { b'T' } else { b'F' };
            FIXED_FORMAT_WIDTH
        }
        HeaderValue::Integer(n) => right_justify(n.to_string().as_bytes(), &mut buf),
        HeaderValue::Float(v) => right_justify(format_float(*v).as_bytes(), &mut buf),
        HeaderValue::String(s) => write_quoted(s, &mut buf),
    };

    if let Some(comment) = comment {
        // Needs room for " / " plus at least one character.
        if end + 4 <= VALUE_FIELD_LEN {
            buf[end + 1] = b'/';
            let bytes = comment.as_bytes();
            let start = end + 3;
            let len = bytes.len().min(VALUE_FIELD_LEN - start);
            buf[start..start + len].copy_from_slice(&bytes[..len]);
        }
    }
    buf
}

/// Right-justify `src` to end at the fixed-format column; returns the end index.
fn right_justify(src: &[u8], buf: &mut [u8; VALUE_FIELD_LEN]) -> usize {
    if src.len() >= FIXED_FORMAT_WIDTH {
        let len = src.len().min(VALUE_FIELD_LEN);
        buf[..len].copy_from_slice(&src[..len]);
        return len;
    }
    let start = FIXED_FORMAT_WIDTH - src.len();
    buf[start..FIXED_FORMAT_WIDTH].copy_from_slice(src);
    FIXED_FORMAT_WIDTH
}

/// Write a quoted, `''`-escaped string padded to at least 8 characters.
fn write_quoted(s: &str, buf: &mut [u8; VALUE_FIELD_LEN]) -> usize {
    let mut pos = 1;
    buf[0] = b'\'';
    for b in s.bytes() {
        let needed = if b == b'\'' { 2 } else { 1 };
        // Keep one byte for the closing quote.
        if pos + needed > VALUE_FIELD_LEN - 1 {
            break;
        }
        buf[pos] = b;
        if b == b'\'' {
            buf[pos + 1] = b'\'';
        }
        pos += needed;
    }
    pos = pos.max(9);
    buf[pos] = b'\'';
    pos + 1
}

/// Shortest representation that parses back to the same `f64`, always
/// carrying a decimal point or exponent so it reads back as a float.
fn format_float(v: f64) -> String {
    let s = format!("{v:?}");
    if s.len() <= FIXED_FORMAT_WIDTH {
        return s.replace('e', "E");
    }
    let mut precision = 15;
    loop {
        let s = format!("{v:.precision$E}");
        if s.len() <= FIXED_FORMAT_WIDTH || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(s: &str) -> Vec<u8> {
        let mut v = s.as_bytes().to_vec();
        v.resize(VALUE_FIELD_LEN, b' ');
        v
    }

    #[test]
    fn parse_logical() {
        assert_eq!(
            parse_value(&field("                   T")),
            (Some(HeaderValue::Logical(true)), None)
        );
        assert_eq!(parse_value(&field("F")).0, Some(HeaderValue::Logical(false)));
    }

    #[test]
    fn parse_integer_with_comment() {
        let (v, c) = parse_value(&field("                  16 / bits per pixel"));
        assert_eq!(v, Some(HeaderValue::Integer(16)));
        assert_eq!(c.as_deref(), Some("bits per pixel"));
    }

    #[test]
    fn parse_comment_without_trailing_space() {
        let (v, c) = parse_value(&field("                 -32 /No. of bits"));
        assert_eq!(v, Some(HeaderValue::Integer(-32)));
        assert_eq!(c.as_deref(), Some("No. of bits"));
    }

    #[test]
    fn parse_float_d_exponent() {
        let (v, _) = parse_value(&field("            1.5D+02"));
        assert_eq!(v, Some(HeaderValue::Float(150.0)));
    }

    #[test]
    fn parse_string_with_escaped_quote() {
        let (v, c) = parse_value(&field("'O''Brien  ' / observer"));
        assert_eq!(v, Some(HeaderValue::String("O'Brien".into())));
        assert_eq!(c.as_deref(), Some("observer"));
    }

    #[test]
    fn parse_string_with_slash_inside() {
        let (v, c) = parse_value(&field("'a/b     '"));
        assert_eq!(v, Some(HeaderValue::String("a/b".into())));
        assert_eq!(c, None);
    }

    #[test]
    fn parse_unterminated_string_is_lenient() {
        let (v, _) = parse_value(&field("'no closing quote"));
        assert_eq!(v, Some(HeaderValue::String("no closing quote".into())));
    }

    #[test]
    fn parse_blank_field() {
        assert_eq!(parse_value(&field("")), (None, None));
    }

    #[test]
    fn format_integer_right_justified() {
        let buf = format_value(&HeaderValue::Integer(42), None);
        assert_eq!(&buf[..20], b"                  42");
    }

    #[test]
    fn format_logical_column_30() {
        let buf = format_value(&HeaderValue::Logical(true), None);
        assert_eq!(buf[19], b'T');
        assert!(buf[..19].iter().all(|&b| b == b' '));
    }

    #[test]
    fn format_short_string_is_padded() {
        let buf = format_value(&HeaderValue::from("abc"), None);
        assert_eq!(&buf[..10], b"'abc     '");
    }

    #[test]
    fn format_with_comment() {
        let buf = format_value(&HeaderValue::Integer(1), Some("one"));
        assert_eq!(&buf[20..26], b" / one");
    }

    #[test]
    fn float_text_reads_back() {
        for v in [0.0, 1.0, -2.5, 1e-30, 6.02214076e23, std::f64::consts::PI] {
            let buf = format_value(&HeaderValue::Float(v), None);
            assert_eq!(parse_value(&buf).0, Some(HeaderValue::Float(v)), "{v}");
        }
    }

    #[test]
    fn string_comparison() {
        let v = HeaderValue::from("Edwin Hubble");
        assert_eq!(v, "Edwin Hubble");
        assert_ne!(HeaderValue::Integer(3600), "3600");
        assert_eq!(HeaderValue::Integer(3600), 3600i64);
    }
}
