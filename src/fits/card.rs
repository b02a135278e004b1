use std::fmt;
use thiserror::Error;

/// Keywords whose cards carry free text instead of a value.
pub const COMMENTARY_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Per-card failures. A malformed card is skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CardError {
    #[error("card contains bytes outside printable ASCII")]
    NonPrintable,

    #[error("invalid keyword: {0:?}")]
    InvalidKeyword(String),

    #[error("keyword {0:?} has no value indicator")]
    MissingValueIndicator(String),

    #[error("unterminated string value")]
    UnterminatedString,

    #[error("invalid value: {0:?}")]
    InvalidValue(String),

    #[error("CONTINUE card without a preceding long string")]
    OrphanContinue,
}

/// A parsed header card value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i128),
    /// Integer wider than `i128`, kept as its decimal digits
    BigInteger(String),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    /// Value indicator present but the field is blank
    Undefined,
    /// Text of a COMMENT, HISTORY or blank-keyword card
    Commentary(String),
}

/// One keyword/value/comment triple
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Value,
    pub comment: String,
}

/// Result of decoding a single 80-byte card image
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    End,
    Continue { fragment: String, comment: String },
    Card(Card),
}

pub(crate) fn parse_card(raw: &[u8]) -> Result<Parsed, CardError> {
    if raw.iter().any(|b| !(0x20..=0x7e).contains(b)) {
        return Err(CardError::NonPrintable);
    }
    let text = std::str::from_utf8(raw).map_err(|_| CardError::NonPrintable)?;
    let (head, rest) = text.split_at(text.len().min(8));
    let keyword = head.trim_end();

    if keyword == "END" && rest.trim().is_empty() {
        return Ok(Parsed::End);
    }

    if keyword == "HIERARCH" {
        let eq = rest
            .find('=')
            .ok_or_else(|| CardError::MissingValueIndicator(keyword.to_string()))?;
        let long_keyword = rest[..eq].trim();
        if long_keyword.is_empty() {
            return Err(CardError::InvalidKeyword(text.trim_end().to_string()));
        }
        let (value, comment) = parse_value_field(&rest[eq + 1..])?;
        return Ok(Parsed::Card(Card {
            keyword: long_keyword.to_string(),
            value,
            comment,
        }));
    }

    if !keyword
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(CardError::InvalidKeyword(keyword.to_string()));
    }

    if COMMENTARY_KEYWORDS.contains(&keyword) {
        return Ok(Parsed::Card(Card {
            keyword: keyword.to_string(),
            value: Value::Commentary(rest.trim_end().to_string()),
            comment: String::new(),
        }));
    }

    if keyword == "CONTINUE" {
        return match parse_value_field(rest)? {
            (Value::Str(fragment), comment) => Ok(Parsed::Continue { fragment, comment }),
            _ => Err(CardError::InvalidValue(rest.trim().to_string())),
        };
    }

    match rest.strip_prefix("= ") {
        Some(field) => {
            let (value, comment) = parse_value_field(field)?;
            Ok(Parsed::Card(Card {
                keyword: keyword.to_string(),
                value,
                comment,
            }))
        }
        None => Err(CardError::MissingValueIndicator(keyword.to_string())),
    }
}

/// Parse the value/comment field that follows the value indicator.
pub(crate) fn parse_value_field(field: &str) -> Result<(Value, String), CardError> {
    let field = field.trim_start();

    if let Some(quoted) = field.strip_prefix('\'') {
        let (text, tail) = parse_quoted(quoted)?;
        let comment = parse_comment(tail)?;
        return Ok((Value::Str(text.trim_end().to_string()), comment));
    }

    let (raw, comment) = match field.find('/') {
        Some(slash) => (&field[..slash], field[slash + 1..].trim().to_string()),
        None => (field, String::new()),
    };
    let raw = raw.trim();

    let value = if raw.is_empty() {
        Value::Undefined
    } else if raw == "T" {
        Value::Logical(true)
    } else if raw == "F" {
        Value::Logical(false)
    } else if let Some(inner) = raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        let (re, im) = inner
            .split_once(',')
            .ok_or_else(|| CardError::InvalidValue(raw.to_string()))?;
        match (parse_real(re.trim()), parse_real(im.trim())) {
            (Some(re), Some(im)) => Value::Complex(re, im),
            _ => return Err(CardError::InvalidValue(raw.to_string())),
        }
    } else if let Ok(int) = raw.parse::<i128>() {
        Value::Integer(int)
    } else if let Some(digits) = parse_big_integer(raw) {
        Value::BigInteger(digits)
    } else if let Some(float) = parse_real(raw) {
        Value::Float(float)
    } else {
        return Err(CardError::InvalidValue(raw.to_string()));
    };

    Ok((value, comment))
}

/// Returns the unescaped string body and whatever follows the closing quote.
fn parse_quoted(quoted: &str) -> Result<(String, &str), CardError> {
    let mut out = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            out.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            out.push('\'');
            continue;
        }
        return Ok((out, &quoted[i + 1..]));
    }
    Err(CardError::UnterminatedString)
}

fn parse_comment(tail: &str) -> Result<String, CardError> {
    let tail = tail.trim_start();
    if tail.is_empty() {
        return Ok(String::new());
    }
    tail.strip_prefix('/')
        .map(|c| c.trim().to_string())
        .ok_or_else(|| CardError::InvalidValue(tail.trim_end().to_string()))
}

/// Signed run of digits, normalized to plain decimal (no `+`, no leading zeros).
fn parse_big_integer(raw: &str) -> Option<String> {
    let (negative, digits) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = digits.trim_start_matches('0');
    Some(match (negative, digits.is_empty()) {
        (_, true) => "0".to_string(),
        (true, false) => format!("-{digits}"),
        (false, false) => digits.to_string(),
    })
}

/// Integer or floating literal; FITS allows a `D` exponent.
fn parse_real(raw: &str) -> Option<f64> {
    let unsigned = raw.trim_start_matches(['+', '-']);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'E' | 'e' | 'D' | 'd' | '+' | '-'))
    {
        return None;
    }
    raw.replace(['D', 'd'], "E").parse::<f64>().ok()
}

/// Shortest round-trip float text with `.0` on integral values and
/// `e±NN` exponents outside [1e-4, 1e16).
pub(crate) fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    if (1e-4..1e16).contains(&v.abs()) {
        let s = format!("{v}");
        if s.contains('.') { s } else { format!("{s}.0") }
    } else {
        let s = format!("{v:e}");
        let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

fn format_component(v: f64) -> String {
    let s = format_float(v);
    match s.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => s,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(true) => f.write_str("True"),
            Value::Logical(false) => f.write_str("False"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::BigInteger(digits) => f.write_str(digits),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Complex(re, im) => {
                let sign = if im.is_sign_negative() { "-" } else { "+" };
                let im = format_component(im.abs());
                if *re == 0.0 && !re.is_sign_negative() {
                    let sign = if sign == "-" { "-" } else { "" };
                    write!(f, "{sign}{im}j")
                } else {
                    write!(f, "({}{sign}{im}j)", format_component(*re))
                }
            }
            Value::Str(s) | Value::Commentary(s) => f.write_str(s),
            Value::Undefined => Ok(()),
        }
    }
}
