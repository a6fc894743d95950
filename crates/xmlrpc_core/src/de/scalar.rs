//! Scalar coercion.
//!
//! Wire text is validated strictly: no surrounding whitespace, no locale
//! variations.

use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};

use super::Deserializer;
use crate::consts;
use crate::descriptor::TypeDesc;
use crate::dialect::NonStandard;
use crate::err::XmlRpcResult;
use crate::node::Node;
use crate::parse_stack::ParseStack;
use crate::value::{Value, DATETIME_MIN};

impl Deserializer {
    /// Coerce a scalar node. `node` must not be a compound or nil node.
    pub(super) fn deserialize_scalar(
        &self,
        node: Node,
        target: Option<&TypeDesc>,
        stack: &mut ParseStack,
    ) -> XmlRpcResult<Value> {
        let (text, expected) = match node {
            Node::Int(text) => (text, TypeDesc::Int),
            Node::Long(text) => (text, TypeDesc::Long),
            Node::Double(text) => (text, TypeDesc::Double),
            Node::Boolean(text) => (text, TypeDesc::Boolean),
            Node::String { text, .. } => (text, TypeDesc::String),
            Node::DateTime(text) => (text, TypeDesc::DateTime),
            Node::Base64(text) => (text, TypeDesc::Base64),
            other => {
                return Err(stack.invalid(format!(
                    "unexpected {} where a scalar was expected",
                    other.describe()
                )))
            }
        };

        check_expected(target, &expected, stack)?;

        stack.scoped(expected.name(), |stack| {
            let parsed = match expected {
                TypeDesc::Int => parse_int(&text).map(Value::Int),
                TypeDesc::Long => parse_long(&text).map(Value::Long),
                TypeDesc::Double => parse_double(&text).map(Value::Double),
                TypeDesc::Boolean => parse_boolean(&text).map(Value::Boolean),
                TypeDesc::DateTime => {
                    parse_datetime(&text, &self.non_standard).map(Value::DateTime)
                }
                TypeDesc::Base64 => parse_base64(&text).map(Value::Base64),
                _ => return Ok(Value::String(text)),
            };

            parsed.ok_or_else(|| stack.invalid(format!("invalid {} value", wire_name(&expected))))
        })
    }
}

/// Name of the wire type in invalid-value messages.
fn wire_name(ty: &TypeDesc) -> &'static str {
    match ty {
        TypeDesc::Int => "int",
        TypeDesc::Long => consts::I8,
        TypeDesc::Double => consts::DOUBLE,
        TypeDesc::Boolean => consts::BOOLEAN,
        TypeDesc::DateTime => "dateTime",
        TypeDesc::Base64 => consts::BASE64,
        _ => consts::STRING,
    }
}

/// A scalar satisfies an untyped target or a target of its own kind.
fn check_expected(
    target: Option<&TypeDesc>,
    expected: &TypeDesc,
    stack: &ParseStack,
) -> XmlRpcResult<()> {
    let target = match target {
        Some(t) => t,
        None => return Ok(()),
    };

    match std::mem::discriminant(target.strip_optional()) == std::mem::discriminant(expected) {
        true => Ok(()),
        false => Err(stack.mismatch(format!(
            "{} value where {} expected",
            expected.name(),
            target.name()
        ))),
    }
}

/// `-?[0-9]+`
fn is_canonical_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn parse_int(text: &str) -> Option<i32> {
    match is_canonical_integer(text) {
        true => text.parse().ok(),
        false => None,
    }
}

pub(crate) fn parse_long(text: &str) -> Option<i64> {
    match is_canonical_integer(text) {
        true => text.parse().ok(),
        false => None,
    }
}

/// Decimal notation with `.` as separator and an optional exponent.
fn parse_double(text: &str) -> Option<f64> {
    let allowed = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    let has_digit = text.bytes().any(|b| b.is_ascii_digit());

    match allowed && has_digit {
        true => text.parse().ok(),
        false => None,
    }
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Standard alphabet with padding. Whitespace, e.g. line breaks, is ignored.
fn parse_base64(text: &str) -> Option<Vec<u8>> {
    let compact = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();

    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()
}

/// Digit layouts of the local date-time part, `9` standing for a digit.
const STRICT_LAYOUTS: [&str; 3] = ["99999999T99:99:99", "99999999T999999", "9999-99-99T99:99:99"];

/// Additional layouts accepted with `allow_non_standard_date_time`.
const RELAXED_LAYOUTS: [&str; 7] = [
    "99999999 99:99:99",
    "99999999 999999",
    "9999-99-99 99:99:99",
    "99999999999999",
    "99999999",
    "9999-99-99",
    "99999999T99:99",
];

fn parse_datetime(text: &str, non_standard: &NonStandard) -> Option<NaiveDateTime> {
    if text.is_empty() && non_standard.map_empty_date_time_to_min_value {
        return Some(DATETIME_MIN);
    }

    match parse_iso8601(text, non_standard.allow_non_standard_date_time) {
        Some(dt) => Some(dt),
        None if non_standard.map_zeros_date_time_to_min_value
            && consts::ZERO_DATETIMES.contains(&text) =>
        {
            Some(DATETIME_MIN)
        }
        None => None,
    }
}

/// Parse a date-time, normalising any UTC offset away.
fn parse_iso8601(text: &str, relaxed: bool) -> Option<NaiveDateTime> {
    let (local, offset_secs) = split_offset(text)?;

    let (base, fraction) = match local.split_once('.') {
        Some((base, fraction)) => {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (base, fraction)
        }
        None => (local, ""),
    };

    let layout = base
        .chars()
        .map(|c| match c.is_ascii_digit() {
            true => '9',
            false => c,
        })
        .collect::<String>();
    let known = STRICT_LAYOUTS.contains(&layout.as_str())
        || (relaxed && RELAXED_LAYOUTS.contains(&layout.as_str()));
    if !known {
        return None;
    }

    // every layout is year, month, day and optionally hour, minute, second
    let digits = base
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| (b - b'0') as u32)
        .collect::<Vec<_>>();
    let field = |start: usize, len: usize| -> u32 {
        digits
            .iter()
            .skip(start)
            .take(len)
            .fold(0, |acc, d| acc * 10 + d)
    };

    let nanos = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(9)
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);

    let date = NaiveDate::from_ymd_opt(field(0, 4) as i32, field(4, 2), field(6, 2))?;
    let dt = date.and_hms_nano_opt(field(8, 2), field(10, 2), field(12, 2), nanos)?;

    dt.checked_sub_signed(chrono::Duration::seconds(offset_secs))
}

/// Split a trailing `Z`, `±HH:MM` or `±HHMM` off a date-time.
///
/// Returns the local part and the offset east of UTC in seconds.
fn split_offset(text: &str) -> Option<(&str, i64)> {
    if let Some(local) = text.strip_suffix('Z') {
        return Some((local, 0));
    }

    // date parts never extend past the 8th byte with a sign in them
    let sign_pos = match text.rfind(|c: char| c == '+' || c == '-') {
        Some(pos) if pos >= 8 => pos,
        _ => return Some((text, 0)),
    };

    let (local, offset) = text.split_at(sign_pos);
    let sign = match offset.as_bytes()[0] {
        b'-' => -1,
        _ => 1,
    };
    let digits = offset[1..].replacen(':', "", 1);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours = digits[..2].parse::<i64>().ok()?;
    let minutes = digits[2..].parse::<i64>().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some((local, sign * (hours * 3600 + minutes * 60)))
}
