//! Column layout of the BaseStation `MSG` record and the coercion applied
//! to each raw column.

use super::types::{Field, Value};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FieldKind {
    Integer,
    Float,
    /// `-1` means set, any other present value means clear.
    Flag,
    Text,
    TrimmedText,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub field: Field,
    pub pattern: &'static str,
    pub kind: FieldKind,
}

/// Columns following the `MSG` tag, in wire order.
#[rustfmt::skip]
pub static FIELD_SCHEMA: [FieldSpec; 21] = [
    FieldSpec { field: Field::Transmission, pattern: r"[0-9]", kind: FieldKind::Integer },
    FieldSpec { field: Field::Session, pattern: r"[0-9]+", kind: FieldKind::Integer },
    FieldSpec { field: Field::Aircraft, pattern: r"[0-9]+", kind: FieldKind::Integer },
    FieldSpec { field: Field::Hexident, pattern: r"[0-9A-F]+", kind: FieldKind::Text },
    FieldSpec { field: Field::Flight, pattern: r"[0-9]+", kind: FieldKind::Integer },
    FieldSpec { field: Field::GenerationDate, pattern: r"[0-9/]+", kind: FieldKind::Text },
    FieldSpec { field: Field::GenerationTime, pattern: r"[0-9:.]+", kind: FieldKind::Text },
    FieldSpec { field: Field::LogDate, pattern: r"[0-9/]+", kind: FieldKind::Text },
    FieldSpec { field: Field::LogTime, pattern: r"[0-9:.]+", kind: FieldKind::Text },
    FieldSpec { field: Field::Callsign, pattern: r"[\w\s]*", kind: FieldKind::TrimmedText },
    FieldSpec { field: Field::Altitude, pattern: r"[0-9]*", kind: FieldKind::Integer },
    FieldSpec { field: Field::Speed, pattern: r"[0-9]*", kind: FieldKind::Integer },
    FieldSpec { field: Field::Track, pattern: r"[0-9-]*", kind: FieldKind::Integer },
    FieldSpec { field: Field::Latitude, pattern: r"[0-9.-]*", kind: FieldKind::Float },
    FieldSpec { field: Field::Longitude, pattern: r"[0-9.-]*", kind: FieldKind::Float },
    FieldSpec { field: Field::VerticalRate, pattern: r"[0-9-]*", kind: FieldKind::Integer },
    FieldSpec { field: Field::Squawk, pattern: r"[0-9]*", kind: FieldKind::Text },
    FieldSpec { field: Field::Alert, pattern: r"[0-9-]*", kind: FieldKind::Flag },
    FieldSpec { field: Field::Emergency, pattern: r"[0-9-]*", kind: FieldKind::Flag },
    FieldSpec { field: Field::Spi, pattern: r"[0-9-]*", kind: FieldKind::Flag },
    FieldSpec { field: Field::OnGround, pattern: r"[0-9-]*", kind: FieldKind::Flag },
];

pub const FLAG_SET_SENTINEL: &str = "-1";

#[derive(Debug, PartialEq)]
pub enum FieldState {
    Absent,
    Invalid(String),
    Valid(Value),
}

/// Converts one raw column into its typed value.
///
/// Empty raw text is always [`FieldState::Absent`], never a zero or `false`.
#[must_use]
pub fn coerce(kind: FieldKind, raw: &str) -> FieldState {
    if raw.is_empty() {
        return FieldState::Absent;
    }
    match kind {
        FieldKind::Integer => raw.parse::<i64>().map_or_else(
            |_| FieldState::Invalid(raw.to_string()),
            |value| FieldState::Valid(Value::Integer(value)),
        ),
        FieldKind::Float => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => FieldState::Valid(Value::Float(value)),
            _ => FieldState::Invalid(raw.to_string()),
        },
        FieldKind::Flag => FieldState::Valid(Value::Boolean(raw == FLAG_SET_SENTINEL)),
        FieldKind::Text => FieldState::Valid(Value::Text(raw.to_string())),
        FieldKind::TrimmedText => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                FieldState::Absent
            } else {
                FieldState::Valid(Value::Text(trimmed.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{coerce, FieldKind, FieldState, FIELD_SCHEMA};
    use crate::parser::types::{Field, Value};

    #[test]
    fn when_raw_is_empty_then_every_kind_is_absent() {
        for kind in [
            FieldKind::Integer,
            FieldKind::Float,
            FieldKind::Flag,
            FieldKind::Text,
            FieldKind::TrimmedText,
        ] {
            assert_eq!(coerce(kind, ""), FieldState::Absent, "{kind:?}");
        }
    }

    #[test]
    fn when_flag_is_minus_one_then_true_otherwise_false() {
        assert_eq!(coerce(FieldKind::Flag, "-1"), FieldState::Valid(Value::Boolean(true)));
        assert_eq!(coerce(FieldKind::Flag, "0"), FieldState::Valid(Value::Boolean(false)));
        assert_eq!(coerce(FieldKind::Flag, "1"), FieldState::Valid(Value::Boolean(false)));
    }

    #[test]
    fn when_integer_is_signed_then_sign_is_kept() {
        assert_eq!(coerce(FieldKind::Integer, "-64"), FieldState::Valid(Value::Integer(-64)));
    }

    #[test]
    fn when_number_does_not_parse_then_invalid_carries_raw_text() {
        assert_eq!(
            coerce(FieldKind::Integer, "12-3"),
            FieldState::Invalid(String::from("12-3"))
        );
        assert_eq!(
            coerce(FieldKind::Float, "4.0.1"),
            FieldState::Invalid(String::from("4.0.1"))
        );
        assert_eq!(
            coerce(FieldKind::Integer, "99999999999999999999"),
            FieldState::Invalid(String::from("99999999999999999999"))
        );
    }

    #[test]
    fn when_trimmed_text_is_only_whitespace_then_absent() {
        assert_eq!(coerce(FieldKind::TrimmedText, "    "), FieldState::Absent);
        assert_eq!(
            coerce(FieldKind::TrimmedText, "BAW12  "),
            FieldState::Valid(Value::Text(String::from("BAW12")))
        );
    }

    #[test]
    fn when_squawk_has_leading_zero_then_text_is_preserved() {
        let squawk = FIELD_SCHEMA
            .iter()
            .find(|spec| spec.field == Field::Squawk)
            .expect("squawk column");
        assert_eq!(
            coerce(squawk.kind, "0400"),
            FieldState::Valid(Value::Text(String::from("0400")))
        );
    }
}
