use super::constants::MSG_REGEX;
use super::schema::{coerce, FieldState, FIELD_SCHEMA};
use super::types::{Field, Hexident, MessageFields, MessageParseError, ParsedMessage, Value};

/// Parses one BaseStation line (line terminator already removed) into the
/// sparse set of fields it carries.
pub fn build_message_from_string(line: &str) -> Result<ParsedMessage, MessageParseError> {
    let captures = MSG_REGEX
        .captures(line)
        .ok_or_else(|| MessageParseError::Format(line.to_string()))?;

    let mut fields = MessageFields::new();
    for (index, spec) in FIELD_SCHEMA.iter().enumerate() {
        let raw = captures.get(index + 1).map_or("", |m| m.as_str());
        match coerce(spec.kind, raw) {
            FieldState::Absent => {}
            FieldState::Valid(value) => {
                fields.insert(spec.field, value);
            }
            FieldState::Invalid(raw) => {
                return Err(MessageParseError::InvalidField {
                    field: spec.field,
                    raw,
                    line: line.to_string(),
                });
            }
        }
    }

    let hexident = match fields.remove(&Field::Hexident) {
        Some(Value::Text(text)) => Hexident::new(&text)
            .map_err(|_| MessageParseError::Format(line.to_string()))?,
        _ => return Err(MessageParseError::Format(line.to_string())),
    };

    Ok(ParsedMessage { hexident, fields })
}
