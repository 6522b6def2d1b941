//! InfluxDB line protocol encoding.

#[derive(Debug, PartialEq, Clone)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// One time-series entry: index tags plus the measured fields.
///
/// Both lists keep insertion order so the encoded line is deterministic.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct DataPoint {
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
}

impl DataPoint {
    #[must_use]
    pub fn new() -> Self {
        DataPoint::default()
    }

    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.push((key.to_string(), value));
        self
    }

    /// Adds the field only when a value is present.
    #[must_use]
    pub fn optional_field(self, key: &str, value: Option<FieldValue>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    #[must_use]
    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Renders a single field as `key=value`, or `None` when the value has no
/// line protocol representation.
#[must_use]
pub fn encode_field(key: &str, value: &FieldValue) -> Option<String> {
    let rendered = match value {
        FieldValue::Boolean(true) => String::from("t"),
        FieldValue::Boolean(false) => String::from("f"),
        FieldValue::Integer(value) => format!("{value}i"),
        FieldValue::Float(value) if value.is_finite() => format!("{value:?}"),
        FieldValue::Float(_) => return None,
        FieldValue::Text(text) => format!("\"{}\"", escape_string_field(text)),
    };
    Some(format!("{}={rendered}", escape_key(key)))
}

/// Encodes one point as `measurement,tags fields timestamp`.
///
/// Unsupported field values are skipped; a point left without any field
/// cannot be written and yields `None`.
#[must_use]
pub fn encode_point(measurement: &str, point: &DataPoint, timestamp: i64) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| {
            let encoded = encode_field(key, value);
            if encoded.is_none() {
                log::warn!("Value {value:?} of field '{key}' is not supported by the sink, skipping");
            }
            encoded
        })
        .collect();

    if fields.is_empty() {
        log::warn!("Data point {:?} has no writable fields, skipping", point.tags);
        return None;
    }

    let mut line = escape_measurement(measurement);
    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&timestamp.to_string());
    Some(line)
}

/// Newline-joined request body for a batch of points.
#[must_use]
pub fn encode_batch(measurement: &str, points: &[DataPoint], timestamp: i64) -> String {
    points
        .iter()
        .filter_map(|point| encode_point(measurement, point, timestamp))
        .collect::<Vec<String>>()
        .join("\n")
}

fn escape_key(text: &str) -> String {
    escape_chars(text, &[',', '=', ' '])
}

fn escape_measurement(text: &str) -> String {
    escape_chars(text, &[',', ' '])
}

fn escape_chars(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_string_field(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
