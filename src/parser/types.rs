/// Positional attributes of a BaseStation `MSG` record.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Field {
    Transmission,
    Session,
    Aircraft,
    Hexident,
    Flight,
    GenerationDate,
    GenerationTime,
    LogDate,
    LogTime,
    Callsign,
    Altitude,
    Speed,
    Track,
    Latitude,
    Longitude,
    VerticalRate,
    Squawk,
    Alert,
    Emergency,
    Spi,
    OnGround,
}

impl Field {
    /// Name used for this attribute in logs and in exported data points.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Field::Transmission => "transmission",
            Field::Session => "session",
            Field::Aircraft => "aircraft",
            Field::Hexident => "hexident",
            Field::Flight => "flight",
            Field::GenerationDate => "gen_date",
            Field::GenerationTime => "gen_time",
            Field::LogDate => "log_date",
            Field::LogTime => "log_time",
            Field::Callsign => "callsign",
            Field::Altitude => "altitude",
            Field::Speed => "speed",
            Field::Track => "track",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::VerticalRate => "verticalrate",
            Field::Squawk => "squawk",
            Field::Alert => "alert",
            Field::Emergency => "emergency",
            Field::Spi => "spi",
            Field::OnGround => "onground",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Sparse set of the attributes a single message actually carried.
pub type MessageFields = std::collections::BTreeMap<Field, Value>;

/// Hexadecimal aircraft address, the key of the aircraft cache.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct Hexident(String);

impl Hexident {
    pub fn new(value: &str) -> Result<Self, HexidentError> {
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Hexident(value.to_ascii_uppercase()))
        } else {
            Err(HexidentError::InvalidHexFormat(value.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Hexident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub enum HexidentError {
    InvalidHexFormat(String),
}
impl std::fmt::Display for HexidentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexidentError::InvalidHexFormat(value) => {
                write!(f, "Invalid hexadecimal aircraft address '{value}'")
            }
        }
    }
}
impl std::error::Error for HexidentError {}

#[derive(Debug, PartialEq, Clone)]
pub struct ParsedMessage {
    pub hexident: Hexident,
    pub fields: MessageFields,
}

/// A parsed message together with the time it was taken off the feed.
#[derive(Debug, PartialEq, Clone)]
pub struct ReceivedMessage {
    pub message: ParsedMessage,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, PartialEq)]
pub enum MessageParseError {
    Format(String),
    InvalidField {
        field: Field,
        raw: String,
        line: String,
    },
}

impl std::fmt::Display for MessageParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageParseError::Format(line) => write!(f, "Bad MSG format: '{line}'"),
            MessageParseError::InvalidField { field, raw, line } => {
                write!(f, "Invalid value '{raw}' for {field} in '{line}'")
            }
        }
    }
}

impl std::error::Error for MessageParseError {}
