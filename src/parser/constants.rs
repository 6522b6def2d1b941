use super::schema::FIELD_SCHEMA;

pub const RECORD_TYPE_TAG: &str = "MSG";
pub const FIELD_DELIMITER: &str = ",";

/// Whole-line grammar of an aircraft-position report, one capture group per
/// schema column.
pub static MSG_REGEX: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    let columns: Vec<String> = FIELD_SCHEMA
        .iter()
        .map(|spec| format!("({0})", spec.pattern))
        .collect();
    let regex_string = format!(
        r"^{RECORD_TYPE_TAG}{FIELD_DELIMITER}{0}$",
        columns.join(FIELD_DELIMITER)
    );
    regex::Regex::new(&regex_string).unwrap()
});
