pub mod line_protocol;

use line_protocol::{encode_batch, DataPoint};

pub const WRITE_PRECISION: &str = "s";
const WRITE_SUCCESS_STATUS: u16 = 204;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum SinkError {
    InvalidUrl {
        url: String,
        reason: String,
    },
    Client(String),
    Request(String),
    UnexpectedStatus(u16),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::InvalidUrl { url, reason } => {
                write!(f, "Invalid sink URL '{url}': {reason}")
            }
            SinkError::Client(reason) => write!(f, "Failed to create HTTP client: {reason}"),
            SinkError::Request(reason) => write!(f, "Write request failed: {reason}"),
            SinkError::UnexpectedStatus(status) => {
                write!(f, "Write rejected, status code is {status}")
            }
        }
    }
}

impl std::error::Error for SinkError {}

/// Minimal HTTP seam so the writer can be driven without a network.
pub trait HttpClient: Send {
    /// POSTs `body` to `url` and returns the response status code.
    fn post_text(&self, url: &str, body: String) -> Result<u16, SinkError>;
}

pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;
        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post_text(&self, url: &str, body: String) -> Result<u16, SinkError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .map_err(|e| SinkError::Request(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

/// Writes batches of data points to an InfluxDB `/write` endpoint.
pub struct InfluxWriter<C: HttpClient> {
    client: C,
    write_url: String,
}

impl<C: HttpClient> InfluxWriter<C> {
    pub fn new(client: C, base_url: &str, database: &str) -> Result<Self, SinkError> {
        let endpoint = format!("{0}/write", base_url.trim_end_matches('/'));
        let write_url = reqwest::Url::parse_with_params(
            &endpoint,
            &[("precision", WRITE_PRECISION), ("db", database)],
        )
        .map_err(|e| SinkError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(InfluxWriter {
            client,
            write_url: write_url.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn write_url(&self) -> &str {
        &self.write_url
    }

    /// Sends the whole batch in one request stamped with `timestamp`
    /// (seconds). Any status other than 204 fails the entire batch.
    pub fn write(
        &self,
        measurement: &str,
        points: &[DataPoint],
        timestamp: i64,
    ) -> Result<(), SinkError> {
        let body = encode_batch(measurement, points, timestamp);
        let status = self.client.post_text(&self.write_url, body)?;
        if status == WRITE_SUCCESS_STATUS {
            Ok(())
        } else {
            Err(SinkError::UnexpectedStatus(status))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::{HttpClient, SinkError};

    /// Records every request and answers with a fixed status.
    #[derive(Clone)]
    pub struct RecordingClient {
        pub status: u16,
        pub requests: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
    }

    impl RecordingClient {
        pub fn with_status(status: u16) -> Self {
            RecordingClient {
                status,
                requests: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }

        pub fn requests(&self) -> Vec<(String, String)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpClient for RecordingClient {
        fn post_text(&self, url: &str, body: String) -> Result<u16, SinkError> {
            self.requests.lock().unwrap().push((url.to_string(), body));
            Ok(self.status)
        }
    }
}
