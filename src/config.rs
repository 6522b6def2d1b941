use crate::cli::ConfigOverrides;
use serde;
use toml;

pub const DEFAULT_FEED_HOST: &str = "127.0.0.1";
pub const DEFAULT_FEED_PORT: u16 = 30003;
pub const DEFAULT_SINK_URL: &str = "http://127.0.0.1:8186";
pub const DEFAULT_SINK_DATABASE: &str = "dump1090";
pub const DEFAULT_EXPORT_INTERVAL_SECONDS: u64 = 60;

#[derive(serde::Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationConfig {
    pub feed: FeedConfig,
    pub sink: SinkConfig,
    pub export: ExportConfig,
}

impl ApplicationConfig {
    pub fn construct_from_path(
        path: &std::path::PathBuf,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        let string =
            std::fs::read_to_string(path).map_err(|error| errors::ApplicationConfigError::Io {
                source: error,
                path: path.clone(),
            })?;

        toml::from_str(&string).map_err(|error| errors::ApplicationConfigError::Parse {
            source: error,
            path: path.clone(),
        })
    }

    /// Reads the optional config file, layers command-line overrides on top
    /// and validates the result.
    pub fn load(
        path: Option<&std::path::PathBuf>,
        overrides: &ConfigOverrides,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        let mut config = match path {
            Some(path) => ApplicationConfig::construct_from_path(path)?,
            None => ApplicationConfig::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.feed_host {
            self.feed.host.clone_from(host);
        }
        if let Some(port) = overrides.feed_port {
            self.feed.port = port;
        }
        if let Some(url) = &overrides.sink_url {
            self.sink.url.clone_from(url);
        }
        if let Some(database) = &overrides.sink_database {
            self.sink.database.clone_from(database);
        }
        if let Some(interval) = overrides.export_interval {
            self.export.interval_seconds = interval;
        }
    }

    pub fn validate(&self) -> Result<(), errors::ApplicationConfigError> {
        if self.feed.host.is_empty() {
            return Err(errors::ApplicationConfigError::Invalid(String::from(
                "feed host must not be empty",
            )));
        }
        if self.feed.port == 0 {
            return Err(errors::ApplicationConfigError::Invalid(String::from(
                "feed port must not be 0",
            )));
        }
        if self.sink.database.is_empty() {
            return Err(errors::ApplicationConfigError::Invalid(String::from(
                "sink database must not be empty",
            )));
        }
        if self.export.interval_seconds == 0 {
            return Err(errors::ApplicationConfigError::Invalid(String::from(
                "export interval must be at least one second",
            )));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            host: String::from(DEFAULT_FEED_HOST),
            port: DEFAULT_FEED_PORT,
        }
    }
}

#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub url: String,
    pub database: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            url: String::from(DEFAULT_SINK_URL),
            database: String::from(DEFAULT_SINK_DATABASE),
        }
    }
}

#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub interval_seconds: u64,
}

impl ExportConfig {
    #[must_use]
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_seconds)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            interval_seconds: DEFAULT_EXPORT_INTERVAL_SECONDS,
        }
    }
}

pub mod errors {

    #[derive(Debug)]
    pub enum ApplicationConfigError {
        Parse {
            source: toml::de::Error,
            path: std::path::PathBuf,
        },
        Io {
            source: std::io::Error,
            path: std::path::PathBuf,
        },
        Invalid(String),
    }
    impl std::fmt::Display for ApplicationConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ApplicationConfigError::Io {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to read config file '{}': {}",
                        path.display(),
                        error
                    )
                }
                ApplicationConfigError::Parse {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to parse config file '{}': {}",
                        path.display(),
                        error
                    )
                }
                ApplicationConfigError::Invalid(reason) => {
                    write!(f, "Invalid configuration: {reason}")
                }
            }
        }
    }
    impl std::error::Error for ApplicationConfigError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                ApplicationConfigError::Io { source: error, .. } => Some(error),
                ApplicationConfigError::Parse { source: error, .. } => Some(error),
                ApplicationConfigError::Invalid(_) => None,
            }
        }
    }
}
