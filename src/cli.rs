use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Stop after this many seconds instead of waiting for a signal.
    #[arg(long)]
    pub duration: Option<u64>,

    #[arg(short, long, default_value_t = log::LevelFilter::Info)]
    pub logging_level: log::LevelFilter,

    /// TOML file with [feed], [sink] and [export] sections.
    #[arg(long)]
    pub config_file: Option<std::path::PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// dump1090 host [default: 127.0.0.1]
    #[arg(short = 's', long)]
    pub feed_host: Option<String>,

    /// dump1090 BaseStation port [default: 30003]
    #[arg(short = 'p', long)]
    pub feed_port: Option<u16>,

    /// InfluxDB base URL [default: http://127.0.0.1:8186]
    #[arg(short = 'u', long)]
    pub sink_url: Option<String>,

    /// InfluxDB database name [default: dump1090]
    #[arg(short = 'd', long)]
    pub sink_database: Option<String>,

    /// Seconds between two exports [default: 60]
    #[arg(short = 'i', long)]
    pub export_interval: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn when_parsing_overrides_then_they_are_captured() {
        let cli = Cli::try_parse_from([
            "sbs-exporter",
            "--feed-host",
            "10.0.0.2",
            "-p",
            "30005",
            "--export-interval",
            "15",
            "--logging-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.overrides.feed_host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cli.overrides.feed_port, Some(30005));
        assert_eq!(cli.overrides.export_interval, Some(15));
        assert_eq!(cli.logging_level, log::LevelFilter::Debug);
        assert!(cli.config_file.is_none());
    }
}
