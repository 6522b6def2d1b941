use env_logger;
use std::io::Write;

/// Initialises the global logger at `level`. `RUST_LOG`, when set, refines
/// the filter per module.
pub fn setup_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let thread = std::thread::current();
            writeln!(
                buf,
                "[{0} {1} {2} ({3})] {4}",
                record.level(),
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.module_path().unwrap_or(""),
                thread_label(thread.name()),
                record.args()
            )
        })
        .target(env_logger::Target::Stdout)
        .init();
}

/// Short form of a worker thread name, which is the task's type path.
fn thread_label(name: Option<&str>) -> &str {
    let Some(name) = name else {
        return "unnamed";
    };
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
