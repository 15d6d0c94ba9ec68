use anyhow::Context;
use dohgate_domain::LoggingConfig;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG`, when set, takes precedence
/// over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    match log_sink(config)? {
        LogSink::File(file) => registry
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .try_init()?,
        LogSink::Stderr => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()?,
    }

    Ok(())
}

#[derive(Debug)]
enum LogSink {
    File(File),
    /// Query output owns stdout.
    Stderr,
}

fn log_sink(config: &LoggingConfig) -> anyhow::Result<LogSink> {
    match &config.file {
        Some(path) => Ok(LogSink::File(open_log_file(path)?)),
        None => Ok(LogSink::Stderr),
    }
}

/// Maps a configured level onto a tracing directive. Accepts tracing's own
/// names and the syslog-style upper-case ones; anything else means `warn`.
fn filter_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" | "notice" => "info",
        "error" | "critical" => "error",
        _ => "warn",
    }
}

fn open_log_file(path: &str) -> anyhow::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_level_names_map_onto_tracing() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("NOTICE"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("CRITICAL"), "error");
        assert_eq!(filter_directive("trace"), "trace");
        assert_eq!(filter_directive("bogus"), "warn");
    }

    #[test]
    fn test_logs_go_to_stderr_without_logfile() {
        let sink = log_sink(&LoggingConfig::default()).unwrap();
        assert!(matches!(sink, LogSink::Stderr));
    }

    #[test]
    fn test_logfile_setting_selects_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file: Some(dir.path().join("dohgate.log").to_string_lossy().into_owned()),
            ..LoggingConfig::default()
        };

        assert!(matches!(log_sink(&config).unwrap(), LogSink::File(_)));
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dohgate.log");
        std::fs::write(&path, "first\n").unwrap();

        let mut file = open_log_file(path.to_str().unwrap()).unwrap();
        std::io::Write::write_all(&mut file, b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
