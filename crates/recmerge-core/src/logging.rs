use crate::config::LoggingSettings;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "recmerge.log";

/// Directory the log file is written to. Relative settings are resolved
/// against the data directory.
pub fn log_directory(data_dir: &Path, settings: &LoggingSettings) -> PathBuf {
    let configured = Path::new(&settings.directory);
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        data_dir.join(configured)
    }
}

/// `RUST_LOG` when set and valid, else the configured directive.
pub fn build_filter(configured: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(configured)
        .with_context(|| format!("invalid log filter '{}'", configured))
}

/// Install a file layer plus a compact stderr layer; stdout stays free for
/// command output. The returned guard flushes the file on drop and must be
/// held until exit.
pub fn init_logging(data_dir: &Path, settings: &LoggingSettings) -> anyhow::Result<WorkerGuard> {
    let dir = log_directory(data_dir, settings);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&dir, LOG_FILE_NAME));

    tracing_subscriber::registry()
        .with(build_filter(&settings.filter)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_directory_is_under_data_dir() {
        let settings = LoggingSettings::default();
        assert_eq!(
            log_directory(Path::new(".recmerge"), &settings),
            Path::new(".recmerge").join("logs")
        );
    }

    #[test]
    fn absolute_directory_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            directory: dir.path().display().to_string(),
            ..LoggingSettings::default()
        };
        assert_eq!(log_directory(Path::new(".recmerge"), &settings), dir.path());
    }

    #[test]
    fn configured_filter_parses() {
        // Only meaningful when RUST_LOG is unset in the test environment.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("info,recmerge_engine=debug").is_ok());
            assert!(build_filter("recmerge=loud").is_err());
        }
    }
}
