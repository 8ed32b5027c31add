use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/consolidator.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Never,
    Daily,
    Hourly,
}

/// Log filter and file destination, resolved from the environment and `-v` flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub directory: PathBuf,
    pub file_name: String,
    pub rotation: Rotation,
}

impl LogSettings {
    pub fn from_env(verbose: u8) -> Self {
        Self::resolve(|key| env::var(key).ok(), verbose)
    }

    /// `TRACING_LEVEL` sets the base filter; each `-v` overrides it one level up.
    /// `LOG_FILE_PATH` names the log file and `LOG_ROTATION` picks never/daily/hourly.
    fn resolve(lookup: impl Fn(&str) -> Option<String>, verbose: u8) -> Self {
        let filter = match verbose {
            0 => lookup("TRACING_LEVEL").unwrap_or_else(|| "info".to_string()),
            1 => "info,consolidator_core=debug".to_string(),
            _ => "debug,consolidator_core=trace".to_string(),
        };

        let path = lookup("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let path = Path::new(&path);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "consolidator.log".to_string());

        let rotation = match lookup("LOG_ROTATION").as_deref().map(str::to_ascii_lowercase) {
            Some(r) if r == "daily" => Rotation::Daily,
            Some(r) if r == "hourly" => Rotation::Hourly,
            _ => Rotation::Never,
        };

        Self {
            filter,
            directory,
            file_name,
            rotation,
        }
    }

    fn appender(&self) -> RollingFileAppender {
        match self.rotation {
            Rotation::Never => rolling::never(&self.directory, &self.file_name),
            Rotation::Daily => rolling::daily(&self.directory, &self.file_name),
            Rotation::Hourly => rolling::hourly(&self.directory, &self.file_name),
        }
    }
}

/// Console output goes to stderr so it interleaves with the progress bars;
/// the file layer keeps full detail without colors.
pub fn init_logger(settings: &LogSettings) -> impl Drop {
    let (non_blocking, guard) = tracing_appender::non_blocking(settings.appender());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .without_time(),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .with(EnvFilter::new(&settings.filter))
        .init();

    debug!(
        "Logging to {} ({:?} rotation), filter '{}'",
        settings.directory.join(&settings.file_name).display(),
        settings.rotation,
        settings.filter
    );

    guard
}
