//! Operator log: every command sent and every error, in a size-rotated file.
//!
//! [`RunLog`] is an explicit handle passed to the session and the
//! provisioning driver. Each record is written to the run log sink as
//! `timestamp - LEVEL - message` and forwarded to the `log` facade so it
//! also reaches the console through `env_logger`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use log::Level;

use crate::error::ConfigError;

/// Size at which the active log file is rotated.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Rotated files kept next to the active one.
pub const DEFAULT_BACKUPS: usize = 5;

/// Append-only writer that rotates `name.log` → `name.log.1` → … once the
/// active file would exceed `max_bytes`.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            written,
            max_bytes,
            backups,
        })
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Shared handle to the run log.
#[derive(Clone)]
pub struct RunLog {
    sink: Option<Sink>,
}

impl RunLog {
    /// Log into any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    /// Log only through the `log` facade.
    pub fn console_only() -> Self {
        Self { sink: None }
    }

    /// Open the rotating run log file.
    ///
    /// Unless `keep_existing` is set, the active log left over from a
    /// previous run is removed first. Its rotated backups are kept.
    pub fn open_file(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        backups: usize,
        keep_existing: bool,
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        let to_err = |source| ConfigError::LogFile {
            path: path.clone(),
            source,
        };

        if !keep_existing && path.exists() {
            fs::remove_file(&path).map_err(to_err)?;
        }

        let file = RotatingFile::open(path.clone(), max_bytes, backups).map_err(to_err)?;
        Ok(Self::new(file))
    }

    /// Record an informational line.
    pub fn info(&self, message: impl AsRef<str>) {
        self.record(Level::Info, message.as_ref());
    }

    /// Record a warning.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.record(Level::Warn, message.as_ref());
    }

    /// Record an error.
    pub fn error(&self, message: impl AsRef<str>) {
        self.record(Level::Error, message.as_ref());
    }

    fn record(&self, level: Level, message: &str) {
        log::log!(target: "ferrolt::run", level, "{}", message);

        let Some(sink) = &self.sink else {
            return;
        };
        let line = format_line(&Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string(), level, message);
        match sink.lock() {
            Ok(mut writer) => {
                let written = writer.write_all(line.as_bytes());
                if let Err(e) = written.and_then(|()| writer.flush()) {
                    log::warn!("Failed to write run log: {}", e);
                }
            }
            Err(_) => log::warn!("Run log sink poisoned; dropping record"),
        }
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("sink", &self.sink.as_ref().map(|_| "<writer>"))
            .finish()
    }
}

fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("{} - {} - {}\n", timestamp, level.as_str().to_uppercase(), message)
}

/// Install `env_logger` for console output (`RUST_LOG` overrides `info`).
pub fn init_console() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}
