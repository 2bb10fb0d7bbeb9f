//! Rolling Logger
//!
//! File logger for desktop backends:
//! - writes formatted records to `<log_dir>/<app_name>.log`
//! - rotates the file once it grows past a size limit, keeping a few old files
//! - keeps the most recent lines in a circular buffer for in-app display
//!
//! `log` records emitted by library code are bridged into the same subscriber.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::MakeWriter;

/// Rotate once the active file exceeds this many bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;
/// Number of rotated files kept next to the active one
pub const DEFAULT_MAX_FILES: usize = 3;
/// Lines kept in memory for `recent_logs`
pub const DEFAULT_BUFFER_LINES: usize = 500;

static GLOBAL: OnceLock<RollingWriter> = OnceLock::new();

/// Rotation settings
#[derive(Debug, Clone)]
pub struct RollingConfig {
    pub max_file_size: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

struct RollingState {
    dir: PathBuf,
    app_name: String,
    config: RollingConfig,
    file: File,
    written: u64,
    recent: VecDeque<String>,
    partial: String,
}

impl RollingState {
    fn open(dir: &Path, app_name: &str, config: RollingConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            config,
            file,
            written,
            recent: VecDeque::new(),
            partial: String::new(),
        })
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.app_name, index))
    }

    /// Shift `app.N.log` -> `app.N+1.log`, dropping the oldest, and reopen the active file
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.config.max_files == 0 {
            self.file = File::create(self.active_path())?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.rotated_path(self.config.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.config.max_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        fs::rename(self.active_path(), self.rotated_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(self.active_path())?;
        self.written = 0;
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.config.max_file_size {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }

    fn remember(&mut self, buf: &[u8]) {
        if self.config.buffer_lines == 0 {
            return;
        }
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if self.recent.len() == self.config.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line);
        }
    }
}

/// Shared handle that the subscriber clones for each record
#[derive(Clone)]
pub struct RollingWriter {
    state: Arc<Mutex<RollingState>>,
}

impl RollingWriter {
    pub fn new(dir: impl AsRef<Path>, app_name: &str, config: RollingConfig) -> io::Result<Self> {
        let state = RollingState::open(dir.as_ref(), app_name, config)?;
        Ok(Self { state: Arc::new(Mutex::new(state)) })
    }

    /// Most recent lines, oldest first
    pub fn recent(&self) -> Vec<String> {
        match self.state.lock() {
            Ok(state) => state.recent.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer poisoned"))?;
        state.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global subscriber writing to `<log_dir>/<app_name>.log`.
///
/// Fails if a global subscriber (or `log` logger) was already installed.
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, RollingConfig::default())
}

pub fn init_logger_with(log_dir: PathBuf, app_name: &str, config: RollingConfig) -> Result<(), String> {
    let writer = RollingWriter::new(&log_dir, app_name, config)
        .map_err(|e| format!("Failed to open log file in {}: {}", log_dir.display(), e))?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    let _ = GLOBAL.set(writer);
    log::info!(
        "{} logging started at {}",
        app_name,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

/// Log an informational message through the installed subscriber
pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

/// Log an error message through the installed subscriber
pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// Lines retained by the circular buffer (empty before `init_logger`)
pub fn recent_logs() -> Vec<String> {
    GLOBAL.get().map(|w| w.recent()).unwrap_or_default()
}

fn ensure_initialized() -> Result<(), String> {
    if GLOBAL.get().is_some() {
        Ok(())
    } else {
        Err("Logger not initialized".to_string())
    }
}
