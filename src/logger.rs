//! Per-run log file for the batch front end.
//!
//! `init`/`init_at` open the file once per process and truncate it, so it only
//! holds the latest run. Before that the `log_*!` macros are no-ops, which keeps
//! library use and unit tests off the filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

static SINK: OnceLock<Sink> = OnceLock::new();

/// Path of the open log file, if logging was initialised.
pub fn log_path() -> Option<&'static Path> {
    SINK.get().map(|s| s.path.as_path())
}

/// Append one raw line. I/O errors are dropped.
pub fn write_line(line: &str) {
    if let Some(sink) = SINK.get()
        && let Ok(mut file) = sink.file.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Append `[HH:MM:SS] [LEVEL] msg`.
pub fn write(level: &str, msg: &str) {
    if SINK.get().is_some() {
        write_line(&format!("[{}] [{}] {}", clock(), level, msg));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Open the log at [`default_log_path`].
pub fn init() {
    init_at(&default_log_path());
}

/// Open (truncating) the log at `path` and mirror panics into it.
/// Later calls are ignored.
pub fn init_at(path: &Path) {
    if SINK.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    let _ = SINK.set(Sink { path: path.to_path_buf(), file: Mutex::new(file) });

    write_line(&format!(
        "=== pixelmill {} run started (unix {}) ===",
        env!("CARGO_PKG_VERSION"),
        unix_secs().unwrap_or(0)
    ));

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", clock(), info));
        previous(info);
    }));
}

/// `<data dir>/pixelmill/pixelmill.log`.
pub fn default_log_path() -> PathBuf {
    data_dir().join("pixelmill").join("pixelmill.log")
}

fn data_dir() -> PathBuf {
    let var = |name: &str| std::env::var_os(name).map(PathBuf::from);
    let platform = if cfg!(target_os = "windows") {
        var("APPDATA")
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|h| h.join("Library/Application Support"))
    } else {
        None
    };
    platform
        .or_else(|| var("XDG_DATA_HOME"))
        .or_else(|| var("HOME").map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_secs() -> Option<u64> {
    SystemTime::now().duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// UTC wall clock within the day.
fn clock() -> String {
    match unix_secs() {
        Some(secs) => format!("{:02}:{:02}:{:02}", secs % 86_400 / 3600, secs % 3600 / 60, secs % 60),
        None => "??:??:??".to_string(),
    }
}
