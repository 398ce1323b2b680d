//! Session log for the batch tool and the editing engine.
//!
//! One file per run, truncated at start-up.  Lines carry a UTC time of day
//! (with milliseconds) and a level tag:
//!
//! ```text
//! [14:03:22.118] [INFO ] project 6f1c…: loaded 400x300 image
//! ```
//!
//! Default location is `<data dir>/PhotoFE/photofe.log`; `--log-file`
//! overrides it.  Until [`init`] / [`init_at`] runs, and while not verbose,
//! the `log_*!` macros skip formatting entirely, so the library can be
//! embedded and tested without touching the filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
/// Mirror to stderr and let DEBUG through.
static VERBOSE: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Fixed-width tag so columns line up in the file.
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
        }
    }
}

pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Would a line at `level` go anywhere?
pub fn enabled(level: Level) -> bool {
    let verbose = VERBOSE.load(Ordering::Relaxed);
    if level == Level::Debug && !verbose {
        return false;
    }
    verbose || LOG_FILE.get().is_some()
}

pub fn write(level: Level, msg: &str) {
    if !enabled(level) {
        return;
    }
    write_raw(&format_line(&timestamp(), level, msg));
}

fn write_raw(line: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    // I/O errors are dropped: a full disk must not abort an edit
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

fn format_line(ts: &str, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", ts, level.tag(), msg)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::Level::Debug) {
            $crate::logger::write($crate::logger::Level::Debug, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::Level::Info) {
            $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::Level::Warn) {
            $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        if $crate::logger::enabled($crate::logger::Level::Error) {
            $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*));
        }
    };
}

/// Open the log at the platform data directory.
pub fn init() {
    init_at(&data_dir().join("PhotoFE").join("photofe.log"));
}

/// Open (truncate) the log at `path` and hook panics into it.  Only the
/// first call has any effect.
pub fn init_at(path: &Path) {
    if LOG_FILE.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}; continuing without a log file", path.display(), e);
            return;
        }
    };
    let _ = LOG_PATH.set(path.to_path_buf());
    let _ = LOG_FILE.set(Mutex::new(file));

    write_raw(&format!("=== PhotoFE {} run, unix {} ===", env!("CARGO_PKG_VERSION"), unix_seconds()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_raw(&format_line(&timestamp(), Level::Error, &format!("panic: {}", info)));
        prev(info);
    }));
}

fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// `HH:MM:SS.mmm` within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => clock(d.as_millis() as u64),
        Err(_) => "??:??:??.???".to_string(),
    }
}

fn clock(millis: u64) -> String {
    let secs = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        millis % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn lines_have_fixed_width_tags() {
        assert_eq!(format_line("01:02:03.004", Level::Info, "hi"), "[01:02:03.004] [INFO ] hi");
        assert_eq!(format_line("x", Level::Error, "boom"), "[x] [ERROR] boom");
    }

    #[test]
    fn clock_wraps_at_midnight() {
        assert_eq!(clock(0), "00:00:00.000");
        assert_eq!(clock((86_400 + 3661) * 1000 + 7), "01:01:01.007");
    }
}
