//! Dual console and file logger.
//!
//! This module implements the [`log`] crate's logging facade, writing log
//! messages to both the console (terminal/debug output) and `log.txt`, which
//! lands on the SD card when running on the V5 Brain.
//!
//! # Usage
//!
//! Initialize the logger once at the start of your program:
//!
//! ```ignore
//! use highstakes::fs::logger;
//! use log::{info, LevelFilter};
//!
//! #[vexide::main]
//! async fn main(peripherals: Peripherals) {
//!     if let Err(e) = logger::init(LevelFilter::Info) {
//!         println!("Logger init failed: {}", e);
//!     }
//!     info!("Program started");
//! }
//! ```
//!
//! # Log Output
//!
//! Each entry holds the level, the time since program start, the target
//! (module path) and the message:
//!
//! ```text
//! INFO [1m 12s 340ms] highstakes::mechanisms::auto_clamp - Goal detected, clamping
//! WARN [1m 13s 20ms] highstakes::peripherals - Goal Sensor Read Error: device disconnected
//! ```

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    sync::{Mutex, OnceLock},
    time::Duration,
};

use humantime::{FormattedDuration, format_duration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Writes log lines to the console and to `log.txt`.
///
/// The file is created or truncated when the logger is initialized.
pub struct RobotLogger {
    /// `None` if the file could not be opened (e.g. no SD card present).
    file_writer: Mutex<Option<BufWriter<std::fs::File>>>,
}

impl RobotLogger {
    fn new() -> Self {
        let file_writer = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open("log.txt")
            .ok()
            .map(BufWriter::new);

        Self {
            file_writer: Mutex::new(file_writer),
        }
    }
}

impl log::Log for RobotLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_line = format_line(record, uptime());

            print!("{}", log_line);

            if let Ok(mut writer_guard) = self.file_writer.lock() {
                if let Some(ref mut writer) = *writer_guard {
                    let _ = writer.write_all(log_line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(ref mut writer) = *writer_guard {
                let _ = writer.flush();
            }
        }
    }
}

static LOGGER: OnceLock<RobotLogger> = OnceLock::new();

/// Installs the logger.
///
/// Call once before any logging macros are used. Messages below `level` are
/// dropped.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    start_time();
    let logger = LOGGER.get_or_init(RobotLogger::new);
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

fn format_line(record: &Record, elapsed: Duration) -> String {
    format!(
        "{} [{}] {} - {}\n",
        record.level(),
        timestamp(elapsed),
        record.target(),
        record.args()
    )
}

/// Rounds to milliseconds so the timestamps stay short.
fn timestamp(elapsed: Duration) -> FormattedDuration {
    format_duration(Duration::from_millis(elapsed.as_millis() as u64))
}

#[cfg(target_os = "vexos")]
fn start_time() {}

#[cfg(target_os = "vexos")]
fn uptime() -> Duration { vexide::time::user_uptime() }

#[cfg(not(target_os = "vexos"))]
static START: OnceLock<std::time::Instant> = OnceLock::new();

#[cfg(not(target_os = "vexos"))]
fn start_time() { START.get_or_init(std::time::Instant::now); }

/// Time since the logger was initialized when not running on the brain.
#[cfg(not(target_os = "vexos"))]
fn uptime() -> Duration {
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
}
