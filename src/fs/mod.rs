//! Filesystem utilities for the V5 Brain.
//!
//! # Logging
//!
//! The `logger` submodule provides a logger that writes to the console and to
//! `log.txt` on the SD card. This is useful for debugging issues that only
//! occur on the robot, such as a sensor dropping out mid-match.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::fs::logger;
//! use log::{info, LevelFilter};
//!
//! let _ = logger::init(LevelFilter::Debug);
//! info!("Robot initialized successfully");
//! ```

/// Console and file logging.
pub mod logger;
