//! Platform-agnostic types for the CAN bus data logger.
//!
//! This crate provides the REST model shared by the client library
//! (canlog-core) and any front end that renders it.
//!
//! # Features
//!
//! - Device configuration (global settings, per-bus settings, WiFi slots)
//! - Status snapshots and counters
//! - Log file listing entries and filters
//! - Error types for model conversions
//!
//! # Example
//!
//! ```
//! use canlog_types::{Bitrate, FileFilter};
//!
//! let bitrate = Bitrate::try_from(250_000).unwrap();
//! assert_eq!(bitrate.label(), "250 kbit/s");
//! assert_eq!("3".parse::<FileFilter>().unwrap(), FileFilter::Bus(3));
//! ```

pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::{
    BYTES_PER_MB, BUS_NAME_MAX_LEN, Bitrate, BusConfig, CanCounters, DeviceConfig, FileFilter,
    FileFlags, GlobalConfig, LogFile, LoggingStats, MAX_BUSES, StatusSnapshot, StorageStats,
    WIFI_SLOT_COUNT, WifiCredentials, WifiNetwork, wifi_slots_from,
};
