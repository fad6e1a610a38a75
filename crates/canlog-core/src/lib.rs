//! Client-side state sync and batch operations for the CAN bus data logger.
//!
//! This crate talks to the logger's JSON REST API and keeps the client's
//! view of the device consistent across load, edit and save round-trips.
//! It is renderer-agnostic: form state is plain data, and user feedback is a
//! stream of transient notices.
//!
//! # Features
//!
//! - **API client**: authenticated requests with a shared, editable token
//! - **Configuration mirror**: project the device config into form state and
//!   collect it back into a full payload without losing passthrough fields
//! - **WiFi scan**: ranked networks and per-slot suggestion lists
//! - **File registry**: client-side filtering with a selection set that
//!   survives re-filtering
//! - **Batch operations**: spaced downloads and sequential deletes over the
//!   selection
//! - **Polling**: independent repeating status and scan tasks
//! - **Mock device**: in-memory [`DeviceApi`] for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use canlog_core::{Session, SessionOptions, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::connect(
//!         "http://192.168.4.1",
//!         TokenStore::in_memory(""),
//!         SessionOptions::default(),
//!     )?;
//!     session.start().await;
//!
//!     // Edit a bus and save the full configuration.
//!     session
//!         .config()
//!         .edit(|form| {
//!             if let Some(bus) = form.bus_mut(0) {
//!                 bus.logging = true;
//!             }
//!         })
//!         .await;
//!     session.config().save_form().await;
//!
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod control;
pub mod error;
pub mod files;
pub mod form;
pub mod mirror;
pub mod mock;
pub mod notice;
pub mod scan;
pub mod schedule;
pub mod selection;
pub mod session;
pub mod status;
pub mod token;
pub mod traits;

// Re-export the model crate
pub use canlog_types::types;

pub use batch::{BatchReport, BatchRunner, Confirm, DeleteOutcome, DownloadOpener};
pub use client::{ApiClient, TOKEN_HEADER};
pub use control::{DeviceControl, parse_time_input};
pub use error::{Error, Result};
pub use files::{FileRegistry, FileRow, FilterOption, filter_options};
pub use form::{BusForm, ConfigForm, WifiForm};
pub use mirror::ConfigMirror;
pub use mock::MockDevice;
pub use notice::{Notice, NoticeBoard, NoticeLevel, NoticeReceiver};
pub use scan::{SlotSuggestions, Suggestion, WifiScanner, rank_networks};
pub use schedule::RepeatingTask;
pub use selection::SelectionSet;
pub use session::{Session, SessionOptions};
pub use status::StatusPoller;
pub use token::{NoPersistence, TokenPersistence, TokenStore};
pub use traits::DeviceApi;

pub use canlog_types::{
    Bitrate, BusConfig, CanCounters, DeviceConfig, FileFilter, FileFlags, GlobalConfig, LogFile,
    LoggingStats, ParseError, StatusSnapshot, StorageStats, WifiCredentials, WifiNetwork,
};
