//! Trait abstraction over the device REST surface.
//!
//! Session components talk to the device only through [`DeviceApi`], so the
//! same code runs against the HTTP [`crate::ApiClient`] and the in-memory
//! [`crate::MockDevice`].

use async_trait::async_trait;

use canlog_types::{DeviceConfig, LogFile, StatusSnapshot, WifiNetwork};

use crate::error::Result;

/// Operations the data logger exposes to a client.
///
/// File ids are passed as strings because that is how the selection set
/// stores them.
///
/// # Example
///
/// ```ignore
/// use canlog_core::{DeviceApi, Result};
///
/// async fn print_uptime<D: DeviceApi>(device: &D) -> Result<()> {
///     let status = device.status().await?;
///     println!("uptime: {}s", status.uptime_sec);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DeviceApi: Send + Sync {
    // --- Reads ---

    /// Fetch the current status snapshot.
    async fn status(&self) -> Result<StatusSnapshot>;

    /// Fetch the full device configuration.
    async fn config(&self) -> Result<DeviceConfig>;

    /// Fetch the networks visible to the device.
    async fn wifi_scan(&self) -> Result<Vec<WifiNetwork>>;

    /// Fetch the full file listing.
    async fn files(&self) -> Result<Vec<LogFile>>;

    // --- Writes ---

    /// Replace the full device configuration.
    async fn save_config(&self, config: &DeviceConfig) -> Result<()>;

    /// Set the downloaded flag on a file.
    async fn mark_downloaded(&self, id: &str) -> Result<()>;

    /// Remove a file from device storage.
    async fn delete_file(&self, id: &str) -> Result<()>;

    // --- Control ---

    async fn start_logging(&self) -> Result<()>;

    async fn stop_logging(&self) -> Result<()>;

    /// Force-close the segment currently being written.
    async fn close_active_file(&self) -> Result<()>;

    /// Set the device clock to `epoch` seconds.
    async fn set_time(&self, epoch: i64) -> Result<()>;

    // --- Downloads ---

    /// Location of a file's binary content.
    fn download_url(&self, id: &str) -> String;
}
