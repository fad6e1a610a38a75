//! Mock device implementation for testing.
//!
//! This module provides an in-memory data logger that can be used for unit
//! testing without a device on the network.
//!
//! The [`MockDevice`] implements the [`DeviceApi`] trait, allowing it to be
//! used interchangeably with the HTTP client in session components.
//!
//! # Features
//!
//! - **Call log**: every trait call is recorded, so tests can assert request
//!   order and count
//! - **Failure injection**: fail every call, or only file actions on
//!   specific ids
//! - **Latency simulation**: add artificial delays to each call

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use canlog_types::{
    Bitrate, BusConfig, CanCounters, DeviceConfig, FileFlags, GlobalConfig, LogFile,
    StatusSnapshot, WifiCredentials, WifiNetwork,
};

use crate::error::{Error, Result};
use crate::traits::DeviceApi;

/// An in-memory data logger for testing.
///
/// # Example
///
/// ```
/// use canlog_core::{DeviceApi, MockDevice};
///
/// #[tokio::main]
/// async fn main() {
///     let device = MockDevice::new();
///     device.set_files(vec![MockDevice::sample_file(1, 0)]).await;
///
///     let files = device.files().await.unwrap();
///     assert_eq!(files.len(), 1);
///     assert_eq!(device.calls(), vec!["files".to_string()]);
/// }
/// ```
pub struct MockDevice {
    status: RwLock<StatusSnapshot>,
    config: RwLock<DeviceConfig>,
    networks: RwLock<Vec<WifiNetwork>>,
    files: RwLock<Vec<LogFile>>,
    calls: Mutex<Vec<String>>,
    should_fail: AtomicBool,
    fail_status: AtomicU16,
    failing_ids: Mutex<HashSet<String>>,
    /// Simulated latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("calls", &self.calls().len())
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a mock device with a two-bus sample configuration.
    pub fn new() -> Self {
        Self::with_config(Self::sample_config())
    }

    /// Create a mock device serving `config`.
    pub fn with_config(config: DeviceConfig) -> Self {
        Self {
            status: RwLock::new(Self::sample_status()),
            config: RwLock::new(config),
            networks: RwLock::new(Vec::new()),
            files: RwLock::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_status: AtomicU16::new(500),
            failing_ids: Mutex::new(HashSet::new()),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Configuration with buses 0 and 1 and one WiFi slot in use.
    pub fn sample_config() -> DeviceConfig {
        DeviceConfig {
            global: GlobalConfig {
                max_file_size_bytes: 64 * 1024 * 1024,
                low_space_threshold_bytes: 16 * 1024 * 1024,
                wifi_count: 1,
                wifi_sta_enabled: true,
                wifi: [
                    WifiCredentials::new("workshop", "canbus123"),
                    WifiCredentials::default(),
                    WifiCredentials::default(),
                ],
                upload_url: "http://collector.local/upload".to_string(),
                influx_url: "http://influx.local:8086".to_string(),
                influx_token: "influx-secret".to_string(),
                api_token: "device-token".to_string(),
                dbc_name: "vehicle.dbc".to_string(),
                can_time_sync: true,
                manual_time_epoch: Some(0),
            },
            buses: vec![
                BusConfig {
                    id: 0,
                    enabled: true,
                    bitrate: Bitrate::Kbps500,
                    read_only: true,
                    logging: true,
                    name: "powertrain".to_string(),
                },
                BusConfig {
                    id: 1,
                    enabled: false,
                    bitrate: Bitrate::Kbps250,
                    read_only: true,
                    logging: false,
                    name: "body".to_string(),
                },
            ],
        }
    }

    fn sample_status() -> StatusSnapshot {
        StatusSnapshot {
            uptime_sec: 3_600,
            wifi_connected: true,
            ip: "192.168.4.1".to_string(),
            ssid: "workshop".to_string(),
            rssi_percent: 70,
            rssi_dbm: -60,
            can: vec![
                CanCounters {
                    bus: 0,
                    drops: 0,
                    high_water: 4,
                },
                CanCounters {
                    bus: 1,
                    drops: 0,
                    high_water: 0,
                },
            ],
            ..Default::default()
        }
    }

    /// A log file on `bus_id` with the given id.
    pub fn sample_file(id: u32, bus_id: u8) -> LogFile {
        LogFile {
            id,
            bus_id,
            path: format!("/logs/bus{}/{:04}.can", bus_id, id),
            size_bytes: 1024 * u64::from(id + 1),
            start_ms: 1_000 * u64::from(id),
            end_ms: 1_000 * u64::from(id) + 500,
            checksum: 0xC0FFEE ^ id,
            flags: FileFlags::default(),
        }
    }

    // --- State setters ---

    /// Replace the served configuration.
    pub async fn set_config(&self, config: DeviceConfig) {
        *self.config.write().await = config;
    }

    /// Replace the served status.
    pub async fn set_status(&self, status: StatusSnapshot) {
        *self.status.write().await = status;
    }

    /// Replace the served scan results.
    pub async fn set_networks(&self, networks: Vec<WifiNetwork>) {
        *self.networks.write().await = networks;
    }

    /// Replace the stored files.
    pub async fn set_files(&self, files: Vec<LogFile>) {
        *self.files.write().await = files;
    }

    // --- Failure injection ---

    /// Make every call fail with `RequestFailed`.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Status code reported by injected failures.
    pub fn set_fail_status(&self, status: u16) {
        self.fail_status.store(status, Ordering::Relaxed);
    }

    /// Make file actions on `id` fail.
    pub fn fail_file(&self, id: &str) {
        self.failing_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    // --- Inspection ---

    /// Every call made so far, e.g. `"delete_file:3"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls whose log entry starts with `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// The configuration as currently stored on the mock.
    pub async fn current_config(&self) -> DeviceConfig {
        self.config.read().await.clone()
    }

    /// The files as currently stored on the mock.
    pub async fn current_files(&self) -> Vec<LogFile> {
        self.files.read().await.clone()
    }

    async fn begin(&self, call: String) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(self.failure());
        }
        Ok(())
    }

    fn failure(&self) -> Error {
        Error::RequestFailed {
            status: self.fail_status.load(Ordering::Relaxed),
        }
    }

    fn check_file(&self, id: &str) -> Result<()> {
        let failing = self.failing_ids.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(id) {
            return Err(self.failure());
        }
        Ok(())
    }

    async fn file_index(&self, id: &str) -> Result<usize> {
        let files = self.files.read().await;
        files
            .iter()
            .position(|f| f.key() == id)
            .ok_or(Error::RequestFailed { status: 404 })
    }
}

#[async_trait]
impl DeviceApi for MockDevice {
    async fn status(&self) -> Result<StatusSnapshot> {
        self.begin("status".to_string()).await?;
        Ok(self.status.read().await.clone())
    }

    async fn config(&self) -> Result<DeviceConfig> {
        self.begin("config".to_string()).await?;
        Ok(self.config.read().await.clone())
    }

    async fn wifi_scan(&self) -> Result<Vec<WifiNetwork>> {
        self.begin("wifi_scan".to_string()).await?;
        Ok(self.networks.read().await.clone())
    }

    async fn files(&self) -> Result<Vec<LogFile>> {
        self.begin("files".to_string()).await?;
        Ok(self.files.read().await.clone())
    }

    async fn save_config(&self, config: &DeviceConfig) -> Result<()> {
        self.begin("save_config".to_string()).await?;
        *self.config.write().await = config.clone();
        Ok(())
    }

    async fn mark_downloaded(&self, id: &str) -> Result<()> {
        self.begin(format!("mark_downloaded:{}", id)).await?;
        self.check_file(id)?;
        let index = self.file_index(id).await?;
        let mut files = self.files.write().await;
        files[index].flags = files[index].flags | FileFlags::DOWNLOADED;
        Ok(())
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        self.begin(format!("delete_file:{}", id)).await?;
        self.check_file(id)?;
        let index = self.file_index(id).await?;
        self.files.write().await.remove(index);
        Ok(())
    }

    async fn start_logging(&self) -> Result<()> {
        self.begin("start_logging".to_string()).await?;
        self.status.write().await.logging.started = true;
        Ok(())
    }

    async fn stop_logging(&self) -> Result<()> {
        self.begin("stop_logging".to_string()).await?;
        self.status.write().await.logging.started = false;
        Ok(())
    }

    async fn close_active_file(&self) -> Result<()> {
        self.begin("close_active_file".to_string()).await?;
        let mut files = self.files.write().await;
        for file in files.iter_mut() {
            file.flags = FileFlags(file.flags.0 & !FileFlags::ACTIVE.0);
        }
        Ok(())
    }

    async fn set_time(&self, epoch: i64) -> Result<()> {
        self.begin(format!("set_time:{}", epoch)).await?;
        let mut status = self.status.write().await;
        status.time_epoch = epoch;
        status.time_valid = true;
        Ok(())
    }

    fn download_url(&self, id: &str) -> String {
        format!("mock://files/{}/download", id)
    }
}
