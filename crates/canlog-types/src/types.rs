//! Core types for the data logger REST model.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Number of WiFi credential slots in the global configuration.
pub const WIFI_SLOT_COUNT: usize = 3;

/// Maximum length of a bus name, in characters.
pub const BUS_NAME_MAX_LEN: usize = 16;

/// Number of bus ids the device can report (0..=5).
pub const MAX_BUSES: u8 = 6;

/// One megabyte as used by the logging thresholds.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Supported CAN bus bitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "u32", into = "u32")
)]
#[repr(u32)]
pub enum Bitrate {
    /// 125 kbit/s.
    Kbps125 = 125_000,
    /// 250 kbit/s.
    Kbps250 = 250_000,
    /// 500 kbit/s.
    #[default]
    Kbps500 = 500_000,
    /// 1 Mbit/s.
    Mbps1 = 1_000_000,
}

impl Bitrate {
    /// All bitrates in ascending order.
    pub const ALL: [Bitrate; 4] = [
        Bitrate::Kbps125,
        Bitrate::Kbps250,
        Bitrate::Kbps500,
        Bitrate::Mbps1,
    ];

    /// Bits per second.
    #[must_use]
    pub fn as_bps(self) -> u32 {
        self as u32
    }

    /// Human readable label, e.g. `"250 kbit/s"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Bitrate::Kbps125 => "125 kbit/s",
            Bitrate::Kbps250 => "250 kbit/s",
            Bitrate::Kbps500 => "500 kbit/s",
            Bitrate::Mbps1 => "1 Mbit/s",
        }
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Bitrate::ALL
            .into_iter()
            .find(|b| b.as_bps() == value)
            .ok_or(ParseError::UnsupportedBitrate(value))
    }
}

impl From<Bitrate> for u32 {
    fn from(value: Bitrate) -> Self {
        value.as_bps()
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configuration of a single CAN bus.
///
/// The `id` is assigned by the device and is stable across fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    pub id: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bitrate: Bitrate,
    #[cfg_attr(feature = "serde", serde(default))]
    pub read_only: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub logging: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
}

/// One WiFi station credential slot. An empty `ssid` marks the slot unused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    /// Create a credential slot.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Whether the slot holds a network.
    #[must_use]
    pub fn is_used(&self) -> bool {
        !self.ssid.is_empty()
    }
}

/// Device-wide settings.
///
/// `influx_url`, `influx_token`, `api_token` and `dbc_name` are passthrough
/// fields: clients store and re-send them but never edit them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GlobalConfig {
    pub max_file_size_bytes: u64,
    pub low_space_threshold_bytes: u64,
    pub wifi_count: u8,
    pub wifi_sta_enabled: bool,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "deserialize_wifi_slots"))]
    pub wifi: [WifiCredentials; WIFI_SLOT_COUNT],
    pub upload_url: String,
    pub influx_url: String,
    pub influx_token: String,
    pub api_token: String,
    pub dbc_name: String,
    pub can_time_sync: bool,
    /// Device-owned manual clock value; read-only for clients.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub manual_time_epoch: Option<i64>,
}

/// Pad or truncate a list of credentials to exactly [`WIFI_SLOT_COUNT`] slots.
#[must_use]
pub fn wifi_slots_from(entries: Vec<WifiCredentials>) -> [WifiCredentials; WIFI_SLOT_COUNT] {
    let mut slots: [WifiCredentials; WIFI_SLOT_COUNT] = Default::default();
    for (slot, entry) in slots.iter_mut().zip(entries) {
        *slot = entry;
    }
    slots
}

#[cfg(feature = "serde")]
fn deserialize_wifi_slots<'de, D>(
    deserializer: D,
) -> Result<[WifiCredentials; WIFI_SLOT_COUNT], D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<WifiCredentials>> = Option::deserialize(deserializer)?;
    Ok(wifi_slots_from(entries.unwrap_or_default()))
}

/// Full device configuration as served by `GET /api/config`.
///
/// Bus count and ids are decided by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DeviceConfig {
    pub global: GlobalConfig,
    pub buses: Vec<BusConfig>,
}

impl DeviceConfig {
    /// Bus ids in device order.
    #[must_use]
    pub fn bus_ids(&self) -> Vec<u8> {
        self.buses.iter().map(|b| b.id).collect()
    }

    /// Look up a bus by id.
    #[must_use]
    pub fn bus(&self, id: u8) -> Option<&BusConfig> {
        self.buses.iter().find(|b| b.id == id)
    }
}

/// A network visible to the device's WiFi scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WifiNetwork {
    pub ssid: String,
    pub rssi_percent: u8,
    pub rssi_dbm: i32,
    pub channel: u8,
    pub secure: bool,
}

/// Bit set describing a log file's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct FileFlags(pub u32);

impl FileFlags {
    pub const DOWNLOADED: FileFlags = FileFlags(1);
    pub const UPLOADED: FileFlags = FileFlags(2);
    pub const ACTIVE: FileFlags = FileFlags(4);

    /// Whether every bit in `other` is set.
    #[must_use]
    pub fn contains(self, other: FileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set bits, in bit order.
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        [
            (FileFlags::DOWNLOADED, "downloaded"),
            (FileFlags::UPLOADED, "uploaded"),
            (FileFlags::ACTIVE, "active"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, label)| label)
        .collect()
    }
}

impl core::ops::BitOr for FileFlags {
    type Output = FileFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        FileFlags(self.0 | rhs.0)
    }
}

/// A recorded log segment on the device's storage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogFile {
    pub id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bus_id: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub size_bytes: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_ms: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub end_ms: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub checksum: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: FileFlags,
}

impl LogFile {
    /// Identifier as used by selection sets and file endpoints.
    #[must_use]
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    /// Last path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Which files a listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FileFilter {
    #[default]
    All,
    Bus(u8),
}

impl FileFilter {
    /// Whether `file` passes this filter.
    #[must_use]
    pub fn matches(self, file: &LogFile) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Bus(id) => file.bus_id == id,
        }
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFilter::All => f.write_str("all"),
            FileFilter::Bus(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for FileFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(FileFilter::All);
        }
        trimmed
            .parse::<u8>()
            .map(FileFilter::Bus)
            .map_err(|_| ParseError::InvalidFilter(s.to_string()))
    }
}

/// Per-bus CAN receive counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CanCounters {
    pub bus: u8,
    pub drops: u64,
    pub high_water: u64,
}

/// Storage capacity as reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct StorageStats {
    pub ready: bool,
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Log writer throughput and failure counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LoggingStats {
    pub started: bool,
    pub total_bytes: u64,
    pub bytes_per_sec: u64,
    pub active_buses: u32,
    pub open_failures: u32,
    pub write_failures: u32,
    pub last_write_ms: u64,
}

/// Read-only device status as served by `GET /api/status`.
///
/// Each poll replaces the previous snapshot entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct StatusSnapshot {
    pub uptime_sec: u64,
    pub wifi_connected: bool,
    pub ip: String,
    pub ssid: String,
    pub rssi_dbm: i32,
    pub rssi_percent: u8,
    pub sta_mode_enabled: bool,
    pub ap_clients: u32,
    pub time_epoch: i64,
    pub time_valid: bool,
    pub logging: LoggingStats,
    pub storage: StorageStats,
    pub can: Vec<CanCounters>,
}
