//! Editable form state and its conversion to and from [`DeviceConfig`].
//!
//! [`project`] and [`collect`] are pure: the configuration mirror calls them,
//! but they need no device and no renderer.
//!
//! Only the fields a user may edit appear in [`ConfigForm`]. Bus ids, the bus
//! set, passthrough fields and the device-owned manual clock are taken from
//! the mirror on collect.

use canlog_types::{
    BUS_NAME_MAX_LEN, BYTES_PER_MB, Bitrate, BusConfig, DeviceConfig, GlobalConfig,
    WIFI_SLOT_COUNT, WifiCredentials,
};

/// Editable fields of one bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusForm {
    /// Identifies the bus; not editable.
    pub id: u8,
    pub enabled: bool,
    pub bitrate: Bitrate,
    pub read_only: bool,
    pub logging: bool,
    pub name: String,
}

impl From<&BusConfig> for BusForm {
    fn from(bus: &BusConfig) -> Self {
        Self {
            id: bus.id,
            enabled: bus.enabled,
            bitrate: bus.bitrate,
            read_only: bus.read_only,
            logging: bus.logging,
            name: bus.name.clone(),
        }
    }
}

/// Typed values of one WiFi slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiForm {
    pub ssid: String,
    pub password: String,
}

/// Everything the user can edit on the configuration screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    /// One entry per fetched bus, in device order.
    pub buses: Vec<BusForm>,
    pub wifi: [WifiForm; WIFI_SLOT_COUNT],
    pub wifi_sta_enabled: bool,
    pub max_file_size_mb: i64,
    pub low_space_mb: i64,
    pub upload_url: String,
    pub can_time_sync: bool,
}

impl ConfigForm {
    /// The form of bus `id`, if the device reported it.
    pub fn bus_mut(&mut self, id: u8) -> Option<&mut BusForm> {
        self.buses.iter_mut().find(|b| b.id == id)
    }

    pub fn bus(&self, id: u8) -> Option<&BusForm> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// WiFi slot `index` (0-based).
    pub fn wifi_slot_mut(&mut self, index: usize) -> Option<&mut WifiForm> {
        self.wifi.get_mut(index)
    }
}

/// Project a fetched configuration into form state.
pub fn project(config: &DeviceConfig) -> ConfigForm {
    let global = &config.global;
    ConfigForm {
        buses: config.buses.iter().map(BusForm::from).collect(),
        wifi: global.wifi.clone().map(|slot| WifiForm {
            ssid: slot.ssid,
            password: slot.password,
        }),
        wifi_sta_enabled: global.wifi_sta_enabled,
        max_file_size_mb: bytes_to_mb(global.max_file_size_bytes),
        low_space_mb: bytes_to_mb(global.low_space_threshold_bytes),
        upload_url: global.upload_url.clone(),
        can_time_sync: global.can_time_sync,
    }
}

/// Rebuild a full configuration payload from form state.
///
/// The bus set and order come from `mirror`. A mirrored bus with no form
/// entry keeps its mirrored values. Form entries for unknown ids are ignored.
pub fn collect(mirror: &DeviceConfig, form: &ConfigForm) -> DeviceConfig {
    let buses = mirror
        .buses
        .iter()
        .map(|bus| match form.bus(bus.id) {
            Some(edit) => BusConfig {
                id: bus.id,
                enabled: edit.enabled,
                bitrate: edit.bitrate,
                read_only: edit.read_only,
                logging: edit.logging,
                name: clamp_name(edit.name.trim()),
            },
            None => bus.clone(),
        })
        .collect();

    let wifi = form.wifi.clone().map(|slot| WifiCredentials {
        ssid: slot.ssid.trim().to_string(),
        password: slot.password,
    });

    let source = &mirror.global;
    DeviceConfig {
        global: GlobalConfig {
            max_file_size_bytes: mb_to_bytes(form.max_file_size_mb.max(1)),
            low_space_threshold_bytes: mb_to_bytes(form.low_space_mb.max(0)),
            wifi_count: wifi_count(&wifi),
            wifi_sta_enabled: form.wifi_sta_enabled,
            wifi,
            upload_url: form.upload_url.trim().to_string(),
            influx_url: source.influx_url.clone(),
            influx_token: source.influx_token.clone(),
            api_token: source.api_token.clone(),
            dbc_name: source.dbc_name.clone(),
            can_time_sync: form.can_time_sync,
            manual_time_epoch: None,
        },
        buses,
    }
}

/// 1-based index of the last slot with a non-empty ssid, 0 if none.
///
/// Empty slots before the last used one are allowed.
pub fn wifi_count(slots: &[WifiCredentials]) -> u8 {
    slots
        .iter()
        .rposition(|slot| !slot.ssid.trim().is_empty())
        .map_or(0, |index| (index + 1) as u8)
}

/// Rounds to the nearest MB, half up. Saturates instead of overflowing.
fn bytes_to_mb(bytes: u64) -> i64 {
    let mb = bytes / BYTES_PER_MB + u64::from(bytes % BYTES_PER_MB >= BYTES_PER_MB / 2);
    i64::try_from(mb).unwrap_or(i64::MAX)
}

fn mb_to_bytes(mb: i64) -> u64 {
    (mb.max(0) as u64).saturating_mul(BYTES_PER_MB)
}

fn clamp_name(name: &str) -> String {
    name.chars().take(BUS_NAME_MAX_LEN).collect()
}
