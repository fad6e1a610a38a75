//! In-memory mirror of the device configuration.
//!
//! The mirror holds the last fetched [`DeviceConfig`] next to the editable
//! [`ConfigForm`] projected from it. Saving always sends a full payload built
//! by [`form::collect`], so the bus set and passthrough fields are exactly the
//! ones last fetched.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use canlog_types::DeviceConfig;

use crate::error::Error;
use crate::form::{self, ConfigForm};
use crate::notice::NoticeBoard;
use crate::scan::WifiScanner;
use crate::traits::DeviceApi;

#[derive(Debug, Default)]
struct MirrorState {
    mirror: Option<DeviceConfig>,
    form: ConfigForm,
}

/// Configuration mirror and its form state.
pub struct ConfigMirror {
    device: Arc<dyn DeviceApi>,
    scanner: Arc<WifiScanner>,
    notices: NoticeBoard,
    state: RwLock<MirrorState>,
}

impl ConfigMirror {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        scanner: Arc<WifiScanner>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            device,
            scanner,
            notices,
            state: RwLock::new(MirrorState::default()),
        }
    }

    /// Fetch the configuration, replace the mirror and re-project the form.
    ///
    /// On success a WiFi scan refresh is started in the background and its
    /// handle returned; callers may drop it. On failure a notice is posted
    /// and the previous mirror and form are kept.
    pub async fn load(&self) -> Option<JoinHandle<()>> {
        let config = match self.device.config().await {
            Ok(config) => config,
            Err(e) => {
                self.notices.failure(&e);
                return None;
            }
        };

        debug!(buses = config.buses.len(), "Configuration loaded");
        {
            let mut state = self.state.write().await;
            state.form = form::project(&config);
            state.mirror = Some(config);
        }
        Some(self.scanner.trigger())
    }

    /// Build a full payload from the current form, or `None` before the first load.
    pub async fn collect(&self) -> Option<DeviceConfig> {
        let state = self.state.read().await;
        state
            .mirror
            .as_ref()
            .map(|mirror| form::collect(mirror, &state.form))
    }

    /// Replace the configuration on the device, then reload it.
    ///
    /// Returns whether the device accepted the payload. A rejected payload
    /// leaves the form untouched so edits can be retried.
    pub async fn save(&self, payload: &DeviceConfig) -> bool {
        if let Err(e) = self.device.save_config(payload).await {
            self.notices.failure(&e);
            return false;
        }

        info!(buses = payload.buses.len(), "Configuration saved");
        self.notices.ok("Config saved");
        // The scan refresh runs detached.
        let _ = self.load().await;
        true
    }

    /// Collect the current form and save it.
    pub async fn save_form(&self) -> bool {
        match self.collect().await {
            Some(payload) => self.save(&payload).await,
            None => {
                self.notices.failure(&Error::NotLoaded);
                false
            }
        }
    }

    /// Apply an edit to the form state.
    pub async fn edit<F>(&self, f: F)
    where
        F: FnOnce(&mut ConfigForm),
    {
        let mut state = self.state.write().await;
        f(&mut state.form);
    }

    /// Current form state.
    pub async fn form(&self) -> ConfigForm {
        self.state.read().await.form.clone()
    }

    /// Last fetched configuration.
    pub async fn mirror(&self) -> Option<DeviceConfig> {
        self.state.read().await.mirror.clone()
    }

    /// Whether a configuration has been fetched.
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.mirror.is_some()
    }
}

impl std::fmt::Debug for ConfigMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMirror").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use canlog_types::{Bitrate, WifiNetwork};

    fn setup() -> (Arc<MockDevice>, NoticeBoard, ConfigMirror) {
        let device = Arc::new(MockDevice::new());
        let notices = NoticeBoard::default();
        let scanner = Arc::new(WifiScanner::new(device.clone(), notices.clone()));
        let mirror = ConfigMirror::new(device.clone(), scanner, notices.clone());
        (device, notices, mirror)
    }

    #[tokio::test]
    async fn test_collect_before_load_is_none() {
        let (_, _, mirror) = setup();
        assert!(!mirror.is_loaded().await);
        assert!(mirror.collect().await.is_none());
    }

    #[tokio::test]
    async fn test_load_projects_and_triggers_scan() {
        let (device, _, mirror) = setup();
        device
            .set_networks(vec![WifiNetwork {
                ssid: "yard".to_string(),
                rssi_percent: 55,
                ..Default::default()
            }])
            .await;

        let scan = mirror.load().await.unwrap();
        scan.await.unwrap();

        let form = mirror.form().await;
        assert_eq!(form.buses.len(), 2);
        assert_eq!(form.wifi[0].ssid, "workshop");
        assert_eq!(device.call_count("wifi_scan"), 1);
    }

    #[tokio::test]
    async fn test_reload_replaces_form_with_device_state() {
        let (device, _, mirror) = setup();
        mirror.load().await.unwrap().await.unwrap();
        mirror.edit(|form| form.upload_url = "local edit".to_string()).await;

        let mut changed = MockDevice::sample_config();
        changed.buses.truncate(1);
        changed.global.max_file_size_bytes = u64::MAX;
        device.set_config(changed.clone()).await;

        mirror.load().await.unwrap().await.unwrap();
        let form = mirror.form().await;
        assert_eq!(form.buses.len(), 1);
        assert_eq!(form.upload_url, changed.global.upload_url);
        assert!(form.max_file_size_mb > 0);
        assert_eq!(mirror.mirror().await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_state() {
        let (device, notices, mirror) = setup();
        let _ = mirror.load().await;
        mirror.edit(|form| form.upload_url = "edited".to_string()).await;

        device.set_should_fail(true);
        assert!(mirror.load().await.is_none());
        assert_eq!(mirror.form().await.upload_url, "edited");
        assert!(notices.current().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_save_puts_then_reloads() {
        let (device, notices, mirror) = setup();
        mirror.load().await.unwrap().await.unwrap();
        mirror
            .edit(|form| {
                let bus = form.bus_mut(1).unwrap();
                bus.enabled = true;
                bus.bitrate = Bitrate::Kbps125;
            })
            .await;
        device.clear_calls();

        assert!(mirror.save_form().await);
        let calls = device.calls();
        assert_eq!(calls[0], "save_config");
        assert_eq!(calls[1], "config");

        let stored = device.current_config().await;
        assert_eq!(stored.bus_ids(), vec![0, 1]);
        assert!(stored.bus(1).unwrap().enabled);
        assert_eq!(stored.global.api_token, "device-token");
        assert_eq!(mirror.mirror().await.unwrap(), stored);
        assert_eq!(notices.current().unwrap().message, "Config saved");
    }

    #[tokio::test]
    async fn test_save_failure_keeps_edits() {
        let (device, notices, mirror) = setup();
        mirror.load().await.unwrap().await.unwrap();
        mirror.edit(|form| form.can_time_sync = false).await;

        device.set_should_fail(true);
        device.clear_calls();
        assert!(!mirror.save_form().await);
        assert_eq!(device.calls(), vec!["save_config"]);
        assert!(!mirror.form().await.can_time_sync);
        assert_eq!(notices.current().unwrap().message, "Request failed: 500");
    }

    #[tokio::test]
    async fn test_save_form_before_load() {
        let (device, notices, mirror) = setup();
        assert!(!mirror.save_form().await);
        assert_eq!(device.call_count("save_config"), 0);
        assert_eq!(
            notices.current().unwrap().message,
            "Configuration not loaded"
        );
    }
}
