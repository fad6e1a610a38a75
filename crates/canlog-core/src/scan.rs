//! WiFi scan results and per-slot suggestion lists.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use canlog_types::{WIFI_SLOT_COUNT, WifiNetwork};

use crate::notice::NoticeBoard;
use crate::traits::DeviceApi;

/// One pickable entry in a slot's suggestion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Text shown to the user, e.g. `"garage (72%)"`.
    pub label: String,
    /// Value written into the ssid field when picked.
    pub value: String,
}

impl From<&WifiNetwork> for Suggestion {
    fn from(net: &WifiNetwork) -> Self {
        Self {
            label: format!("{} ({}%)", net.ssid, net.rssi_percent),
            value: net.ssid.clone(),
        }
    }
}

/// Suggestion lists, one per WiFi slot.
pub type SlotSuggestions = [Vec<Suggestion>; WIFI_SLOT_COUNT];

/// Drop hidden networks and order by signal, strongest first.
///
/// The sort is stable, so networks with equal signal keep device order.
pub fn rank_networks(mut networks: Vec<WifiNetwork>) -> Vec<WifiNetwork> {
    networks.retain(|net| !net.ssid.is_empty());
    networks.sort_by(|a, b| b.rssi_percent.cmp(&a.rssi_percent));
    networks
}

/// Build the suggestion lists of every slot from ranked networks.
pub fn suggestions_for(networks: &[WifiNetwork]) -> SlotSuggestions {
    let list: Vec<Suggestion> = networks.iter().map(Suggestion::from).collect();
    std::array::from_fn(|_| list.clone())
}

#[derive(Debug, Default)]
struct ScanState {
    networks: Vec<WifiNetwork>,
    suggestions: SlotSuggestions,
}

/// Keeps the latest scan results.
///
/// Overlapping refreshes are not coalesced: whichever response arrives last
/// replaces the state.
pub struct WifiScanner {
    device: Arc<dyn DeviceApi>,
    notices: NoticeBoard,
    state: RwLock<ScanState>,
}

impl WifiScanner {
    pub fn new(device: Arc<dyn DeviceApi>, notices: NoticeBoard) -> Self {
        Self {
            device,
            notices,
            state: RwLock::new(ScanState::default()),
        }
    }

    /// Fetch scan results and rebuild every slot's suggestions.
    pub async fn refresh(&self) {
        match self.device.wifi_scan().await {
            Ok(networks) => {
                let networks = rank_networks(networks);
                debug!(count = networks.len(), "WiFi scan refreshed");
                let suggestions = suggestions_for(&networks);
                let mut state = self.state.write().await;
                state.networks = networks;
                state.suggestions = suggestions;
            }
            Err(e) => self.notices.failure(&e),
        }
    }

    /// Start a refresh in the background without waiting for it.
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<()> {
        let scanner = Arc::clone(self);
        tokio::spawn(async move { scanner.refresh().await })
    }

    /// Ranked networks from the latest successful scan.
    pub async fn networks(&self) -> Vec<WifiNetwork> {
        self.state.read().await.networks.clone()
    }

    /// Suggestion lists from the latest successful scan.
    pub async fn suggestions(&self) -> SlotSuggestions {
        self.state.read().await.suggestions.clone()
    }
}

impl std::fmt::Debug for WifiScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiScanner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    fn net(ssid: &str, rssi_percent: u8) -> WifiNetwork {
        WifiNetwork {
            ssid: ssid.to_string(),
            rssi_percent,
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_is_stable_descending() {
        let ranked = rank_networks(vec![net("A", 40), net("B", 90), net("C", 90)]);
        let ssids: Vec<&str> = ranked.iter().map(|n| n.ssid.as_str()).collect();
        assert_eq!(ssids, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_rank_drops_hidden_networks() {
        let ranked = rank_networks(vec![net("", 99), net("lab", 10)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].ssid, "lab");
    }

    #[test]
    fn test_suggestion_label() {
        let suggestions = suggestions_for(&[net("garage", 72)]);
        for slot in &suggestions {
            assert_eq!(
                slot,
                &vec![Suggestion {
                    label: "garage (72%)".to_string(),
                    value: "garage".to_string(),
                }]
            );
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_state() {
        let device = Arc::new(MockDevice::new());
        device
            .set_networks(vec![net("A", 40), net("", 80), net("B", 90)])
            .await;
        let scanner = WifiScanner::new(device.clone(), NoticeBoard::default());

        scanner.refresh().await;
        let ssids: Vec<String> = scanner.networks().await.into_iter().map(|n| n.ssid).collect();
        assert_eq!(ssids, vec!["B", "A"]);
        assert_eq!(scanner.suggestions().await[2].len(), 2);

        device.set_networks(vec![net("C", 10)]).await;
        scanner.refresh().await;
        assert_eq!(scanner.networks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_state_and_posts_notice() {
        let device = Arc::new(MockDevice::new());
        device.set_networks(vec![net("A", 40)]).await;
        let notices = NoticeBoard::default();
        let scanner = WifiScanner::new(device.clone(), notices.clone());
        scanner.refresh().await;

        device.set_should_fail(true);
        scanner.refresh().await;
        assert_eq!(scanner.networks().await.len(), 1);
        assert_eq!(notices.current().unwrap().message, "Request failed: 500");
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let device = Arc::new(MockDevice::new());
        device.set_networks(vec![net("A", 40)]).await;
        let scanner = Arc::new(WifiScanner::new(device.clone(), NoticeBoard::default()));

        scanner.trigger().await.unwrap();
        assert_eq!(device.call_count("wifi_scan"), 1);
        assert_eq!(scanner.networks().await.len(), 1);
    }
}
