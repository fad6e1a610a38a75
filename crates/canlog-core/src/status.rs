//! Device status polling.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use canlog_types::StatusSnapshot;

use crate::notice::NoticeBoard;
use crate::traits::DeviceApi;

/// Holds the latest status snapshot.
///
/// Each successful refresh replaces the snapshot entirely, including the CAN
/// counter rows. A failed refresh posts a notice and keeps the old snapshot.
pub struct StatusPoller {
    device: Arc<dyn DeviceApi>,
    notices: NoticeBoard,
    snapshot: RwLock<Option<StatusSnapshot>>,
}

impl StatusPoller {
    pub fn new(device: Arc<dyn DeviceApi>, notices: NoticeBoard) -> Self {
        Self {
            device,
            notices,
            snapshot: RwLock::new(None),
        }
    }

    /// Fetch and store the current status. Returns whether it succeeded.
    pub async fn refresh(&self) -> bool {
        match self.device.status().await {
            Ok(status) => {
                debug!(
                    uptime = status.uptime_sec,
                    logging = status.logging.started,
                    "Status refreshed"
                );
                *self.snapshot.write().await = Some(status);
                true
            }
            Err(e) => {
                self.notices.failure(&e);
                false
            }
        }
    }

    /// Latest snapshot, if any refresh has succeeded.
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        self.snapshot.read().await.clone()
    }
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller").finish_non_exhaustive()
    }
}
