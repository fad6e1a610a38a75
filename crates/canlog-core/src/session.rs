//! Session wiring for all client components.
//!
//! A [`Session`] owns one instance of every component, all sharing the same
//! device handle and notice board. It replaces what would otherwise be
//! global mutable state: create it at startup, drop it on teardown.
//!
//! # Example
//!
//! ```no_run
//! use canlog_core::{Session, SessionOptions, TokenStore};
//!
//! # async fn example() -> canlog_core::Result<()> {
//! let session = Session::connect(
//!     "http://192.168.4.1",
//!     TokenStore::in_memory("secret"),
//!     SessionOptions::default(),
//! )?;
//!
//! // Initial status and config fetch, then the repeating tasks.
//! session.start().await;
//!
//! if let Some(status) = session.status().snapshot().await {
//!     println!("uptime: {}s", status.uptime_sec);
//! }
//!
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use crate::batch::{BatchRunner, DEFAULT_DOWNLOAD_SPACING};
use crate::client::ApiClient;
use crate::control::DeviceControl;
use crate::error::{Error, Result};
use crate::files::FileRegistry;
use crate::mirror::ConfigMirror;
use crate::notice::{DEFAULT_NOTICE_CAPACITY, DEFAULT_NOTICE_LIFETIME, NoticeBoard};
use crate::scan::WifiScanner;
use crate::schedule::RepeatingTask;
use crate::status::StatusPoller;
use crate::token::TokenStore;
use crate::traits::DeviceApi;

/// Timing and buffering knobs for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Period of the status poll.
    /// Default: 5 seconds.
    pub status_interval: Duration,
    /// Period of the WiFi scan refresh.
    /// Default: 15 seconds.
    pub scan_interval: Duration,
    /// Delay between consecutive download opens.
    /// Default: 300 ms.
    pub download_spacing: Duration,
    /// Notices buffered per subscriber.
    /// Default: 64.
    pub notice_capacity: usize,
    /// How long a notice stays visible.
    /// Default: 2.5 seconds.
    pub notice_lifetime: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(5),
            scan_interval: Duration::from_secs(15),
            download_spacing: DEFAULT_DOWNLOAD_SPACING,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
            notice_lifetime: DEFAULT_NOTICE_LIFETIME,
        }
    }
}

impl SessionOptions {
    /// Set the status poll period.
    #[must_use]
    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set the WiFi scan refresh period.
    #[must_use]
    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Set the delay between download opens.
    #[must_use]
    pub fn download_spacing(mut self, spacing: Duration) -> Self {
        self.download_spacing = spacing;
        self
    }

    /// Set how long notices stay visible.
    #[must_use]
    pub fn notice_lifetime(mut self, lifetime: Duration) -> Self {
        self.notice_lifetime = lifetime;
        self
    }

    /// Validate the options.
    ///
    /// Returns an error if either repeating period is zero.
    pub fn validate(&self) -> Result<()> {
        if self.status_interval.is_zero() {
            return Err(Error::validation("status_interval must be > 0"));
        }
        if self.scan_interval.is_zero() {
            return Err(Error::validation("scan_interval must be > 0"));
        }
        Ok(())
    }
}

/// All client components for one device.
pub struct Session {
    device: Arc<dyn DeviceApi>,
    notices: NoticeBoard,
    status: Arc<StatusPoller>,
    scanner: Arc<WifiScanner>,
    mirror: Arc<ConfigMirror>,
    files: Arc<FileRegistry>,
    batch: BatchRunner,
    control: DeviceControl,
    options: SessionOptions,
    tasks: Mutex<Vec<RepeatingTask>>,
}

impl Session {
    /// Build a session over any [`DeviceApi`] implementation.
    pub fn new(device: Arc<dyn DeviceApi>, options: SessionOptions) -> Self {
        let notices = NoticeBoard::new(options.notice_capacity, options.notice_lifetime);
        let status = Arc::new(StatusPoller::new(device.clone(), notices.clone()));
        let scanner = Arc::new(WifiScanner::new(device.clone(), notices.clone()));
        let mirror = Arc::new(ConfigMirror::new(
            device.clone(),
            scanner.clone(),
            notices.clone(),
        ));
        let files = Arc::new(FileRegistry::new(device.clone(), notices.clone()));
        let batch = BatchRunner::new(
            device.clone(),
            files.clone(),
            notices.clone(),
            options.download_spacing,
        );
        let control = DeviceControl::new(device.clone(), status.clone(), notices.clone());

        Self {
            device,
            notices,
            status,
            scanner,
            mirror,
            files,
            batch,
            control,
            options,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Build a session talking HTTP to `base_url`.
    pub fn connect(base_url: &str, token: TokenStore, options: SessionOptions) -> Result<Self> {
        options.validate()?;
        let client = ApiClient::new(base_url, token)?;
        Ok(Self::new(Arc::new(client), options))
    }

    /// Fetch status and configuration, then start the repeating tasks.
    pub async fn start(&self) {
        let (_, scan) = tokio::join!(self.status.refresh(), self.mirror.load());
        // The scan started by the config load runs on its own.
        drop(scan);
        self.start_timers();
    }

    /// Start the status poll and WiFi scan tasks, replacing any running ones.
    pub fn start_timers(&self) {
        let status = self.status.clone();
        let status_task =
            RepeatingTask::spawn("status", self.options.status_interval, move || {
                let status = status.clone();
                async move {
                    status.refresh().await;
                }
            });

        let scanner = self.scanner.clone();
        let scan_task =
            RepeatingTask::spawn("wifi_scan", self.options.scan_interval, move || {
                let scanner = scanner.clone();
                async move { scanner.refresh().await }
            });

        info!(
            status_secs = self.options.status_interval.as_secs_f32(),
            scan_secs = self.options.scan_interval.as_secs_f32(),
            "Session timers started"
        );
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        *tasks = vec![status_task, scan_task];
    }

    /// Stop the repeating tasks. Requests already in flight finish normally.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for task in tasks.iter() {
            task.cancel();
        }
        tasks.clear();
    }

    /// Whether the repeating tasks are scheduled.
    pub fn is_polling(&self) -> bool {
        !self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    pub fn device(&self) -> &Arc<dyn DeviceApi> {
        &self.device
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn status(&self) -> &Arc<StatusPoller> {
        &self.status
    }

    pub fn scanner(&self) -> &Arc<WifiScanner> {
        &self.scanner
    }

    pub fn config(&self) -> &Arc<ConfigMirror> {
        &self.mirror
    }

    pub fn files(&self) -> &Arc<FileRegistry> {
        &self.files
    }

    pub fn batch(&self) -> &BatchRunner {
        &self.batch
    }

    pub fn control(&self) -> &DeviceControl {
        &self.control
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    fn session(device: &Arc<MockDevice>) -> Session {
        Session::new(device.clone(), SessionOptions::default())
    }

    #[test]
    fn test_options_default() {
        let options = SessionOptions::default();
        assert_eq!(options.status_interval, Duration::from_secs(5));
        assert_eq!(options.scan_interval, Duration::from_secs(15));
        assert_eq!(options.download_spacing, Duration::from_millis(300));
        assert_eq!(options.notice_lifetime, Duration::from_millis(2500));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_validate() {
        let options = SessionOptions::default().status_interval(Duration::ZERO);
        assert!(options.validate().is_err());

        let options = SessionOptions::default().scan_interval(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let result = Session::connect(
            "ftp://device",
            TokenStore::default(),
            SessionOptions::default(),
        );
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fetches_then_polls() {
        let device = Arc::new(MockDevice::new());
        let session = session(&device);

        session.start().await;
        assert!(session.is_polling());
        assert!(session.status().snapshot().await.is_some());
        assert!(session.config().is_loaded().await);
        assert_eq!(device.call_count("status"), 1);
        assert_eq!(device.call_count("config"), 1);

        tokio::time::sleep(Duration::from_millis(15_100)).await;
        assert_eq!(device.call_count("status"), 4);
        // One scan after the config load, one from the timer.
        assert_eq!(device.call_count("wifi_scan"), 2);
        assert_eq!(device.call_count("config"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ticks_keep_polling() {
        let device = Arc::new(MockDevice::new());
        let session = session(&device);
        let mut notices = session.notices().subscribe();
        session.start_timers();
        device.set_should_fail(true);

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(device.call_count("status"), 2);
        assert!(notices.recv().await.unwrap().is_error());
        assert!(session.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timers() {
        let device = Arc::new(MockDevice::new());
        let session = session(&device);
        session.start().await;
        session.shutdown();
        assert!(!session.is_polling());

        // Let the scan started by the config load finish.
        tokio::time::sleep(Duration::from_millis(1)).await;
        device.clear_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(device.call_count("status"), 0);
        assert_eq!(device.call_count("wifi_scan"), 0);
    }
}
