//! Logging control and clock setting.

use std::sync::Arc;

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::info;

use crate::error::{Error, Result};
use crate::notice::NoticeBoard;
use crate::status::StatusPoller;
use crate::traits::DeviceApi;

/// Parse user input into epoch seconds.
///
/// Accepts RFC 3339 (`2024-05-01T12:30:00+02:00`) or a UTC wall-clock time
/// as `YYYY-MM-DD HH:MM[:SS]`, with a space or `T` between date and time.
pub fn parse_time_input(input: &str) -> Result<i64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::validation("Pick a time first"));
    }

    let epoch = OffsetDateTime::parse(input, &Rfc3339)
        .ok()
        .or_else(|| {
            let formats: [&[BorrowedFormatItem<'_>]; 4] = [
                format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
                format_description!("[year]-[month]-[day] [hour]:[minute]"),
                format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
                format_description!("[year]-[month]-[day]T[hour]:[minute]"),
            ];
            formats
                .iter()
                .find_map(|format| PrimitiveDateTime::parse(input, *format).ok())
                .map(PrimitiveDateTime::assume_utc)
        })
        .map(OffsetDateTime::unix_timestamp);

    match epoch {
        Some(epoch) if epoch != 0 => Ok(epoch),
        _ => Err(Error::validation("Invalid time")),
    }
}

/// Device-level actions that refresh the status afterwards.
pub struct DeviceControl {
    device: Arc<dyn DeviceApi>,
    status: Arc<StatusPoller>,
    notices: NoticeBoard,
}

impl DeviceControl {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        status: Arc<StatusPoller>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            device,
            status,
            notices,
        }
    }

    pub async fn start_logging(&self) -> bool {
        let result = self.device.start_logging().await;
        self.finish(result, "Logging started", true).await
    }

    pub async fn stop_logging(&self) -> bool {
        let result = self.device.stop_logging().await;
        self.finish(result, "Logging stopped", true).await
    }

    pub async fn close_active_file(&self) -> bool {
        let result = self.device.close_active_file().await;
        self.finish(result, "File closed", false).await
    }

    /// Set the device clock to `epoch` seconds.
    pub async fn set_time(&self, epoch: i64) -> bool {
        let result = self.device.set_time(epoch).await;
        self.finish(result, "Time updated", true).await
    }

    /// Parse `input` with [`parse_time_input`] and set the clock.
    pub async fn set_time_from_input(&self, input: &str) -> bool {
        match parse_time_input(input) {
            Ok(epoch) => self.set_time(epoch).await,
            Err(e) => {
                self.notices.failure(&e);
                false
            }
        }
    }

    async fn finish(&self, result: Result<()>, message: &str, refresh: bool) -> bool {
        match result {
            Ok(()) => {
                info!(action = message, "Device control succeeded");
                self.notices.ok(message);
                if refresh {
                    self.status.refresh().await;
                }
                true
            }
            Err(e) => {
                self.notices.failure(&e);
                false
            }
        }
    }
}

impl std::fmt::Debug for DeviceControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceControl").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;

    fn setup() -> (Arc<MockDevice>, NoticeBoard, Arc<StatusPoller>, DeviceControl) {
        let device = Arc::new(MockDevice::new());
        let notices = NoticeBoard::default();
        let status = Arc::new(StatusPoller::new(device.clone(), notices.clone()));
        let control = DeviceControl::new(device.clone(), status.clone(), notices.clone());
        (device, notices, status, control)
    }

    #[test]
    fn test_parse_time_input_formats() {
        assert_eq!(parse_time_input("2024-01-01T00:00:00Z").unwrap(), 1_704_067_200);
        assert_eq!(
            parse_time_input("2024-01-01T02:00:00+02:00").unwrap(),
            1_704_067_200
        );
        assert_eq!(parse_time_input("2024-01-01 00:00:30").unwrap(), 1_704_067_230);
        assert_eq!(parse_time_input(" 2024-01-01 00:01 ").unwrap(), 1_704_067_260);
        assert_eq!(parse_time_input("2024-01-01T00:01").unwrap(), 1_704_067_260);
    }

    #[test]
    fn test_parse_time_input_rejects() {
        let err = parse_time_input("   ").unwrap_err();
        assert_eq!(err.to_string(), "Pick a time first");

        let err = parse_time_input("yesterday").unwrap_err();
        assert_eq!(err.to_string(), "Invalid time");

        let err = parse_time_input("1970-01-01 00:00").unwrap_err();
        assert_eq!(err.to_string(), "Invalid time");
    }

    #[tokio::test]
    async fn test_start_logging_refreshes_status() {
        let (device, notices, status, control) = setup();
        assert!(control.start_logging().await);
        assert_eq!(device.calls(), vec!["start_logging", "status"]);
        assert!(status.snapshot().await.unwrap().logging.started);
        assert_eq!(notices.current().unwrap().message, "Logging started");

        assert!(control.stop_logging().await);
        assert!(!status.snapshot().await.unwrap().logging.started);
    }

    #[tokio::test]
    async fn test_close_file_does_not_refresh() {
        let (device, notices, _, control) = setup();
        assert!(control.close_active_file().await);
        assert_eq!(device.calls(), vec!["close_active_file"]);
        assert_eq!(notices.current().unwrap().message, "File closed");
    }

    #[tokio::test]
    async fn test_set_time_from_input() {
        let (device, notices, status, control) = setup();
        assert!(control.set_time_from_input("2024-01-01 00:00:00").await);
        assert_eq!(device.calls(), vec!["set_time:1704067200", "status"]);
        assert_eq!(status.snapshot().await.unwrap().time_epoch, 1_704_067_200);
        assert_eq!(notices.current().unwrap().message, "Time updated");
    }

    #[tokio::test]
    async fn test_set_time_invalid_input_sends_nothing() {
        let (device, notices, _, control) = setup();
        assert!(!control.set_time_from_input("").await);
        assert!(device.calls().is_empty());
        let notice = notices.current().unwrap();
        assert!(notice.is_error());
        assert_eq!(notice.message, "Pick a time first");
    }

    #[tokio::test]
    async fn test_failure_skips_refresh() {
        let (device, notices, _, control) = setup();
        device.set_should_fail(true);
        assert!(!control.start_logging().await);
        assert_eq!(device.calls(), vec!["start_logging"]);
        assert_eq!(notices.current().unwrap().message, "Request failed: 500");
    }
}
