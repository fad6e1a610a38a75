//! Batch operations over the selection set.
//!
//! Downloads and deletes pace requests differently:
//!
//! - [`BatchRunner::download_selected`] hands each file to a
//!   [`DownloadOpener`] at a fixed spacing and returns at once. Nothing
//!   reports back per file.
//! - [`BatchRunner::delete_selected`] awaits each delete in selection order
//!   and stops at the first failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::files::FileRegistry;
use crate::notice::NoticeBoard;
use crate::traits::DeviceApi;

/// Default spacing between download opens.
pub const DEFAULT_DOWNLOAD_SPACING: Duration = Duration::from_millis(300);

/// Receives download locations, one per selected file.
pub trait DownloadOpener: Send + Sync {
    /// Start fetching `url` for file `id`. Must not block.
    fn open(&self, id: &str, url: &str);
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Per-file results of a sequential batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids processed successfully, in order.
    pub completed: Vec<String>,
    /// The id whose request failed and aborted the batch.
    pub failed: Option<String>,
    /// Ids after the failure that were never sent.
    pub not_attempted: Vec<String>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Result of [`BatchRunner::delete_selected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing was selected.
    Empty,
    /// The user declined the confirmation.
    Cancelled,
    /// Deletes ran; the selection was cleared and the listing reloaded.
    Finished(BatchReport),
}

/// Runs per-file operations over the registry's selection.
pub struct BatchRunner {
    device: Arc<dyn DeviceApi>,
    registry: Arc<FileRegistry>,
    notices: NoticeBoard,
    spacing: Duration,
}

impl BatchRunner {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        registry: Arc<FileRegistry>,
        notices: NoticeBoard,
        spacing: Duration,
    ) -> Self {
        Self {
            device,
            registry,
            notices,
            spacing,
        }
    }

    /// Open a download for every selected file, `spacing` apart.
    ///
    /// Returns the handle of the background schedule, or `None` with a
    /// notice posted when nothing is selected. The selection is kept.
    pub async fn download_selected(
        &self,
        opener: Arc<dyn DownloadOpener>,
    ) -> Option<JoinHandle<()>> {
        let ids = self.selected_ids().await?;
        let targets: Vec<(String, String)> = ids
            .into_iter()
            .map(|id| {
                let url = self.device.download_url(&id);
                (id, url)
            })
            .collect();

        info!(count = targets.len(), "Scheduling downloads");
        let spacing = self.spacing;
        Some(tokio::spawn(async move {
            let start = Instant::now();
            for (index, (id, url)) in targets.iter().enumerate() {
                sleep_until(start + spacing * index as u32).await;
                debug!(id = %id, "Opening download");
                opener.open(id, url);
            }
        }))
    }

    /// Delete every selected file after confirmation.
    ///
    /// Deletes run one at a time in selection order. The first failure posts
    /// a notice and skips the rest. Once confirmed, the selection is always
    /// cleared and the listing reloaded, whatever the outcome.
    pub async fn delete_selected(&self, confirm: &dyn Confirm) -> DeleteOutcome {
        let Some(ids) = self.selected_ids().await else {
            return DeleteOutcome::Empty;
        };

        if !confirm.confirm(&format!("Delete {} file(s)?", ids.len())) {
            debug!("Delete cancelled");
            return DeleteOutcome::Cancelled;
        }

        let device = Arc::clone(&self.device);
        let report = self
            .run_sequential(ids, |id| {
                let device = Arc::clone(&device);
                async move { device.delete_file(&id).await }
            })
            .await;
        if report.is_success() {
            self.notices.ok("Files deleted");
        }

        self.registry.clear_selection().await;
        self.registry.load(None).await;
        DeleteOutcome::Finished(report)
    }

    /// Mark every selected file as downloaded, one at a time.
    ///
    /// Stops at the first failure. The selection is kept and the listing
    /// reloaded. Returns `None` when nothing is selected.
    pub async fn mark_selected_downloaded(&self) -> Option<BatchReport> {
        let ids = self.selected_ids().await?;
        let device = Arc::clone(&self.device);
        let report = self
            .run_sequential(ids, |id| {
                let device = Arc::clone(&device);
                async move { device.mark_downloaded(&id).await }
            })
            .await;
        if report.is_success() {
            self.notices.ok("Marked downloaded");
        }
        self.registry.load(None).await;
        Some(report)
    }

    async fn selected_ids(&self) -> Option<Vec<String>> {
        let selection = self.registry.selection().await;
        if selection.is_empty() {
            self.notices.error("Select files first");
            return None;
        }
        Some(selection.ids().to_vec())
    }

    async fn run_sequential<F, Fut>(&self, ids: Vec<String>, op: F) -> BatchReport
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut report = BatchReport::default();
        let mut remaining = ids.into_iter();
        while let Some(id) = remaining.next() {
            match op(id.clone()).await {
                Ok(()) => report.completed.push(id),
                Err(e) => {
                    warn!(id = %id, error = %e, "Batch aborted");
                    self.notices.failure(&e);
                    report.failed = Some(id);
                    report.not_attempted = remaining.collect();
                    break;
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("spacing", &self.spacing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use canlog_types::FileFlags;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<(String, Instant)>>,
    }

    impl DownloadOpener for RecordingOpener {
        fn open(&self, _id: &str, url: &str) {
            self.opened
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
        }
    }

    async fn setup(ids: &[u32]) -> (Arc<MockDevice>, NoticeBoard, Arc<FileRegistry>, BatchRunner) {
        let device = Arc::new(MockDevice::new());
        device
            .set_files(ids.iter().map(|&id| MockDevice::sample_file(id, 0)).collect())
            .await;
        let notices = NoticeBoard::default();
        let registry = Arc::new(FileRegistry::new(device.clone(), notices.clone()));
        registry.load(None).await;
        let runner = BatchRunner::new(
            device.clone(),
            registry.clone(),
            notices.clone(),
            DEFAULT_DOWNLOAD_SPACING,
        );
        device.clear_calls();
        (device, notices, registry, runner)
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_spacing_and_order() {
        let (_, _, registry, runner) = setup(&[1, 2, 3]).await;
        for id in ["3", "1", "2"] {
            registry.toggle_select(id, true).await;
        }
        let opener = Arc::new(RecordingOpener::default());

        let start = Instant::now();
        let handle = runner.download_selected(opener.clone()).await.unwrap();
        handle.await.unwrap();

        let opened = opener.opened.lock().unwrap();
        let urls: Vec<&str> = opened.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "mock://files/3/download",
                "mock://files/1/download",
                "mock://files/2/download"
            ]
        );
        for (index, (_, at)) in opened.iter().enumerate() {
            assert_eq!(*at - start, Duration::from_millis(300) * index as u32);
        }
        // Downloads keep the selection.
        assert_eq!(registry.selection().await.len(), 3);
    }

    #[tokio::test]
    async fn test_download_empty_selection() {
        let (device, notices, _, runner) = setup(&[1]).await;
        let opener = Arc::new(RecordingOpener::default());
        let mut rx = notices.subscribe();

        assert!(runner.download_selected(opener.clone()).await.is_none());
        assert!(opener.opened.lock().unwrap().is_empty());
        assert!(device.calls().is_empty());

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.message, "Select files first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_aborts_on_first_failure() {
        let (device, notices, registry, runner) = setup(&[1, 2, 3]).await;
        for id in ["1", "2", "3"] {
            registry.toggle_select(id, true).await;
        }
        device.fail_file("2");

        let outcome = runner.delete_selected(&|_: &str| true).await;
        assert_eq!(
            outcome,
            DeleteOutcome::Finished(BatchReport {
                completed: vec!["1".to_string()],
                failed: Some("2".to_string()),
                not_attempted: vec!["3".to_string()],
            })
        );
        assert_eq!(
            device.calls(),
            vec!["delete_file:1", "delete_file:2", "files"]
        );
        assert!(registry.selection().await.is_empty());
        let remaining: Vec<u32> = registry.files().await.iter().map(|f| f.id).collect();
        assert_eq!(remaining, vec![2, 3]);
        assert_eq!(notices.current().unwrap().message, "Request failed: 500");
    }

    #[tokio::test]
    async fn test_delete_success() {
        let (device, notices, registry, runner) = setup(&[1, 2]).await;
        registry.select_all(true).await;

        let prompts = Mutex::new(Vec::new());
        let confirm = |prompt: &str| {
            prompts.lock().unwrap().push(prompt.to_string());
            true
        };
        let outcome = runner.delete_selected(&confirm).await;

        assert!(matches!(outcome, DeleteOutcome::Finished(ref r) if r.is_success()));
        assert_eq!(*prompts.lock().unwrap(), vec!["Delete 2 file(s)?"]);
        assert!(device.current_files().await.is_empty());
        assert!(registry.rows().await.is_empty());
        assert_eq!(notices.current().unwrap().message, "Files deleted");
    }

    #[tokio::test]
    async fn test_delete_cancelled() {
        let (device, _, registry, runner) = setup(&[1]).await;
        registry.toggle_select("1", true).await;

        let outcome = runner.delete_selected(&|_: &str| false).await;
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert!(device.calls().is_empty());
        assert!(registry.selection().await.contains("1"));
    }

    #[tokio::test]
    async fn test_delete_empty_selection() {
        let (device, notices, _, runner) = setup(&[1]).await;
        let outcome = runner
            .delete_selected(&|_: &str| -> bool { panic!("no prompt") })
            .await;
        assert_eq!(outcome, DeleteOutcome::Empty);
        assert!(device.calls().is_empty());
        assert_eq!(notices.current().unwrap().message, "Select files first");
    }

    #[tokio::test]
    async fn test_mark_selected_downloaded() {
        let (device, _, registry, runner) = setup(&[1, 2]).await;
        registry.select_all(true).await;

        let report = runner.mark_selected_downloaded().await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.completed, vec!["1", "2"]);
        assert!(
            device
                .current_files()
                .await
                .iter()
                .all(|f| f.flags.contains(FileFlags::DOWNLOADED))
        );
        assert_eq!(registry.selection().await.len(), 2);
    }
}
