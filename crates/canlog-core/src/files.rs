//! File listing, client-side filtering and the selection set.
//!
//! The listing is always fetched in full; filtering happens locally. The
//! selection set lives next to the listing but is never rebuilt from it, so
//! a selected file stays selected while it is filtered out of view.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use canlog_types::{FileFilter, LogFile, MAX_BUSES};

use crate::notice::NoticeBoard;
use crate::selection::SelectionSet;
use crate::traits::DeviceApi;

/// A choice in the filter picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub filter: FileFilter,
    pub label: String,
}

/// The filter picker's choices: all files, then one per bus id.
pub fn filter_options() -> Vec<FilterOption> {
    std::iter::once(FilterOption {
        filter: FileFilter::All,
        label: "All".to_string(),
    })
    .chain((0..MAX_BUSES).map(|id| FilterOption {
        filter: FileFilter::Bus(id),
        label: format!("Bus {}", id),
    }))
    .collect()
}

/// A rendered listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub file: LogFile,
    /// Whether the file's id is in the selection set.
    pub selected: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    files: Vec<LogFile>,
    filter: FileFilter,
    selection: SelectionSet,
}

impl RegistryState {
    fn rendered(&self) -> impl Iterator<Item = &LogFile> {
        let filter = self.filter;
        self.files.iter().filter(move |f| filter.matches(f))
    }
}

/// Last fetched file listing plus the user's selection.
pub struct FileRegistry {
    device: Arc<dyn DeviceApi>,
    notices: NoticeBoard,
    state: RwLock<RegistryState>,
}

impl FileRegistry {
    pub fn new(device: Arc<dyn DeviceApi>, notices: NoticeBoard) -> Self {
        Self {
            device,
            notices,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Fetch the full listing and apply `filter`.
    ///
    /// `None` keeps the current filter. A filter that is not among
    /// [`filter_options`] falls back to [`FileFilter::All`]. On failure a
    /// notice is posted and the previous listing is kept.
    pub async fn load(&self, filter: Option<FileFilter>) -> bool {
        let files = match self.device.files().await {
            Ok(files) => files,
            Err(e) => {
                self.notices.failure(&e);
                return false;
            }
        };

        let mut state = self.state.write().await;
        let requested = filter.unwrap_or(state.filter);
        state.filter = if filter_options().iter().any(|o| o.filter == requested) {
            requested
        } else {
            FileFilter::All
        };
        state.files = files;
        debug!(
            files = state.files.len(),
            filter = %state.filter,
            "File listing loaded"
        );
        true
    }

    /// Rows matching the current filter, in device order.
    pub async fn rows(&self) -> Vec<FileRow> {
        let state = self.state.read().await;
        state
            .rendered()
            .map(|file| FileRow {
                selected: state.selection.contains(&file.key()),
                file: file.clone(),
            })
            .collect()
    }

    /// Every file from the last fetch, ignoring the filter.
    pub async fn files(&self) -> Vec<LogFile> {
        self.state.read().await.files.clone()
    }

    pub async fn filter(&self) -> FileFilter {
        self.state.read().await.filter
    }

    /// Check or uncheck a single file.
    pub async fn toggle_select(&self, id: &str, checked: bool) {
        self.state.write().await.selection.set(id, checked);
    }

    /// Check or uncheck every currently rendered row.
    ///
    /// Selected files hidden by the filter are not affected.
    pub async fn select_all(&self, checked: bool) {
        let mut state = self.state.write().await;
        let ids: Vec<String> = state.rendered().map(LogFile::key).collect();
        for id in ids {
            state.selection.set(id, checked);
        }
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
    }

    /// Snapshot of the selection set.
    pub async fn selection(&self) -> SelectionSet {
        self.state.read().await.selection.clone()
    }

    /// Set the downloaded flag on a file and reload on success.
    pub async fn mark_downloaded(&self, id: &str) -> bool {
        match self.device.mark_downloaded(id).await {
            Ok(()) => {
                self.notices.ok("Marked downloaded");
                self.load(None).await;
                true
            }
            Err(e) => {
                self.notices.failure(&e);
                false
            }
        }
    }
}

impl std::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDevice;
    use canlog_types::FileFlags;

    async fn setup() -> (Arc<MockDevice>, NoticeBoard, FileRegistry) {
        let device = Arc::new(MockDevice::new());
        device
            .set_files(vec![
                MockDevice::sample_file(1, 0),
                MockDevice::sample_file(2, 1),
                MockDevice::sample_file(3, 0),
                MockDevice::sample_file(4, 1),
            ])
            .await;
        let notices = NoticeBoard::default();
        let registry = FileRegistry::new(device.clone(), notices.clone());
        (device, notices, registry)
    }

    fn ids(rows: &[FileRow]) -> Vec<u32> {
        rows.iter().map(|r| r.file.id).collect()
    }

    #[test]
    fn test_filter_options() {
        let options = filter_options();
        assert_eq!(options.len(), 7);
        assert_eq!(options[0].label, "All");
        assert_eq!(options[6].filter, FileFilter::Bus(5));
        assert_eq!(options[6].label, "Bus 5");
    }

    #[tokio::test]
    async fn test_load_filters_client_side() {
        let (device, _, registry) = setup().await;
        assert!(registry.load(Some(FileFilter::Bus(1))).await);
        assert_eq!(ids(&registry.rows().await), vec![2, 4]);
        assert_eq!(registry.files().await.len(), 4);

        // A reload without a filter keeps the chosen one.
        assert!(registry.load(None).await);
        assert_eq!(registry.filter().await, FileFilter::Bus(1));
        assert_eq!(device.call_count("files"), 2);
    }

    #[tokio::test]
    async fn test_unknown_filter_falls_back_to_all() {
        let (_, _, registry) = setup().await;
        registry.load(Some(FileFilter::Bus(9))).await;
        assert_eq!(registry.filter().await, FileFilter::All);
        assert_eq!(registry.rows().await.len(), 4);
    }

    #[tokio::test]
    async fn test_selection_survives_filter_change() {
        let (_, _, registry) = setup().await;
        registry.load(Some(FileFilter::All)).await;
        registry.toggle_select("2", true).await;

        registry.load(Some(FileFilter::Bus(0))).await;
        assert!(registry.rows().await.iter().all(|r| !r.selected));

        registry.load(Some(FileFilter::All)).await;
        let rows = registry.rows().await;
        let row = rows.iter().find(|r| r.file.id == 2).unwrap();
        assert!(row.selected);
    }

    #[tokio::test]
    async fn test_select_all_affects_rendered_rows_only() {
        let (_, _, registry) = setup().await;
        registry.load(Some(FileFilter::Bus(0))).await;
        registry.select_all(true).await;
        registry.load(Some(FileFilter::Bus(1))).await;
        registry.select_all(true).await;
        assert_eq!(registry.selection().await.ids(), ["1", "3", "2", "4"]);

        registry.select_all(false).await;
        assert_eq!(registry.selection().await.ids(), ["1", "3"]);
    }

    #[tokio::test]
    async fn test_stale_ids_are_tolerated() {
        let (device, _, registry) = setup().await;
        registry.load(None).await;
        registry.toggle_select("4", true).await;

        device.set_files(vec![MockDevice::sample_file(1, 0)]).await;
        registry.load(None).await;
        assert_eq!(registry.rows().await.len(), 1);
        assert!(registry.selection().await.contains("4"));
    }

    #[tokio::test]
    async fn test_mark_downloaded_reloads() {
        let (device, notices, registry) = setup().await;
        registry.load(None).await;
        device.clear_calls();

        assert!(registry.mark_downloaded("3").await);
        assert_eq!(device.calls(), vec!["mark_downloaded:3", "files"]);
        assert_eq!(notices.current().unwrap().message, "Marked downloaded");
        let files = registry.files().await;
        assert!(files[2].flags.contains(FileFlags::DOWNLOADED));
    }

    #[tokio::test]
    async fn test_mark_downloaded_failure() {
        let (device, notices, registry) = setup().await;
        registry.load(None).await;
        device.fail_file("3");
        device.clear_calls();

        assert!(!registry.mark_downloaded("3").await);
        assert_eq!(device.calls(), vec!["mark_downloaded:3"]);
        assert!(notices.current().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_listing() {
        let (device, notices, registry) = setup().await;
        registry.load(None).await;
        device.set_should_fail(true);
        assert!(!registry.load(Some(FileFilter::Bus(0))).await);
        assert_eq!(registry.files().await.len(), 4);
        assert_eq!(registry.filter().await, FileFilter::All);
        assert!(notices.current().is_some());
    }
}
