//! Utility functions for CLI operations.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use canlog_core::{
    ApiClient, Confirm, DownloadOpener, NoticeReceiver, Session, SessionOptions, TokenStore,
};
use dialoguer::theme::ColorfulTheme;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, FileTokenPersistence};
use crate::format::{FormatOptions, format_notice};

/// A session plus the HTTP client behind it.
pub struct Connection {
    pub session: Session,
    pub client: Arc<ApiClient>,
    notices: NoticeReceiver,
}

impl Connection {
    /// Print the notices posted since the last call and turn a failed
    /// operation into an error carrying the last error notice.
    pub fn finish(&mut self, ok: bool, opts: &FormatOptions, quiet: bool) -> Result<()> {
        let mut last_error = None;
        while let Ok(notice) = self.notices.try_recv() {
            if notice.is_error() {
                if ok {
                    eprintln!("{}", format_notice(&notice, opts));
                }
                last_error = Some(notice.message);
            } else if !quiet {
                eprintln!("{}", format_notice(&notice, opts));
            }
        }
        if ok {
            Ok(())
        } else {
            Err(anyhow!(
                last_error.unwrap_or_else(|| "Operation failed".to_string())
            ))
        }
    }

    /// Take the notice stream, e.g. for watch mode.
    pub fn into_parts(self) -> (Session, Arc<ApiClient>, NoticeReceiver) {
        (self.session, self.client, self.notices)
    }
}

/// Resolve the device URL from the argument (or `CANLOG_URL`) and then the
/// config file.
pub fn resolve_url(url: Option<&str>, config: &Config) -> Result<String> {
    url.map(str::to_string)
        .or_else(|| config.device_url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "No device specified. Use --url <URL> or set CANLOG_URL environment variable.\n\
                 Run 'canlog config url <URL>' to save a default."
            )
        })
}

/// Build a session for the resolved device.
///
/// A `token` argument applies to this run only; otherwise the token saved in
/// the config file is used.
pub fn connect(
    url: Option<&str>,
    token: Option<&str>,
    options: SessionOptions,
) -> Result<Connection> {
    let config = Config::load();
    let url = resolve_url(url, &config)?;
    let token = match token {
        Some(token) => TokenStore::in_memory(token),
        None => TokenStore::new(Arc::new(FileTokenPersistence::default())),
    };

    options.validate()?;
    let client = Arc::new(
        ApiClient::new(&url, token).with_context(|| format!("Invalid device URL: {}", url))?,
    );
    let session = Session::new(client.clone(), options);
    let notices = session.notices().subscribe();
    debug!(url = %client.base_url(), "Session ready");

    Ok(Connection {
        session,
        client,
        notices,
    })
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Fetches each opened download in its own task and writes it to `dir`.
///
/// Failures are logged per file and never stop the other downloads.
pub struct FileDownloader {
    client: Arc<ApiClient>,
    dir: PathBuf,
    names: HashMap<String, String>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FileDownloader {
    /// `names` maps file ids to the file names written in `dir`.
    pub fn new(client: Arc<ApiClient>, dir: PathBuf, names: HashMap<String, String>) -> Self {
        Self {
            client,
            dir,
            names,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every download started so far.
    pub async fn wait(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Download task panicked");
            }
        }
    }

    fn target_name(&self, id: &str) -> String {
        self.names
            .get(id)
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{}.can", id))
    }
}

impl DownloadOpener for FileDownloader {
    fn open(&self, id: &str, url: &str) {
        let client = Arc::clone(&self.client);
        let id = id.to_string();
        let url = url.to_string();
        let path = self.dir.join(self.target_name(&id));

        let task = tokio::spawn(async move {
            let bytes = match client.download(&id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(id = %id, url = %url, error = %e, "Download failed");
                    return;
                }
            };
            match tokio::fs::write(&path, &bytes).await {
                Ok(()) => info!(id = %id, path = %path.display(), bytes = bytes.len(), "Downloaded"),
                Err(e) => warn!(id = %id, path = %path.display(), error = %e, "Failed to save download"),
            }
        });
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task);
    }
}

/// Confirmation through an interactive terminal prompt.
///
/// Declines when stdin is not a terminal.
pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() {
            warn!("Not a terminal; use --yes to skip the confirmation");
            return false;
        }
        dialoguer::Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Ensure a download directory exists and is a directory.
pub fn prepare_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_url_prefers_argument() {
        let config = Config {
            device_url: Some("http://saved.local".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_url(Some("http://arg.local"), &config).unwrap(),
            "http://arg.local"
        );
        assert_eq!(resolve_url(None, &config).unwrap(), "http://saved.local");
    }

    #[test]
    fn test_resolve_url_missing() {
        let err = resolve_url(None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("--url"));
        assert!(resolve_url(Some("  "), &Config::default()).is_err());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let result = connect(
            Some("ftp://logger"),
            Some("token"),
            SessionOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_prepare_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        prepare_dir(&nested).unwrap();
        assert!(nested.is_dir());

        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(prepare_dir(&file).is_err());
    }

    #[tokio::test]
    async fn test_downloader_target_names() {
        let client = Arc::new(ApiClient::new("http://logger.local", TokenStore::default()).unwrap());
        let names = HashMap::from([("3".to_string(), "0003.can".to_string())]);
        let downloader = FileDownloader::new(client, PathBuf::from("."), names);
        assert_eq!(downloader.target_name("3"), "0003.can");
        assert_eq!(downloader.target_name("9"), "9.can");
        downloader.wait().await;
    }

    #[tokio::test]
    async fn test_connection_finish() {
        let mut connection =
            connect(Some("http://logger.local"), Some(""), SessionOptions::default()).unwrap();
        let opts = FormatOptions::new(true, false);

        connection.session.notices().ok("Logging started");
        assert!(connection.finish(true, &opts, true).is_ok());

        connection.session.notices().error("Request failed: 500");
        let err = connection.finish(false, &opts, true).unwrap_err();
        assert_eq!(err.to_string(), "Request failed: 500");

        let err = connection.finish(false, &opts, true).unwrap_err();
        assert_eq!(err.to_string(), "Operation failed");
    }
}
