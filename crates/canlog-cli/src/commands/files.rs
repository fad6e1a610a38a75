//! Log file commands: listing, marking, downloading and deleting.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use canlog_core::{DeleteOutcome, FileFilter, FileRegistry, LogFile};
use tracing::warn;

use super::Globals;
use crate::cli::{FileTargets, FilesAction};
use crate::format::format_files_text;
use crate::util::{Connection, FileDownloader, PromptConfirm, prepare_dir, write_output};

pub async fn cmd_files(globals: &Globals, action: FilesAction) -> Result<()> {
    let mut connection = globals.connect()?;
    match action {
        FilesAction::List { bus } => list(globals, &mut connection, bus).await,
        FilesAction::Mark(targets) => mark(globals, &mut connection, &targets).await,
        FilesAction::Download { targets, dir } => {
            download(globals, &mut connection, &targets, dir).await
        }
        FilesAction::Delete { targets, yes } => {
            delete(globals, &mut connection, &targets, yes).await
        }
    }
}

async fn list(globals: &Globals, connection: &mut Connection, bus: FileFilter) -> Result<()> {
    let registry = connection.session.files().clone();
    let ok = registry.load(Some(bus)).await;
    globals.finish(connection, ok)?;

    let rows = registry.rows().await;
    let content = if globals.opts.json {
        let files: Vec<&LogFile> = rows.iter().map(|row| &row.file).collect();
        globals.opts.as_json(&files)?
    } else {
        format_files_text(&rows, &globals.opts)
    };
    write_output(globals.output(), &content)
}

async fn mark(globals: &Globals, connection: &mut Connection, targets: &FileTargets) -> Result<()> {
    let registry = connection.session.files().clone();
    select_targets(globals, connection, &registry, targets).await?;

    let selection = registry.selection().await;
    let ok = if let [id] = selection.ids() {
        registry.mark_downloaded(id).await
    } else {
        connection
            .session
            .batch()
            .mark_selected_downloaded()
            .await
            .is_some_and(|report| report.is_success())
    };
    globals.finish(connection, ok)
}

async fn download(
    globals: &Globals,
    connection: &mut Connection,
    targets: &FileTargets,
    dir: PathBuf,
) -> Result<()> {
    let registry = connection.session.files().clone();
    select_targets(globals, connection, &registry, targets).await?;
    prepare_dir(&dir)?;

    let names: HashMap<String, String> = registry
        .files()
        .await
        .iter()
        .map(|file| (file.key(), file.file_name().to_string()))
        .collect();
    let count = registry.selection().await.len();
    let downloader = Arc::new(FileDownloader::new(
        connection.client.clone(),
        dir.clone(),
        names,
    ));

    let schedule = connection
        .session
        .batch()
        .download_selected(downloader.clone())
        .await;
    let ok = schedule.is_some();
    if let Some(schedule) = schedule {
        schedule.await.context("Download schedule failed")?;
    }
    downloader.wait().await;
    globals.finish(connection, ok)?;

    if !globals.quiet {
        eprintln!("Fetched {} file(s) into {}", count, dir.display());
    }
    Ok(())
}

async fn delete(
    globals: &Globals,
    connection: &mut Connection,
    targets: &FileTargets,
    yes: bool,
) -> Result<()> {
    let registry = connection.session.files().clone();
    select_targets(globals, connection, &registry, targets).await?;

    let batch = connection.session.batch();
    let outcome = if yes {
        batch.delete_selected(&|_: &str| true).await
    } else {
        batch.delete_selected(&PromptConfirm).await
    };

    match outcome {
        DeleteOutcome::Empty => globals.finish(connection, false),
        DeleteOutcome::Cancelled => {
            if !globals.quiet {
                eprintln!("Cancelled");
            }
            Ok(())
        }
        DeleteOutcome::Finished(report) => {
            let deleted = report.completed.len();
            let skipped = report.not_attempted.len();
            globals
                .finish(connection, report.is_success())
                .with_context(|| {
                    format!(
                        "Deleted {} file(s); {} not attempted",
                        deleted, skipped
                    )
                })
        }
    }
}

/// Load the listing with the targets' filter and select the requested files.
///
/// Ids missing from the filtered listing are skipped with a warning.
async fn select_targets(
    globals: &Globals,
    connection: &mut Connection,
    registry: &FileRegistry,
    targets: &FileTargets,
) -> Result<()> {
    let ok = registry.load(Some(targets.bus)).await;
    globals.finish(connection, ok)?;

    if targets.all {
        registry.select_all(true).await;
        return Ok(());
    }

    let listed: HashSet<String> = registry
        .rows()
        .await
        .iter()
        .map(|row| row.file.key())
        .collect();
    for id in &targets.ids {
        let id = id.trim();
        if listed.contains(id) {
            registry.toggle_select(id, true).await;
        } else {
            warn!(id = %id, "No listed file with this id; skipping");
        }
    }
    Ok(())
}
