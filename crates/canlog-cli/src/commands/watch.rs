//! Watch command: run the session's repeating tasks until interrupted.

use std::time::Duration;

use anyhow::Result;
use canlog_core::SessionOptions;
use canlog_types::StatusSnapshot;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::Globals;
use crate::cli::WatchArgs;
use crate::format::{format_notice, format_status_line};

/// How often the latest snapshot is checked for changes.
const REDRAW_PERIOD: Duration = Duration::from_millis(250);

pub async fn cmd_watch(globals: &Globals, args: &WatchArgs) -> Result<()> {
    let options = SessionOptions::default()
        .status_interval(Duration::from_secs(args.interval))
        .scan_interval(Duration::from_secs(args.scan_interval));
    let (session, client, mut notices) = globals.connect_with(options)?.into_parts();

    if !globals.quiet {
        eprintln!(
            "Watching {} every {}s | Press Ctrl+C to stop",
            client.base_url(),
            args.interval
        );
    }

    session.start().await;

    let mut last: Option<StatusSnapshot> = None;
    let mut redraw = tokio::time::interval(REDRAW_PERIOD);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            notice = notices.recv() => match notice {
                Ok(notice) => eprintln!("{}", format_notice(&notice, &globals.opts)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed notices"),
                Err(RecvError::Closed) => break,
            },
            _ = redraw.tick() => {
                let current = session.status().snapshot().await;
                if current.is_some() && current != last {
                    if let Some(status) = &current {
                        print_status(status, globals)?;
                    }
                    last = current;
                }
            }
        }
    }

    session.shutdown();
    if !globals.quiet {
        eprintln!("Stopped");
    }
    Ok(())
}

fn print_status(status: &StatusSnapshot, globals: &Globals) -> Result<()> {
    if globals.opts.json {
        println!("{}", serde_json::to_string(status)?);
    } else {
        print!("{}", format_status_line(status, &globals.opts));
    }
    Ok(())
}
