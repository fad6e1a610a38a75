//! Status command implementation.

use anyhow::{Result, bail};

use super::{Globals, cmd_watch};
use crate::cli::WatchArgs;
use crate::format::format_status_text;
use crate::util::write_output;

pub async fn cmd_status(globals: &Globals, watch: bool) -> Result<()> {
    if watch {
        return cmd_watch(globals, &WatchArgs::default()).await;
    }

    let mut connection = globals.connect()?;
    let poller = connection.session.status().clone();
    let ok = poller.refresh().await;
    globals.finish(&mut connection, ok)?;

    let Some(status) = poller.snapshot().await else {
        bail!("Device returned no status");
    };
    let content = if globals.opts.json {
        globals.opts.as_json(&status)?
    } else {
        format_status_text(&status, &globals.opts)
    };
    write_output(globals.output(), &content)
}
