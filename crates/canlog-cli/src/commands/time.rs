//! Device clock commands.

use anyhow::Result;
use time::OffsetDateTime;

use super::Globals;
use crate::cli::TimeAction;
use crate::format::format_epoch;

pub async fn cmd_time(globals: &Globals, action: TimeAction) -> Result<()> {
    let mut connection = globals.connect()?;
    let control = connection.session.control();
    let ok = match action {
        TimeAction::Set { value } => control.set_time_from_input(&value).await,
        TimeAction::Now => {
            control
                .set_time(OffsetDateTime::now_utc().unix_timestamp())
                .await
        }
    };
    globals.finish(&mut connection, ok)?;

    if !globals.quiet
        && let Some(status) = connection.session.status().snapshot().await
    {
        eprintln!("Device time: {}", format_epoch(status.time_epoch));
    }
    Ok(())
}
