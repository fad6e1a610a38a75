//! Logging control commands.

use anyhow::Result;

use super::Globals;
use crate::cli::ControlAction;

pub async fn cmd_control(globals: &Globals, action: ControlAction) -> Result<()> {
    let mut connection = globals.connect()?;
    let control = connection.session.control();
    let ok = match action {
        ControlAction::Start => control.start_logging().await,
        ControlAction::Stop => control.stop_logging().await,
        ControlAction::Close => control.close_active_file().await,
    };
    globals.finish(&mut connection, ok)
}
