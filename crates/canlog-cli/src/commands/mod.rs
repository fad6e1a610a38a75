//! Command implementations for the CLI.

mod config;
mod control;
mod files;
mod status;
mod time;
mod token;
mod watch;

use std::path::PathBuf;

use anyhow::Result;
use canlog_core::SessionOptions;

use crate::format::FormatOptions;
use crate::util::{self, Connection};

pub use config::cmd_config;
pub use control::cmd_control;
pub use files::cmd_files;
pub use status::cmd_status;
pub use time::cmd_time;
pub use token::cmd_token;
pub use watch::cmd_watch;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub url: Option<String>,
    pub token: Option<String>,
    pub output: Option<PathBuf>,
    pub opts: FormatOptions,
    pub quiet: bool,
}

impl Globals {
    /// Connect with default session options.
    pub fn connect(&self) -> Result<Connection> {
        self.connect_with(SessionOptions::default())
    }

    pub fn connect_with(&self, options: SessionOptions) -> Result<Connection> {
        util::connect(self.url.as_deref(), self.token.as_deref(), options)
    }

    pub fn output(&self) -> Option<&PathBuf> {
        self.output.as_ref()
    }

    /// Report a finished operation through the session's notices.
    pub fn finish(&self, connection: &mut Connection, ok: bool) -> Result<()> {
        connection.finish(ok, &self.opts, self.quiet)
    }
}
