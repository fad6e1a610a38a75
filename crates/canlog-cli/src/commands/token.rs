//! API token commands.
//!
//! The token is kept in the CLI config file and sent as `X-Api-Token` with
//! every request unless `--token` overrides it for one run.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use canlog_core::TokenStore;

use super::Globals;
use crate::cli::TokenAction;
use crate::config::{Config, FileTokenPersistence};
use crate::format::mask_token;
use crate::util::write_output;

pub fn cmd_token(globals: &Globals, action: TokenAction) -> Result<()> {
    let store = TokenStore::new(Arc::new(FileTokenPersistence::default()));
    match action {
        TokenAction::Set { value } => {
            if value.trim().is_empty() {
                bail!("Token is empty. Use 'canlog token clear' to remove it.");
            }
            store.set(&value).context("Failed to save token")?;
            if !globals.quiet {
                eprintln!("Token saved to {}", Config::path().display());
            }
        }
        TokenAction::Show { reveal } => {
            let content = match store.get() {
                Some(token) if reveal => format!("{}\n", token),
                Some(token) => format!("{}\n", mask_token(&token)),
                None => "No token saved\n".to_string(),
            };
            write_output(globals.output(), &content)?;
        }
        TokenAction::Clear => {
            store.clear().context("Failed to clear token")?;
            if !globals.quiet {
                eprintln!("Token cleared");
            }
        }
    }
    Ok(())
}
