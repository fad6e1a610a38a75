//! Device configuration commands.

use anyhow::{Context, Result, anyhow, bail};
use canlog_core::ConfigForm;

use super::Globals;
use crate::cli::{ConfigAction, ConfigSetArgs};
use crate::config::Config;
use crate::format::{format_config_text, format_networks_text, format_suggestions_text};
use crate::util::write_output;

pub async fn cmd_config(globals: &Globals, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { networks } => show(globals, networks).await,
        ConfigAction::Set(args) => set(globals, &args).await,
        ConfigAction::Url { address } => url_command(globals, address),
        ConfigAction::Path => write_output(
            globals.output(),
            &format!("{}\n", Config::path().display()),
        ),
    }
}

async fn show(globals: &Globals, networks: bool) -> Result<()> {
    let mut connection = globals.connect()?;
    let mirror = connection.session.config().clone();
    let scan = mirror.load().await;
    let ok = scan.is_some();
    if let Some(scan) = scan
        && networks
    {
        scan.await.context("WiFi scan task failed")?;
    }
    globals.finish(&mut connection, ok)?;

    if globals.opts.json {
        let config = mirror
            .mirror()
            .await
            .ok_or_else(|| anyhow!("Configuration not loaded"))?;
        return write_output(globals.output(), &globals.opts.as_json(&config)?);
    }

    let form = mirror.form().await;
    let mut content = format_config_text(&form, &globals.opts);
    if networks {
        let scanner = connection.session.scanner();
        content.push_str(&format_networks_text(&scanner.networks().await, &globals.opts));
        content.push_str(&format_suggestions_text(
            &form,
            &scanner.suggestions().await,
            &globals.opts,
        ));
    }
    write_output(globals.output(), &content)
}

async fn set(globals: &Globals, args: &ConfigSetArgs) -> Result<()> {
    let mut connection = globals.connect()?;
    let mirror = connection.session.config().clone();
    let loaded = mirror.load().await.is_some();
    globals.finish(&mut connection, loaded)?;

    let mut form = mirror.form().await;
    apply_edits(args, &mut form)?;
    mirror.edit(move |current| *current = form).await;

    let ok = mirror.save_form().await;
    globals.finish(&mut connection, ok)
}

/// Apply command-line edits to the form.
///
/// Fails when the bus is not reported by the device or nothing was changed.
pub fn apply_edits(args: &ConfigSetArgs, form: &mut ConfigForm) -> Result<()> {
    let mut changed = false;

    if let Some(id) = args.bus {
        let bus = form
            .bus_mut(id)
            .ok_or_else(|| anyhow!("Bus {} is not configured on the device", id))?;
        if let Some(enabled) = args.enabled {
            bus.enabled = enabled;
            changed = true;
        }
        if let Some(bitrate) = args.bitrate {
            bus.bitrate = bitrate;
            changed = true;
        }
        if let Some(read_only) = args.read_only {
            bus.read_only = read_only;
            changed = true;
        }
        if let Some(logging) = args.logging {
            bus.logging = logging;
            changed = true;
        }
        if let Some(name) = &args.name {
            bus.name = name.clone();
            changed = true;
        }
    }

    if let Some(slot) = args.wifi_slot {
        let index = usize::from(slot.saturating_sub(1));
        let wifi = form
            .wifi_slot_mut(index)
            .ok_or_else(|| anyhow!("WiFi slot {} does not exist", slot))?;
        if let Some(ssid) = &args.ssid {
            wifi.ssid = ssid.clone();
            changed = true;
        }
        if let Some(password) = &args.password {
            wifi.password = password.clone();
            changed = true;
        }
    }

    if let Some(sta) = args.sta {
        form.wifi_sta_enabled = sta;
        changed = true;
    }
    if let Some(mb) = args.max_file_mb {
        form.max_file_size_mb = mb;
        changed = true;
    }
    if let Some(mb) = args.low_space_mb {
        form.low_space_mb = mb;
        changed = true;
    }
    if let Some(url) = &args.upload_url {
        form.upload_url = url.clone();
        changed = true;
    }
    if let Some(sync) = args.time_sync {
        form.can_time_sync = sync;
        changed = true;
    }

    if !changed {
        bail!("Nothing to change. See 'canlog config set --help' for settings.");
    }
    Ok(())
}

fn url_command(globals: &Globals, url: Option<String>) -> Result<()> {
    let mut config = Config::load();
    match url {
        Some(url) => {
            let url = url.trim().trim_end_matches('/').to_string();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Device URL must start with http:// or https://");
            }
            config.device_url = Some(url.clone());
            config.save()?;
            if !globals.quiet {
                eprintln!("Default device set to {}", url);
            }
            Ok(())
        }
        None => {
            let content = match config.device_url {
                Some(url) => format!("{}\n", url),
                None => "No default device. Run 'canlog config url <URL>'.\n".to_string(),
            };
            write_output(globals.output(), &content)
        }
    }
}
