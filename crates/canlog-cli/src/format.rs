//! Output formatting utilities for text and JSON output.

use anyhow::Result;
use canlog_core::{ConfigForm, FileRow, Notice, SlotSuggestions};
use canlog_types::{FileFlags, StatusSnapshot, WifiNetwork};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::OffsetDateTime;
use time::macros::format_description;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Emit JSON instead of tables.
    pub json: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool, json: bool) -> Self {
        Self { no_color, json }
    }

    /// Serialize `value` as pretty JSON with a trailing newline.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }

    fn title(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.bold())
        }
    }

    fn state(&self, text: &str, good: bool) -> String {
        match (self.no_color, good) {
            (true, _) => text.to_string(),
            (false, true) => format!("{}", text.green()),
            (false, false) => format!("{}", text.yellow()),
        }
    }
}

// ============================================================================
// Scalar formatting
// ============================================================================

/// Bytes in the largest unit up to GB, with one decimal.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Uptime as `Xd Yh Zm`, or `-` when zero.
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    if seconds == 0 {
        return "-".to_string();
    }
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let mins = (seconds % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, mins)
}

#[must_use]
pub fn format_flags(flags: FileFlags) -> String {
    let labels = flags.labels();
    if labels.is_empty() {
        "-".to_string()
    } else {
        labels.join(", ")
    }
}

/// Epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC), or `-` when unset.
#[must_use]
pub fn format_epoch(epoch: i64) -> String {
    if epoch == 0 {
        return "-".to_string();
    }
    OffsetDateTime::from_unix_timestamp(epoch)
        .ok()
        .and_then(|dt| {
            dt.format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .ok()
        })
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Show the first few characters of a token and mask the rest.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "*".repeat(token.chars().count())
    } else {
        format!("{}{}", visible, "*".repeat(8))
    }
}

// ============================================================================
// Status formatting
// ============================================================================

#[must_use]
pub fn format_status_text(status: &StatusSnapshot, opts: &FormatOptions) -> String {
    let logging = if status.logging.started {
        opts.state("running", true)
    } else {
        opts.state("stopped", false)
    };
    let storage = if status.storage.ready {
        opts.state("ready", true)
    } else {
        opts.state("not ready", false)
    };
    let time = if status.time_valid {
        format_epoch(status.time_epoch)
    } else {
        format!("{} (not set)", format_epoch(status.time_epoch))
    };

    let mut builder = Builder::default();
    builder.push_record(["Property", "Value"]);
    builder.push_record(["Uptime".to_string(), format_uptime(status.uptime_sec)]);
    builder.push_record(["Device time".to_string(), time]);
    builder.push_record([
        "WiFi".to_string(),
        if status.wifi_connected {
            format!(
                "{} ({}%, {} dBm)",
                or_dash(&status.ssid),
                status.rssi_percent,
                status.rssi_dbm
            )
        } else {
            "disconnected".to_string()
        },
    ]);
    builder.push_record(["IP", or_dash(&status.ip)]);
    builder.push_record(["Station mode", on_off(status.sta_mode_enabled)]);
    builder.push_record(["AP clients".to_string(), status.ap_clients.to_string()]);
    builder.push_record(["Logging".to_string(), logging]);
    builder.push_record([
        "Log rate".to_string(),
        format!("{}/s", format_bytes(status.logging.bytes_per_sec)),
    ]);
    builder.push_record([
        "Logged".to_string(),
        format_bytes(status.logging.total_bytes),
    ]);
    builder.push_record([
        "Active buses".to_string(),
        status.logging.active_buses.to_string(),
    ]);
    if status.logging.open_failures > 0 || status.logging.write_failures > 0 {
        builder.push_record([
            "Failures".to_string(),
            format!(
                "{} open, {} write",
                status.logging.open_failures, status.logging.write_failures
            ),
        ]);
    }
    builder.push_record(["SD card".to_string(), storage]);
    builder.push_record([
        "SD free".to_string(),
        format!(
            "{} of {}",
            format_bytes(status.storage.free_bytes),
            format_bytes(status.storage.total_bytes)
        ),
    ]);

    let mut table = builder.build();
    table.with(Style::rounded());
    let mut out = format!("{}\n{}\n", opts.title("Device Status"), table);

    if !status.can.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Bus", "Drops", "High water"]);
        for counters in &status.can {
            builder.push_record([
                counters.bus.to_string(),
                counters.drops.to_string(),
                counters.high_water.to_string(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        out.push_str(&format!("{}\n{}\n", opts.title("CAN Counters"), table));
    }
    out
}

/// One-line status summary for watch mode.
#[must_use]
pub fn format_status_line(status: &StatusSnapshot, opts: &FormatOptions) -> String {
    let logging = if status.logging.started {
        opts.state("logging", true)
    } else {
        opts.state("stopped", false)
    };
    let wifi = if status.wifi_connected {
        format!("{} {}%", or_dash(&status.ssid), status.rssi_percent)
    } else {
        "offline".to_string()
    };
    format!(
        "up {} | {} {}/s | SD {} free | WiFi {}\n",
        format_uptime(status.uptime_sec),
        logging,
        format_bytes(status.logging.bytes_per_sec),
        format_bytes(status.storage.free_bytes),
        wifi
    )
}

// ============================================================================
// File listing formatting
// ============================================================================

#[must_use]
pub fn format_files_text(rows: &[FileRow], opts: &FormatOptions) -> String {
    if rows.is_empty() {
        return "No files.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Bus", "Name", "Size", "Start", "End", "Flags"]);
    for row in rows {
        let file = &row.file;
        builder.push_record([
            file.id.to_string(),
            file.bus_id.to_string(),
            file.file_name().to_string(),
            format_bytes(file.size_bytes),
            file.start_ms.to_string(),
            file.end_ms.to_string(),
            format_flags(file.flags),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());

    let total: u64 = rows.iter().map(|r| r.file.size_bytes).sum();
    format!(
        "{}\n{}\n",
        table,
        opts.title(&format!("{} file(s), {}", rows.len(), format_bytes(total)))
    )
}

// ============================================================================
// Configuration formatting
// ============================================================================

#[must_use]
pub fn format_config_text(form: &ConfigForm, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Bus", "Name", "Enabled", "Bitrate", "Read-only", "Logging"]);
    for bus in &form.buses {
        builder.push_record([
            bus.id.to_string(),
            or_dash(&bus.name).to_string(),
            on_off(bus.enabled).to_string(),
            bus.bitrate.label().to_string(),
            on_off(bus.read_only).to_string(),
            on_off(bus.logging).to_string(),
        ]);
    }
    let mut buses = builder.build();
    buses.with(Style::rounded());

    let mut builder = Builder::default();
    builder.push_record(["Slot", "SSID", "Password"]);
    for (index, slot) in form.wifi.iter().enumerate() {
        let password = if slot.password.is_empty() {
            "-".to_string()
        } else {
            "*".repeat(8)
        };
        builder.push_record([
            (index + 1).to_string(),
            or_dash(&slot.ssid).to_string(),
            password,
        ]);
    }
    let mut wifi = builder.build();
    wifi.with(Style::rounded());

    let mut builder = Builder::default();
    builder.push_record(["Setting", "Value"]);
    builder.push_record(["Station mode", on_off(form.wifi_sta_enabled)]);
    builder.push_record([
        "Max file size".to_string(),
        format!("{} MB", form.max_file_size_mb),
    ]);
    builder.push_record([
        "Low space threshold".to_string(),
        format!("{} MB", form.low_space_mb),
    ]);
    builder.push_record(["Upload URL", or_dash(&form.upload_url)]);
    builder.push_record(["CAN time sync", on_off(form.can_time_sync)]);
    let mut logging = builder.build();
    logging.with(Style::rounded());

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n",
        opts.title("CAN Buses"),
        buses,
        opts.title("WiFi Networks"),
        wifi,
        opts.title("Logging"),
        logging
    )
}

/// Ranked scan results, strongest first.
#[must_use]
pub fn format_networks_text(networks: &[WifiNetwork], opts: &FormatOptions) -> String {
    if networks.is_empty() {
        return "No networks found.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["SSID", "Signal", "RSSI", "Channel", "Security"]);
    for network in networks {
        builder.push_record([
            network.ssid.clone(),
            format!("{}%", network.rssi_percent),
            format!("{} dBm", network.rssi_dbm),
            network.channel.to_string(),
            if network.secure { "secured" } else { "open" }.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    format!("{}\n{}\n", opts.title("Nearby Networks"), table)
}

/// Networks that could go into each WiFi slot. The configured one is starred.
///
/// Empty when the scan found nothing.
#[must_use]
pub fn format_suggestions_text(
    form: &ConfigForm,
    suggestions: &SlotSuggestions,
    opts: &FormatOptions,
) -> String {
    if suggestions.iter().all(Vec::is_empty) {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(["Slot", "SSID", "Suggestions"]);
    for (index, (slot, list)) in form.wifi.iter().zip(suggestions).enumerate() {
        let ssid = slot.ssid.trim();
        let picks: Vec<String> = list
            .iter()
            .map(|s| {
                if s.value == ssid {
                    format!("*{}", s.label)
                } else {
                    s.label.clone()
                }
            })
            .collect();
        builder.push_record([
            (index + 1).to_string(),
            if ssid.is_empty() { "-" } else { ssid }.to_string(),
            if picks.is_empty() {
                "-".to_string()
            } else {
                picks.join(", ")
            },
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    format!("{}\n{}\n", opts.title("Slot Suggestions"), table)
}

// ============================================================================
// Notices
// ============================================================================

#[must_use]
pub fn format_notice(notice: &Notice, opts: &FormatOptions) -> String {
    match (opts.no_color, notice.is_error()) {
        (true, false) => format!("ok: {}", notice.message),
        (true, true) => format!("error: {}", notice.message),
        (false, false) => format!("{} {}", "ok:".green(), notice.message),
        (false, true) => format!("{} {}", "error:".red(), notice.message),
    }
}
