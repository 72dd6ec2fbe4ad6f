//! Device listing (`-l`)

use crate::capture::{CaptureBackend, DeviceCatalog, DeviceInfo};
use crate::config::Settings;
use crate::utils::AppResult;
use serde::Serialize;

/// Device list as printed with `--json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport<'a> {
    pub backend: CaptureBackend,
    pub video_devices: &'a [DeviceInfo],
    pub audio_devices: &'a [DeviceInfo],
}

/// List connected devices to stdout
pub async fn list(settings: &Settings, json: bool) -> AppResult<()> {
    let catalog = DeviceCatalog::discover(&settings.ffmpeg_path, CaptureBackend::native()).await?;

    if json {
        println!("{}", render_json(&catalog)?);
    } else {
        print!("{}", render_text(&catalog));
    }
    Ok(())
}

pub fn render_json(catalog: &DeviceCatalog) -> AppResult<String> {
    let report = DeviceReport {
        backend: catalog.backend(),
        video_devices: catalog.video_devices(),
        audio_devices: catalog.audio_devices(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn render_text(catalog: &DeviceCatalog) -> String {
    let mut out = String::new();
    append_section(&mut out, "video", catalog.video_devices());
    append_section(&mut out, "audio", catalog.audio_devices());
    out
}

fn append_section(out: &mut String, what: &str, devices: &[DeviceInfo]) {
    if devices.is_empty() {
        out.push_str(&format!("No {} devices found\n", what));
        return;
    }

    out.push_str(&format!(
        "Found {} connected {} device{}:\n",
        devices.len(),
        what,
        if devices.len() == 1 { "" } else { "s" }
    ));
    for device in devices {
        if device.is_default {
            out.push_str(&format!("* {} (default)\n", device.name));
        } else {
            out.push_str(&format!("* {}\n", device.name));
        }
    }
}
