//! Subcommand handlers and scan status output.

use std::io::Write;
use std::path::Path;

use super::args::ConfigAction;
use crate::camera::{self, infer_facing};
use crate::config::{default_path, Config, DEFAULT_CONFIG};
use crate::scan::ScanEvent;

/// List available cameras and print them to stdout.
pub fn list_cameras() {
    match camera::list_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No cameras found.");
                println!();
                println!("Make sure your camera is connected and permissions are granted.");
            } else {
                println!("Available cameras:");
                for device in devices {
                    match infer_facing(&device) {
                        Some(facing) => println!("  {} [{}]", device, facing),
                        None => println!("  {}", device),
                    }
                }
                println!();
                println!("Use --camera <index> to select a camera.");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>, config: &Config) {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            print!("{}", render_config(config));
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'qrscan config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}

/// Human-readable summary of the effective configuration.
pub fn render_config(config: &Config) -> String {
    let optional = |v: Option<u32>| v.map_or_else(|| "none".to_string(), |v| v.to_string());

    let mut out = String::from("Current configuration:\n");
    out.push_str(&format!(
        "  Camera: {}\n",
        config
            .camera
            .device
            .map_or_else(|| "auto".to_string(), |d| d.to_string())
    ));
    out.push_str(&format!("  Facing: {}\n", config.camera.facing));
    out.push_str(&format!("  Resolution: {}\n", config.camera.resolution));
    out.push_str(&format!("  FPS: {}\n", config.camera.fps));
    out.push_str(&format!(
        "  Mirror: {}\n",
        if config.camera.mirror { "yes" } else { "no" }
    ));
    out.push_str(&format!("  Interval: {} ms\n", config.scan.interval_ms));
    out.push_str(&format!(
        "  Warm-up frame limit: {}\n",
        optional(config.scan.warmup_frame_limit)
    ));
    out.push_str(&format!(
        "  Max attempts: {}\n",
        optional(config.scan.max_attempts)
    ));
    out.push_str(&format!(
        "  Zoom: {}\n",
        config
            .scan
            .zoom
            .map_or_else(|| "device default".to_string(), |z| format!("{:.1}x", z))
    ));
    out.push_str(&format!(
        "  Assist: {}\n",
        if config.decoder.assist { "yes" } else { "no" }
    ));
    out
}

/// Status line shown on stderr for each lifecycle event.
pub fn describe_event(event: &ScanEvent) -> String {
    match event {
        ScanEvent::Initializing => "Initializing...".to_string(),
        ScanEvent::Scanning => "Scanning...".to_string(),
        ScanEvent::Decoded(payload) => format!(
            "Decoded {} bytes ({})",
            payload.bytes.len(),
            payload.strategy
        ),
        ScanEvent::Cancelled => "Scan cancelled.".to_string(),
        ScanEvent::Failed(reason) => format!("Scan failed: {}", reason),
    }
}

/// Step applied by `+` and `-` zoom commands, matching a 0.1x slider notch.
pub const ZOOM_STEP: f64 = 0.1;

/// Interpret one line typed during a scan as a zoom request.
///
/// Accepts an absolute factor (`2.5`, `2.5x`) or `+`/`-` to step from the
/// current zoom. Returns `None` for anything else.
pub fn parse_zoom_command(line: &str, current: f64) -> Option<f64> {
    let line = line.trim();
    match line {
        "+" => Some(current + ZOOM_STEP),
        "-" => Some(current - ZOOM_STEP),
        _ => line
            .trim_end_matches(&['x', 'X'][..])
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
    }
}

/// Write a decoded payload verbatim, followed by a newline.
pub fn write_payload<W: Write>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    out.flush()
}
