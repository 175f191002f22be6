//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::FacingArg;
use crate::camera::Facing;
use crate::config::Config;

/// Parse and validate a zoom factor (finite, positive)
fn parse_zoom(s: &str) -> Result<f64, String> {
    let zoom: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(format!("Zoom must be a positive number, got {}", s));
    }
    Ok(zoom)
}

/// Parse and validate the cycle interval (1-1000 ms)
fn parse_interval(s: &str) -> Result<u64, String> {
    let ms: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid interval", s))?;
    if !(1..=1000).contains(&ms) {
        return Err(format!("Interval must be between 1 and 1000 ms, got {}", ms));
    }
    Ok(ms)
}

/// Scan a QR code from a live camera
#[derive(Parser, Debug)]
#[command(name = "qrscan")]
#[command(version, about = "Scan a QR code from a live camera", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Scan with the rear camera
    qrscan

    # Use the first camera found, zoomed in
    qrscan --facing any --zoom 2.0

    # Give up after 600 frames without a code
    qrscan --max-attempts 600")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Preferred camera facing
    #[arg(long)]
    pub facing: Option<FacingArg>,

    /// Camera device index (from list-cameras); overrides --facing
    #[arg(long)]
    pub camera: Option<u32>,

    /// Zoom factor, clamped to what the camera supports
    #[arg(long, short, value_parser = parse_zoom)]
    pub zoom: Option<f64>,

    /// Milliseconds between scan cycles
    #[arg(long, value_parser = parse_interval)]
    pub interval_ms: Option<u64>,

    /// Stop after this many frames without a match
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Disable the enhanced preprocessing strategy
    #[arg(long)]
    pub no_assist: bool,

    /// Mirror camera horizontally
    #[arg(long)]
    pub mirror: bool,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan for a code (the default)
    Scan,
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Overlay command-line flags on top of the file configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(facing) = self.facing {
            config.camera.facing = Facing::from(facing).as_str().to_string();
        }
        if let Some(device) = self.camera {
            config.camera.device = Some(device);
        }
        if let Some(zoom) = self.zoom {
            config.scan.zoom = Some(zoom);
        }
        if let Some(ms) = self.interval_ms {
            config.scan.interval_ms = ms;
        }
        if let Some(max) = self.max_attempts {
            config.scan.max_attempts = Some(max);
        }
        if self.no_assist {
            config.decoder.assist = false;
        }
        if self.mirror {
            config.camera.mirror = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["qrscan"]);
        assert!(args.command.is_none());
        assert!(args.facing.is_none());
        assert!(args.camera.is_none());
        assert!(args.zoom.is_none());
        assert!(args.interval_ms.is_none());
        assert!(args.max_attempts.is_none());
        assert!(!args.no_assist);
        assert!(!args.mirror);
        assert!(args.config.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_facing_values() {
        let args = Args::parse_from(["qrscan", "--facing", "user"]);
        assert_eq!(args.facing, Some(FacingArg::User));

        let args = Args::parse_from(["qrscan", "--facing", "environment"]);
        assert_eq!(args.facing, Some(FacingArg::Environment));

        let args = Args::parse_from(["qrscan", "--facing", "any"]);
        assert_eq!(args.facing, Some(FacingArg::Any));
    }

    #[test]
    fn test_args_zoom_validation() {
        let args = Args::parse_from(["qrscan", "--zoom", "2.5"]);
        assert_eq!(args.zoom, Some(2.5));

        let args = Args::parse_from(["qrscan", "-z", "1"]);
        assert_eq!(args.zoom, Some(1.0));

        assert!(Args::try_parse_from(["qrscan", "--zoom", "-1"]).is_err());
        assert!(Args::try_parse_from(["qrscan", "--zoom", "abc"]).is_err());
    }

    #[test]
    fn test_args_interval_validation() {
        let args = Args::parse_from(["qrscan", "--interval-ms", "33"]);
        assert_eq!(args.interval_ms, Some(33));

        assert!(Args::try_parse_from(["qrscan", "--interval-ms", "0"]).is_err());
        assert!(Args::try_parse_from(["qrscan", "--interval-ms", "5000"]).is_err());
    }

    #[test]
    fn test_args_max_attempts_validation() {
        let args = Args::parse_from(["qrscan", "--max-attempts", "1"]);
        assert_eq!(args.max_attempts, Some(1));

        assert!(Args::try_parse_from(["qrscan", "--max-attempts", "0"]).is_err());
        assert!(Args::try_parse_from(["qrscan", "--max-attempts", "-3"]).is_err());
    }

    #[test]
    fn test_args_subcommands() {
        let args = Args::parse_from(["qrscan", "list-cameras"]);
        assert!(matches!(args.command, Some(Command::ListCameras)));

        let args = Args::parse_from(["qrscan", "scan"]);
        assert!(matches!(args.command, Some(Command::Scan)));

        let args = Args::parse_from(["qrscan", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));

        let args = Args::parse_from(["qrscan", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }

    #[test]
    fn test_args_global_config_after_subcommand() {
        let args = Args::parse_from(["qrscan", "config", "show", "-c", "/tmp/q.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/q.toml")));
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = Args::parse_from([
            "qrscan",
            "--facing",
            "any",
            "--camera",
            "1",
            "--zoom",
            "3",
            "--interval-ms",
            "33",
            "--max-attempts",
            "10",
            "--no-assist",
            "--mirror",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.facing().unwrap(), Facing::Any);
        assert_eq!(config.camera.device, Some(1));
        assert_eq!(config.scan.zoom, Some(3.0));
        assert_eq!(config.scan.interval_ms, 33);
        assert_eq!(config.scan.max_attempts, Some(10));
        assert!(!config.decoder.assist);
        assert!(config.camera.mirror);
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let args = Args::parse_from(["qrscan"]);
        let mut config = Config::default();
        config.scan.max_attempts = Some(7);
        args.apply(&mut config);
        assert_eq!(config.scan.max_attempts, Some(7));
        assert!(config.decoder.assist);
    }
}
