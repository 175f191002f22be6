//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction};
pub use commands::{
    describe_event, handle_config_action, list_cameras, parse_zoom_command, render_config,
    write_payload, ZOOM_STEP,
};
pub use enums::FacingArg;
