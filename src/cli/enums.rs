//! CLI enum types.

use clap::ValueEnum;

use crate::camera::Facing;

/// Which camera to prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FacingArg {
    User,
    #[default]
    Environment,
    Any,
}

impl From<FacingArg> for Facing {
    fn from(f: FacingArg) -> Self {
        match f {
            FacingArg::User => Facing::User,
            FacingArg::Environment => Facing::Environment,
            FacingArg::Any => Facing::Any,
        }
    }
}
