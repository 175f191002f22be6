//! Scan session orchestration: the cycle scheduler, its lifecycle state,
//! cancellation and zoom control.

mod cancel;
mod scan_loop;
mod session;
mod zoom;

use std::sync::{Arc, Mutex};

use crate::camera::FrameSource;

pub use cancel::CancelFlag;
pub use scan_loop::{ScanHandle, ScanLoop, ScanOptions, DEFAULT_CYCLE_INTERVAL};
pub use session::{FailureReason, ScanEvent, ScanPhase, ScanStats, SessionView};
pub use zoom::{ZoomController, ZoomError};

/// Frame source shared by a scan loop and its zoom controller.
pub(crate) type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;
