//! The frame source contract consumed by the scan loop.

use super::types::{CameraError, Facing, Frame, ZoomCapability};

/// A live video feed that yields frames on demand.
///
/// Implementations are driven from a single scan session at a time. The
/// scan loop calls `open` once, then `capture` once per cycle, and `close`
/// exactly once on every exit path. `close` must still tolerate repeated
/// calls, since it also runs from `Drop` on some sources.
pub trait FrameSource: Send {
    /// Acquire a device with the requested facing.
    ///
    /// Must fail with an error when no device matches; never substitute a
    /// different facing silently.
    fn open(&mut self, facing: Facing) -> Result<(), CameraError>;

    /// Take the current frame.
    ///
    /// `None` is the normal answer while the stream is still warming up and
    /// has not produced dimensioned output yet.
    fn capture(&mut self) -> Option<Frame>;

    /// Zoom bounds of the open device. [`ZoomCapability::FIXED`] when the
    /// device has no zoom control or is not open.
    fn capabilities(&self) -> ZoomCapability;

    /// Request a zoom factor. Fire-and-forget; callers clamp beforehand.
    fn apply_zoom(&mut self, value: f64);

    /// Release every device resource. Idempotent.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self, facing: Facing) -> Result<(), CameraError> {
        (**self).open(facing)
    }

    fn capture(&mut self) -> Option<Frame> {
        (**self).capture()
    }

    fn capabilities(&self) -> ZoomCapability {
        (**self).capabilities()
    }

    fn apply_zoom(&mut self, value: f64) {
        (**self).apply_zoom(value)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
