//! Zoom control for an active scan session.

use std::sync::{Arc, PoisonError};

use super::session::SessionShared;
use super::SharedSource;
use crate::camera::ZoomCapability;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoomError {
    #[error("scan session has ended")]
    SessionEnded,

    #[error("invalid zoom value: {0}")]
    InvalidValue(f64),
}

/// Clamps zoom requests to the source's bounds and forwards them.
///
/// Independent of scan state: it can be used while the loop is mid-cycle,
/// and the new zoom shows up in whatever frame the loop captures next.
#[derive(Clone)]
pub struct ZoomController {
    source: SharedSource,
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for ZoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomController")
            .field("capability", &self.capability())
            .finish_non_exhaustive()
    }
}

impl ZoomController {
    pub(crate) fn new(source: SharedSource, shared: Arc<SessionShared>) -> Self {
        Self { source, shared }
    }

    /// Zoom bounds of the open source; [`ZoomCapability::FIXED`] until it
    /// has opened.
    pub fn capability(&self) -> ZoomCapability {
        self.shared.capability().unwrap_or_default()
    }

    /// Apply `value`, clamped to the current capability.
    ///
    /// Returns the value actually applied so a displayed zoom level never
    /// drifts from what the device was asked for. Before the source has
    /// opened the request is clamped to [`ZoomCapability::FIXED`] and the
    /// source is not touched, so this never waits on a slow open.
    pub fn set_zoom(&self, value: f64) -> Result<f64, ZoomError> {
        if !value.is_finite() {
            return Err(ZoomError::InvalidValue(value));
        }
        if self.shared.phase().is_terminal() {
            return Err(ZoomError::SessionEnded);
        }

        let applied = match self.shared.capability() {
            Some(capability) => {
                let applied = capability.clamp(value);
                self.source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply_zoom(applied);
                applied
            }
            None => ZoomCapability::FIXED.clamp(value),
        };

        if !self.shared.record_zoom(applied) {
            return Err(ZoomError::SessionEnded);
        }
        if applied != value {
            log::debug!("Zoom {:.2} adjusted to {:.2}", value, applied);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraError, Facing, Frame, FrameSource};
    use crate::scan::session::ScanPhase;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ZoomOnly {
        capability: Option<ZoomCapability>,
        applied: Arc<Mutex<Vec<f64>>>,
    }

    impl FrameSource for ZoomOnly {
        fn open(&mut self, _facing: Facing) -> Result<(), CameraError> {
            Ok(())
        }

        fn capture(&mut self) -> Option<Frame> {
            None
        }

        fn capabilities(&self) -> ZoomCapability {
            self.capability.unwrap_or_default()
        }

        fn apply_zoom(&mut self, value: f64) {
            self.applied.lock().unwrap().push(value);
        }

        fn close(&mut self) {}
    }

    fn controller(
        capability: Option<ZoomCapability>,
    ) -> (ZoomController, Arc<SessionShared>, Arc<Mutex<Vec<f64>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let source = ZoomOnly {
            capability,
            applied: Arc::clone(&applied),
        };
        let shared = SessionShared::new();
        if let Some(capability) = capability {
            shared.publish_capability(capability);
        }
        let source: SharedSource = Arc::new(Mutex::new(Box::new(source)));
        (
            ZoomController::new(source, Arc::clone(&shared)),
            shared,
            applied,
        )
    }

    #[test]
    fn test_clamps_to_capability() {
        let (zoom, _shared, applied) = controller(Some(ZoomCapability::new(1.0, 3.0)));
        assert_eq!(zoom.set_zoom(0.5), Ok(1.0));
        assert_eq!(zoom.set_zoom(2.2), Ok(2.2));
        assert_eq!(zoom.set_zoom(9.0), Ok(3.0));
        assert_eq!(*applied.lock().unwrap(), vec![1.0, 2.2, 3.0]);
    }

    #[test]
    fn test_clamp_property_over_range() {
        let cap = ZoomCapability::new(1.5, 4.0);
        let (zoom, _shared, _applied) = controller(Some(cap));
        for step in -20..=80 {
            let v = step as f64 * 0.1;
            let got = zoom.set_zoom(v).unwrap();
            assert_eq!(got, cap.min.max(v.min(cap.max)));
            assert!(got >= cap.min && got <= cap.max);
        }
    }

    #[test]
    fn test_fixed_capability_pins_to_one() {
        let (zoom, _shared, applied) = controller(Some(ZoomCapability::FIXED));
        assert_eq!(zoom.set_zoom(2.0), Ok(1.0));
        assert_eq!(*applied.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_unopened_source_is_not_touched() {
        let (zoom, shared, applied) = controller(None);
        assert_eq!(zoom.capability(), ZoomCapability::FIXED);
        assert_eq!(zoom.set_zoom(2.0), Ok(1.0));
        assert!(applied.lock().unwrap().is_empty());
        assert_eq!(crate::scan::SessionView::new(shared).zoom(), Some(1.0));
    }

    #[test]
    fn test_zoom_before_open_does_not_wait_for_source_lock() {
        let (zoom, _shared, _applied) = controller(None);
        let source = Arc::clone(&zoom.source);
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();

        // Hold the source the way a slow open does
        let holder = std::thread::spawn(move || {
            let _guard = source.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(300));
        });
        locked_rx.recv().unwrap();

        let started = std::time::Instant::now();
        assert_eq!(zoom.set_zoom(2.0), Ok(1.0));
        assert!(started.elapsed() < std::time::Duration::from_millis(100));
        holder.join().unwrap();
    }

    #[test]
    fn test_stepped_capability_reports_what_source_receives() {
        let cap = ZoomCapability::new(1.0, 5.0).with_step(0.1);
        let (zoom, _shared, applied) = controller(Some(cap));
        let got = zoom.set_zoom(1.26).unwrap();
        assert!((got - 1.3).abs() < 1e-9);
        assert_eq!(*applied.lock().unwrap(), vec![got]);
    }

    #[test]
    fn test_records_applied_zoom() {
        let (zoom, shared, _applied) = controller(Some(ZoomCapability::new(1.0, 2.0)));
        zoom.set_zoom(5.0).unwrap();
        assert_eq!(crate::scan::SessionView::new(shared).zoom(), Some(2.0));
    }

    #[test]
    fn test_rejected_after_session_ends() {
        let (zoom, shared, applied) = controller(Some(ZoomCapability::new(1.0, 3.0)));
        shared.transition(ScanPhase::Cancelled);
        assert_eq!(zoom.set_zoom(2.0), Err(ZoomError::SessionEnded));
        assert!(applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_finite() {
        let (zoom, _shared, applied) = controller(Some(ZoomCapability::new(1.0, 3.0)));
        assert!(matches!(
            zoom.set_zoom(f64::NAN),
            Err(ZoomError::InvalidValue(_))
        ));
        assert!(applied.lock().unwrap().is_empty());
    }
}
