//! Scan session state and lifecycle events.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::cancel::CancelFlag;
use crate::camera::ZoomCapability;
use crate::decoder::Payload;

/// Lifecycle phase of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Initializing,
    Scanning,
    Decoded,
    Cancelled,
    Failed,
}

impl ScanPhase {
    /// Terminal phases are absorbing: nothing leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanPhase::Decoded | ScanPhase::Cancelled | ScanPhase::Failed
        )
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Initializing => "initializing",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Decoded => "decoded",
            ScanPhase::Cancelled => "cancelled",
            ScanPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a session ended in [`ScanPhase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("camera produced no frames after {attempts} captures")]
    NoFrames { attempts: u32 },

    #[error("no code found after {attempts} decode attempts")]
    AttemptsExhausted { attempts: u32 },
}

/// Lifecycle events emitted by the scan loop, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Initializing,
    Scanning,
    Decoded(Payload),
    Cancelled,
    Failed(FailureReason),
}

impl ScanEvent {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanEvent::Initializing => ScanPhase::Initializing,
            ScanEvent::Scanning => ScanPhase::Scanning,
            ScanEvent::Decoded(_) => ScanPhase::Decoded,
            ScanEvent::Cancelled => ScanPhase::Cancelled,
            ScanEvent::Failed(_) => ScanPhase::Failed,
        }
    }
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Scheduled cycles that ran
    pub cycles: u64,
    /// Captures that returned no frame
    pub empty_captures: u64,
    /// Frames handed to the decoder pipeline
    pub decode_attempts: u64,
}

#[derive(Debug)]
struct Inner {
    phase: ScanPhase,
    payload: Option<Payload>,
    zoom: Option<f64>,
    /// Known once the source has opened
    capability: Option<ZoomCapability>,
}

/// State shared between the scan loop, its zoom controller and read views.
///
/// Only the scan loop moves the phase and sets the payload; only the zoom
/// controller writes the zoom value.
#[derive(Debug)]
pub(crate) struct SessionShared {
    inner: Mutex<Inner>,
    pub(crate) cancel: CancelFlag,
    cycles: AtomicU64,
    empty_captures: AtomicU64,
    decode_attempts: AtomicU64,
    source_released: AtomicBool,
}

impl SessionShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                phase: ScanPhase::Idle,
                payload: None,
                zoom: None,
                capability: None,
            }),
            cancel: CancelFlag::new(),
            cycles: AtomicU64::new(0),
            empty_captures: AtomicU64::new(0),
            decode_attempts: AtomicU64::new(0),
            source_released: AtomicBool::new(false),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> ScanPhase {
        self.lock().phase
    }

    /// Move to `next`. Refused once a terminal phase has been reached.
    pub(crate) fn transition(&self, next: ScanPhase) -> bool {
        let mut inner = self.lock();
        if inner.phase.is_terminal() {
            return false;
        }
        inner.phase = next;
        true
    }

    /// Freeze the payload and enter [`ScanPhase::Decoded`].
    pub(crate) fn decode(&self, payload: Payload) -> bool {
        let mut inner = self.lock();
        if inner.phase.is_terminal() {
            return false;
        }
        inner.phase = ScanPhase::Decoded;
        inner.payload = Some(payload);
        true
    }

    /// Record an applied zoom unless the session has ended.
    pub(crate) fn record_zoom(&self, value: f64) -> bool {
        let mut inner = self.lock();
        if inner.phase.is_terminal() {
            return false;
        }
        inner.zoom = Some(value);
        true
    }

    pub(crate) fn publish_capability(&self, capability: ZoomCapability) {
        self.lock().capability = Some(capability);
    }

    pub(crate) fn capability(&self) -> Option<ZoomCapability> {
        self.lock().capability
    }

    pub(crate) fn mark_source_released(&self) {
        self.source_released.store(true, Ordering::SeqCst);
    }

    pub(crate) fn count_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_empty_capture(&self) {
        self.empty_captures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_decode_attempt(&self) {
        self.decode_attempts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read-only projection of a session for presentation code.
#[derive(Debug, Clone)]
pub struct SessionView {
    shared: Arc<SessionShared>,
}

impl SessionView {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    pub fn phase(&self) -> ScanPhase {
        self.shared.phase()
    }

    /// Frozen payload once the session has decoded.
    pub fn payload(&self) -> Option<Payload> {
        self.shared.lock().payload.clone()
    }

    /// Last zoom value actually applied, if any.
    pub fn zoom(&self) -> Option<f64> {
        self.shared.lock().zoom
    }

    /// True once the frame source's `close` has returned.
    pub fn is_source_released(&self) -> bool {
        self.shared.source_released.load(Ordering::SeqCst)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            cycles: self.shared.cycles.load(Ordering::Relaxed),
            empty_captures: self.shared.empty_captures.load(Ordering::Relaxed),
            decode_attempts: self.shared.decode_attempts.load(Ordering::Relaxed),
        }
    }
}
