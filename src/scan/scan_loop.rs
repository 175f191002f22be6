//! The frame-acquisition and decode scheduler.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::session::{FailureReason, ScanEvent, ScanPhase, SessionShared, SessionView};
use super::zoom::ZoomController;
use super::SharedSource;
use crate::camera::{CameraError, Facing, Frame, FrameSource};
use crate::decoder::{DecodeResult, DecoderPipeline, Payload};

/// One display refresh at 60 Hz.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(16);

/// Knobs for a single scan session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Facing requested from the frame source
    pub facing: Facing,
    /// Delay between cycles; one capture and at most one decode per cycle
    pub cycle_interval: Duration,
    /// Fail if this many captures in a row come back empty before the
    /// first frame arrives. `None` waits forever. `Some(0)` acts as `Some(1)`.
    pub warmup_frame_limit: Option<u32>,
    /// Fail after this many decode attempts without a match. `None` scans
    /// until decoded or cancelled. `Some(0)` acts as `Some(1)`: the first
    /// frame is always decoded.
    pub max_attempts: Option<u32>,
    /// Zoom applied right after the source opens
    pub initial_zoom: Option<f64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            warmup_frame_limit: None,
            max_attempts: None,
            initial_zoom: None,
        }
    }
}

// Source open states. A source abandoned mid-open is closed by the open task.
const NOT_OPENED: u8 = 0;
const OPENING: u8 = 1;
const OPENED: u8 = 2;
const ABANDONED: u8 = 3;

/// How the session ended, before it is published.
enum Outcome {
    Decoded(Payload),
    Cancelled,
    Failed(FailureReason),
}

/// Caller-side handle to a scan session. Cheap to clone and safe to use
/// from any thread.
#[derive(Clone)]
pub struct ScanHandle {
    source: SharedSource,
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("phase", &self.shared.phase())
            .finish_non_exhaustive()
    }
}

impl ScanHandle {
    /// Request cancellation. Idempotent; a no-op once the session ended.
    pub fn cancel(&self) {
        if self.shared.phase().is_terminal() {
            return;
        }
        if self.shared.cancel.cancel() {
            log::info!("Scan cancellation requested");
        }
    }

    pub fn zoom(&self) -> ZoomController {
        ZoomController::new(Arc::clone(&self.source), Arc::clone(&self.shared))
    }

    pub fn view(&self) -> SessionView {
        SessionView::new(Arc::clone(&self.shared))
    }

    pub fn phase(&self) -> ScanPhase {
        self.shared.phase()
    }
}

/// Drives one scan session from `Idle` to a terminal phase.
///
/// Each cycle waits for the next tick, captures one frame and, if there is
/// one, runs the decoder pipeline on it. Cycles never overlap. Empty
/// captures and no-match results are retried on the next tick. The frame
/// source is closed exactly once, on every exit path.
pub struct ScanLoop {
    source: SharedSource,
    pipeline: Arc<DecoderPipeline>,
    options: ScanOptions,
    shared: Arc<SessionShared>,
    open_state: Arc<AtomicU8>,
    closed: AtomicBool,
}

impl ScanLoop {
    pub fn new(
        source: impl FrameSource + 'static,
        pipeline: impl Into<Arc<DecoderPipeline>>,
        options: ScanOptions,
    ) -> Self {
        let source: Box<dyn FrameSource> = Box::new(source);
        Self {
            source: Arc::new(Mutex::new(source)),
            pipeline: pipeline.into(),
            options,
            shared: SessionShared::new(),
            open_state: Arc::new(AtomicU8::new(NOT_OPENED)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle {
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the session on the current tokio runtime and stream its events.
    pub fn spawn(self) -> (JoinHandle<ScanPhase>, UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(tx));
        (task, rx)
    }

    /// Run the session to completion, sending lifecycle events to `events`.
    ///
    /// Returns the terminal phase. Never panics on frame or decoder faults;
    /// every exit goes through a terminal phase.
    pub async fn run(self, events: UnboundedSender<ScanEvent>) -> ScanPhase {
        let outcome = self.drive(&events).await;
        self.finish(outcome, &events)
    }

    async fn drive(&self, events: &UnboundedSender<ScanEvent>) -> Outcome {
        if self.shared.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        self.enter(ScanPhase::Initializing, ScanEvent::Initializing, events);

        self.open_state.store(OPENING, Ordering::SeqCst);
        let mut open_task = {
            let source = Arc::clone(&self.source);
            let shared = Arc::clone(&self.shared);
            let open_state = Arc::clone(&self.open_state);
            let facing = self.options.facing;
            tokio::task::spawn_blocking(move || {
                let mut source = lock_source(&source);
                let opened = source.open(facing).map(|()| source.capabilities());
                if open_state
                    .compare_exchange(OPENING, OPENED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    log::debug!("Closing source opened after cancellation");
                    source.close();
                    shared.mark_source_released();
                }
                opened
            })
        };

        let opened = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => None,
            joined = &mut open_task => Some(joined),
        };
        let Some(joined) = opened else {
            return Outcome::Cancelled;
        };

        match joined {
            Ok(Ok(capability)) => self.shared.publish_capability(capability),
            Ok(Err(e)) => return Outcome::Failed(device_unavailable(e)),
            Err(e) => {
                return Outcome::Failed(FailureReason::DeviceUnavailable(format!(
                    "open task failed: {}",
                    e
                )))
            }
        }

        if self.shared.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        if let Some(zoom) = self.options.initial_zoom {
            match self.handle().zoom().set_zoom(zoom) {
                Ok(applied) => log::info!("Initial zoom {:.2}", applied),
                Err(e) => log::warn!("Initial zoom not applied: {}", e),
            }
        }

        self.enter(ScanPhase::Scanning, ScanEvent::Scanning, events);
        self.scan().await
    }

    /// The steady-state `Scanning -> Scanning` cycle.
    async fn scan(&self) -> Outcome {
        let mut ticker = tokio::time::interval(self.options.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut seen_frame = false;
        let mut empty_streak: u32 = 0;
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => return Outcome::Cancelled,
                _ = ticker.tick() => {}
            }
            self.shared.count_cycle();

            let captured = lock_source(&self.source).capture();
            let Some(frame) = captured.filter(Frame::is_dimensioned) else {
                self.shared.count_empty_capture();
                if !seen_frame {
                    empty_streak = empty_streak.saturating_add(1);
                    if let Some(limit) = self.options.warmup_frame_limit {
                        if empty_streak >= limit {
                            return Outcome::Failed(FailureReason::NoFrames {
                                attempts: empty_streak,
                            });
                        }
                    }
                }
                continue;
            };

            if !seen_frame {
                seen_frame = true;
                log::debug!(
                    "First frame {}x{} after {} empty captures",
                    frame.width,
                    frame.height,
                    empty_streak
                );
            }

            self.shared.count_decode_attempt();
            let pipeline = Arc::clone(&self.pipeline);
            let mut decode_task = tokio::task::spawn_blocking(move || pipeline.decode(&frame));

            let decoded = tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => None,
                joined = &mut decode_task => Some(joined),
            };

            let Some(joined) = decoded else {
                log::debug!("Abandoning in-flight decode");
                return Outcome::Cancelled;
            };
            if self.shared.cancel.is_cancelled() {
                // Cancelled while the decode was finishing; its result is discarded
                return Outcome::Cancelled;
            }

            match joined {
                Ok(DecodeResult::Success(payload)) => return Outcome::Decoded(payload),
                Ok(DecodeResult::NoMatch) => {}
                Err(e) => log::warn!("Decode task failed: {}", e),
            }

            attempts = attempts.saturating_add(1);
            if let Some(max) = self.options.max_attempts {
                if attempts >= max {
                    return Outcome::Failed(FailureReason::AttemptsExhausted { attempts });
                }
            }
        }
    }

    fn enter(&self, phase: ScanPhase, event: ScanEvent, events: &UnboundedSender<ScanEvent>) {
        if self.shared.transition(phase) {
            log::info!("Scan {}", phase);
            let _ = events.send(event);
        }
    }

    fn finish(&self, outcome: Outcome, events: &UnboundedSender<ScanEvent>) -> ScanPhase {
        self.close_source();

        let (published, event) = match outcome {
            Outcome::Decoded(payload) => {
                log::info!(
                    "Decoded {} bytes via '{}'",
                    payload.bytes.len(),
                    payload.strategy
                );
                (self.shared.decode(payload.clone()), ScanEvent::Decoded(payload))
            }
            Outcome::Cancelled => {
                log::info!("Scan cancelled");
                (
                    self.shared.transition(ScanPhase::Cancelled),
                    ScanEvent::Cancelled,
                )
            }
            Outcome::Failed(reason) => {
                log::error!("Scan failed: {}", reason);
                (
                    self.shared.transition(ScanPhase::Failed),
                    ScanEvent::Failed(reason),
                )
            }
        };

        if published {
            let _ = events.send(event);
        }
        self.shared.phase()
    }

    /// Close the source unless it has been closed already. An open still
    /// running on the blocking pool is left to close the source itself, so
    /// this never waits on it.
    fn close_source(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let abandoned = self
            .open_state
            .compare_exchange(OPENING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if abandoned {
            return;
        }
        lock_source(&self.source).close();
        self.shared.mark_source_released();
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        // Covers a caller dropping the run future mid-session
        self.close_source();
    }
}

fn lock_source(source: &SharedSource) -> MutexGuard<'_, Box<dyn FrameSource>> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}

fn device_unavailable(error: CameraError) -> FailureReason {
    FailureReason::DeviceUnavailable(error.to_string())
}
