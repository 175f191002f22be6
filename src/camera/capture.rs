//! Live webcam frame source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use super::capture_loop::{run_capture_loop, CaptureCommand, StreamInfo};
use super::device::{list_devices, select_device};
use super::source::FrameSource;
use super::types::{CameraError, CameraSettings, Facing, Frame, Resolution, ZoomCapability};

/// A webcam opened through nokhwa, usable as a [`FrameSource`].
///
/// A worker thread owns the device and keeps replacing `latest` with the
/// newest decoded frame. [`FrameSource::capture`] takes that frame, so the
/// scan loop never sees the same frame twice and gets `None` between frames.
pub struct CameraCapture {
    latest: Arc<Mutex<Option<Frame>>>,
    worker: Option<JoinHandle<()>>,
    commands: Option<Sender<CaptureCommand>>,
    stop: Arc<AtomicBool>,
    settings: CameraSettings,
    /// What the device agreed to when it opened
    stream: Option<StreamInfo>,
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CameraCapture {
    /// Create an unopened capture handle. Nothing touches the hardware
    /// until [`FrameSource::open`] is called.
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            worker: None,
            commands: None,
            stop: Arc::new(AtomicBool::new(false)),
            settings,
            stream: None,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Negotiated resolution, once open.
    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.stream.as_ref().map(|s| s.resolution)
    }

    pub fn actual_fps(&self) -> Option<u32> {
        self.stream.as_ref().map(|s| s.fps)
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.worker, Some(worker) if !worker.is_finished())
    }

    fn stop_worker(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(CaptureCommand::Stop);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl FrameSource for CameraCapture {
    fn open(&mut self, facing: Facing) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }

        let devices = list_devices()?;
        let device = select_device(&devices, facing, self.settings.device_index)?;
        log::info!("Opening camera {}", device);

        self.stop.store(false, Ordering::SeqCst);
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<StreamInfo, CameraError>>();
        let latest = Arc::clone(&self.latest);
        let stop = Arc::clone(&self.stop);
        let settings = self.settings.clone();

        self.commands = Some(command_tx);
        self.worker = Some(std::thread::spawn(move || {
            run_capture_loop(device.index, settings, latest, stop, command_rx, ready_tx);
        }));

        // Block until the worker has a stream or gives up on the device
        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(CameraError::StreamFailed(
                "capture worker exited before the stream started".to_string(),
            ))
        });
        match ready {
            Ok(info) => {
                log::info!(
                    "Camera streaming at {} @ {} fps, zoom {:.1}x-{:.1}x",
                    info.resolution,
                    info.fps,
                    info.zoom.min,
                    info.zoom.max
                );
                self.stream = Some(info);
                Ok(())
            }
            Err(e) => {
                self.stop_worker();
                Err(e)
            }
        }
    }

    fn capture(&mut self) -> Option<Frame> {
        self.latest.lock().ok()?.take()
    }

    fn capabilities(&self) -> ZoomCapability {
        self.stream.as_ref().map(|s| s.zoom).unwrap_or_default()
    }

    fn apply_zoom(&mut self, value: f64) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(CaptureCommand::SetZoom(value));
        }
    }

    fn close(&mut self) {
        self.stop_worker();
        self.stream = None;
        if let Ok(mut latest) = self.latest.lock() {
            latest.take();
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_unknown_index_fails() {
        let settings = CameraSettings {
            device_index: Some(999),
            ..CameraSettings::default()
        };
        let mut camera = CameraCapture::new(settings);
        let result = camera.open(Facing::Any);
        assert!(result.is_err());
        assert!(!camera.is_running());
    }

    #[test]
    fn test_unopened_camera_is_inert() {
        let mut camera = CameraCapture::new(CameraSettings::default());
        assert!(camera.capture().is_none());
        assert_eq!(camera.capabilities(), ZoomCapability::FIXED);
        camera.apply_zoom(2.0);
        camera.close();
        camera.close();
        assert!(camera.actual_resolution().is_none());
    }
}
