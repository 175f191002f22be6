//! Capture worker: owns the nokhwa device for the lifetime of a stream.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, ControlValueDescription, ControlValueSetter,
    FrameFormat as NokhwaFrameFormat, KnownCameraControl, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::frame_utils::{convert_to_rgb, mirror_horizontal};
use super::types::{
    CameraError, CameraSettings, DeviceZoomRange, Frame, Resolution, ZoomCapability,
};

/// Requests from the [`CameraCapture`](super::CameraCapture) handle.
pub enum CaptureCommand {
    SetZoom(f64),
    Stop,
}

/// What the capture thread reports once the stream is running.
pub struct StreamInfo {
    pub resolution: Resolution,
    pub fps: u32,
    pub zoom: ZoomCapability,
}

/// Body of the capture worker thread.
///
/// Opens the device, reports the negotiated stream (or the failure) on
/// `ready`, then publishes frames into `latest` until stopped.
pub fn run_capture_loop(
    device_index: u32,
    settings: CameraSettings,
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    commands: Receiver<CaptureCommand>,
    ready: Sender<Result<StreamInfo, CameraError>>,
) {
    let mut camera = match open_camera(CameraIndex::Index(device_index), &settings) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    let zoom = zoom_range(&camera);
    let negotiated = camera.resolution();
    let _ = ready.send(Ok(StreamInfo {
        resolution: Resolution {
            width: negotiated.width(),
            height: negotiated.height(),
        },
        fps: camera.frame_rate(),
        zoom: zoom.map(|z| z.range.capability()).unwrap_or_default(),
    }));

    'stream: while !stop.load(Ordering::Relaxed) {
        for command in commands.try_iter() {
            match command {
                CaptureCommand::Stop => break 'stream,
                CaptureCommand::SetZoom(value) => {
                    if let Some(control) = zoom {
                        apply_zoom(&mut camera, control, value);
                    }
                }
            }
        }

        // A frame that fails to decode is dropped; the scan loop just sees None
        let frame = camera.frame().ok().and_then(|raw| convert_to_rgb(&raw));
        if let Some(mut frame) = frame {
            if settings.mirror {
                mirror_horizontal(&mut frame);
            }
            if let Ok(mut slot) = latest.lock() {
                *slot = Some(frame);
            }
        }

        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

#[derive(Clone, Copy)]
struct ZoomControl {
    range: DeviceZoomRange,
    integer: bool,
}

/// Read the device zoom control.
fn zoom_range(camera: &Camera) -> Option<ZoomControl> {
    let control = camera.camera_control(KnownCameraControl::Zoom).ok()?;
    match control.description() {
        ControlValueDescription::IntegerRange { min, max, step, .. } => Some(ZoomControl {
            range: DeviceZoomRange {
                min: *min as f64,
                max: *max as f64,
                step: (*step).max(1) as f64,
            },
            integer: true,
        }),
        ControlValueDescription::FloatRange { min, max, step, .. } => Some(ZoomControl {
            range: DeviceZoomRange {
                min: *min,
                max: *max,
                step: *step,
            },
            integer: false,
        }),
        _ => None,
    }
}

/// Send a zoom factor, already snapped to the capability grid, to the device.
fn apply_zoom(camera: &mut Camera, control: ZoomControl, factor: f64) {
    let raw = control.range.to_device(factor);
    let setter = if control.integer {
        ControlValueSetter::Integer(raw.round() as i64)
    } else {
        ControlValueSetter::Float(raw)
    };
    if let Err(e) = camera.set_camera_control(KnownCameraControl::Zoom, setter) {
        log::warn!("Camera rejected zoom {:.2}x: {}", factor, e);
    }
}

/// Open the device, trying NV12 (native on macOS), then MJPEG, then
/// whatever the driver offers at its highest resolution.
fn open_camera(index: CameraIndex, settings: &CameraSettings) -> Result<Camera, CameraError> {
    let resolution =
        nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let closest = |format| {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            format,
            settings.fps,
        )))
    };
    let requests = [
        closest(NokhwaFrameFormat::NV12),
        closest(NokhwaFrameFormat::MJPEG),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = String::from("no format accepted");
    for request in requests {
        match Camera::new(index.clone(), request) {
            Ok(camera) => return Ok(camera),
            Err(e) => {
                log::debug!("Camera rejected format request: {}", e);
                last_error = e.to_string();
            }
        }
    }

    let lower = last_error.to_lowercase();
    let denied = ["permission", "denied", "authorization", "access"]
        .iter()
        .any(|hint| lower.contains(hint));
    if denied {
        Err(CameraError::PermissionDenied)
    } else {
        Err(CameraError::OpenFailed(last_error))
    }
}
