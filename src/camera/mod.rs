//! Frame sources: the contract the scan loop captures through, and the
//! live webcam implementation behind the `camera` feature.
//!
//! - Frame source contract via [`FrameSource`]
//! - Device enumeration via [`list_devices`] and selection via [`select_device`]
//! - Webcam capture via `CameraCapture` (feature `camera`)

#[cfg(feature = "camera")]
mod capture;
#[cfg(feature = "camera")]
mod capture_loop;
mod device;
pub mod frame_utils;
mod source;
mod types;

#[cfg(feature = "camera")]
pub use capture::CameraCapture;
pub use device::{infer_facing, list_devices, select_device};
pub use source::FrameSource;
pub use types::{
    CameraError, CameraInfo, CameraSettings, DeviceZoomRange, Facing, Frame, FrameFormat,
    Resolution, ZoomCapability,
};
