//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Medium resolution (640x480) - enough modules for most printed codes
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// High resolution (1280x720) - dense codes at a distance
    pub const HIGH: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// Parse a `WIDTHxHEIGHT` string such as `1280x720`.
    pub fn parse(s: &str) -> Option<Resolution> {
        let (w, h) = s.trim().split_once('x')?;
        let width: u32 = w.parse().ok()?;
        let height: u32 = h.parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Resolution { width, height })
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Front camera, towards the user
    User,
    /// Rear camera, towards the scene
    #[default]
    Environment,
    /// Whatever device is available first
    Any,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::User => "user",
            Facing::Environment => "environment",
            Facing::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Facing> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "front" => Some(Facing::User),
            "environment" | "rear" | "back" => Some(Facing::Environment),
            "any" => Some(Facing::Any),
            _ => None,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zoom bounds reported by a frame source, as a magnification factor.
///
/// Fixed for the lifetime of an open session. A device without zoom support
/// reports [`ZoomCapability::FIXED`], which turns every zoom request into 1.0.
/// A non-zero `step` means the device only accepts values on the grid
/// `min + k * step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomCapability {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ZoomCapability {
    /// Degenerate range for sources without zoom control.
    pub const FIXED: ZoomCapability = ZoomCapability {
        min: 1.0,
        max: 1.0,
        step: 0.0,
    };

    /// Build a continuous capability, swapping reversed bounds. Non-finite
    /// bounds collapse to [`ZoomCapability::FIXED`].
    pub fn new(min: f64, max: f64) -> Self {
        if !min.is_finite() || !max.is_finite() {
            return Self::FIXED;
        }
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max, step: 0.0 }
    }

    /// Restrict the capability to a grid. Non-positive or non-finite steps
    /// leave it continuous.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = if step.is_finite() && step > 0.0 { step } else { 0.0 };
        self
    }

    /// Clamp `value` into `[min, max]`, then snap it to the step grid.
    pub fn clamp(&self, value: f64) -> f64 {
        let clamped = self.min.max(value.min(self.max));
        if self.step == 0.0 {
            return clamped;
        }
        let snapped = self.min + ((clamped - self.min) / self.step).round() * self.step;
        self.min.max(snapped.min(self.max))
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

/// Raw zoom units per 1.0x when the device range starts at zero or below.
/// Such a range is spread over the 1x-3x span of a typical zoom slider.
const ZOOM_SLIDER_SPAN: f64 = 2.0;

/// A zoom control as the driver reports it, in raw device units.
///
/// UVC cameras commonly report something like 100..=500 with 100 meaning
/// no magnification. [`DeviceZoomRange::capability`] turns that into a
/// factor range starting at 1.0, and [`DeviceZoomRange::to_device`] maps a
/// factor on that range back to the raw value to send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceZoomRange {
    pub min: f64,
    pub max: f64,
    /// Smallest raw increment; 0 for continuous controls
    pub step: f64,
}

impl DeviceZoomRange {
    /// Raw units that make up 1.0 of zoom factor.
    fn unit(&self) -> f64 {
        let span = self.max - self.min;
        let unit = if self.min > 0.0 {
            self.min
        } else {
            span / ZOOM_SLIDER_SPAN
        };
        if unit.is_finite() && unit > 0.0 {
            unit
        } else {
            1.0
        }
    }

    pub fn capability(&self) -> ZoomCapability {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            return ZoomCapability::FIXED;
        }
        let unit = self.unit();
        ZoomCapability::new(1.0, 1.0 + (self.max - self.min) / unit).with_step(self.step / unit)
    }

    /// Raw control value for a factor taken from [`Self::capability`].
    pub fn to_device(&self, factor: f64) -> f64 {
        let raw = self.min + (factor - 1.0) * self.unit();
        self.min.max(raw.min(self.max))
    }
}

impl Default for ZoomCapability {
    fn default() -> Self {
        Self::FIXED
    }
}

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
    /// Single-channel luminance (1 byte per pixel)
    Luma,
}

/// A captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: FrameFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
        }
    }

    /// Get the number of bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
            FrameFormat::Luma => 1,
        }
    }

    /// True when the frame has non-zero dimensions and a buffer that matches them.
    pub fn is_dimensioned(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// Settings for camera capture.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Explicit device index; overrides facing-based selection
    pub device_index: Option<u32>,
    /// Capture resolution
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
    /// Mirror horizontally (selfie mode)
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: None,
            resolution: Resolution::default(),
            fps: 30,
            mirror: false,
        }
    }
}

/// Errors that can occur during camera operations.
///
/// Every variant is fatal to a scan session and is reported as a
/// device-unavailable failure.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("No cameras found")]
    NoDevices,

    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Camera permission denied. Grant camera access to this terminal and try again")]
    PermissionDenied,

    #[error("Camera device {0} not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(u32),

    #[error("No camera facing '{0}' found. Use --facing any or pick a device with --camera")]
    NoMatchingFacing(Facing),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("Capture thread is already running")]
    AlreadyRunning,
}
