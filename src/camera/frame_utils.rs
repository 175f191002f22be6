//! Frame conversion and transformation utilities.

use super::types::{Frame, FrameFormat};

/// Convert a nokhwa buffer to our RGB Frame format.
///
/// Handles various camera formats (MJPEG, YUYV, NV12, etc.) by using
/// nokhwa's built-in decode_image which automatically converts from
/// the camera's native format to RGB.
///
/// Returns `None` if the conversion fails (unsupported format or corrupt data).
#[cfg(feature = "camera")]
pub fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    use nokhwa::pixel_format::RgbFormat;

    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    let frame = Frame::new(
        decoded.into_raw(),
        resolution.width(),
        resolution.height(),
        FrameFormat::Rgb,
    );
    frame.is_dimensioned().then_some(frame)
}

/// Reduce a frame to one luminance byte per pixel.
///
/// Uses the BT.601 integer weights (77, 150, 29) / 256. Luma frames are
/// copied as-is. Returns `None` when the buffer does not match the frame
/// dimensions.
pub fn to_luma(frame: &Frame) -> Option<Vec<u8>> {
    if !frame.is_dimensioned() {
        return None;
    }

    match frame.format {
        FrameFormat::Luma => Some(frame.data.clone()),
        FrameFormat::Rgb => Some(
            frame
                .data
                .chunks_exact(3)
                .map(|px| {
                    let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                    ((77 * r + 150 * g + 29 * b) >> 8) as u8
                })
                .collect(),
        ),
    }
}

/// Mirror a frame horizontally (flip left-right) for selfie mode.
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    if frame.data.len() < width * height * bpp {
        return;
    }

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}
