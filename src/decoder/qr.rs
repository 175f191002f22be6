//! Primary QR strategy backed by rqrr.

use rqrr::PreparedImage;

use super::strategy::{DecodeStrategy, StrategyError};
use crate::camera::frame_utils::to_luma;
use crate::camera::Frame;

/// Straight luminance decode with no preprocessing. Always ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrStrategy;

impl QrStrategy {
    pub const NAME: &'static str = "qr";
}

impl DecodeStrategy for QrStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn try_decode(&self, frame: &Frame) -> Result<Option<Vec<u8>>, StrategyError> {
        let luma = to_luma(frame).ok_or_else(|| StrategyError::malformed(frame))?;
        Ok(decode_greyscale(
            &luma,
            frame.width as usize,
            frame.height as usize,
        ))
    }
}

/// Run grid detection on a greyscale buffer and return the raw bytes of the
/// first grid that decodes.
pub(crate) fn decode_greyscale(grey: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    if width == 0 || height == 0 || grey.len() < width * height {
        return None;
    }
    let mut img = PreparedImage::prepare_from_greyscale(width, height, |x, y| grey[y * width + x]);
    img.detect_grids().into_iter().find_map(|grid| {
        let mut bytes = Vec::new();
        grid.decode_to(&mut bytes).ok().map(|_| bytes)
    })
}

/// Same as [`decode_greyscale`] but with a fixed binarization threshold;
/// pixels darker than `threshold` count as dark modules.
pub(crate) fn decode_bitmap(
    grey: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
) -> Option<Vec<u8>> {
    if width == 0 || height == 0 || grey.len() < width * height {
        return None;
    }
    let mut img =
        PreparedImage::prepare_from_bitmap(width, height, |x, y| grey[y * width + x] < threshold);
    img.detect_grids().into_iter().find_map(|grid| {
        let mut bytes = Vec::new();
        grid.decode_to(&mut bytes).ok().map(|_| bytes)
    })
}
