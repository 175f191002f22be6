//! Assistive QR strategy: a preprocessing cascade for low-contrast, glare
//! and oversized codes that the straight decode misses.
//!
//! Each stage rewrites the luminance buffer and retries rqrr:
//! 1. contrast stretch to the full 0-255 range
//! 2. Otsu binarization
//! 3. gamma lift for underexposed frames (lookup table built at load time)
//! 4. 2x box downscale, for codes too large for the capstone finder

use super::qr::{decode_bitmap, decode_greyscale};
use super::strategy::{DecodeStrategy, StrategyError};
use crate::camera::frame_utils::to_luma;
use crate::camera::Frame;

const GAMMA: f64 = 0.5;

/// Preprocessing cascade. Build with [`EnhancedQrStrategy::load`], usually
/// from a deferred warm-up so the scan loop starts without it.
pub struct EnhancedQrStrategy {
    gamma_lut: [u8; 256],
}

impl EnhancedQrStrategy {
    pub const NAME: &'static str = "enhanced";

    /// Build the lookup tables.
    pub fn load() -> Result<Self, StrategyError> {
        let mut gamma_lut = [0u8; 256];
        for (i, slot) in gamma_lut.iter_mut().enumerate() {
            let v = 255.0 * (i as f64 / 255.0).powf(GAMMA);
            *slot = v.round().clamp(0.0, 255.0) as u8;
        }
        Ok(Self { gamma_lut })
    }

    fn cascade(&self, grey: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
        let stretched = contrast_stretch(grey);
        if let Some(bytes) = decode_greyscale(&stretched, width, height) {
            return Some(bytes);
        }

        let threshold = otsu_threshold(&stretched);
        if let Some(bytes) = decode_bitmap(&stretched, width, height, threshold) {
            return Some(bytes);
        }

        let lifted: Vec<u8> = grey.iter().map(|&p| self.gamma_lut[p as usize]).collect();
        if let Some(bytes) = decode_greyscale(&lifted, width, height) {
            return Some(bytes);
        }

        if width >= 4 && height >= 4 {
            let small = downscale_2x(&stretched, width, height);
            return decode_greyscale(&small, width / 2, height / 2);
        }

        None
    }
}

impl DecodeStrategy for EnhancedQrStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn try_decode(&self, frame: &Frame) -> Result<Option<Vec<u8>>, StrategyError> {
        let grey = to_luma(frame).ok_or_else(|| StrategyError::malformed(frame))?;
        Ok(self.cascade(&grey, frame.width as usize, frame.height as usize))
    }
}

/// Stretch the histogram so the darkest pixel maps to 0 and the brightest to 255.
fn contrast_stretch(grey: &[u8]) -> Vec<u8> {
    let (lo, hi) = grey
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));

    let range = hi.saturating_sub(lo) as u32;
    if range == 0 {
        return grey.to_vec();
    }

    grey.iter()
        .map(|&p| ((p.saturating_sub(lo) as u32 * 255) / range).min(255) as u8)
        .collect()
}

/// Threshold maximizing between-class variance.
fn otsu_threshold(grey: &[u8]) -> u8 {
    let mut hist = [0u32; 256];
    for &p in grey {
        hist[p as usize] += 1;
    }

    let total = grey.len() as f64;
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;
    let mut weight_bg = 0.0f64;
    let mut sum_bg = 0.0f64;

    for (t, &count) in hist.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }

        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }

    // Pixels strictly below the threshold are dark, so shift past the background class
    best_threshold.saturating_add(1)
}

fn downscale_2x(grey: &[u8], width: usize, height: usize) -> Vec<u8> {
    let dw = width / 2;
    let dh = height / 2;
    let mut out = Vec::with_capacity(dw * dh);

    for dy in 0..dh {
        for dx in 0..dw {
            let sx = dx * 2;
            let sy = dy * 2;
            let tl = grey[sy * width + sx] as u32;
            let tr = grey[sy * width + sx + 1] as u32;
            let bl = grey[(sy + 1) * width + sx] as u32;
            let br = grey[(sy + 1) * width + sx + 1] as u32;
            out.push(((tl + tr + bl + br + 2) / 4) as u8);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FrameFormat;

    #[test]
    fn test_contrast_stretch_full_range() {
        assert_eq!(contrast_stretch(&[100, 150, 200]), vec![0, 127, 255]);
        assert_eq!(contrast_stretch(&[42, 42]), vec![42, 42]);
        assert!(contrast_stretch(&[]).is_empty());
    }

    #[test]
    fn test_otsu_splits_bimodal() {
        let mut grey = vec![20u8; 50];
        grey.extend(vec![220u8; 50]);
        let t = otsu_threshold(&grey);
        assert!(t > 20 && t <= 220, "threshold {} should separate classes", t);
    }

    #[test]
    fn test_downscale_averages_blocks() {
        let grey = vec![0, 255, 10, 10, 255, 0, 10, 10];
        assert_eq!(downscale_2x(&grey, 4, 2), vec![128, 10]);
    }

    #[test]
    fn test_gamma_lut_brightens_midtones() {
        let strategy = EnhancedQrStrategy::load().unwrap();
        assert_eq!(strategy.gamma_lut[0], 0);
        assert_eq!(strategy.gamma_lut[255], 255);
        assert!(strategy.gamma_lut[64] > 64);
    }

    #[test]
    fn test_flat_frame_is_no_match() {
        let strategy = EnhancedQrStrategy::load().unwrap();
        let frame = Frame::new(vec![128; 32 * 32], 32, 32, FrameFormat::Luma);
        assert!(matches!(strategy.try_decode(&frame), Ok(None)));
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        let strategy = EnhancedQrStrategy::load().unwrap();
        let frame = Frame::new(vec![0; 3], 32, 32, FrameFormat::Luma);
        assert!(strategy.try_decode(&frame).is_err());
    }
}
