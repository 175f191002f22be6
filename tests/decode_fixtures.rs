//! Decode tests against rendered QR codes.
//!
//! Codes are rendered in memory so each test controls size, contrast and
//! pixel format exactly.

use qrcode::{Color, QrCode};
use qrscan::camera::{Frame, FrameFormat};
use qrscan::decoder::{
    DecodeResult, DecodeStrategy, DecoderPipeline, EnhancedQrStrategy, Payload, QrStrategy,
};

/// Pixels per module
const SCALE: usize = 4;
/// Light border around the symbol, in modules
const QUIET_ZONE: usize = 4;

/// Render `payload` as a square greyscale frame.
fn render(payload: &[u8], dark: u8, light: u8) -> Frame {
    let code = QrCode::new(payload).expect("payload should fit in a QR code");
    let modules = code.width();
    let size = (modules + 2 * QUIET_ZONE) * SCALE;
    let mut data = vec![light; size * size];

    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let mx = (i % modules + QUIET_ZONE) * SCALE;
        let my = (i / modules + QUIET_ZONE) * SCALE;
        for y in my..my + SCALE {
            data[y * size + mx..y * size + mx + SCALE].fill(dark);
        }
    }

    Frame::new(data, size as u32, size as u32, FrameFormat::Luma)
}

fn to_rgb(frame: &Frame) -> Frame {
    let data = frame.data.iter().flat_map(|&v| [v, v, v]).collect();
    Frame::new(data, frame.width, frame.height, FrameFormat::Rgb)
}

#[test]
fn test_primary_decodes_rendered_code() {
    let frame = render(b"HELLO", 0, 255);
    let decoded = QrStrategy.try_decode(&frame).unwrap();
    assert_eq!(decoded.as_deref(), Some(&b"HELLO"[..]));
}

#[test]
fn test_primary_decodes_rgb_frame() {
    let frame = to_rgb(&render(b"https://example.com/a?b=c", 20, 235));
    let decoded = QrStrategy.try_decode(&frame).unwrap();
    assert_eq!(decoded.as_deref(), Some(&b"https://example.com/a?b=c"[..]));
}

#[test]
fn test_primary_returns_payload_bytes_verbatim() {
    let payload = [0x00, 0xff, 0x10, b'Q', 0x80];
    let frame = render(&payload, 0, 255);
    let decoded = QrStrategy.try_decode(&frame).unwrap();
    assert_eq!(decoded, Some(payload.to_vec()));
}

#[test]
fn test_enhanced_recovers_low_contrast_code() {
    // Four grey levels apart: below the adaptive threshold's bias
    let frame = render(b"LOWCON", 124, 128);
    assert_eq!(QrStrategy.try_decode(&frame).unwrap(), None);

    let enhanced = EnhancedQrStrategy::load().unwrap();
    let decoded = enhanced.try_decode(&frame).unwrap();
    assert_eq!(decoded.as_deref(), Some(&b"LOWCON"[..]));
}

#[test]
fn test_pipeline_reports_which_strategy_matched() {
    let pipeline = DecoderPipeline::new()
        .with_strategy(QrStrategy)
        .with_strategy(EnhancedQrStrategy::load().unwrap());

    assert_eq!(
        pipeline.decode(&render(b"HELLO", 0, 255)),
        DecodeResult::Success(Payload::new("HELLO", QrStrategy::NAME))
    );
    assert_eq!(
        pipeline.decode(&render(b"LOWCON", 124, 128)),
        DecodeResult::Success(Payload::new("LOWCON", EnhancedQrStrategy::NAME))
    );
}

#[test]
fn test_decode_is_deterministic() {
    let frame = render(b"SAME", 0, 255);
    let first = QrStrategy.try_decode(&frame).unwrap();
    for _ in 0..3 {
        assert_eq!(QrStrategy.try_decode(&frame).unwrap(), first);
    }
}
