//! Decode strategy interface.

use crate::camera::Frame;

/// A pluggable algorithm that tries to pull a barcode payload out of a frame.
///
/// Strategies must be deterministic with respect to the frame bytes: the
/// same frame gives the same match or no-match answer every time.
pub trait DecodeStrategy: Send + Sync {
    /// Short identifier, reported alongside decoded payloads.
    fn name(&self) -> &str;

    /// Whether any resource the strategy depends on has finished loading.
    fn is_ready(&self) -> bool {
        true
    }

    /// Attempt a decode.
    ///
    /// `Ok(None)` means the frame holds no readable code. Errors are local
    /// to this frame; the pipeline turns them into a no-match.
    fn try_decode(&self, frame: &Frame) -> Result<Option<Vec<u8>>, StrategyError>;
}

/// Faults a strategy can hit on a single frame.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("malformed frame: {width}x{height} with {len} bytes")]
    MalformedFrame { width: u32, height: u32, len: usize },

    #[error("decoder backend error: {0}")]
    Backend(String),
}

impl StrategyError {
    pub fn malformed(frame: &Frame) -> Self {
        StrategyError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        }
    }
}
