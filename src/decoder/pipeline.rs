//! Ordered decode strategies, first match wins.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use super::strategy::DecodeStrategy;
use crate::camera::Frame;

/// A successfully decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Raw bytes exactly as the strategy produced them
    pub bytes: Vec<u8>,
    /// Name of the strategy that produced the match
    pub strategy: String,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>, strategy: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            strategy: strategy.into(),
        }
    }

    /// Lossy UTF-8 rendering, for display only.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Outcome of running the pipeline on one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    Success(Payload),
    NoMatch,
}

impl DecodeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DecodeResult::Success(_))
    }
}

struct Slot {
    strategy: Box<dyn DecodeStrategy>,
    /// Readiness already reported to the log
    announced: AtomicBool,
}

/// Strategies tried sequentially in registration order.
///
/// Faults inside a strategy, including panics, never escape
/// [`DecoderPipeline::decode`]; they count as a no-match for that frame.
#[derive(Default)]
pub struct DecoderPipeline {
    slots: Vec<Slot>,
}

impl fmt::Debug for DecoderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderPipeline")
            .field("strategies", &self.readiness())
            .finish()
    }
}

impl DecoderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy with the lowest priority so far.
    pub fn push(&mut self, strategy: impl DecodeStrategy + 'static) {
        self.push_boxed(Box::new(strategy));
    }

    pub fn push_boxed(&mut self, strategy: Box<dyn DecodeStrategy>) {
        self.slots.push(Slot {
            strategy,
            announced: AtomicBool::new(false),
        });
    }

    /// Builder form of [`DecoderPipeline::push`].
    pub fn with_strategy(mut self, strategy: impl DecodeStrategy + 'static) -> Self {
        self.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Strategy names in priority order with their current readiness.
    pub fn readiness(&self) -> Vec<(String, bool)> {
        self.slots
            .iter()
            .map(|s| (s.strategy.name().to_string(), s.strategy.is_ready()))
            .collect()
    }

    /// Try each ready strategy in order; return the first match.
    pub fn decode(&self, frame: &Frame) -> DecodeResult {
        for slot in &self.slots {
            let strategy = slot.strategy.as_ref();

            if !strategy.is_ready() {
                continue;
            }
            if !slot.announced.swap(true, Ordering::Relaxed) {
                log::info!("Decode strategy '{}' active", strategy.name());
            }

            let attempt = panic::catch_unwind(AssertUnwindSafe(|| strategy.try_decode(frame)));
            match attempt {
                Ok(Ok(Some(bytes))) => {
                    log::debug!(
                        "Strategy '{}' matched {} bytes",
                        strategy.name(),
                        bytes.len()
                    );
                    return DecodeResult::Success(Payload::new(bytes, strategy.name()));
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    log::debug!("Strategy '{}' fault: {}", strategy.name(), e);
                }
                Err(_) => {
                    log::warn!("Strategy '{}' panicked; treating as no match", strategy.name());
                }
            }
        }

        DecodeResult::NoMatch
    }
}
