//! Barcode decoding: strategy interface, the ordered pipeline, and the
//! built-in rqrr strategies.

mod deferred;
mod enhanced;
mod pipeline;
mod qr;
mod strategy;

pub use deferred::{DeferredStrategy, Readiness};
pub use enhanced::EnhancedQrStrategy;
pub use pipeline::{DecodeResult, DecoderPipeline, Payload};
pub use qr::QrStrategy;
pub use strategy::{DecodeStrategy, StrategyError};

/// Standard pipeline: the rqrr decode first, then optionally the enhanced
/// cascade, which warms up in the background.
///
/// Must be called from within a tokio runtime when `assist` is set.
pub fn default_pipeline(assist: bool) -> DecoderPipeline {
    let mut pipeline = DecoderPipeline::new().with_strategy(QrStrategy);
    if assist {
        let deferred = DeferredStrategy::new(EnhancedQrStrategy::NAME);
        deferred.spawn_warm_up(EnhancedQrStrategy::load);
        pipeline.push(deferred);
    }
    pipeline
}
