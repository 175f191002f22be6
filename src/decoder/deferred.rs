//! Strategies whose backing resource loads in the background.

use std::sync::{Arc, OnceLock};

use super::strategy::{DecodeStrategy, StrategyError};
use crate::camera::Frame;

/// Set-once slot for a late-arriving strategy.
///
/// Readiness is monotonic: once a strategy is installed it stays installed.
#[derive(Clone, Default)]
pub struct Readiness {
    slot: Arc<OnceLock<Box<dyn DecodeStrategy>>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Install the loaded strategy. Returns `false` if one was already
    /// installed; the first installation wins.
    pub fn install(&self, strategy: Box<dyn DecodeStrategy>) -> bool {
        self.slot.set(strategy).is_ok()
    }

    fn get(&self) -> Option<&dyn DecodeStrategy> {
        self.slot.get().map(|s| s.as_ref())
    }
}

/// Placeholder registered in the pipeline before its strategy has loaded.
///
/// Answers no-match until the warm-up completes, then forwards to the
/// loaded strategy. Activation happens in place; the pipeline and scan loop
/// never wait on it.
pub struct DeferredStrategy {
    name: String,
    readiness: Readiness,
}

impl DeferredStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readiness: Readiness::new(),
        }
    }

    /// Handle used to install the strategy once loaded.
    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Run `loader` on tokio's blocking pool and install its result.
    ///
    /// A failed load is logged and leaves the strategy permanently not
    /// ready; it is never fatal to scanning. Must be called from within a
    /// tokio runtime.
    pub fn spawn_warm_up<S, F>(&self, loader: F) -> tokio::task::JoinHandle<bool>
    where
        S: DecodeStrategy + 'static,
        F: FnOnce() -> Result<S, StrategyError> + Send + 'static,
    {
        let readiness = self.readiness();
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || match loader() {
            Ok(strategy) => {
                log::info!("Decode strategy '{}' loaded", name);
                readiness.install(Box::new(strategy))
            }
            Err(e) => {
                log::warn!("Decode strategy '{}' failed to load: {}", name, e);
                false
            }
        })
    }
}

impl DecodeStrategy for DeferredStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    fn try_decode(&self, frame: &Frame) -> Result<Option<Vec<u8>>, StrategyError> {
        match self.readiness.get() {
            Some(strategy) => strategy.try_decode(frame),
            None => Ok(None),
        }
    }
}
