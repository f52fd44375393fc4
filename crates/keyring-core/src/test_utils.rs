//! Scripted providers and sinks for tests.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use crate::asset::{AssetProvider, Image};
use crate::error::AssetError;
use crate::interaction::EffectSink;

/// Every fetch fails immediately.
#[derive(Debug, Clone, Copy)]
pub struct FailingProvider;

impl AssetProvider for FailingProvider {
    async fn fetch_image(&self, _path: &str) -> Result<Image, AssetError> {
        Err(AssetError::Unavailable)
    }
}

/// Never answers.
#[derive(Debug, Clone, Copy)]
pub struct PendingProvider;

impl AssetProvider for PendingProvider {
    async fn fetch_image(&self, _path: &str) -> Result<Image, AssetError> {
        std::future::pending().await
    }
}

/// Answers known paths after a per-path delay; unknown paths fail at once.
#[derive(Debug, Clone, Default)]
pub struct DelayedProvider {
    entries: HashMap<String, ([f32; 2], u64)>,
}

impl DelayedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, size: [f32; 2], delay_ms: u64) -> Self {
        self.entries.insert(path.to_string(), (size, delay_ms));
        self
    }
}

impl AssetProvider for DelayedProvider {
    async fn fetch_image(&self, path: &str) -> Result<Image, AssetError> {
        let Some(&([width, height], delay_ms)) = self.entries.get(path) else {
            return Err(AssetError::NotFound(path.to_string()));
        };
        sleep(Duration::from_millis(delay_ms)).await;
        Ok(Image::new(path, width, height))
    }
}

/// Effect hook call, as recorded by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Tap(String),
    Swipe(String, [f32; 2]),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub effects: Mutex<Vec<Effect>>,
}

impl RecordingSink {
    pub fn taps(&self) -> usize {
        self.effects
            .lock()
            .iter()
            .filter(|e| matches!(e, Effect::Tap(_)))
            .count()
    }

    pub fn swipes(&self) -> usize {
        self.effects
            .lock()
            .iter()
            .filter(|e| matches!(e, Effect::Swipe(..)))
            .count()
    }
}

impl EffectSink for RecordingSink {
    fn on_tap_effect(&self, effect_id: &str) {
        self.effects.lock().push(Effect::Tap(effect_id.to_string()));
    }

    fn on_swipe_effect(&self, effect_id: &str, position: [f32; 2]) {
        self.effects
            .lock()
            .push(Effect::Swipe(effect_id.to_string(), position));
    }
}
