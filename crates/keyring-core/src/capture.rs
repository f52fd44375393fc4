//! Physics-free layout for thumbnails and screenshots.
//!
//! Uses the same stacking as the live loader, so a captured frame matches the
//! live assembly at rest.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::AssetProvider;
use crate::config::{AssemblySpec, SceneConfig};
use crate::error::ConfigError;
use crate::loader::{AssemblyLoader, LoadedAssembly};
use crate::segment::SegmentRole;
use crate::shape::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 2],
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureItem {
    pub role: SegmentRole,
    pub shape: Shape,
    pub visual_size: [f32; 2],
    pub transform: Transform,
    pub z_order: u64,
}

/// Flat, back-to-front list of drawable items for one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFrame {
    pub items: Vec<CaptureItem>,
    /// `[min_x, min_y, max_x, max_y]` of every item's visual box.
    pub bounds: [f32; 4],
    pub degraded: bool,
}

impl CaptureFrame {
    pub fn positions(&self) -> Vec<[f32; 2]> {
        self.items.iter().map(|item| item.transform.position).collect()
    }

    pub fn size(&self) -> [f32; 2] {
        let [min_x, min_y, max_x, max_y] = self.bounds;
        [max_x - min_x, max_y - min_y]
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Lays assemblies out without a physics world.
#[derive(Debug, Clone, Default)]
pub struct StaticLayoutEngine {
    config: SceneConfig,
}

impl StaticLayoutEngine {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }

    /// Frame of an already loaded assembly.
    pub fn capture(&self, loaded: &LoadedAssembly) -> CaptureFrame {
        let mut items: Vec<CaptureItem> = loaded
            .segments
            .iter()
            .map(|segment| CaptureItem {
                role: segment.role,
                shape: segment.shape.clone(),
                visual_size: segment.visual_size,
                transform: Transform {
                    position: segment.position,
                    rotation: 0.0,
                },
                z_order: segment.z_order.max(u64::from(segment.id)),
            })
            .collect();
        items.sort_by_key(|item| item.z_order);

        let bounds = items.iter().fold(
            [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
            |[min_x, min_y, max_x, max_y], item| {
                let [x, y] = item.transform.position;
                let [hw, hh] = item.visual_size.map(|v| v / 2.0);
                [
                    min_x.min(x - hw),
                    min_y.min(y - hh),
                    max_x.max(x + hw),
                    max_y.max(y + hh),
                ]
            },
        );

        CaptureFrame {
            items,
            bounds,
            degraded: loaded.degraded,
        }
    }

    /// Resolves assets for `spec` and captures it.
    pub async fn capture_spec<P: AssetProvider>(&self, spec: &AssemblySpec, provider: Arc<P>) -> CaptureFrame {
        let loader = AssemblyLoader::new(provider, &self.config, 1);
        let loaded = loader.load(spec).await;
        self.capture(&loaded)
    }

    /// Captures every assembly of the configured scene, in order.
    pub async fn capture_scene<P: AssetProvider>(&self, provider: Arc<P>) -> Vec<CaptureFrame> {
        let mut frames = Vec::with_capacity(self.config.assemblies.len());
        for spec in &self.config.assemblies {
            frames.push(self.capture_spec(spec, Arc::clone(&provider)).await);
        }
        tracing::info!("[capture] Captured {} assemblies", frames.len());
        frames
    }
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Handle;

    use super::*;
    use crate::config::{BodySource, MountType, SizingPolicy};
    use crate::manager::MultiAssemblyManager;
    use crate::test_utils::{DelayedProvider, FailingProvider};

    fn provider() -> Arc<DelayedProvider> {
        Arc::new(
            DelayedProvider::new()
                .with("rings/basic.png", [64.0, 64.0], 5)
                .with("chains/basic/link_0.png", [12.0, 28.0], 5)
                .with("chains/basic/link_1.png", [16.0, 20.0], 5)
                .with("bodies/cat.png", [90.0, 120.0], 5),
        )
    }

    fn spec() -> AssemblySpec {
        AssemblySpec::basic([240.0, 80.0], 5).with_body(BodySource::Asset {
            path: "bodies/cat.png".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_matches_frozen_live_positions() {
        let engine = StaticLayoutEngine::default();
        let frame = engine.capture_spec(&spec(), provider()).await;

        let mut scene = MultiAssemblyManager::new(SceneConfig::default(), provider(), Handle::current());
        let id = scene.add_assembly(spec());
        scene.settle().await;
        let live = scene.assembly(id).unwrap().positions(scene.world());

        assert_eq!(frame.positions(), live);
    }

    /// Steps a live copy of `spec` until it hangs at rest and returns the
    /// worst distance between a captured and a live segment position.
    async fn rest_deviation(spec: &AssemblySpec) -> (f32, CaptureFrame) {
        let engine = StaticLayoutEngine::default();
        let frame = engine.capture_spec(spec, Arc::new(FailingProvider)).await;

        let mut scene =
            MultiAssemblyManager::new(SceneConfig::default(), Arc::new(FailingProvider), Handle::current());
        let id = scene.add_assembly(spec.clone());
        scene.settle().await;
        assert!(scene.gravity_enabled());
        for _ in 0..1200 {
            scene.step();
        }

        let assembly = scene.assembly(id).unwrap();
        let fastest = assembly
            .bodies(scene.world())
            .map(|(_, body)| body.linvel().x.hypot(body.linvel().y))
            .fold(0.0_f32, f32::max);
        assert!(fastest < 5.0, "still moving at {fastest}");

        let worst = frame
            .positions()
            .iter()
            .zip(assembly.positions(scene.world()))
            .map(|(captured, live)| (captured[0] - live[0]).hypot(captured[1] - live[1]))
            .fold(0.0_f32, f32::max);
        (worst, frame)
    }

    // Joint compliance lets a hanging chain sag slightly under gravity; the
    // capture must stay within 2% of the frame height of the settled pose.
    #[tokio::test]
    async fn test_capture_matches_settled_live_assembly() {
        for mount in [MountType::Fixed, MountType::Free] {
            let spec = AssemblySpec::basic([240.0, 80.0], 5).with_mount(mount);
            let (worst, frame) = rest_deviation(&spec).await;
            let tolerance = frame.size()[1] * 0.02;
            assert!(worst < tolerance, "{mount:?}: off by {worst} (tolerance {tolerance})");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_is_flat_and_z_sorted() {
        let engine = StaticLayoutEngine::default();
        let frame = engine.capture_spec(&spec(), provider()).await;

        assert_eq!(frame.items.len(), 7);
        assert!(frame.items.windows(2).all(|w| w[0].z_order < w[1].z_order));
        assert_eq!(frame.items[0].role, SegmentRole::Ring);
        assert_eq!(frame.items[6].role, SegmentRole::Body);
        assert_eq!(frame.items[6].visual_size, [90.0, 120.0]);
        assert!(!frame.degraded);

        let json = frame.to_json().unwrap();
        assert!(json.contains("\"transform\""));
        assert!(!json.contains("joint"));
    }

    #[tokio::test]
    async fn test_bounds_cover_every_item() {
        let engine = StaticLayoutEngine::default();
        let spec = AssemblySpec::basic([0.0, 0.0], 2)
            .with_mount(MountType::Free)
            .with_sizing(SizingPolicy::Thumbnail { side: 50.0 });
        let frame = engine.capture_spec(&spec, Arc::new(FailingProvider)).await;

        // Fallback ring is 60 wide; fallback body is a 50-unit disc.
        let [min_x, min_y, max_x, _] = frame.bounds;
        assert_eq!((min_x, max_x), (-30.0, 30.0));
        assert_eq!(min_y, -30.0);
        let body = frame.items.last().unwrap();
        assert_eq!(frame.bounds[3], body.transform.position[1] + 25.0);
        assert_eq!(frame.size()[0], 60.0);
    }

    #[tokio::test]
    async fn test_capture_scene_uses_config_order() {
        let engine = StaticLayoutEngine::new(SceneConfig::default_scene().unwrap());
        let frames = engine.capture_scene(Arc::new(FailingProvider)).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].positions()[0], [200.0, 120.0]);
        assert_eq!(frames[2].positions()[0], [600.0, 120.0]);
    }
}
