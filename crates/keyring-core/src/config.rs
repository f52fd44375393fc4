//! Scene configuration: per-keyring specs and tuning blocks.
//!
//! Everything here is plain serde data so the host can persist it as JSON.
//! Every tuning block has defaults, so a scene file only needs to list its
//! assemblies.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ring style. Determines band thickness and the ring asset path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingKind {
    #[default]
    Basic,
    Round,
    /// Flat ring used with fixed mounts; the chain hooks onto its edge.
    Plain,
}

impl RingKind {
    /// Band thickness as a fraction of the outer radius.
    pub fn thickness_ratio(self) -> f32 {
        match self {
            Self::Basic => 0.2,
            Self::Round => 0.3,
            Self::Plain => 0.15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Round => "round",
            Self::Plain => "plain",
        }
    }

    pub fn asset_path(self) -> String {
        format!("rings/{}.png", self.name())
    }
}

/// Chain style. Links alternate between two sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    #[default]
    Basic,
    Ball,
    Bead,
}

impl ChainKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Ball => "ball",
            Self::Bead => "bead",
        }
    }

    /// Asset path of the link at `index` (0-based).
    pub fn link_asset_path(self, index: u32) -> String {
        format!("chains/{}/link_{}.png", self.name(), index % 2)
    }
}

/// Chain description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    #[serde(default)]
    pub kind: ChainKind,
    pub link_count: u32,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            kind: ChainKind::Basic,
            link_count: 5,
        }
    }
}

/// Shape used when no body asset is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBody {
    #[default]
    Basic,
}

/// Where the decorative body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodySource {
    Asset { path: String },
    Fallback {
        #[serde(default)]
        kind: FallbackBody,
    },
}

impl Default for BodySource {
    fn default() -> Self {
        Self::Fallback {
            kind: FallbackBody::Basic,
        }
    }
}

/// How the decorative body is sized from its image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Intrinsic image size (full detail view).
    #[default]
    Natural,
    /// Fixed square cell (grid view).
    Thumbnail { side: f32 },
    /// Aspect-preserving fit inside a box (multi-body bundle view).
    AspectFit { max_width: f32, max_height: f32 },
}

impl SizingPolicy {
    /// Applies the policy to an intrinsic size.
    pub fn apply(self, natural: [f32; 2]) -> [f32; 2] {
        match self {
            Self::Natural => natural,
            Self::Thumbnail { side } => [side, side],
            Self::AspectFit {
                max_width,
                max_height,
            } => {
                let [w, h] = natural;
                if w <= 0.0 || h <= 0.0 {
                    return [max_width.min(max_height); 2];
                }
                let scale = (max_width / w).min(max_height / h);
                [w * scale, h * scale]
            }
        }
    }
}

/// Whether the ring is held by a fixed anchor or swings freely below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountType {
    #[default]
    Fixed,
    Free,
}

/// Everything needed to build one keyring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySpec {
    #[serde(default)]
    pub ring: RingKind,
    #[serde(default)]
    pub chain: ChainSpec,
    #[serde(default)]
    pub body: BodySource,
    #[serde(default)]
    pub sizing: SizingPolicy,
    #[serde(default)]
    pub mount: MountType,
    /// Fraction of the body's height that overlaps the last link.
    #[serde(default = "default_hook_offset")]
    pub hook_offset: f32,
    /// World position of the ring centre.
    pub position: [f32; 2],
    /// Effect fired when the body is tapped. Falls back to the scene default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tap_effect: Option<String>,
}

fn default_hook_offset() -> f32 {
    0.1
}

impl AssemblySpec {
    /// A basic keyring at `position` with `link_count` links and a fallback body.
    pub fn basic(position: [f32; 2], link_count: u32) -> Self {
        Self {
            ring: RingKind::Basic,
            chain: ChainSpec {
                kind: ChainKind::Basic,
                link_count,
            },
            body: BodySource::default(),
            sizing: SizingPolicy::Natural,
            mount: MountType::Fixed,
            hook_offset: default_hook_offset(),
            position,
            tap_effect: None,
        }
    }

    pub fn with_body(mut self, body: BodySource) -> Self {
        self.body = body;
        self
    }

    pub fn with_mount(mut self, mount: MountType) -> Self {
        self.mount = mount;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }
}

/// Physical tuning shared by every assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Gravity applied once the scene goes live (pixels/s², y down).
    pub gravity: [f32; 2],
    /// Number of discs approximating a ring.
    pub ring_segments: u32,
    /// Amount trimmed from each axis of a link's image size.
    pub link_inset: f32,
    /// Limit joint length as a multiple of the rest distance.
    pub limit_slack: f32,
    pub pin_friction_torque: f32,
    /// Torque of the ring-to-first-link pin on fixed mounts.
    pub stiff_first_link_torque: f32,
    /// Damping multiplier applied per link after the first.
    pub link_damping_falloff: f32,
    pub min_link_damping: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: [0.0, 981.0],
            ring_segments: 32,
            link_inset: 4.0,
            limit_slack: 1.05,
            pin_friction_torque: 0.1,
            stiff_first_link_torque: 5.0,
            link_damping_falloff: 0.5,
            min_link_damping: 0.05,
        }
    }
}

/// Geometry used for stacking and for fallback segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    /// Outer diameter of a ring without a resolved asset.
    pub ring_size: f32,
    /// Visual size of a link without a resolved asset.
    pub link_size: [f32; 2],
    /// Fraction of each link's height that overlaps its neighbour.
    pub link_overlap: f32,
    /// Radius of the basic fallback body.
    pub fallback_body_radius: f32,
    /// Cell side of the grid view.
    pub thumbnail_side: f32,
    /// Box each body is fitted into in the bundle view.
    pub bundle_box: [f32; 2],
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            ring_size: 60.0,
            link_size: [14.0, 24.0],
            link_overlap: 0.25,
            fallback_body_radius: 40.0,
            thumbnail_side: 64.0,
            bundle_box: [120.0, 120.0],
        }
    }
}

impl LayoutTuning {
    pub fn thumbnail_policy(&self) -> SizingPolicy {
        SizingPolicy::Thumbnail {
            side: self.thumbnail_side,
        }
    }

    pub fn bundle_policy(&self) -> SizingPolicy {
        let [max_width, max_height] = self.bundle_box;
        SizingPolicy::AspectFit {
            max_width,
            max_height,
        }
    }
}

/// Asset loading limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Hard deadline for a whole assembly load, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { timeout_ms: 3000 }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Gesture thresholds and impulse factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionTuning {
    /// Start-to-end distance below which a gesture may be a tap.
    pub tap_distance: f32,
    /// Radius around the pointer within which segments receive impulses.
    pub proximity_radius: f32,
    pub base_factor: f32,
    pub link_factor: f32,
    pub body_factor: f32,
    /// Smallest time delta used for velocity estimation, in seconds.
    pub min_dt: f32,
    /// Swipe speed above which the particle hook fires.
    pub particle_speed: f32,
    /// Minimum time between two particle hooks, in seconds.
    pub particle_cooldown: f32,
    pub tap_effect: String,
    pub swipe_effect: String,
}

impl Default for InteractionTuning {
    fn default() -> Self {
        Self {
            tap_distance: 30.0,
            proximity_radius: 80.0,
            base_factor: 0.4,
            link_factor: 0.35,
            body_factor: 0.5,
            min_dt: 0.001,
            particle_speed: 2500.0,
            particle_cooldown: 0.4,
            tap_effect: "tap".to_string(),
            swipe_effect: "sparkle".to_string(),
        }
    }
}

/// Complete scene description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub physics: PhysicsTuning,
    #[serde(default)]
    pub layout: LayoutTuning,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub interaction: InteractionTuning,
    #[serde(default)]
    pub assemblies: Vec<AssemblySpec>,
}

impl SceneConfig {
    /// Parses and validates a scene from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The bundled three-keyring demo scene.
    pub fn default_scene() -> Result<Self, ConfigError> {
        const DEFAULT_SCENE_JSON: &str = include_str!("../scenes/default.json");
        Self::from_json(DEFAULT_SCENE_JSON)
    }

    /// Rejects tuning values that would produce invalid geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.physics.limit_slack < 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "physics.limit_slack",
                expected: ">= 1.0",
                value: self.physics.limit_slack,
            });
        }
        if self.physics.ring_segments == 0 {
            return Err(ConfigError::OutOfRange {
                field: "physics.ring_segments",
                expected: "> 0",
                value: 0.0,
            });
        }
        if !(0.0..1.0).contains(&self.layout.link_overlap) {
            return Err(ConfigError::OutOfRange {
                field: "layout.link_overlap",
                expected: "in [0, 1)",
                value: self.layout.link_overlap,
            });
        }
        for spec in &self.assemblies {
            if !(0.0..=1.0).contains(&spec.hook_offset) {
                return Err(ConfigError::OutOfRange {
                    field: "assemblies[].hook_offset",
                    expected: "in [0, 1]",
                    value: spec.hook_offset,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene() {
        let config = SceneConfig::default_scene().expect("default scene parses");
        assert_eq!(config.assemblies.len(), 3);
        assert_eq!(config.physics, PhysicsTuning::default());
        assert!(
            config
                .assemblies
                .iter()
                .any(|a| matches!(a.body, BodySource::Asset { .. }))
        );
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{ "assemblies": [ { "position": [100, 50] } ] }"#;
        let config = SceneConfig::from_json(json).expect("parses");
        let spec = &config.assemblies[0];
        assert_eq!(spec.ring, RingKind::Basic);
        assert_eq!(spec.chain.link_count, 5);
        assert_eq!(spec.mount, MountType::Fixed);
        assert_eq!(spec.body, BodySource::default());
        assert!((spec.hook_offset - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.loader.timeout_ms, 3000);
    }

    #[test]
    fn test_tagged_enums() {
        let json = r#"{
            "assemblies": [{
                "position": [0, 0],
                "ring": "plain",
                "chain": { "kind": "bead", "link_count": 2 },
                "body": { "type": "asset", "path": "bodies/cat.png" },
                "sizing": { "type": "aspect_fit", "max_width": 80, "max_height": 60 },
                "mount": "free"
            }]
        }"#;
        let config = SceneConfig::from_json(json).expect("parses");
        let spec = &config.assemblies[0];
        assert_eq!(spec.ring, RingKind::Plain);
        assert_eq!(spec.chain.kind, ChainKind::Bead);
        assert_eq!(spec.mount, MountType::Free);
        assert_eq!(
            spec.sizing,
            SizingPolicy::AspectFit {
                max_width: 80.0,
                max_height: 60.0
            }
        );
    }

    #[test]
    fn test_validation_rejects_tight_slack() {
        let json = r#"{ "physics": { "limit_slack": 0.9 } }"#;
        let err = SceneConfig::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "physics.limit_slack",
                ..
            }
        ));
    }

    #[test]
    fn test_sizing_policies() {
        assert_eq!(SizingPolicy::Natural.apply([30.0, 60.0]), [30.0, 60.0]);
        assert_eq!(
            SizingPolicy::Thumbnail { side: 48.0 }.apply([30.0, 60.0]),
            [48.0, 48.0]
        );
        assert_eq!(
            SizingPolicy::AspectFit {
                max_width: 40.0,
                max_height: 40.0
            }
            .apply([30.0, 60.0]),
            [20.0, 40.0]
        );
    }

    #[test]
    fn test_view_policies_follow_layout() {
        let layout = LayoutTuning::default();
        assert_eq!(layout.thumbnail_policy(), SizingPolicy::Thumbnail { side: 64.0 });
        assert_eq!(
            layout.bundle_policy().apply([240.0, 120.0]),
            [120.0, 60.0]
        );
    }

    #[test]
    fn test_asset_paths() {
        assert_eq!(RingKind::Round.asset_path(), "rings/round.png");
        assert_eq!(ChainKind::Ball.link_asset_path(0), "chains/ball/link_0.png");
        assert_eq!(ChainKind::Ball.link_asset_path(3), "chains/ball/link_1.png");
    }
}
