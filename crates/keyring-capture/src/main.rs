//! Keyring-Live Capture
//!
//! Lays out every keyring of a scene without physics and prints the capture
//! frames to stdout as JSON.
//!
//! ```text
//! keyring-capture [SCENE_JSON] [--manifest PATH] [--view detail|grid|bundle]
//! ```
//!
//! Without a scene file the bundled default scene is used. The manifest maps
//! asset paths to intrinsic image sizes; assets missing from it fall back to
//! the built-in geometry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use keyring_core::config::LayoutTuning;
use keyring_core::{
    CachedAssetProvider, SceneConfig, SizingPolicy, StaticAssetProvider, StaticLayoutEngine,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Body sizing applied to every assembly of the scene.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum View {
    /// Keep each assembly's own sizing.
    #[default]
    Detail,
    /// Fit every body into the thumbnail square.
    Grid,
    /// Fit every body into the bundle box.
    Bundle,
}

impl View {
    fn sizing(self, layout: &LayoutTuning) -> Option<SizingPolicy> {
        match self {
            Self::Detail => None,
            Self::Grid => Some(layout.thumbnail_policy()),
            Self::Bundle => Some(layout.bundle_policy()),
        }
    }
}

/// Lays out every keyring of a scene without physics and prints the frames as JSON.
#[derive(Parser, Debug, Default, PartialEq)]
#[command(author, version, about)]
struct Args {
    /// Scene file; the bundled default scene when omitted.
    scene: Option<PathBuf>,
    /// JSON manifest mapping asset paths to image sizes.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Body sizing override.
    #[arg(long, value_enum, default_value_t = View::Detail)]
    view: View,
}

fn load_scene(args: &Args) -> anyhow::Result<SceneConfig> {
    let mut config = match &args.scene {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading scene {}", path.display()))?;
            SceneConfig::from_json(&json).with_context(|| format!("parsing scene {}", path.display()))?
        }
        None => SceneConfig::default_scene()?,
    };

    if let Some(sizing) = args.view.sizing(&config.layout) {
        for spec in &mut config.assemblies {
            spec.sizing = sizing;
        }
    }
    Ok(config)
}

fn load_manifest(args: &Args) -> anyhow::Result<StaticAssetProvider> {
    let Some(path) = &args.manifest else {
        return Ok(StaticAssetProvider::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let provider = StaticAssetProvider::from_manifest_json(&json)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    tracing::info!("[capture] Loaded {} assets from {}", provider.len(), path.display());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_scene(&args)?;
    let provider = Arc::new(CachedAssetProvider::new(load_manifest(&args)?));

    let engine = StaticLayoutEngine::new(config);
    let frames = engine.capture_scene(provider).await;

    let degraded = frames.iter().filter(|frame| frame.degraded).count();
    if degraded > 0 {
        tracing::warn!("[capture] {degraded} assemblies timed out while loading");
    }

    println!("{}", serde_json::to_string_pretty(&frames)?);
    Ok(())
}
