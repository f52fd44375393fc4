//! Staged asynchronous loading of one assembly.
//!
//! The ring, chain and body stages each fan out their fetches as tokio tasks
//! and wait on a [`StageBarrier`] before advancing. A single deadline covers
//! the whole load; when it passes the outstanding fetches are aborted and every
//! missing slot gets fallback geometry.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, timeout_at};

use crate::asset::{AssetProvider, Image};
use crate::barrier::StageBarrier;
use crate::config::{AssemblySpec, BodySource, FallbackBody, LayoutTuning, PhysicsTuning, SceneConfig};
use crate::factory::BodyFactory;
use crate::layout::StackLayout;
use crate::segment::Segment;

/// Progress of an assembly load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoaderState {
    #[default]
    Empty,
    RingRequested,
    RingReady,
    ChainRequested,
    ChainReady,
    BodyRequested,
    Assembled,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::RingRequested => "ring-requested",
            Self::RingReady => "ring-ready",
            Self::ChainRequested => "chain-requested",
            Self::ChainReady => "chain-ready",
            Self::BodyRequested => "body-requested",
            Self::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// Shared, observable loader state.
#[derive(Debug, Clone, Default)]
pub struct LoaderProgress {
    state: Arc<Mutex<LoaderState>>,
}

impl LoaderProgress {
    pub fn state(&self) -> LoaderState {
        *self.state.lock()
    }

    fn set(&self, state: LoaderState) {
        *self.state.lock() = state;
        tracing::debug!("[loader] -> {state}");
    }
}

/// Fully built, positioned segments of one assembly. No joints yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAssembly {
    pub spec: AssemblySpec,
    /// Ring, links, body, in that order.
    pub segments: Vec<Segment>,
    pub layout: StackLayout,
    /// The load hit its deadline and some slots were filled with fallbacks.
    pub degraded: bool,
    pub fallback_count: usize,
}

impl LoadedAssembly {
    /// Builds every segment from the resolved images (any of which may be
    /// missing) and stacks them at the assembly position.
    pub fn from_images(
        factory: &BodyFactory,
        spec: &AssemblySpec,
        ring: Option<&Image>,
        links: &[Option<Image>],
        body: Option<&Image>,
    ) -> Self {
        let fallback_kind = match &spec.body {
            BodySource::Fallback { kind } => *kind,
            BodySource::Asset { .. } => FallbackBody::Basic,
        };

        let mut segments = Vec::with_capacity(links.len() + 2);
        segments.push(factory.ring_for(spec.ring, ring));
        for (index, image) in (0..spec.chain.link_count).zip(links) {
            segments.push(factory.chain_link_for(index, image.as_ref()));
        }
        segments.push(factory.make_body(body, fallback_kind, spec.sizing));

        let layout = StackLayout::compute(
            spec.position,
            &segments,
            spec.hook_offset,
            factory.layout().link_overlap,
        );
        layout.apply(&mut segments);

        let fallback_count = segments.iter().filter(|s| s.fallback).count();
        Self {
            spec: spec.clone(),
            segments,
            layout,
            degraded: false,
            fallback_count,
        }
    }

    pub fn body(&self) -> Option<&Segment> {
        self.segments.last()
    }
}

/// Fetch outcomes gathered so far; survives a timed-out load.
struct StageResults {
    ring: StageBarrier<Option<Image>>,
    links: StageBarrier<Option<Image>>,
    body: StageBarrier<Option<Image>>,
}

/// Loads one assembly's assets and builds its segments.
pub struct AssemblyLoader<P> {
    provider: Arc<P>,
    physics: PhysicsTuning,
    layout: LayoutTuning,
    timeout: Duration,
    collision_group: u32,
    progress: LoaderProgress,
}

impl<P: AssetProvider> AssemblyLoader<P> {
    pub fn new(provider: Arc<P>, config: &SceneConfig, collision_group: u32) -> Self {
        Self {
            provider,
            physics: config.physics.clone(),
            layout: config.layout.clone(),
            timeout: config.loader.timeout(),
            collision_group,
            progress: LoaderProgress::default(),
        }
    }

    pub fn progress(&self) -> LoaderProgress {
        self.progress.clone()
    }

    /// Runs every stage and returns the assembly. Never fails: missing or
    /// broken assets become fallback segments.
    pub async fn load(&self, spec: &AssemblySpec) -> LoadedAssembly {
        let deadline = Instant::now() + self.timeout;
        let body_paths = match &spec.body {
            BodySource::Asset { path } => vec![path.clone()],
            BodySource::Fallback { .. } => Vec::new(),
        };
        let mut results = StageResults {
            ring: StageBarrier::new(1),
            links: StageBarrier::new(spec.chain.link_count as usize),
            body: StageBarrier::new(body_paths.len()),
        };

        let timed_out = timeout_at(deadline, self.run_stages(spec, body_paths, &mut results))
            .await
            .is_err();
        if timed_out {
            tracing::warn!(
                "[loader] Load timed out after {:?}, filling {} missing slots with fallbacks",
                self.timeout,
                results.ring.missing().count()
                    + results.links.missing().count()
                    + results.body.missing().count()
            );
        }

        let factory = BodyFactory::new(
            self.physics.clone(),
            self.layout.clone(),
            self.collision_group,
            spec,
        );
        let ring = results.ring.into_values(|_| None).pop().flatten();
        let links = results.links.into_values(|_| None);
        let body = results.body.into_values(|_| None).pop().flatten();

        let mut loaded =
            LoadedAssembly::from_images(&factory, spec, ring.as_ref(), &links, body.as_ref());
        loaded.degraded = timed_out;
        self.progress.set(LoaderState::Assembled);
        loaded
    }

    async fn run_stages(&self, spec: &AssemblySpec, body_paths: Vec<String>, results: &mut StageResults) {
        self.progress.set(LoaderState::RingRequested);
        self.fetch_stage(vec![spec.ring.asset_path()], &mut results.ring)
            .await;
        self.progress.set(LoaderState::RingReady);

        self.progress.set(LoaderState::ChainRequested);
        let link_paths = (0..spec.chain.link_count)
            .map(|i| spec.chain.kind.link_asset_path(i))
            .collect();
        self.fetch_stage(link_paths, &mut results.links).await;
        self.progress.set(LoaderState::ChainReady);

        self.progress.set(LoaderState::BodyRequested);
        self.fetch_stage(body_paths, &mut results.body).await;
    }

    /// Fetches every path concurrently. Dropping the future aborts the
    /// remaining fetches along with the `JoinSet`.
    async fn fetch_stage(&self, paths: Vec<String>, barrier: &mut StageBarrier<Option<Image>>) {
        let mut tasks = JoinSet::new();
        for (slot, path) in paths.into_iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            tasks.spawn(async move {
                let result = provider.fetch_image(&path).await;
                (slot, path, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, _, Ok(image))) => {
                    barrier.arrive(slot, Some(image));
                }
                Ok((slot, path, Err(e))) => {
                    tracing::warn!("[loader] Using fallback for {path}: {e}");
                    barrier.arrive(slot, None);
                }
                Err(e) => {
                    tracing::warn!("[loader] Fetch task failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainKind, ChainSpec, MountType, RingKind, SizingPolicy};
    use crate::segment::SegmentRole;
    use crate::shape::Shape;
    use crate::test_utils::{DelayedProvider, FailingProvider, PendingProvider};

    fn loader<P: AssetProvider>(provider: P) -> AssemblyLoader<P> {
        AssemblyLoader::new(Arc::new(provider), &SceneConfig::default(), 1)
    }

    #[tokio::test]
    async fn test_all_fetches_failing_yields_fallbacks() {
        let loader = loader(FailingProvider);
        let spec = AssemblySpec::basic([100.0, 100.0], 5);

        let loaded = loader.load(&spec).await;

        assert_eq!(loader.progress().state(), LoaderState::Assembled);
        assert!(!loaded.degraded);
        assert_eq!(loaded.segments.len(), 7);
        assert_eq!(loaded.fallback_count, 7);
        assert_eq!(loaded.segments[0].role, SegmentRole::Ring);
        assert_eq!(loaded.body().unwrap().shape, Shape::Disc { radius: 40.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrival_order_never_reorders_chain() {
        // Later links resolve first.
        let provider = DelayedProvider::new()
            .with("chains/ball/link_0.png", [10.0, 30.0], 300)
            .with("chains/ball/link_1.png", [12.0, 20.0], 10)
            .with("rings/basic.png", [60.0, 60.0], 50);
        let loader = loader(provider);
        let spec = AssemblySpec {
            chain: ChainSpec {
                kind: ChainKind::Ball,
                link_count: 4,
            },
            ..AssemblySpec::basic([0.0, 0.0], 4)
        };

        let loaded = loader.load(&spec).await;

        let roles: Vec<SegmentRole> = loaded.segments.iter().map(|s| s.role).collect();
        assert_eq!(roles[0], SegmentRole::Ring);
        for (i, role) in roles[1..5].iter().enumerate() {
            assert_eq!(*role, SegmentRole::ChainLink { index: i as u32 });
        }
        assert_eq!(roles[5], SegmentRole::Body);

        let sizes: Vec<[f32; 2]> = loaded.segments[1..5].iter().map(|s| s.visual_size).collect();
        assert_eq!(sizes, vec![[10.0, 30.0], [12.0, 20.0], [10.0, 30.0], [12.0, 20.0]]);
        assert!(loaded.segments.windows(2).all(|w| w[0].position[1] < w[1].position[1]));
        assert_eq!(loaded.fallback_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_completes_degraded() {
        let loader = loader(PendingProvider);
        let spec = AssemblySpec::basic([0.0, 0.0], 3).with_body(BodySource::Asset {
            path: "bodies/cat.png".to_string(),
        });

        let start = Instant::now();
        let loaded = loader.load(&spec).await;

        assert!(loaded.degraded);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3100));
        assert_eq!(loaded.segments.len(), 5);
        assert!(loaded.segments.iter().all(|s| s.fallback));
        assert_eq!(loader.progress().state(), LoaderState::Assembled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_body_degrades_only_missing_slot() {
        let provider = DelayedProvider::new()
            .with("rings/plain.png", [80.0, 80.0], 10)
            .with("chains/basic/link_0.png", [14.0, 24.0], 10)
            .with("chains/basic/link_1.png", [14.0, 24.0], 10)
            .with("bodies/slow.png", [50.0, 50.0], 10_000);
        let loader = loader(provider);
        let spec = AssemblySpec {
            ring: RingKind::Plain,
            ..AssemblySpec::basic([0.0, 0.0], 2)
        }
        .with_body(BodySource::Asset {
            path: "bodies/slow.png".to_string(),
        })
        .with_mount(MountType::Free)
        .with_sizing(SizingPolicy::Thumbnail { side: 64.0 });

        let loaded = loader.load(&spec).await;

        assert!(loaded.degraded);
        assert_eq!(loaded.fallback_count, 1);
        assert_eq!(loaded.segments[0].visual_size, [80.0, 80.0]);
        let body = loaded.body().unwrap();
        assert!(body.fallback);
        assert_eq!(body.shape, Shape::Disc { radius: 32.0 });
    }
}
