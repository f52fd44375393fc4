//! Multi-assembly scene: ids, collision groups, z layers, the readiness
//! barrier and every mutation of the shared world.
//!
//! Loads run as tokio tasks on the injected runtime and report back over a
//! channel. Results are applied only in [`MultiAssemblyManager::pump`], on the
//! caller's thread, so the world itself needs no lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rapier2d::prelude::{CollisionEvent, Vector};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

use crate::activation::{ActivationState, PhysicsActivationController};
use crate::asset::AssetProvider;
use crate::assembly::Assembly;
use crate::config::{AssemblySpec, SceneConfig};
use crate::error::{AssemblyId, SceneError};
use crate::events::{SceneEvent, SegmentCollision, SegmentRef};
use crate::interaction::LiveScene;
use crate::loader::{AssemblyLoader, LoadedAssembly, LoaderProgress, LoaderState};
use crate::physics::PhysicsWorld;
use crate::segment::{USER_DATA_SEGMENT, decode_user_data};

/// Number of distinct collision groups.
pub const MAX_COLLISION_GROUPS: u32 = 32;

/// Extra wait on top of the loader deadline before a silent load task is
/// given up on.
const SETTLE_GRACE: Duration = Duration::from_secs(1);

/// Collision group of an assembly: one bit, aliasing from id 32 on.
pub fn collision_group_for(id: AssemblyId) -> u32 {
    1 << (id % MAX_COLLISION_GROUPS)
}

/// Per-id bookkeeping that survives reconfiguration.
#[derive(Debug, Clone, Copy)]
struct Slot {
    layer: u32,
    collision_group: u32,
    generation: u64,
}

struct PendingLoad {
    generation: u64,
    progress: LoaderProgress,
    task: JoinHandle<()>,
}

struct LoadResult {
    epoch: u64,
    id: AssemblyId,
    generation: u64,
    loaded: LoadedAssembly,
}

/// Owns the shared world and every assembly in it.
pub struct MultiAssemblyManager<P> {
    config: SceneConfig,
    provider: Arc<P>,
    runtime: Handle,
    world: PhysicsWorld,
    activation: PhysicsActivationController,
    assemblies: BTreeMap<AssemblyId, Assembly>,
    slots: BTreeMap<AssemblyId, Slot>,
    pending: HashMap<AssemblyId, PendingLoad>,
    /// Loads concluded since the last readiness barrier.
    settled_in_batch: usize,
    next_id: AssemblyId,
    next_layer: u32,
    epoch: u64,
    simulation_enabled: bool,
    events: Vec<SceneEvent>,
    results_tx: UnboundedSender<LoadResult>,
    results_rx: UnboundedReceiver<LoadResult>,
}

impl<P: AssetProvider> MultiAssemblyManager<P> {
    pub fn new(config: SceneConfig, provider: Arc<P>, runtime: Handle) -> Self {
        let [gx, gy] = config.physics.gravity;
        let (results_tx, results_rx) = unbounded_channel();
        Self {
            activation: PhysicsActivationController::new(config.physics.clone()),
            world: PhysicsWorld::with_gravity(Vector::new(gx, gy)),
            config,
            provider,
            runtime,
            assemblies: BTreeMap::new(),
            slots: BTreeMap::new(),
            pending: HashMap::new(),
            settled_in_batch: 0,
            next_id: 0,
            next_layer: 0,
            epoch: 0,
            simulation_enabled: true,
            events: Vec::new(),
            results_tx,
            results_rx,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Starts loading every assembly listed in the scene config.
    pub fn load_scene(&mut self) -> Vec<AssemblyId> {
        let specs = self.config.assemblies.clone();
        specs.into_iter().map(|spec| self.add_assembly(spec)).collect()
    }

    /// Registers a new assembly and starts loading it.
    pub fn add_assembly(&mut self, spec: AssemblySpec) -> AssemblyId {
        let id = self.next_id;
        self.next_id += 1;

        let collision_group = collision_group_for(id);
        if id >= MAX_COLLISION_GROUPS {
            tracing::warn!(
                "[scene] Assembly {id} shares collision group {collision_group:#x} with assembly {}",
                id % MAX_COLLISION_GROUPS
            );
            self.events.push(SceneEvent::CollisionGroupOverflow {
                id,
                group: collision_group,
            });
        }

        let slot = Slot {
            layer: self.next_layer,
            collision_group,
            generation: 0,
        };
        self.next_layer += 1;
        self.slots.insert(id, slot);

        tracing::info!("[scene] Assembly {id} added (group {collision_group:#x}, layer {})", slot.layer);
        self.start_load(id, spec, slot);
        id
    }

    /// Tears an assembly down and reloads it from `spec`, keeping its id,
    /// collision group and layer.
    pub fn reconfigure(&mut self, id: AssemblyId, spec: AssemblySpec) -> Result<(), SceneError> {
        let slot = self.slots.get_mut(&id).ok_or(SceneError::UnknownAssembly(id))?;
        slot.generation += 1;
        let slot = *slot;

        self.cancel_load(id);
        if let Some(mut assembly) = self.assemblies.remove(&id) {
            assembly.detach(&mut self.world);
        }

        tracing::info!("[scene] Assembly {id} reconfigured");
        self.start_load(id, spec, slot);
        Ok(())
    }

    /// Removes every body and joint of an assembly and invalidates its id.
    pub fn remove_assembly(&mut self, id: AssemblyId) -> Result<(), SceneError> {
        self.slots
            .remove(&id)
            .ok_or(SceneError::UnknownAssembly(id))?;

        self.cancel_load(id);
        if let Some(mut assembly) = self.assemblies.remove(&id) {
            assembly.detach(&mut self.world);
        }
        tracing::info!("[scene] Assembly {id} removed");
        Ok(())
    }

    /// Cancels every load and clears the world. Results from before the
    /// reset are dropped when they arrive.
    pub fn reset(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.task.abort();
        }
        self.assemblies.clear();
        self.slots.clear();
        self.world.reset();
        self.settled_in_batch = 0;
        self.next_id = 0;
        self.next_layer = 0;
        self.events.clear();
        self.epoch += 1;
        tracing::info!("[scene] Reset (epoch {})", self.epoch);
    }

    fn start_load(&mut self, id: AssemblyId, spec: AssemblySpec, slot: Slot) {
        let loader = AssemblyLoader::new(
            Arc::clone(&self.provider),
            &self.config,
            slot.collision_group,
        );
        let progress = loader.progress();
        let results_tx = self.results_tx.clone();
        let epoch = self.epoch;
        let generation = slot.generation;

        let task = self.runtime.spawn(async move {
            let loaded = loader.load(&spec).await;
            // A closed channel means the manager is gone.
            let _ = results_tx.send(LoadResult {
                epoch,
                id,
                generation,
                loaded,
            });
        });

        self.pending.insert(
            id,
            PendingLoad {
                generation,
                progress,
                task,
            },
        );
    }

    fn cancel_load(&mut self, id: AssemblyId) {
        if let Some(pending) = self.pending.remove(&id) {
            pending.task.abort();
            tracing::debug!("[scene] Cancelled in-flight load of assembly {id}");
        }
    }

    /// Applies every finished load and runs the readiness barrier. Returns the
    /// number of results applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.results_rx.try_recv() {
            if self.apply(result) {
                applied += 1;
            }
        }
        self.check_barrier();
        applied
    }

    /// Waits until no load is pending, applying results as they arrive.
    pub async fn settle(&mut self) {
        let patience = self.config.loader.timeout() + SETTLE_GRACE;
        while !self.pending.is_empty() {
            match timeout(patience, self.results_rx.recv()).await {
                Ok(Some(result)) => {
                    self.apply(result);
                }
                Ok(None) => break,
                Err(_) => self.reap_silent_loads(),
            }
        }
        self.pump();
    }

    /// Drops pending loads whose task ended without reporting a result.
    fn reap_silent_loads(&mut self) {
        let silent: Vec<AssemblyId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.task.is_finished())
            .map(|(id, _)| *id)
            .collect();
        for id in silent {
            self.pending.remove(&id);
            self.discard(id, "load task ended without a result".to_string());
        }
    }

    fn apply(&mut self, result: LoadResult) -> bool {
        let LoadResult {
            epoch,
            id,
            generation,
            loaded,
        } = result;

        let current = epoch == self.epoch
            && self
                .pending
                .get(&id)
                .is_some_and(|pending| pending.generation == generation);
        if !current {
            tracing::debug!("[scene] Dropping stale load result for assembly {id}");
            return false;
        }
        self.pending.remove(&id);

        let Some(slot) = self.slots.get(&id).copied() else {
            return false;
        };

        if loaded.degraded {
            tracing::warn!("[scene] Assembly {id} loaded degraded after timeout");
            self.events.push(SceneEvent::AssemblyTimedOut { id });
        }

        match Assembly::insert(id, slot.layer, loaded, &self.config.physics, &mut self.world) {
            Ok(assembly) => {
                tracing::debug!(
                    "[scene] Assembly {id} assembled with {} segments",
                    assembly.segments.len()
                );
                self.assemblies.insert(id, assembly);
                self.settled_in_batch += 1;
            }
            Err(e) => self.discard(id, e.to_string()),
        }
        true
    }

    fn discard(&mut self, id: AssemblyId, error: String) {
        tracing::warn!("[scene] Discarding assembly {id}: {error}");
        if let Some(mut assembly) = self.assemblies.remove(&id) {
            assembly.detach(&mut self.world);
        }
        self.slots.remove(&id);
        self.settled_in_batch += 1;
        self.events.push(SceneEvent::AssemblyFailed { id, error });
    }

    /// Once nothing is pending, activates every frozen assembly and turns
    /// gravity on.
    fn check_barrier(&mut self) {
        if !self.pending.is_empty() || self.settled_in_batch == 0 {
            return;
        }
        self.settled_in_batch = 0;

        let frozen: Vec<AssemblyId> = self
            .assemblies
            .iter()
            .filter(|(_, assembly)| assembly.activation() == ActivationState::Frozen)
            .map(|(id, _)| *id)
            .collect();

        for id in frozen {
            let Some(assembly) = self.assemblies.get_mut(&id) else {
                continue;
            };
            match self.activation.activate(assembly, &mut self.world) {
                Ok(()) => {
                    tracing::info!("[scene] Assembly {id} ready");
                    self.events.push(SceneEvent::AssemblyReady { id });
                }
                Err(source) => {
                    let error = SceneError::JointConstruction { id, source };
                    self.discard(id, error.to_string());
                    self.settled_in_batch = 0;
                }
            }
        }

        if self.assemblies.values().any(Assembly::is_live) {
            if !self.world.gravity_enabled {
                self.world.gravity_enabled = true;
                tracing::info!("[scene] All assemblies ready, gravity on");
            }
            self.events.push(SceneEvent::AllAssembliesReady);
        } else {
            tracing::warn!("[scene] No assembly could be loaded");
            self.events.push(SceneEvent::SceneLoadFailed);
        }
    }

    /// Advances the world by one fixed tick and reports segment contacts.
    pub fn step(&mut self) -> Vec<SegmentCollision> {
        if !self.simulation_enabled {
            return Vec::new();
        }
        let raw = self.world.step_with_events();
        raw.into_iter()
            .filter_map(|event| {
                let (c1, c2, started) = match event {
                    CollisionEvent::Started(c1, c2, _) => (c1, c2, true),
                    CollisionEvent::Stopped(c1, c2, _) => (c1, c2, false),
                };
                Some(SegmentCollision {
                    first: self.segment_ref(self.world.collider_owner(c1)?)?,
                    second: self.segment_ref(self.world.collider_owner(c2)?)?,
                    started,
                })
            })
            .collect()
    }

    fn segment_ref(&self, user_data: u128) -> Option<SegmentRef> {
        let (tag, assembly, segment) = decode_user_data(user_data);
        (tag == USER_DATA_SEGMENT).then_some(SegmentRef { assembly, segment })
    }

    pub fn set_simulation_enabled(&mut self, enabled: bool) {
        self.simulation_enabled = enabled;
    }

    pub fn simulation_enabled(&self) -> bool {
        self.simulation_enabled
    }

    pub fn gravity_enabled(&self) -> bool {
        self.world.gravity_enabled
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Loader state of an assembly, `None` for unknown ids.
    pub fn loader_state(&self, id: AssemblyId) -> Option<LoaderState> {
        if let Some(pending) = self.pending.get(&id) {
            return Some(pending.progress.state());
        }
        self.assemblies.get(&id).map(|_| LoaderState::Assembled)
    }

    pub fn collision_group(&self, id: AssemblyId) -> Option<u32> {
        self.slots.get(&id).map(|slot| slot.collision_group)
    }

    pub fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.assemblies.get(&id)
    }

    pub fn assemblies(&self) -> impl Iterator<Item = &Assembly> {
        self.assemblies.values()
    }

    pub fn assembly_count(&self) -> usize {
        self.slots.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// World plus live assemblies, for the interaction controller.
    pub fn live_scene(&mut self) -> LiveScene<'_> {
        LiveScene::new(&mut self.world, &self.assemblies)
    }
}

impl<P> Drop for MultiAssemblyManager<P> {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.task.abort();
        }
    }
}
