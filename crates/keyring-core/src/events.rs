//! Scene readiness events, drained by the host after each pump.

use serde::{Deserialize, Serialize};

use crate::error::AssemblyId;
use crate::segment::SegmentId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEvent {
    /// Emitted once per successfully loaded assembly.
    AssemblyReady { id: AssemblyId },
    /// Every pending assembly was assembled and at least one is live.
    AllAssembliesReady,
    /// Every pending assembly settled and none of them is usable.
    SceneLoadFailed,
    /// The assembly was discarded; siblings are unaffected.
    AssemblyFailed { id: AssemblyId, error: String },
    /// The load hit its deadline and completed with fallbacks.
    AssemblyTimedOut { id: AssemblyId },
    /// The assembly shares its collision group with an earlier one.
    CollisionGroupOverflow { id: AssemblyId, group: u32 },
}

/// A segment addressed across the whole scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentRef {
    pub assembly: AssemblyId,
    pub segment: SegmentId,
}

/// Contact between two segments reported by one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCollision {
    pub first: SegmentRef,
    pub second: SegmentRef,
    pub started: bool,
}

impl SegmentCollision {
    pub fn crosses_assemblies(&self) -> bool {
        self.first.assembly != self.second.assembly
    }
}
