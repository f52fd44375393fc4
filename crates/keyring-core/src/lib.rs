//! Keyring-Live Core Library
//!
//! Articulated keyring simulation on `Rapier2D`: a ring, a chain of pinned
//! links and a decorative body, loaded asynchronously and activated under
//! gravity only once every pending assembly of the scene is assembled.
//!
//! Pipeline:
//! - [`AssemblyLoader`] resolves assets and builds positioned [`Segment`]s.
//! - [`JointChainBuilder`] wires them into pins, welds and limits.
//! - [`PhysicsActivationController`] inserts the joints and goes dynamic.
//! - [`MultiAssemblyManager`] runs many assemblies in one world.
//! - [`StaticLayoutEngine`] lays the same assemblies out without physics.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod activation;
pub mod assembly;
pub mod asset;
pub mod barrier;
pub mod capture;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod interaction;
pub mod joint;
pub mod layout;
pub mod loader;
pub mod manager;
pub mod material;
pub mod physics;
pub mod segment;
pub mod shape;

#[cfg(test)]
pub(crate) mod test_utils;

pub use activation::{ActivationState, PhysicsActivationController};
pub use assembly::Assembly;
pub use asset::{AssetProvider, CachedAssetProvider, Image, StaticAssetProvider};
pub use capture::{CaptureFrame, CaptureItem, StaticLayoutEngine, Transform};
pub use chain::JointChainBuilder;
pub use config::{
    AssemblySpec, BodySource, ChainKind, ChainSpec, FallbackBody, MountType, RingKind,
    SceneConfig, SizingPolicy,
};
pub use error::{AssemblyId, AssetError, ConfigError, JointError, SceneError};
pub use events::{SceneEvent, SegmentCollision, SegmentRef};
pub use factory::BodyFactory;
pub use interaction::{EffectSink, InteractionController, LiveScene, PointerOutcome};
pub use joint::Joint;
pub use layout::StackLayout;
pub use loader::{AssemblyLoader, LoadedAssembly, LoaderProgress, LoaderState};
pub use manager::MultiAssemblyManager;
pub use material::Material;
pub use physics::{PHYSICS_DT, PhysicsWorld};
pub use segment::{Segment, SegmentId, SegmentRole};
pub use shape::Shape;
