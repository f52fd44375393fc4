//! Physical material parameters and per-role presets.

use serde::{Deserialize, Serialize};

/// Physical parameters of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Material {
    /// Ring: light, with high angular damping so it resists spinning.
    pub const fn ring() -> Self {
        Self {
            mass: 0.5,
            friction: 0.3,
            restitution: 0.1,
            linear_damping: 0.5,
            angular_damping: 5.0,
        }
    }

    /// Chain link: light and loosely damped so the chain swings freely.
    pub const fn chain_link() -> Self {
        Self {
            mass: 0.1,
            friction: 0.2,
            restitution: 0.1,
            linear_damping: 0.1,
            angular_damping: 0.1,
        }
    }

    /// Link nearest a fixed anchor: heavily damped to suppress jitter.
    pub const fn anchor_link() -> Self {
        Self {
            linear_damping: 1.0,
            angular_damping: 2.0,
            ..Self::chain_link()
        }
    }

    /// Decorative body: heavier and well damped for stability.
    pub const fn body() -> Self {
        Self {
            mass: 2.0,
            friction: 0.4,
            restitution: 0.2,
            linear_damping: 0.8,
            angular_damping: 1.5,
        }
    }
}
