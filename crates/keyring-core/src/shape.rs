//! Collision geometry for keyring segments.

use std::f32::consts::TAU;

use rapier2d::prelude::{ActiveEvents, Collider, ColliderBuilder, InteractionGroups, Vector};
use serde::{Deserialize, Serialize};

use crate::material::Material;

/// Collision geometry of a single segment, in the segment's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Disc {
        radius: f32,
    },
    Rectangle {
        width: f32,
        height: f32,
    },
    /// Annulus approximated by `segments` small discs on the mid-radius circle.
    CompoundDiscRing {
        segments: u32,
        inner_radius: f32,
        outer_radius: f32,
    },
}

impl Shape {
    /// Width and height of the axis-aligned box enclosing the shape.
    pub fn bounding_size(&self) -> [f32; 2] {
        match *self {
            Self::Disc { radius } => [radius * 2.0, radius * 2.0],
            Self::Rectangle { width, height } => [width, height],
            Self::CompoundDiscRing { outer_radius, .. } => [outer_radius * 2.0, outer_radius * 2.0],
        }
    }

    /// Returns true if a point given in the local frame lies inside the shape.
    pub fn contains_local(&self, point: [f32; 2]) -> bool {
        let [x, y] = point;
        match *self {
            Self::Disc { radius } => x * x + y * y <= radius * radius,
            Self::Rectangle { width, height } => x.abs() <= width / 2.0 && y.abs() <= height / 2.0,
            Self::CompoundDiscRing {
                inner_radius,
                outer_radius,
                ..
            } => {
                let d2 = x * x + y * y;
                d2 >= inner_radius * inner_radius && d2 <= outer_radius * outer_radius
            }
        }
    }

    /// Radius of the circle the ring discs are centred on.
    pub fn mid_radius(&self) -> Option<f32> {
        match *self {
            Self::CompoundDiscRing {
                inner_radius,
                outer_radius,
                ..
            } => Some(f32::midpoint(inner_radius, outer_radius)),
            _ => None,
        }
    }

    /// Local centres of the discs making up a compound ring.
    pub fn ring_disc_centers(&self) -> Vec<[f32; 2]> {
        let Self::CompoundDiscRing { segments, .. } = *self else {
            return Vec::new();
        };
        let mid = self.mid_radius().unwrap_or_default();
        (0..segments)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = TAU * i as f32 / segments as f32;
                [mid * angle.cos(), mid * angle.sin()]
            })
            .collect()
    }

    /// Builds the colliders for this shape, to be attached to one rigid body.
    pub fn colliders(&self, material: &Material, groups: InteractionGroups) -> Vec<Collider> {
        let base = |builder: ColliderBuilder, mass: f32| {
            builder
                .friction(material.friction)
                .restitution(material.restitution)
                .mass(mass)
                .collision_groups(groups)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build()
        };

        match *self {
            Self::Disc { radius } => vec![base(ColliderBuilder::ball(radius), material.mass)],
            Self::Rectangle { width, height } => vec![base(
                ColliderBuilder::cuboid(width / 2.0, height / 2.0),
                material.mass,
            )],
            Self::CompoundDiscRing {
                segments,
                inner_radius,
                outer_radius,
            } => {
                let disc_radius = (outer_radius - inner_radius).max(f32::EPSILON) / 2.0;
                #[allow(clippy::cast_precision_loss)]
                let disc_mass = material.mass / segments.max(1) as f32;
                self.ring_disc_centers()
                    .into_iter()
                    .map(|[x, y]| {
                        base(
                            ColliderBuilder::ball(disc_radius).translation(Vector::new(x, y)),
                            disc_mass,
                        )
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Shape {
        Shape::CompoundDiscRing {
            segments: 32,
            inner_radius: 20.0,
            outer_radius: 30.0,
        }
    }

    #[test]
    fn test_ring_discs_sit_on_mid_radius() {
        let shape = ring();
        let centers = shape.ring_disc_centers();
        assert_eq!(centers.len(), 32);
        for [x, y] in centers {
            assert!(((x * x + y * y).sqrt() - 25.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_ring_colliders_one_per_disc() {
        let colliders = ring().colliders(&Material::ring(), InteractionGroups::all());
        assert_eq!(colliders.len(), 32);
        let radius = colliders[0].shape().as_ball().map(|b| b.radius);
        assert_eq!(radius, Some(5.0));
    }

    #[test]
    fn test_contains_local() {
        let rect = Shape::Rectangle {
            width: 10.0,
            height: 20.0,
        };
        assert!(rect.contains_local([4.0, -9.0]));
        assert!(!rect.contains_local([6.0, 0.0]));

        // The ring's hole is not part of the ring.
        assert!(!ring().contains_local([0.0, 0.0]));
        assert!(ring().contains_local([25.0, 0.0]));
    }

    #[test]
    fn test_bounding_size() {
        assert_eq!(Shape::Disc { radius: 12.0 }.bounding_size(), [24.0, 24.0]);
        assert_eq!(ring().bounding_size(), [60.0, 60.0]);
    }

    #[test]
    fn test_shape_json_tagging() {
        let json = serde_json::to_string(&Shape::Disc { radius: 3.0 }).unwrap();
        assert_eq!(json, r#"{"type":"disc","radius":3.0}"#);
    }
}
