//! Builds individual segments from resolved assets or fallback geometry.
//!
//! The factory is pure: it returns [`Segment`]s and never touches the physics
//! world. Positions are left at the origin; the stacking layout assigns them
//! once every segment of the assembly exists.

use crate::asset::Image;
use crate::config::{
    AssemblySpec, FallbackBody, LayoutTuning, MountType, PhysicsTuning, RingKind, SizingPolicy,
};
use crate::material::Material;
use crate::segment::{Segment, SegmentId, SegmentRole};
use crate::shape::Shape;

/// Smallest physical extent a link may be trimmed down to.
const MIN_LINK_EXTENT: f32 = 1.0;

/// Segment builder for one assembly.
#[derive(Debug, Clone)]
pub struct BodyFactory {
    physics: PhysicsTuning,
    layout: LayoutTuning,
    collision_group: u32,
    mount: MountType,
    link_count: u32,
}

impl BodyFactory {
    pub fn new(
        physics: PhysicsTuning,
        layout: LayoutTuning,
        collision_group: u32,
        spec: &AssemblySpec,
    ) -> Self {
        Self {
            physics,
            layout,
            collision_group,
            mount: spec.mount,
            link_count: spec.chain.link_count,
        }
    }

    pub fn layout(&self) -> &LayoutTuning {
        &self.layout
    }

    /// Segment id of the terminal body.
    pub fn body_id(&self) -> SegmentId {
        self.link_count + 1
    }

    fn segment(&self, id: SegmentId, role: SegmentRole, shape: Shape, material: Material) -> Segment {
        let visual_size = shape.bounding_size();
        Segment {
            id,
            role,
            shape,
            material,
            position: [0.0, 0.0],
            visual_size,
            is_kinematic: true,
            collision_group: self.collision_group,
            z_order: 0,
            fallback: false,
        }
    }

    /// Ring of the given outer diameter, approximated by a ring of discs.
    pub fn make_ring(&self, kind: RingKind, bounding_size: f32) -> Segment {
        let outer_radius = bounding_size / 2.0;
        let inner_radius = outer_radius * (1.0 - kind.thickness_ratio());
        let shape = Shape::CompoundDiscRing {
            segments: self.physics.ring_segments,
            inner_radius,
            outer_radius,
        };
        self.segment(0, SegmentRole::Ring, shape, Material::ring())
    }

    /// Ring sized from its image, or from the default ring size.
    pub fn ring_for(&self, kind: RingKind, image: Option<&Image>) -> Segment {
        match image.filter(|image| image.has_valid_size()) {
            Some(image) => self.make_ring(kind, image.width.max(image.height)),
            None => Segment {
                fallback: true,
                ..self.make_ring(kind, self.layout.ring_size)
            },
        }
    }

    /// Link `index` (0-based) whose sprite has the given size. The collision
    /// rectangle is inset so overlapping sprites do not over-constrain rotation.
    pub fn make_chain_link(&self, index: u32, size: [f32; 2]) -> Segment {
        let inset = self.physics.link_inset;
        let shape = Shape::Rectangle {
            width: (size[0] - inset).max(MIN_LINK_EXTENT),
            height: (size[1] - inset).max(MIN_LINK_EXTENT),
        };
        let material = if index == 0 && self.mount == MountType::Fixed {
            Material::anchor_link()
        } else {
            Material::chain_link()
        };
        Segment {
            visual_size: size,
            ..self.segment(index + 1, SegmentRole::ChainLink { index }, shape, material)
        }
    }

    /// Link sized from its image, or from the default link size.
    pub fn chain_link_for(&self, index: u32, image: Option<&Image>) -> Segment {
        match image.filter(|image| image.has_valid_size()) {
            Some(image) => self.make_chain_link(index, image.size()),
            None => Segment {
                fallback: true,
                ..self.make_chain_link(index, self.layout.link_size)
            },
        }
    }

    /// Terminal body. Without a usable image this is the basic disc body, so
    /// the chain always ends in a valid segment.
    pub fn make_body(
        &self,
        image: Option<&Image>,
        fallback: FallbackBody,
        sizing: SizingPolicy,
    ) -> Segment {
        let id = self.body_id();
        match image.filter(|image| image.has_valid_size()) {
            Some(image) => {
                let [width, height] = sizing.apply(image.size());
                self.segment(
                    id,
                    SegmentRole::Body,
                    Shape::Rectangle { width, height },
                    Material::body(),
                )
            }
            None => {
                let radius = match fallback {
                    FallbackBody::Basic => {
                        let diameter = self.layout.fallback_body_radius * 2.0;
                        let [w, h] = sizing.apply([diameter, diameter]);
                        w.min(h) / 2.0
                    }
                };
                Segment {
                    fallback: true,
                    ..self.segment(id, SegmentRole::Body, Shape::Disc { radius }, Material::body())
                }
            }
        }
    }
}
