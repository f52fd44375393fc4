//! Stacking math shared by the live loader and the static capture path.
//!
//! World coordinates are y-down, matching gravity. The ring centre sits at the
//! assembly position; the chain starts at the bottom of the ring's mid-radius
//! circle; each link overlaps its neighbours by a fraction of their height; the
//! body hangs below the last link, raised by its hook offset.

use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentRole};

/// Resting positions of every segment of one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackLayout {
    pub ring: [f32; 2],
    /// Top of the ring's mid-radius circle; a free-mounted ring hangs here.
    pub mount_anchor: [f32; 2],
    /// Bottom of the ring's mid-radius circle; the first link hooks on here.
    pub chain_start: [f32; 2],
    pub links: Vec<[f32; 2]>,
    pub body: [f32; 2],
}

impl StackLayout {
    /// Computes the layout for segments in ring → links → body order.
    ///
    /// `hook_offset` is the fraction of the body's height that overlaps the
    /// last link; `link_overlap` the fraction of link height shared by
    /// neighbouring links.
    pub fn compute(origin: [f32; 2], ordered: &[Segment], hook_offset: f32, link_overlap: f32) -> Self {
        let [x, y] = origin;
        let mid_radius = ordered
            .first()
            .map(|ring| ring.shape.mid_radius().unwrap_or(ring.visual_size[1] / 2.0))
            .unwrap_or_default();

        let chain_start = [x, y + mid_radius];
        let mut links = Vec::new();
        let mut previous_height = 0.0_f32;
        let mut cursor = chain_start[1];
        let mut bottom = chain_start[1];
        let mut body = chain_start;

        for segment in ordered {
            match segment.role {
                SegmentRole::Ring => {}
                SegmentRole::ChainLink { .. } => {
                    let height = segment.visual_size[1];
                    cursor += f32::midpoint(previous_height, height) * (1.0 - link_overlap);
                    links.push([x, cursor]);
                    bottom = cursor + height / 2.0;
                    previous_height = height;
                }
                SegmentRole::Body => {
                    let height = segment.visual_size[1];
                    body = [x, bottom + height / 2.0 - hook_offset * height];
                }
            }
        }

        Self {
            ring: origin,
            mount_anchor: [x, y - mid_radius],
            chain_start,
            links,
            body,
        }
    }

    /// Writes the computed positions into the segments.
    pub fn apply(&self, ordered: &mut [Segment]) {
        let mut links = self.links.iter();
        for segment in ordered {
            segment.position = match segment.role {
                SegmentRole::Ring => self.ring,
                SegmentRole::ChainLink { .. } => links.next().copied().unwrap_or(self.chain_start),
                SegmentRole::Body => self.body,
            };
        }
    }

    /// All positions in ring → links → body order.
    pub fn positions(&self) -> Vec<[f32; 2]> {
        let mut positions = Vec::with_capacity(self.links.len() + 2);
        positions.push(self.ring);
        positions.extend(self.links.iter().copied());
        positions.push(self.body);
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AssemblySpec, FallbackBody, LayoutTuning, PhysicsTuning, RingKind, SizingPolicy,
    };
    use crate::factory::BodyFactory;

    fn ordered(link_count: u32) -> Vec<Segment> {
        let spec = AssemblySpec::basic([100.0, 50.0], link_count);
        let factory = BodyFactory::new(PhysicsTuning::default(), LayoutTuning::default(), 1, &spec);
        let mut segments = vec![factory.make_ring(RingKind::Basic, 60.0)];
        for i in 0..link_count {
            segments.push(factory.make_chain_link(i, [14.0, 20.0]));
        }
        segments.push(factory.make_body(None, FallbackBody::Basic, SizingPolicy::Natural));
        segments
    }

    #[test]
    fn test_links_stack_below_ring() {
        let segments = ordered(3);
        let layout = StackLayout::compute([100.0, 50.0], &segments, 0.1, 0.25);

        // Mid radius of a basic 60-unit ring is 27.
        assert_eq!(layout.chain_start, [100.0, 77.0]);
        assert_eq!(layout.mount_anchor, [100.0, 23.0]);

        // First step is half a link, later steps a full link, both scaled by overlap.
        let ys: Vec<f32> = layout.links.iter().map(|p| p[1]).collect();
        assert!((ys[0] - (77.0 + 7.5)).abs() < 1e-4);
        assert!((ys[1] - (ys[0] + 15.0)).abs() < 1e-4);
        assert!((ys[2] - (ys[1] + 15.0)).abs() < 1e-4);

        // Fallback body: 80 tall, raised by 10% of its height.
        let bottom = ys[2] + 10.0;
        assert!((layout.body[1] - (bottom + 40.0 - 8.0)).abs() < 1e-4);
        assert!(layout.positions().iter().all(|p| (p[0] - 100.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_without_links_body_hangs_from_ring() {
        let segments = ordered(0);
        let layout = StackLayout::compute([0.0, 0.0], &segments, 0.0, 0.25);
        assert!(layout.links.is_empty());
        assert_eq!(layout.body, [0.0, 27.0 + 40.0]);
    }

    #[test]
    fn test_apply_writes_positions_in_order() {
        let mut segments = ordered(2);
        let layout = StackLayout::compute([10.0, 10.0], &segments, 0.1, 0.25);
        layout.apply(&mut segments);
        let positions: Vec<[f32; 2]> = segments.iter().map(|s| s.position).collect();
        assert_eq!(positions, layout.positions());
    }
}
