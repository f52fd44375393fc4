//! Joints between consecutive segments and their rapier counterparts.

use rapier2d::prelude::{
    FixedJointBuilder, GenericJoint, RevoluteJointBuilder, RopeJointBuilder, Vector,
};
use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentId};

/// A constraint between two segments of the same assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Joint {
    /// Free rotation about a world-space anchor, resisted by a small friction torque.
    Pin {
        a: SegmentId,
        b: SegmentId,
        anchor: [f32; 2],
        friction_torque: f32,
    },
    /// Caps the distance between the two segment origins.
    Limit {
        a: SegmentId,
        b: SegmentId,
        max_length: f32,
    },
    /// Rigid connection at a world-space anchor.
    Weld {
        a: SegmentId,
        b: SegmentId,
        anchor: [f32; 2],
    },
}

impl Joint {
    pub fn endpoints(&self) -> (SegmentId, SegmentId) {
        match *self {
            Self::Pin { a, b, .. } | Self::Limit { a, b, .. } | Self::Weld { a, b, .. } => (a, b),
        }
    }

    pub fn max_length(&self) -> Option<f32> {
        match *self {
            Self::Limit { max_length, .. } => Some(max_length),
            _ => None,
        }
    }

    /// Loosens a limit joint to `length`. Limits never tighten.
    pub fn relax_to(&mut self, length: f32) {
        if let Self::Limit { max_length, .. } = self {
            if length > *max_length {
                *max_length = length;
            }
        }
    }

    /// Builds the rapier joint between the bodies of `a` and `b`, converting
    /// world anchors into each body's local frame.
    pub(crate) fn to_rapier(&self, a: &Segment, b: &Segment) -> GenericJoint {
        let local = |anchor: [f32; 2], segment: &Segment| {
            Vector::new(
                anchor[0] - segment.position[0],
                anchor[1] - segment.position[1],
            )
        };

        match *self {
            Self::Pin {
                anchor,
                friction_torque,
                ..
            } => RevoluteJointBuilder::new()
                .local_anchor1(local(anchor, a))
                .local_anchor2(local(anchor, b))
                .motor_velocity(0.0, friction_torque)
                .contacts_enabled(false)
                .build()
                .into(),
            Self::Limit { max_length, .. } => RopeJointBuilder::new(max_length)
                .contacts_enabled(false)
                .build()
                .into(),
            Self::Weld { anchor, .. } => FixedJointBuilder::new()
                .local_anchor1(local(anchor, a))
                .local_anchor2(local(anchor, b))
                .contacts_enabled(false)
                .build()
                .into(),
        }
    }
}

/// Euclidean distance between two points.
pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}

pub fn midpoint(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [f32::midpoint(a[0], b[0]), f32::midpoint(a[1], b[1])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_only_relaxes() {
        let mut joint = Joint::Limit {
            a: 0,
            b: 1,
            max_length: 10.0,
        };
        joint.relax_to(8.0);
        assert_eq!(joint.max_length(), Some(10.0));
        joint.relax_to(12.0);
        assert_eq!(joint.max_length(), Some(12.0));
    }

    #[test]
    fn test_relax_ignores_pins() {
        let mut joint = Joint::Pin {
            a: 0,
            b: 1,
            anchor: [0.0, 0.0],
            friction_torque: 0.1,
        };
        joint.relax_to(100.0);
        assert_eq!(joint.max_length(), None);
        assert_eq!(joint.endpoints(), (0, 1));
    }

    #[test]
    fn test_geometry_helpers() {
        assert!((distance([0.0, 0.0], [3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(midpoint([0.0, 2.0], [4.0, 6.0]), [2.0, 4.0]);
    }
}
