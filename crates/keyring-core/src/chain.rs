//! Wires an ordered segment list into a joint chain.

use crate::config::{MountType, PhysicsTuning};
use crate::error::JointError;
use crate::joint::{Joint, distance, midpoint};
use crate::segment::{Segment, SegmentRole};

/// Pairs closer than this are treated as coincident.
const MIN_PAIR_DISTANCE: f32 = 1e-3;

/// Builds pin/weld + limit joint pairs for one assembly.
#[derive(Debug, Clone)]
pub struct JointChainBuilder {
    tuning: PhysicsTuning,
    mount: MountType,
}

impl JointChainBuilder {
    pub fn new(tuning: PhysicsTuning, mount: MountType) -> Self {
        Self { tuning, mount }
    }

    /// Connects `ordered` (ring, links…, body) and returns the joints in
    /// anchor → leaf order: for each adjacent pair, a pin (or a weld for the
    /// terminal pair) followed by a limit.
    ///
    /// Also lowers the damping of every link after the first so motion grows
    /// towards the leaf.
    pub fn connect(&self, ordered: &mut [Segment]) -> Result<Vec<Joint>, JointError> {
        Self::validate(ordered)?;
        self.apply_damping_gradient(ordered);

        let last = ordered.len() - 1;
        let mut joints = Vec::with_capacity(last * 2);

        for (i, pair) in ordered.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            let rest = distance(a.position, b.position);

            if i + 1 == last {
                joints.push(Joint::Weld {
                    a: a.id,
                    b: b.id,
                    anchor: midpoint(a.position, b.position),
                });
            } else if i == 0 && self.mount == MountType::Fixed {
                // Hook onto the ring's own edge so the ring cannot translate.
                let edge = a.shape.mid_radius().unwrap_or(a.visual_size[1] / 2.0);
                joints.push(Joint::Pin {
                    a: a.id,
                    b: b.id,
                    anchor: [a.position[0], a.position[1] + edge],
                    friction_torque: self.tuning.stiff_first_link_torque,
                });
            } else {
                joints.push(Joint::Pin {
                    a: a.id,
                    b: b.id,
                    anchor: midpoint(a.position, b.position),
                    friction_torque: self.tuning.pin_friction_torque,
                });
            }

            joints.push(Joint::Limit {
                a: a.id,
                b: b.id,
                max_length: self.tuning.limit_slack * rest,
            });
        }

        tracing::debug!(
            "[chain] Connected {} segments with {} joints",
            ordered.len(),
            joints.len()
        );
        Ok(joints)
    }

    fn validate(ordered: &[Segment]) -> Result<(), JointError> {
        if ordered.len() < 2 {
            return Err(JointError::TooFewSegments(ordered.len()));
        }

        let last = ordered.len() - 1;
        for (i, segment) in ordered.iter().enumerate() {
            let in_place = match segment.role {
                SegmentRole::Ring => i == 0,
                SegmentRole::Body => i == last,
                SegmentRole::ChainLink { .. } => i != 0 && i != last,
            };
            if !in_place {
                return Err(JointError::UnexpectedOrder(segment.id));
            }
            if !segment.position.iter().all(|v| v.is_finite()) {
                return Err(JointError::NonFinitePosition(segment.id));
            }
        }

        for pair in ordered.windows(2) {
            if distance(pair[0].position, pair[1].position) < MIN_PAIR_DISTANCE {
                return Err(JointError::CoincidentSegments {
                    a: pair[0].id,
                    b: pair[1].id,
                });
            }
        }
        Ok(())
    }

    fn apply_damping_gradient(&self, ordered: &mut [Segment]) {
        let floor = self.tuning.min_link_damping;
        let mut factor = 1.0;
        for segment in ordered.iter_mut() {
            let SegmentRole::ChainLink { index } = segment.role else {
                continue;
            };
            if index == 0 {
                continue;
            }
            factor *= self.tuning.link_damping_falloff;
            let material = &mut segment.material;
            material.angular_damping = (material.angular_damping * factor)
                .max(floor)
                .min(material.angular_damping);
            material.linear_damping = (material.linear_damping * factor)
                .max(floor)
                .min(material.linear_damping);
        }
    }
}
