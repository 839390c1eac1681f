//! Limb length measurement and per-mapping position scaling.

use serde::{Deserialize, Serialize};

use super::skeleton_map::SkeletonMap;
use crate::clip::Clip;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    UpperArm,
    Forearm,
    Thigh,
    Shin,
    Spine,
}

impl Limb {
    pub const ALL: [Limb; 5] = [
        Limb::UpperArm,
        Limb::Forearm,
        Limb::Thigh,
        Limb::Shin,
        Limb::Spine,
    ];
}

/// Limb lengths in target units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbLengths {
    pub upper_arm: f32,
    pub forearm: f32,
    pub thigh: f32,
    pub shin: f32,
    pub spine: f32,
}

impl LimbLengths {
    /// Adult human proportions in metres.
    pub fn standard_human() -> Self {
        Self {
            upper_arm: 0.28,
            forearm: 0.25,
            thigh: 0.42,
            shin: 0.40,
            spine: 0.45,
        }
    }

    /// Short-limbed cartoon proportions in metres.
    pub fn stylized() -> Self {
        Self {
            upper_arm: 0.18,
            forearm: 0.16,
            thigh: 0.22,
            shin: 0.20,
            spine: 0.40,
        }
    }

    pub fn get(&self, limb: Limb) -> f32 {
        match limb {
            Limb::UpperArm => self.upper_arm,
            Limb::Forearm => self.forearm,
            Limb::Thigh => self.thigh,
            Limb::Shin => self.shin,
            Limb::Spine => self.spine,
        }
    }

    pub fn set(&mut self, limb: Limb, length: f32) {
        match limb {
            Limb::UpperArm => self.upper_arm = length,
            Limb::Forearm => self.forearm = length,
            Limb::Thigh => self.thigh = length,
            Limb::Shin => self.shin = length,
            Limb::Spine => self.spine = length,
        }
    }
}

/// A limb measured from `start` to `end`. The limb's length lives in the rest offset
/// chain ending at `end`, so `end` is the mapping whose translation gets scaled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbChain {
    pub limb: Limb,
    pub start: String,
    pub end: String,
}

impl LimbChain {
    pub fn new(limb: Limb, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            limb,
            start: start.into(),
            end: end.into(),
        }
    }

    /// Left-side CMU chains; right-side joints are found by mirroring names.
    pub fn cmu() -> Vec<LimbChain> {
        vec![
            LimbChain::new(Limb::UpperArm, "LeftArm", "LeftForeArm"),
            LimbChain::new(Limb::Forearm, "LeftForeArm", "LeftHand"),
            LimbChain::new(Limb::Thigh, "LeftUpLeg", "LeftLeg"),
            LimbChain::new(Limb::Shin, "LeftLeg", "LeftFoot"),
            LimbChain::new(Limb::Spine, "Hips", "Neck"),
        ]
    }
}

fn mirror(name: &str) -> Option<String> {
    if name.contains("Left") {
        Some(name.replacen("Left", "Right", 1))
    } else if name.contains("Right") {
        Some(name.replacen("Right", "Left", 1))
    } else {
        None
    }
}

/// Source limb lengths converted to target units, against desired target lengths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbProportions {
    pub source: LimbLengths,
    pub target: LimbLengths,
    pub chains: Vec<LimbChain>,
}

impl LimbProportions {
    /// Measure rest-pose distances between chain joints in `clip`, multiplied by
    /// `unit_scale` so they compare directly with `target`. Missing joints measure 0.
    pub fn measure(clip: &Clip, chains: Vec<LimbChain>, target: LimbLengths, unit_scale: f32) -> Self {
        let world = rest_positions(clip);
        let mut source = LimbLengths {
            upper_arm: 0.0,
            forearm: 0.0,
            thigh: 0.0,
            shin: 0.0,
            spine: 0.0,
        };
        for chain in &chains {
            let (Some(a), Some(b)) = (clip.joint_index(&chain.start), clip.joint_index(&chain.end))
            else {
                continue;
            };
            source.set(chain.limb, (world[b] - world[a]).norm() * unit_scale);
        }
        Self {
            source,
            target,
            chains,
        }
    }

    /// `target / source`, or 1 when the source limb was not measured.
    pub fn ratio(&self, limb: Limb) -> f32 {
        let s = self.source.get(limb);
        if s > f32::EPSILON {
            self.target.get(limb) / s
        } else {
            1.0
        }
    }

    /// Set `position_scale` on each chain's end mapping and its mirrored twin.
    ///
    /// Combined with the retarget `unit_scale`, the scaled offset equals the target limb
    /// length; `unit_scale` is not applied twice.
    pub fn apply_to(&self, map: &mut SkeletonMap) {
        for chain in &self.chains {
            let ratio = self.ratio(chain.limb);
            let mut names = vec![chain.end.clone()];
            names.extend(mirror(&chain.end));
            for name in names {
                if let Some(m) = map.mapping_for_source_mut(&name) {
                    m.position_scale = ratio;
                }
            }
        }
    }
}

fn rest_positions(clip: &Clip) -> Vec<nalgebra::Vector3<f32>> {
    let mut world: Vec<nalgebra::Vector3<f32>> = Vec::with_capacity(clip.joint_count());
    for joint in clip.joints() {
        let p = match joint.parent {
            Some(parent) => world[parent] + joint.offset,
            None => joint.offset,
        };
        world.push(p);
    }
    world
}
