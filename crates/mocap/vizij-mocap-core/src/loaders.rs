//! JSON loaders for skeleton maps and target skeletons.
//!
//! The on-disk schema structs are private; loaders convert them to core types and run
//! the same validation as the in-code constructors.
//!
//! Map schema:
//! `{ "mappings": [ { "source": "Hips", "target": "hips" | 0, "correction": [x,y,z,w]?, "scale": 1.0? } ] }`
//!
//! Skeleton schema:
//! `{ "bones": [ { "name": "hips", "parent": "root"?, "offset": [x,y,z], "rotation": [x,y,z,w]? } ] }`

use hashbrown::HashMap;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::{MapError, SkeletonError};
use crate::interp::functions::normalize_quat;
use crate::pose::JointTransform;
use crate::retarget::{BoneMapping, SkeletonMap};
use crate::skeleton::{Bone, TargetSkeleton};

#[derive(Debug, Deserialize)]
struct StoredMap {
    mappings: Vec<StoredMapping>,
}

#[derive(Debug, Deserialize)]
struct StoredMapping {
    source: String,
    target: StoredTarget,
    #[serde(default)]
    correction: Option<[f32; 4]>,
    #[serde(default)]
    scale: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredTarget {
    Index(usize),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct StoredSkeleton {
    bones: Vec<StoredBone>,
}

#[derive(Debug, Deserialize)]
struct StoredBone {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    offset: [f32; 3],
    #[serde(default)]
    rotation: Option<[f32; 4]>,
}

/// `[x, y, z, w]` to a unit quaternion; zero-length input becomes identity.
fn quat_xyzw(q: [f32; 4]) -> UnitQuaternion<f32> {
    normalize_quat(Quaternion::new(q[3], q[0], q[1], q[2]))
}

/// Parse a skeleton map, resolving bone names against `skeleton`.
pub fn parse_skeleton_map_json(
    json: &str,
    skeleton: &TargetSkeleton,
) -> Result<SkeletonMap, MapError> {
    let stored: StoredMap = serde_json::from_str(json).map_err(|e| MapError::Json {
        reason: e.to_string(),
    })?;
    let mut mappings = Vec::with_capacity(stored.mappings.len());
    for m in stored.mappings {
        let target = match m.target {
            StoredTarget::Index(i) => i,
            StoredTarget::Name(name) => skeleton
                .bone_index(&name)
                .ok_or(MapError::UnknownTargetBone { name })?,
        };
        let mut mapping = BoneMapping::new(m.source, target);
        if let Some(q) = m.correction {
            mapping = mapping.with_correction(quat_xyzw(q));
        }
        if let Some(s) = m.scale {
            mapping = mapping.with_scale(s);
        }
        mappings.push(mapping);
    }
    SkeletonMap::new(mappings)
}

/// Parse a target skeleton. Parents are referenced by name and must precede children.
pub fn parse_target_skeleton_json(json: &str) -> Result<TargetSkeleton, SkeletonError> {
    let stored: StoredSkeleton = serde_json::from_str(json).map_err(|e| SkeletonError::Json {
        reason: e.to_string(),
    })?;
    let index: HashMap<&str, usize> = stored
        .bones
        .iter()
        .enumerate()
        .map(|(i, b)| (b.name.as_str(), i))
        .collect();

    let mut bones = Vec::with_capacity(stored.bones.len());
    for b in &stored.bones {
        let parent = match &b.parent {
            Some(p) => Some(*index.get(p.as_str()).ok_or_else(|| {
                SkeletonError::UnknownParent {
                    name: b.name.clone(),
                    parent: p.clone(),
                }
            })?),
            None => None,
        };
        let [x, y, z] = b.offset;
        let rotation = b.rotation.map(quat_xyzw).unwrap_or_else(UnitQuaternion::identity);
        bones.push(Bone {
            name: b.name.clone(),
            parent,
            rest: JointTransform::new(Vector3::new(x, y, z), rotation),
        });
    }
    TargetSkeleton::new(bones)
}
