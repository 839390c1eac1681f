//! Fuzzy bone-name matching between a clip and a target skeleton.
//!
//! Names are reduced to a side plus a canonical body part: namespaces (`mixamorig:`,
//! `Armature|`) are dropped, case and separators ignored, and side markers recognised
//! as prefixes (`Left`, `L_`) or suffixes (`.L`, `_r`). Each target bone is matched by
//! the first clip joint, in hierarchy order, that reduces to the same pair.

use hashbrown::HashMap;
use log::debug;

use super::skeleton_map::{BoneMapping, SkeletonMap};
use crate::clip::Clip;
use crate::skeleton::TargetSkeleton;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Center,
}

const SYNONYMS: &[(&str, &[&str])] = &[
    ("hips", &["hips", "hip", "pelvis", "root"]),
    ("spine", &["spine", "abdomen", "spine0", "lowerback", "waist"]),
    ("chest", &["chest", "spine1", "spine2", "upperchest", "thorax", "torso"]),
    ("neck", &["neck", "neck1"]),
    ("head", &["head"]),
    ("shoulder", &["shoulder", "clavicle", "collar"]),
    ("upper_arm", &["arm", "upperarm", "humerus", "uparm"]),
    ("forearm", &["forearm", "lowerarm", "elbow"]),
    ("hand", &["hand", "wrist"]),
    ("thigh", &["upleg", "thigh", "upperleg", "femur"]),
    ("shin", &["leg", "shin", "lowerleg", "calf", "knee"]),
    ("foot", &["foot", "ankle"]),
    ("toe", &["toebase", "toe", "toes", "ball"]),
];

/// Reduce a bone name to `(side, canonical part)`, or `None` if the part is unknown.
pub fn canonical_name(name: &str) -> Option<(Side, &'static str)> {
    let bare = name.rsplit([':', '|']).next().unwrap_or(name);
    let lower = bare.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == ' ')
        .filter(|t| !t.is_empty())
        .collect();

    let mut side = Side::Center;
    let mut core: String = tokens.concat();
    if let Some(rest) = core.strip_prefix("left") {
        side = Side::Left;
        core = rest.to_string();
    } else if let Some(rest) = core.strip_prefix("right") {
        side = Side::Right;
        core = rest.to_string();
    } else if let Some(rest) = core.strip_suffix("left") {
        side = Side::Left;
        core = rest.to_string();
    } else if let Some(rest) = core.strip_suffix("right") {
        side = Side::Right;
        core = rest.to_string();
    } else if tokens.len() > 1 {
        let first = tokens[0];
        let last = tokens[tokens.len() - 1];
        let marker = |t: &str| match t {
            "l" => Some(Side::Left),
            "r" => Some(Side::Right),
            _ => None,
        };
        if let Some(s) = marker(first) {
            side = s;
            core = tokens[1..].concat();
        } else if let Some(s) = marker(last) {
            side = s;
            core = tokens[..tokens.len() - 1].concat();
        }
    }

    SYNONYMS
        .iter()
        .find(|(_, words)| words.contains(&core.as_str()))
        .map(|(canonical, _)| (side, *canonical))
}

/// Build a map by matching names. Unmatched bones are left out of the map.
pub fn auto_map(clip: &Clip, skeleton: &TargetSkeleton) -> SkeletonMap {
    let mut targets: HashMap<(Side, &'static str), usize> = HashMap::new();
    for (index, bone) in skeleton.bones().iter().enumerate() {
        if let Some(key) = canonical_name(&bone.name) {
            targets.entry(key).or_insert(index);
        }
    }

    let mut mappings = Vec::new();
    for joint in clip.joints() {
        let Some(key) = canonical_name(&joint.name) else {
            continue;
        };
        if let Some(target) = targets.remove(&key) {
            mappings.push(BoneMapping::new(joint.name.clone(), target));
        }
    }
    debug!(
        "auto-mapped {} of {} target bones from {} clip joints",
        mappings.len(),
        skeleton.bone_count(),
        clip.joint_count()
    );
    // Each target index was removed from `targets` when used, so targets are unique.
    SkeletonMap::new(mappings).unwrap_or_default()
}
