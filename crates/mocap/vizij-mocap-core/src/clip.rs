//! Joint hierarchy and motion buffer for a parsed mocap clip.
//!
//! Joints live in a flat arena in pre-order: every parent index is smaller than the
//! index of its children and joint 0 is the single root. Each frame in the motion
//! buffer is one contiguous row of `total_channels` floats; a joint's values start at
//! its `channel_offset` within that row.

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use hashbrown::HashMap;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{ClipError, LoadError, ParseError};
use crate::interp::Axis;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    #[inline]
    pub fn is_translation(self) -> bool {
        matches!(
            self,
            Channel::Xposition | Channel::Yposition | Channel::Zposition
        )
    }

    #[inline]
    pub fn is_rotation(self) -> bool {
        !self.is_translation()
    }

    #[inline]
    pub fn axis(self) -> Axis {
        match self {
            Channel::Xposition | Channel::Xrotation => Axis::X,
            Channel::Yposition | Channel::Yrotation => Axis::Y,
            Channel::Zposition | Channel::Zrotation => Axis::Z,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
        }
    }
}

impl FromStr for Channel {
    type Err = ();

    /// Channel names are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Xposition" => Ok(Channel::Xposition),
            "Yposition" => Ok(Channel::Yposition),
            "Zposition" => Ok(Channel::Zposition),
            "Xrotation" => Ok(Channel::Xrotation),
            "Yrotation" => Ok(Channel::Yrotation),
            "Zrotation" => Ok(Channel::Zrotation),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    /// Rest translation relative to the parent.
    pub offset: Vector3<f32>,
    /// Declaration order fixes both storage order and Euler composition order.
    pub channels: Vec<Channel>,
    /// Index of this joint's first value within a frame row.
    pub channel_offset: usize,
    /// Terminal `End Site` offset, if the joint declared one.
    pub end_site: Option<Vector3<f32>>,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, offset: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            offset,
            channels: Vec::new(),
            channel_offset: 0,
            end_site: None,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Position of `channel` within this joint's channel list.
    pub fn channel_index(&self, channel: Channel) -> Option<usize> {
        self.channels.iter().position(|c| *c == channel)
    }
}

/// An immutable, validated mocap clip. Share it between retargeters with `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    joints: Vec<Joint>,
    frame_count: usize,
    frame_time: f32,
    total_channels: usize,
    motion: Vec<f32>,
    name_to_index: HashMap<String, usize>,
}

impl Clip {
    /// Assemble a clip, checking every structural invariant.
    pub fn new(
        joints: Vec<Joint>,
        frame_count: usize,
        frame_time: f32,
        motion: Vec<f32>,
    ) -> Result<Self, ClipError> {
        if joints.is_empty() {
            return Err(ClipError::NoJoints);
        }
        if frame_count == 0 {
            return Err(ClipError::EmptyMotion);
        }
        if !(frame_time.is_finite() && frame_time > 0.0) {
            return Err(ClipError::InvalidFrameTime { value: frame_time });
        }

        let roots = joints.iter().filter(|j| j.parent.is_none()).count();
        if roots != 1 || joints[0].parent.is_some() {
            return Err(ClipError::RootCount { count: roots });
        }

        let mut name_to_index = HashMap::with_capacity(joints.len());
        let mut expected_offset = 0usize;
        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= index {
                    return Err(ClipError::ParentOrder {
                        index,
                        name: joint.name.clone(),
                        parent,
                    });
                }
            }
            if joint.channel_offset != expected_offset {
                return Err(ClipError::ChannelOffset {
                    name: joint.name.clone(),
                    expected: expected_offset,
                    found: joint.channel_offset,
                });
            }
            expected_offset += joint.channels.len();
            if name_to_index.insert(joint.name.clone(), index).is_some() {
                return Err(ClipError::DuplicateJoint {
                    name: joint.name.clone(),
                });
            }
        }

        let total_channels = expected_offset;
        let expected_len = frame_count.checked_mul(total_channels).ok_or(
            ClipError::MotionTooLarge {
                frame_count,
                total_channels,
            },
        )?;
        if motion.len() != expected_len {
            return Err(ClipError::BufferLength {
                expected: expected_len,
                found: motion.len(),
            });
        }

        Ok(Self {
            joints,
            frame_count,
            frame_time,
            total_channels,
            motion,
            name_to_index,
        })
    }

    /// Parse BVH text.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        crate::bvh::parse_bvh(src)
    }

    /// Read and parse a BVH file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    #[inline]
    pub fn total_channels(&self) -> usize {
        self.total_channels
    }

    #[inline]
    pub fn motion(&self) -> &[f32] {
        &self.motion
    }

    /// `frame_count * frame_time`: each frame owns one frame-time slot.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 * self.frame_time
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        1.0 / self.frame_time
    }

    /// Channel values for one frame; `frame` is clamped to the last frame.
    pub fn frame_values(&self, frame: usize) -> &[f32] {
        let frame = frame.min(self.frame_count - 1);
        let start = frame * self.total_channels;
        &self.motion[start..start + self.total_channels]
    }

    /// Direct children of `index`, in pre-order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.joints
            .iter()
            .enumerate()
            .filter(move |(_, j)| j.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Depth of a joint; the root is at depth 0.
    pub fn depth(&self, mut index: usize) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.joints.get(index).and_then(|j| j.parent) {
            depth += 1;
            index = parent;
        }
        depth
    }

    /// Indented, human-readable dump of the hierarchy.
    pub fn describe_hierarchy(&self) -> String {
        let mut out = String::new();
        for (index, joint) in self.joints.iter().enumerate() {
            let indent = "  ".repeat(self.depth(index));
            let channels: Vec<&str> = joint.channels.iter().map(|c| c.as_str()).collect();
            let _ = writeln!(
                out,
                "{indent}{} [{}] offset=({:.3}, {:.3}, {:.3})",
                joint.name,
                channels.join(" "),
                joint.offset.x,
                joint.offset.y,
                joint.offset.z
            );
        }
        out
    }
}
