//! Error types for mocap loading, mapping and controller construction.

use std::path::PathBuf;

/// Fatal error raised while reading BVH text. No partial clip is ever returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("line {line}, offset {offset}: {kind}")]
pub struct ParseError {
    /// 1-based line of the offending token (or of end of input).
    pub line: usize,
    /// Byte offset of the offending token from the start of the text.
    pub offset: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, offset: usize, kind: ParseErrorKind) -> Self {
        Self { line, offset, kind }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("invalid number '{token}'")]
    InvalidNumber { token: String },

    #[error("unknown channel '{name}'")]
    UnknownChannel { name: String },

    #[error("CHANNELS for joint '{joint}' declared after a child joint")]
    ChannelsAfterChild { joint: String },

    #[error("duplicate {keyword} in joint '{joint}'")]
    DuplicateKeyword { joint: String, keyword: String },

    #[error("duplicate joint name '{name}'")]
    DuplicateJoint { name: String },

    #[error("motion row {row} has {found} values, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("declared {declared} frames but found {found}")]
    FrameCountMismatch { declared: usize, found: usize },

    #[error("frame count must be at least 1")]
    EmptyMotion,

    #[error("frame time must be finite and positive, got {value}")]
    InvalidFrameTime { value: f32 },

    #[error("clip rejected: {0}")]
    Invalid(#[from] ClipError),
}

/// Structural violations detected when assembling a [`crate::clip::Clip`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ClipError {
    #[error("clip has no joints")]
    NoJoints,

    #[error("joint {index} ('{name}') has parent {parent}, which does not precede it")]
    ParentOrder {
        index: usize,
        name: String,
        parent: usize,
    },

    #[error("expected exactly one root joint, found {count}")]
    RootCount { count: usize },

    #[error("joint '{name}' channel offset {found} does not continue the channel layout (expected {expected})")]
    ChannelOffset {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("motion buffer holds {found} values, expected {expected}")]
    BufferLength { expected: usize, found: usize },

    #[error("{frame_count} frames of {total_channels} channels do not fit in memory")]
    MotionTooLarge {
        frame_count: usize,
        total_channels: usize,
    },

    #[error("duplicate joint name '{name}'")]
    DuplicateJoint { name: String },

    #[error("frame count must be at least 1")]
    EmptyMotion,

    #[error("frame time must be finite and positive, got {value}")]
    InvalidFrameTime { value: f32 },
}

/// Failure to load a clip from disk.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Invalid skeleton map construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MapError {
    #[error("target bone {target} is mapped by both '{first}' and '{second}'")]
    DuplicateTarget {
        target: usize,
        first: String,
        second: String,
    },

    #[error("unknown target bone '{name}'")]
    UnknownTargetBone { name: String },

    #[error("invalid skeleton map JSON: {reason}")]
    Json { reason: String },
}

/// Invalid target skeleton description.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SkeletonError {
    #[error("skeleton has no bones")]
    Empty,

    #[error("bone {index} ('{name}') has parent {parent}, which does not precede it")]
    ParentOrder {
        index: usize,
        name: String,
        parent: usize,
    },

    #[error("duplicate bone name '{name}'")]
    DuplicateBone { name: String },

    #[error("unknown parent bone '{parent}' for '{name}'")]
    UnknownParent { name: String, parent: String },

    #[error("unknown bone '{name}'")]
    UnknownBone { name: String },

    #[error("bones {root}, {mid}, {end} do not form a parent-child chain")]
    NotAChain { root: usize, mid: usize, end: usize },

    #[error("invalid skeleton JSON: {reason}")]
    Json { reason: String },
}

/// Non-fatal retarget diagnostic. The affected mapping is skipped and the target bone
/// keeps its default transform.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetargetError {
    #[error("source joint '{source_joint}' for target bone {target} not found in clip")]
    MissingSourceJoint { source_joint: String, target: usize },

    #[error("target bone {target} out of range for {bone_count} bones")]
    TargetOutOfRange { target: usize, bone_count: usize },
}

/// Controller construction or runtime state errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("unknown state '{name}'")]
    UnknownState { name: String },

    #[error("initial state '{name}' is not registered")]
    UnknownInitialState { name: String },

    #[error("duplicate state '{name}'")]
    DuplicateState { name: String },

    #[error("transition {from} -> {to} has invalid blend duration {duration}")]
    InvalidBlendDuration {
        from: String,
        to: String,
        duration: f32,
    },

    #[error("state '{state}' produces {found} bones, controller expects {expected}")]
    BoneCountMismatch {
        state: String,
        expected: usize,
        found: usize,
    },

    #[error("state '{state}' uses a blend tree with no entries")]
    EmptyBlendTree { state: String },

    #[error("unknown layer '{name}'")]
    UnknownLayer { name: String },

    #[error("duplicate layer '{name}'")]
    DuplicateLayer { name: String },
}
