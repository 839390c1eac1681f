//! Reusable pose buffers so the tick path does not allocate after warm-up.

use crate::config::Config;
use crate::pose::Pose;

#[derive(Debug, Default)]
pub struct Scratch {
    /// Sample of the outgoing (or only) state.
    pub from: Pose,
    /// Sample of the incoming state during a blend.
    pub to: Pose,
    /// Extra buffer for blend-tree entries.
    pub aux: Pose,
}

impl Scratch {
    pub fn new(cfg: &Config) -> Self {
        let mk = || Pose(Vec::with_capacity(cfg.scratch_bones));
        Self {
            from: mk(),
            to: mk(),
            aux: mk(),
        }
    }
}
