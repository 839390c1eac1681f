//! A skeleton map bound once to a shared clip.

use std::sync::Arc;

use log::warn;

use super::skeleton_map::{write_resolved, ResolvedMapping, RetargetSettings, SkeletonMap};
use crate::clip::Clip;
use crate::error::RetargetError;
use crate::pose::Pose;

/// Immutable after construction; share across controllers with `Arc`.
///
/// Joint lookups happen in [`Retargeter::new`], so [`Retargeter::sample_into`] has no
/// failure paths and performs no allocation.
#[derive(Clone, Debug)]
pub struct Retargeter {
    map: Arc<SkeletonMap>,
    clip: Arc<Clip>,
    defaults: Pose,
    settings: RetargetSettings,
    resolved: Vec<ResolvedMapping>,
}

impl Retargeter {
    /// Bind `map` to `clip`. Skipped mappings are logged and returned; their bones keep
    /// the transform from `defaults`, whose length fixes the output bone count.
    pub fn new(
        map: Arc<SkeletonMap>,
        clip: Arc<Clip>,
        defaults: Pose,
        settings: RetargetSettings,
    ) -> (Self, Vec<RetargetError>) {
        let (resolved, diagnostics) = map.resolve(&clip, defaults.len());
        for d in &diagnostics {
            warn!("retarget mapping skipped: {d}");
        }
        (
            Self {
                map,
                clip,
                defaults,
                settings,
                resolved,
            },
            diagnostics,
        )
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.defaults.len()
    }

    #[inline]
    pub fn clip(&self) -> &Arc<Clip> {
        &self.clip
    }

    #[inline]
    pub fn map(&self) -> &Arc<SkeletonMap> {
        &self.map
    }

    #[inline]
    pub fn settings(&self) -> &RetargetSettings {
        &self.settings
    }

    #[inline]
    pub fn defaults(&self) -> &Pose {
        &self.defaults
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.clip.duration()
    }

    /// Number of mappings that will be written each sample.
    #[inline]
    pub fn active_mappings(&self) -> usize {
        self.resolved.len()
    }

    /// Retarget the clip at `time` into `out`, which is reset to the defaults first.
    pub fn sample_into(&self, time: f32, out: &mut Pose) {
        out.copy_from(&self.defaults);
        write_resolved(&self.resolved, &self.clip, time, &self.settings, out);
    }

    pub fn sample(&self, time: f32) -> Pose {
        let mut out = Pose::default();
        self.sample_into(time, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retarget::skeleton_map::BoneMapping;

    const SRC: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 3 Xposition Yposition Zposition
}
MOTION
Frames: 2
Frame Time: 1
0 10 0
0 20 0
";

    #[test]
    fn bound_sampling_matches_one_shot_apply() {
        let clip = Arc::new(Clip::parse(SRC).unwrap());
        let map = Arc::new(
            SkeletonMap::new(vec![
                BoneMapping::new("Hips", 0).with_scale(0.5),
                BoneMapping::new("Tail", 1),
            ])
            .unwrap(),
        );
        let defaults = Pose::identity(2);
        let settings = RetargetSettings::with_unit_scale(0.1);
        let (rt, diagnostics) =
            Retargeter::new(map.clone(), clip.clone(), defaults.clone(), settings);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(rt.active_mappings(), 1);

        let bound = rt.sample(0.5);
        let once = map.apply(&clip, 0.5, &defaults, &settings);
        assert_eq!(bound, once.pose);
        approx::assert_relative_eq!(bound[0].translation.y, 0.75, epsilon = 1e-6);
        assert_eq!(bound[1], defaults[1]);
    }
}
