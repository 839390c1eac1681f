//! One-dimensional blend tree: motion sources placed along a parameter axis.

use super::state::{MotionSource, Parameters};
use crate::blend::blend_transforms;
use crate::pose::Pose;

#[derive(Clone, Debug)]
pub struct BlendEntry {
    pub source: MotionSource,
    pub threshold: f32,
}

/// All entries are sampled at the same local time; the two bracketing the parameter
/// value are blended by its position between their thresholds.
#[derive(Clone, Debug)]
pub struct BlendTree1D {
    parameter: String,
    entries: Vec<BlendEntry>,
}

impl BlendTree1D {
    pub fn new(parameter: impl Into<String>, entries: Vec<(MotionSource, f32)>) -> Self {
        let mut entries: Vec<BlendEntry> = entries
            .into_iter()
            .map(|(source, threshold)| BlendEntry { source, threshold })
            .collect();
        entries.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self {
            parameter: parameter.into(),
            entries,
        }
    }

    #[inline]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    #[inline]
    pub fn entries(&self) -> &[BlendEntry] {
        &self.entries
    }

    /// `(lower, upper, t)` for `value`; clamps to the end entries outside the range.
    pub fn bracket(&self, value: f32) -> Option<(usize, usize, f32)> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        let first = self.entries[0].threshold;
        let last = self.entries[n - 1].threshold;
        if value.is_nan() || value <= first {
            return Some((0, 0, 0.0));
        }
        if value >= last {
            return Some((n - 1, n - 1, 0.0));
        }
        let hi = self.entries.partition_point(|e| e.threshold <= value);
        let lo = hi - 1;
        let span = self.entries[hi].threshold - self.entries[lo].threshold;
        Some((lo, hi, (value - self.entries[lo].threshold) / span))
    }

    /// Longest entry duration.
    pub fn duration(&self) -> Option<f32> {
        self.entries
            .iter()
            .filter_map(|e| e.source.duration())
            .reduce(f32::max)
    }

    /// Bone count of the first entry that reports one. The controller builder checks
    /// that every entry agrees.
    pub fn bone_count(&self) -> Option<usize> {
        self.entries.iter().find_map(|e| e.source.bone_count())
    }

    /// Sample into `out`. An empty tree leaves `out` untouched.
    pub fn sample(&self, time: f32, params: &Parameters, out: &mut Pose, aux: &mut Pose) {
        let value = params.get(&self.parameter).copied().unwrap_or(0.0);
        let Some((lo, hi, t)) = self.bracket(value) else {
            return;
        };
        sample_entry(&self.entries[lo].source, time, params, out);
        if lo == hi {
            return;
        }
        sample_entry(&self.entries[hi].source, time, params, aux);
        for (dst, src) in out.iter_mut().zip(aux.iter()) {
            *dst = blend_transforms(dst, src, t);
        }
    }
}

fn sample_entry(source: &MotionSource, time: f32, params: &Parameters, out: &mut Pose) {
    // Nested trees need their own scratch.
    let mut aux = Pose::default();
    source.sample(time, params, out, &mut aux);
}
