//! Base controller plus masked overlay layers (e.g. upper-body actions over locomotion).

use super::machine::AnimController;
use crate::blend::{apply_layer, BoneMask};
use crate::error::ControllerError;
use crate::ids::{IdAllocator, LayerId};
use crate::inputs::Inputs;
use crate::outputs::ControllerEvent;
use crate::pose::Pose;

#[derive(Debug)]
pub struct AnimLayer {
    pub id: LayerId,
    pub name: String,
    pub mask: BoneMask,
    weight: f32,
    pub controller: AnimController,
}

impl AnimLayer {
    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }
}

#[derive(Debug)]
pub struct LayeredController {
    base: AnimController,
    layers: Vec<AnimLayer>,
    ids: IdAllocator,
    pose: Pose,
    events: Vec<ControllerEvent>,
}

impl LayeredController {
    pub fn new(base: AnimController) -> Self {
        let pose = Pose::identity(base.bone_count());
        Self {
            base,
            layers: Vec::new(),
            ids: IdAllocator::new(),
            pose,
            events: Vec::new(),
        }
    }

    /// Add a layer on top of the existing ones. Layers are composited in insertion order.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        controller: AnimController,
        mask: BoneMask,
        weight: f32,
    ) -> Result<LayerId, ControllerError> {
        let name = name.into();
        if self.layers.iter().any(|l| l.name == name) {
            return Err(ControllerError::DuplicateLayer { name });
        }
        if controller.bone_count() != self.base.bone_count() {
            return Err(ControllerError::BoneCountMismatch {
                state: name,
                expected: self.base.bone_count(),
                found: controller.bone_count(),
            });
        }
        let id = self.ids.alloc_layer();
        self.layers.push(AnimLayer {
            id,
            name,
            mask,
            weight: clamp_weight(weight),
            controller,
        });
        Ok(id)
    }

    /// Weight is clamped to [0, 1].
    pub fn set_layer_weight(&mut self, name: &str, weight: f32) -> Result<(), ControllerError> {
        let layer = self.layer_mut(name)?;
        layer.weight = clamp_weight(weight);
        Ok(())
    }

    pub fn layer_weight(&self, name: &str) -> Option<f32> {
        self.layers.iter().find(|l| l.name == name).map(|l| l.weight)
    }

    pub fn layer_mut(&mut self, name: &str) -> Result<&mut AnimLayer, ControllerError> {
        self.layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| ControllerError::UnknownLayer {
                name: name.to_string(),
            })
    }

    #[inline]
    pub fn base(&self) -> &AnimController {
        &self.base
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut AnimController {
        &mut self.base
    }

    #[inline]
    pub fn layers(&self) -> &[AnimLayer] {
        &self.layers
    }

    /// Events from the base and every active layer during the last update.
    #[inline]
    pub fn events(&self) -> &[ControllerEvent] {
        &self.events
    }

    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Tick the base and every layer with non-zero weight, then composite. Layers at
    /// weight 0 are neither advanced nor sampled.
    pub fn update(&mut self, dt: f32, inputs: &Inputs) -> &Pose {
        self.events.clear();
        let base = self.base.update(dt, inputs);
        self.pose.copy_from(&base.pose);
        self.events.extend_from_slice(&base.events);
        for layer in &mut self.layers {
            if layer.weight == 0.0 {
                continue;
            }
            let out = layer.controller.update(dt, inputs);
            apply_layer(&mut self.pose, &out.pose, &layer.mask, layer.weight);
            self.events.extend_from_slice(&out.events);
        }
        &self.pose
    }
}

fn clamp_weight(weight: f32) -> f32 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
