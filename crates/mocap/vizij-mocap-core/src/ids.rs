//! Dense identifiers for controller states and layers.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl LayerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic allocator; ids double as indices into the owning controller's vectors.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_state: u32,
    next_layer: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_state(&mut self) -> StateId {
        let id = StateId(self.next_state);
        self.next_state = self.next_state.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_layer(&mut self) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer = self.next_layer.wrapping_add(1);
        id
    }
}
