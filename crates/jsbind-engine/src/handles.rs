//! Handle registry
//!
//! Per-context table mapping opaque tokens to embedder capsules. The engine
//! never looks inside a capsule; it only stores it, hands it back by token,
//! and drops it when the owning context releases its handles.
//!
//! Tokens carry a generation so a token that outlived its slot resolves to
//! `None` instead of to whatever capsule reused the slot.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Opaque token for a registered capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    index: u32,
    generation: u32,
}

impl HandleId {
    /// Slot index (diagnostics only)
    pub fn index(&self) -> u32 {
        self.index
    }
}

struct Slot {
    generation: u32,
    value: Option<Rc<dyn Any>>,
}

/// Arena of embedder capsules owned by one `Context`.
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty registry with room for `capacity` handles
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store a capsule and return its token
    pub fn register(&mut self, value: Rc<dyn Any>) -> HandleId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.value = Some(value);
                return HandleId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        HandleId {
            index,
            generation: 0,
        }
    }

    /// Look up a capsule by token.
    ///
    /// The returned `Rc` keeps the capsule alive for the duration of a
    /// callback even if the caller goes on to mutate the context.
    pub fn get(&self, id: HandleId) -> Option<Rc<dyn Any>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.clone()
    }

    /// Drop every capsule. Returns how many were released.
    ///
    /// Every outstanding token becomes stale.
    pub fn release_all(&mut self) -> usize {
        let released = self.live;
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.value = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(u32::try_from(index).unwrap_or(u32::MAX));
        }
        self.live = 0;
        released
    }

    /// Number of live capsules
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no capsules are live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
