//! Identity tracker
//!
//! One conversion pass (a top-level `from_engine_value` call and all of its
//! recursive sub-conversions) shares one tracker. Containers are recorded
//! before their contents are converted, so a graph that refers back to
//! itself resolves to the host container already being built.

use jsbind_engine::ObjectId;
use jsbind_sdk::HostValue;
use rustc_hash::FxHashMap;

/// Engine object identity → host value produced for it in this pass
#[derive(Debug, Default)]
pub struct IdentityTracker {
    converted: FxHashMap<ObjectId, HostValue>,
}

impl IdentityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Host value already produced for `id`
    pub fn get(&self, id: ObjectId) -> Option<HostValue> {
        self.converted.get(&id).cloned()
    }

    /// Record the host value produced for `id`
    pub fn insert(&mut self, id: ObjectId, value: HostValue) {
        self.converted.insert(id, value);
    }

    /// Number of objects converted so far
    pub fn len(&self) -> usize {
        self.converted.len()
    }

    /// Check if nothing has been converted yet
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty()
    }
}
