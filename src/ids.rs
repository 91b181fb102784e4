//! Task identifier allocation.
//!
//! Identifiers are opaque to the compiler; only names are compared across
//! compilations. [`RandomIds`] gives fresh ids on every run, [`HashedIds`]
//! derives them from a seed so the same input always serializes identically.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use crate::graph::TaskId;

pub trait IdAllocator {
    fn allocate(&mut self, name: &str) -> TaskId;
}

/// Random v4 UUIDs, url-safe base64 without padding (22 characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdAllocator for RandomIds {
    fn allocate(&mut self, _: &str) -> TaskId {
        TaskId::new(URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes()))
    }
}

/// Ids derived from a seed and the task name with BLAKE3.
#[derive(Debug, Clone)]
pub struct HashedIds {
    seed: String,
}

impl HashedIds {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }
}

impl IdAllocator for HashedIds {
    fn allocate(&mut self, name: &str) -> TaskId {
        let hash = blake3::Hasher::new()
            .update(self.seed.as_bytes())
            .update(&[0])
            .update(name.as_bytes())
            .finalize();

        TaskId::new(URL_SAFE_NO_PAD.encode(&hash.as_bytes()[..16]))
    }
}
