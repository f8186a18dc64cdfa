//! Keyed in-flight registry
//!
//! Tracks which content identifiers are currently being processed so a
//! concurrent duplicate announcement can be turned away.

use dashmap::DashSet;
use std::sync::Arc;

use crate::domain::ContentId;

/// Set of content identifiers with a running execution.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<DashSet<ContentId>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `cid`. Returns `None` if another execution holds it.
    ///
    /// The claim is released when the guard drops.
    pub fn try_acquire(&self, cid: &ContentId) -> Option<InFlightGuard> {
        self.active.insert(cid.clone()).then(|| InFlightGuard {
            active: Arc::clone(&self.active),
            cid: cid.clone(),
        })
    }

    pub fn contains(&self, cid: &ContentId) -> bool {
        self.active.contains(cid)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Releases a claimed content identifier on drop.
pub struct InFlightGuard {
    active: Arc<DashSet<ContentId>>,
    cid: ContentId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.cid);
    }
}
