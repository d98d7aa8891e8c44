use std::sync::atomic::{AtomicBool, Ordering};

/// Flags the tree updater raises for the render timer.
#[derive(Debug, Default)]
pub struct UpdaterStatus {
    ready: AtomicBool,
    dirty: AtomicBool,
}

impl UpdaterStatus {
    /// Set once the initial tree has been built.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns the dirty flag and resets it.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}
