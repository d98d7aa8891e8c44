use std::collections::HashSet;

use crate::scm::ChangeEvent;

/// What changed between two consecutive change lists of one SCM root.
#[derive(Debug, Clone, Default)]
pub struct ChangeDelta {
    /// New paths, and known paths whose status changed.
    pub reported: Vec<ChangeEvent>,
    /// Paths no longer reported, with the status they had.
    pub cleared: Vec<ChangeEvent>,
}

impl ChangeDelta {
    /// Set difference on `(root, path)`, plus paths present in both lists whose status changed.
    pub fn between(previous: &HashSet<ChangeEvent>, current: &HashSet<ChangeEvent>) -> Self {
        let mut reported: Vec<ChangeEvent> = current
            .iter()
            .filter(|event| {
                previous
                    .get(*event)
                    .is_none_or(|known| known.status() != event.status())
            })
            .cloned()
            .collect();
        let mut cleared: Vec<ChangeEvent> = previous.difference(current).cloned().collect();

        reported.sort_by(|a, b| a.path().cmp(b.path()));
        cleared.sort_by(|a, b| a.path().cmp(b.path()));
        Self { reported, cleared }
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty() && self.cleared.is_empty()
    }
}
