use std::collections::HashMap;

use sluice_core::id::ObjectId;

/// Cursor over a branch tip shared by every change in one batch.
///
/// Strategies advance it as they integrate commits and record which commit
/// each integrated commit ended up as.
#[derive(Debug, Clone, Default)]
pub struct MergeTip {
    initial: Option<ObjectId>,
    current: Option<ObjectId>,
    merge_results: HashMap<ObjectId, ObjectId>,
}

impl MergeTip {
    pub fn new(initial: Option<ObjectId>) -> Self {
        Self {
            initial,
            current: initial,
            merge_results: HashMap::new(),
        }
    }

    pub fn initial_tip(&self) -> Option<ObjectId> {
        self.initial
    }

    pub fn current_tip(&self) -> Option<ObjectId> {
        self.current
    }

    /// Advance to `tip`, recording it as the merge result of `to_merge`.
    pub fn move_tip_to(&mut self, tip: ObjectId, to_merge: ObjectId) {
        self.current = Some(tip);
        self.merge_results.insert(to_merge, tip);
    }

    /// Record a result without moving the tip.
    pub fn record_result(&mut self, to_merge: ObjectId, result: ObjectId) {
        self.merge_results.insert(to_merge, result);
    }

    pub fn merge_result(&self, to_merge: &ObjectId) -> Option<ObjectId> {
        self.merge_results.get(to_merge).copied()
    }
}
