use std::collections::HashMap;
use std::sync::RwLock;

use sluice_core::id::ObjectId;

/// Last known tip per `(project, ref)`, only advanced by fast-forward.
///
/// An update whose old id does not match the cached tip means the cache has
/// missed a change; the entry is dropped rather than guessed.
#[derive(Debug, Default)]
pub struct TipCache {
    entries: RwLock<HashMap<(String, String), ObjectId>>,
}

impl TipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project: &str, ref_name: &str) -> Option<ObjectId> {
        self.entries
            .read()
            .ok()?
            .get(&(project.to_string(), ref_name.to_string()))
            .copied()
    }

    pub fn record(&self, project: &str, ref_name: &str, tip: ObjectId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((project.to_string(), ref_name.to_string()), tip);
        }
    }

    /// Returns true when the cached tip moved from `old` to `new`.
    pub fn update_fast_forward(
        &self,
        project: &str,
        ref_name: &str,
        old: ObjectId,
        new: ObjectId,
    ) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        let key = (project.to_string(), ref_name.to_string());
        match entries.get(&key).copied() {
            Some(cached) if cached == old => {
                entries.insert(key, new);
                true
            }
            Some(_) => {
                tracing::debug!(project, ref_name, "tip cache out of date, evicting");
                entries.remove(&key);
                false
            }
            // Creation of a ref the cache never saw.
            None if old.is_zero() => {
                entries.insert(key, new);
                true
            }
            None => false,
        }
    }
}
