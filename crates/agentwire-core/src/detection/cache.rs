//! Memoized detection results.

use std::collections::HashMap;

use crate::platform::Platform;

/// Detection results keyed by `(agent name, platform)`.
///
/// Owned by the caller and passed into detection sweeps; nothing is cached
/// globally.
#[derive(Debug, Default, Clone)]
pub struct DetectionCache {
    entries: HashMap<(String, Platform), bool>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent: &str, platform: Platform) -> Option<bool> {
        self.entries.get(&(agent.to_string(), platform)).copied()
    }

    /// Return the cached result or compute and remember it.
    pub fn get_or_detect(
        &mut self,
        agent: &str,
        platform: Platform,
        detect: impl FnOnce() -> bool,
    ) -> bool {
        *self
            .entries
            .entry((agent.to_string(), platform))
            .or_insert_with(detect)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
