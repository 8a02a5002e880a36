use std::collections::HashMap;
use std::hash::Hash;

/// Session-stable identifier handed to the host for a tracked feature.
pub type StableId = u64;

const FIRST_ID: StableId = 1;

/// Maps ephemeral native keys to stable identifiers.
///
/// The counter belongs to the registry, so two sessions never share an id
/// sequence. Keys must be forgotten once the native object they name is
/// released, otherwise a recycled key would inherit a stale identity.
#[derive(Debug, Clone)]
pub struct IdentityRegistry<K> {
    entries: HashMap<K, StableId>,
    next_id: StableId,
}

impl<K> Default for IdentityRegistry<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: FIRST_ID,
        }
    }
}

impl<K: Copy + Eq + Hash> IdentityRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `key` and whether it was assigned by this call.
    pub fn resolve(&mut self, key: K) -> (StableId, bool) {
        if let Some(id) = self.entries.get(&key) {
            return (*id, false);
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.insert(key, id);
        (id, true)
    }

    pub fn get(&self, key: K) -> Option<StableId> {
        self.entries.get(&key).copied()
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn forget(&mut self, key: K) -> Option<StableId> {
        self.entries.remove(&key)
    }

    /// Entries ordered by id, i.e. by first sighting.
    pub fn snapshot(&self) -> Vec<(K, StableId)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, id)| (*k, *id)).collect();
        entries.sort_by_key(|(_, id)| *id);
        entries
    }

    /// Removes every entry, returning them ordered by id. The counter keeps
    /// running so ids are never reissued within the registry's lifetime.
    pub fn drain(&mut self) -> Vec<(K, StableId)> {
        let entries = self.snapshot();
        self.entries.clear();
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_stable_across_calls() {
        let mut registry = IdentityRegistry::new();
        let (a, new_a) = registry.resolve(0xA0_u64);
        let (b, new_b) = registry.resolve(0xB0_u64);
        let (a_again, new_again) = registry.resolve(0xA0_u64);

        assert_eq!((a, new_a), (1, true));
        assert_eq!((b, new_b), (2, true));
        assert_eq!((a_again, new_again), (1, false));
    }

    #[test]
    fn forgotten_key_gets_a_fresh_id() {
        let mut registry = IdentityRegistry::new();
        let (first, _) = registry.resolve(7_i32);
        assert_eq!(registry.forget(7), Some(first));
        assert_eq!(registry.forget(7), None);

        let (second, is_new) = registry.resolve(7);
        assert!(is_new);
        assert_ne!(first, second);
    }

    #[test]
    fn registries_do_not_share_counters() {
        let mut planes = IdentityRegistry::new();
        let mut images = IdentityRegistry::new();
        planes.resolve(1_u64);
        planes.resolve(2_u64);
        assert_eq!(images.resolve(1_u64).0, 1);
    }

    #[test]
    fn drain_keeps_the_counter_running() {
        let mut registry = IdentityRegistry::new();
        registry.resolve(3_u64);
        registry.resolve(1_u64);
        let drained = registry.drain();

        assert_eq!(drained, vec![(3, 1), (1, 2)]);
        assert!(registry.is_empty());
        assert_eq!(registry.resolve(3).0, 3);
    }
}
