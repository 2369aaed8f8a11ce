//! Three-tier scoped override map

use crate::scope::ScopeTier;
use std::collections::BTreeMap;

/// Entries declared at account, OU and root scope
///
/// Invariants: account entries win over OU entries, which win over root entries;
/// within a tier the most recently inserted entry for a key wins.
#[derive(Debug, Clone)]
pub struct ScopedOverride<K, V> {
    root: Vec<(K, V)>,
    organizational_unit: Vec<(K, V)>,
    account: Vec<(K, V)>,
}

impl<K, V> Default for ScopedOverride<K, V> {
    fn default() -> Self {
        Self {
            root: Vec::new(),
            organizational_unit: Vec::new(),
            account: Vec::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> ScopedOverride<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tier: ScopeTier, key: K, value: V) {
        self.tier_mut(tier).push((key, value));
    }

    /// Nearest value for `key` together with the tier it came from
    pub fn get(&self, key: &K) -> Option<(&V, ScopeTier)> {
        [ScopeTier::Account, ScopeTier::OrganizationalUnit, ScopeTier::Root]
            .into_iter()
            .find_map(|tier| {
                self.tier(tier)
                    .iter()
                    .rev()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| (v, tier))
            })
    }

    /// Every key resolved to its nearest value
    pub fn merged(&self) -> BTreeMap<K, (V, ScopeTier)> {
        let mut merged = BTreeMap::new();
        for tier in [ScopeTier::Root, ScopeTier::OrganizationalUnit, ScopeTier::Account] {
            for (key, value) in self.tier(tier) {
                merged.insert(key.clone(), (value.clone(), tier));
            }
        }
        merged
    }

    /// Nearest tier holding at least one entry
    pub fn nearest_tier(&self) -> Option<ScopeTier> {
        [ScopeTier::Account, ScopeTier::OrganizationalUnit, ScopeTier::Root]
            .into_iter()
            .find(|tier| !self.tier(*tier).is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.organizational_unit.is_empty() && self.account.is_empty()
    }

    fn tier(&self, tier: ScopeTier) -> &[(K, V)] {
        match tier {
            ScopeTier::Root => &self.root,
            ScopeTier::OrganizationalUnit => &self.organizational_unit,
            ScopeTier::Account => &self.account,
        }
    }

    fn tier_mut(&mut self, tier: ScopeTier) -> &mut Vec<(K, V)> {
        match tier {
            ScopeTier::Root => &mut self.root,
            ScopeTier::OrganizationalUnit => &mut self.organizational_unit,
            ScopeTier::Account => &mut self.account,
        }
    }
}
