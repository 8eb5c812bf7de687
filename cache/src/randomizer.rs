// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Secondary index over randomizer-class cache entries: block size to the
/// set of candidate addresses, ordered by descending use count with ties
/// broken by address order for determinism.
///
/// Membership tracks the primary cache exactly; both structures mutate
/// under the cache's critical section only.
#[derive(Debug, Default)]
pub(crate) struct RandomizerIndex {
    by_size: BTreeMap<u32, BTreeSet<(Reverse<u64>, Cid)>>,
}

impl RandomizerIndex {
    pub fn insert(&mut self, size: u32, use_count: u64, cid: Cid) {
        self.by_size
            .entry(size)
            .or_default()
            .insert((Reverse(use_count), cid));
    }

    pub fn remove(&mut self, size: u32, use_count: u64, cid: &Cid) {
        if let Some(set) = self.by_size.get_mut(&size) {
            set.remove(&(Reverse(use_count), *cid));
            if set.is_empty() {
                self.by_size.remove(&size);
            }
        }
    }

    /// Re-ranks one address after its use count changed.
    pub fn bump(&mut self, size: u32, old_use_count: u64, new_use_count: u64, cid: &Cid) {
        if let Some(set) = self.by_size.get_mut(&size) {
            if set.remove(&(Reverse(old_use_count), *cid)) {
                set.insert((Reverse(new_use_count), *cid));
            }
        }
    }

    /// The `want` most popular candidates of exactly `size` bytes.
    pub fn best(&self, size: u32, want: usize) -> Vec<Cid> {
        self.by_size
            .get(&size)
            .map(|set| set.iter().take(want).map(|(_, cid)| *cid).collect())
            .unwrap_or_default()
    }

    pub fn candidates(&self, size: u32) -> usize {
        self.by_size.get(&size).map(BTreeSet::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilfs_encoding::cid_from_raw;

    #[test]
    fn best_prefers_higher_use_counts() {
        let mut index = RandomizerIndex::default();
        let a = cid_from_raw(b"a");
        let b = cid_from_raw(b"b");
        let c = cid_from_raw(b"c");
        index.insert(16, 1, a);
        index.insert(16, 5, b);
        index.insert(16, 3, c);

        assert_eq!(index.best(16, 2), vec![b, c]);
        assert_eq!(index.best(32, 2), Vec::<Cid>::new());
    }

    #[test]
    fn ties_break_by_address_order() {
        let mut index = RandomizerIndex::default();
        let mut cids = vec![cid_from_raw(b"x"), cid_from_raw(b"y")];
        for cid in &cids {
            index.insert(16, 2, *cid);
        }
        cids.sort();
        assert_eq!(index.best(16, 2), cids);
    }

    #[test]
    fn bump_rerank_moves_candidate_forward() {
        let mut index = RandomizerIndex::default();
        let a = cid_from_raw(b"a");
        let b = cid_from_raw(b"b");
        index.insert(16, 2, a);
        index.insert(16, 3, b);
        index.bump(16, 2, 9, &a);
        assert_eq!(index.best(16, 1), vec![a]);
    }

    #[test]
    fn remove_clears_empty_size_classes() {
        let mut index = RandomizerIndex::default();
        let a = cid_from_raw(b"a");
        index.insert(16, 1, a);
        index.remove(16, 1, &a);
        assert_eq!(index.candidates(16), 0);
    }
}
