//! A consumer's local copy of the battle and its merge cursor.

use std::collections::{BTreeMap, VecDeque};

use skirmish_core::{BattleSnapshot, Delta};
use skirmish_world::{collapse, query, Battle};

use crate::config::SyncConfig;

/// Local battle copy kept in step with the authority's log.
///
/// Deltas may arrive in any order and more than once. Each is parked at its
/// log index and the battle only advances while the slot at its head is
/// filled, so holes are never skipped and duplicates never apply twice.
#[derive(Clone, Debug)]
pub struct Replica {
    battle: Battle,
    pending: BTreeMap<u32, Delta>,
    latest_known: u32,
    playback: VecDeque<Delta>,
    playback_capacity: usize,
}

impl Default for Replica {
    fn default() -> Self {
        Self::new()
    }
}

impl Replica {
    /// Replica that has not applied any delta yet.
    #[must_use]
    pub fn new() -> Self {
        Self::with_playback_capacity(SyncConfig::default().max_playback)
    }

    /// Empty replica whose playback queue keeps at most `capacity` deltas.
    #[must_use]
    pub fn with_playback_capacity(capacity: usize) -> Self {
        Self {
            battle: Battle::new(),
            pending: BTreeMap::new(),
            latest_known: 0,
            playback: VecDeque::new(),
            playback_capacity: capacity,
        }
    }

    /// Local battle state.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Index of the next delta to apply.
    #[must_use]
    pub fn head(&self) -> u32 {
        query::delta_head(&self.battle)
    }

    /// Largest log length this replica has heard of.
    #[must_use]
    pub const fn latest_known(&self) -> u32 {
        self.latest_known
    }

    /// Number of known deltas not applied yet.
    #[must_use]
    pub fn lag(&self) -> u32 {
        self.latest_known.saturating_sub(self.head())
    }

    /// Reports whether the lag exceeds `threshold`.
    #[must_use]
    pub fn needs_fast_forward(&self, threshold: u32) -> bool {
        self.lag() > threshold
    }

    /// Records that the authority's log has reached `head`.
    pub fn observe_head(&mut self, head: u32) {
        self.latest_known = self.latest_known.max(head);
    }

    /// Writes `deltas` at `head_before_merge + offset` and applies every contiguous one.
    ///
    /// Slots below the current head were already applied and are ignored.
    /// Returns the number of deltas applied.
    pub fn merge(&mut self, head_before_merge: u32, deltas: &[Delta]) -> u32 {
        let head = self.head();
        for (offset, delta) in (0_u32..).zip(deltas) {
            let Some(index) = head_before_merge.checked_add(offset) else {
                break;
            };
            self.observe_head(index.saturating_add(1));
            if index >= head {
                let _ = self.pending.insert(index, delta.clone());
            }
        }
        self.drain()
    }

    /// Replaces the local state with `snapshot` and resumes from its head.
    ///
    /// Parked deltas past the snapshot head are kept; the playback queue is
    /// cleared since the deltas it narrates were folded into the snapshot.
    pub fn fast_forward(&mut self, snapshot: &BattleSnapshot) -> u32 {
        let from = self.head();
        self.battle = Battle::from_snapshot(snapshot);
        let head = self.head();
        self.pending = self.pending.split_off(&head);
        self.observe_head(head);
        self.playback.clear();
        tracing::info!(from, to = head, "fast-forwarded to snapshot");
        self.drain()
    }

    /// Oldest applied delta not yet narrated by presentation.
    ///
    /// Only the most recent deltas are kept; a consumer that never drains the
    /// queue loses the oldest ones first.
    pub fn next_playback(&mut self) -> Option<Delta> {
        self.playback.pop_front()
    }

    /// Number of applied deltas waiting for presentation.
    #[must_use]
    pub fn playback_len(&self) -> usize {
        self.playback.len()
    }

    fn drain(&mut self) -> u32 {
        let mut applied = 0;
        let mut dropped = 0_usize;
        loop {
            let head = self.head();
            let Some(delta) = self.pending.remove(&head) else {
                break;
            };
            let _ = collapse(&mut self.battle, &delta);
            self.playback.push_back(delta);
            while self.playback.len() > self.playback_capacity {
                let _ = self.playback.pop_front();
                dropped += 1;
            }
            applied += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, capacity = self.playback_capacity, "playback overflowed");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::catalog::demo_battle;

    use super::*;

    #[test]
    fn holes_hold_back_later_slots() {
        let setup = demo_battle();
        let mut replica = Replica::new();

        assert_eq!(replica.merge(4, &setup[4..]), 0);
        assert_eq!(replica.head(), 0);
        assert_eq!(replica.latest_known(), 12);
        assert_eq!(replica.lag(), 12);

        assert_eq!(replica.merge(0, &setup[..4]), 12);
        assert_eq!(replica.head(), 12);
        assert_eq!(replica.lag(), 0);
    }

    #[test]
    fn playback_trails_collapse() {
        let setup = demo_battle();
        let mut replica = Replica::new();
        let _ = replica.merge(0, &setup);
        assert_eq!(replica.playback_len(), 12);
        assert_eq!(replica.next_playback().as_ref(), setup.first());
        assert_eq!(replica.playback_len(), 11);
    }

    #[test]
    fn playback_keeps_only_the_most_recent_deltas() {
        let setup = demo_battle();
        let mut replica = Replica::with_playback_capacity(3);
        assert_eq!(replica.merge(0, &setup), 12);
        assert_eq!(replica.head(), 12);
        assert_eq!(replica.playback_len(), 3);
        assert_eq!(replica.next_playback().as_ref(), setup.get(9));

        let mut silent = Replica::with_playback_capacity(0);
        assert_eq!(silent.merge(0, &setup), 12);
        assert_eq!(silent.playback_len(), 0);
        assert_eq!(query::snapshot(silent.battle()), query::snapshot(replica.battle()));
    }

    #[test]
    fn fast_forward_adopts_the_snapshot_head() {
        let setup = demo_battle();
        let mut source = Replica::new();
        let _ = source.merge(0, &setup);
        let snapshot = query::snapshot(source.battle());

        let mut late = Replica::new();
        late.observe_head(40);
        assert!(late.needs_fast_forward(32));
        assert_eq!(late.fast_forward(&snapshot), 0);
        assert_eq!(late.head(), 12);
        assert_eq!(late.playback_len(), 0);
        assert_eq!(query::snapshot(late.battle()), snapshot);
    }
}
