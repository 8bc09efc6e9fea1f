//! Per-instruction dependency depth and the running maximum.
//!
//! Depth is the length, in edges + 1, of the longest dependency chain ending
//! at an instruction. A tracked instruction has depth >= 1; an untracked one
//! reports 0. Depths never decrease, and `max_depth` always equals the
//! largest depth of any tracked record.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::id::{Opcode, Uid};
use crate::ops::OpClass;

/// Depth assigned to an instruction with no recorded producers.
pub const LEAF_DEPTH: u32 = 1;

/// Everything the engine keeps about one dynamic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstructionRecord {
    pub depth: u32,
    pub class: OpClass,
    /// Raw opcode, known once the instruction commits.
    pub opcode: Option<Opcode>,
    pub committed: bool,
}

impl InstructionRecord {
    fn leaf() -> Self {
        InstructionRecord {
            depth: LEAF_DEPTH,
            class: OpClass::Other,
            opcode: None,
            committed: false,
        }
    }
}

/// Depth map over all instructions seen so far in one run.
///
/// Records are kept in first-seen order, which makes every iteration (the
/// critical-path seeds, the histogram) deterministic for a given event order.
#[derive(Debug, Clone, Default)]
pub struct DepthTracker {
    records: IndexMap<Uid, InstructionRecord>,
    max_depth: u32,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth of `uid`, or 0 if it has never been tracked.
    pub fn depth(&self, uid: Uid) -> u32 {
        self.records.get(&uid).map_or(0, |r| r.depth)
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn record(&self, uid: Uid) -> Option<&InstructionRecord> {
        self.records.get(&uid)
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.records.contains_key(&uid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Starts tracking `uid` at leaf depth if it is not tracked yet, and
    /// returns its current depth either way.
    pub fn ensure_tracked(&mut self, uid: Uid) -> u32 {
        let depth = self
            .records
            .entry(uid)
            .or_insert_with(InstructionRecord::leaf)
            .depth;
        if depth > self.max_depth {
            self.max_depth = depth;
        }
        depth
    }

    /// Raises the depth of `uid` to `candidate` if that is deeper than what
    /// it has now (an unseen UID counts as depth 0).
    ///
    /// Returns `Some(new_global_max)` when the raise also moved the global
    /// maximum, `None` otherwise.
    pub fn raise(&mut self, uid: Uid, candidate: u32) -> Option<u32> {
        let entry = self.records.entry(uid).or_insert(InstructionRecord {
            depth: 0,
            ..InstructionRecord::leaf()
        });
        if candidate <= entry.depth {
            // A fresh entry that lost the comparison still needs a real depth.
            if entry.depth == 0 {
                entry.depth = LEAF_DEPTH;
            }
            return None;
        }
        entry.depth = candidate;
        if candidate > self.max_depth {
            self.max_depth = candidate;
            Some(candidate)
        } else {
            None
        }
    }

    /// Tags a committed instruction with its class and opcode.
    pub fn mark_committed(&mut self, uid: Uid, opcode: Opcode, class: OpClass) -> u32 {
        self.ensure_tracked(uid);
        let record = &mut self.records[&uid];
        record.class = class;
        record.opcode = Some(opcode);
        record.committed = true;
        record.depth
    }

    /// Number of tracked instructions at each depth.
    pub fn histogram(&self) -> BTreeMap<u32, u64> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.depth).or_insert(0) += 1;
        }
        counts
    }

    /// UIDs whose depth equals the current maximum, in first-seen order.
    pub fn deepest(&self) -> impl Iterator<Item = Uid> + '_ {
        let max = self.max_depth;
        self.records
            .iter()
            .filter(move |(_, r)| r.depth == max)
            .map(|(uid, _)| *uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uid, &InstructionRecord)> {
        self.records.iter().map(|(uid, r)| (*uid, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untracked_depth_is_zero() {
        let tracker = DepthTracker::new();
        assert_eq!(tracker.depth(Uid(9)), 0);
        assert_eq!(tracker.max_depth(), 0);
    }

    #[test]
    fn ensure_tracked_starts_at_leaf_and_is_idempotent() {
        let mut tracker = DepthTracker::new();
        assert_eq!(tracker.ensure_tracked(Uid(1)), LEAF_DEPTH);
        assert_eq!(tracker.max_depth(), 1);
        tracker.raise(Uid(1), 4);
        assert_eq!(tracker.ensure_tracked(Uid(1)), 4);
    }

    #[test]
    fn raise_only_moves_upward() {
        let mut tracker = DepthTracker::new();
        assert_eq!(tracker.raise(Uid(2), 3), Some(3));
        assert_eq!(tracker.raise(Uid(2), 2), None);
        assert_eq!(tracker.depth(Uid(2)), 3);
        assert_eq!(tracker.raise(Uid(2), 5), Some(5));
        assert_eq!(tracker.depth(Uid(2)), 5);
    }

    #[test]
    fn raise_below_max_does_not_report_new_max() {
        let mut tracker = DepthTracker::new();
        tracker.raise(Uid(1), 6);
        assert_eq!(tracker.raise(Uid(2), 3), None);
        assert_eq!(tracker.depth(Uid(2)), 3);
        assert_eq!(tracker.max_depth(), 6);
    }

    #[test]
    fn histogram_counts_per_depth() {
        let mut tracker = DepthTracker::new();
        tracker.ensure_tracked(Uid(1));
        tracker.raise(Uid(2), 2);
        tracker.raise(Uid(3), 2);
        tracker.raise(Uid(4), 3);
        let hist = tracker.histogram();
        assert_eq!(hist.get(&1), Some(&1));
        assert_eq!(hist.get(&2), Some(&2));
        assert_eq!(hist.get(&3), Some(&1));
        assert_eq!(hist.values().sum::<u64>(), 4);
    }

    #[test]
    fn mark_committed_tags_record() {
        let mut tracker = DepthTracker::new();
        tracker.raise(Uid(5), 2);
        let depth = tracker.mark_committed(Uid(5), Opcode(12), OpClass::Store);
        assert_eq!(depth, 2);
        let record = tracker.record(Uid(5)).unwrap();
        assert_eq!(record.class, OpClass::Store);
        assert_eq!(record.opcode, Some(Opcode(12)));
        assert!(record.committed);
    }

    #[test]
    fn deepest_follows_first_seen_order() {
        let mut tracker = DepthTracker::new();
        tracker.raise(Uid(8), 2);
        tracker.ensure_tracked(Uid(1));
        tracker.raise(Uid(3), 2);
        let deepest: Vec<Uid> = tracker.deepest().collect();
        assert_eq!(deepest, vec![Uid(8), Uid(3)]);
    }
}
