//! Critical path analysis, run once at finalize.
//!
//! The analysis does not pick a single canonical path. Starting from every
//! instruction at the maximum depth it walks back through producers that are
//! exactly one level shallower, so every tied longest chain is marked.
//!
//! A visited set bounds the walk to O(V + E) even if the producer graph
//! contains a cycle; such a cycle only cuts that branch short.

use std::collections::{BTreeMap, BTreeSet};

use crate::depth::DepthTracker;
use crate::id::{Opcode, Uid};
use crate::ops::OpClass;
use crate::recorder::DependencyRecorder;

/// Result of one critical-path pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriticalPath {
    /// Maximum depth at the time of the pass.
    pub length: u32,
    /// Every instruction on at least one maximum-depth chain.
    pub members: BTreeSet<Uid>,
    /// Tracked instructions per depth value.
    pub depth_histogram: BTreeMap<u32, u64>,
    /// Tracked instructions divided by path length; `None` for an empty run.
    pub avg_ready_instructions: Option<f64>,
    pub loads: u64,
    pub stores: u64,
    pub computes: u64,
    pub by_opcode: BTreeMap<Opcode, u64>,
}

impl CriticalPath {
    /// Runs the full pass over the accumulated depth map and producer index.
    pub fn compute(depths: &DepthTracker, recorder: &DependencyRecorder) -> Self {
        let length = depths.max_depth();
        let depth_histogram = depths.histogram();
        let tracked: u64 = depth_histogram.values().sum();
        let avg_ready_instructions = (length > 0).then(|| tracked as f64 / f64::from(length));

        let members = mark_critical_path(depths, recorder);

        let mut path = CriticalPath {
            length,
            members,
            depth_histogram,
            avg_ready_instructions,
            ..CriticalPath::default()
        };
        path.classify(depths);
        path
    }

    pub fn instruction_count(&self) -> u64 {
        self.members.len() as u64
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.members.contains(&uid)
    }

    fn classify(&mut self, depths: &DepthTracker) {
        for uid in &self.members {
            let Some(record) = depths.record(*uid) else {
                continue;
            };
            match record.class {
                OpClass::Load => self.loads += 1,
                OpClass::Store => self.stores += 1,
                OpClass::Compute => self.computes += 1,
                OpClass::Other => {}
            }
            if let Some(opcode) = record.opcode {
                *self.by_opcode.entry(opcode).or_insert(0) += 1;
            }
        }
    }
}

/// Marks every instruction lying on some maximum-depth chain.
pub fn mark_critical_path(depths: &DepthTracker, recorder: &DependencyRecorder) -> BTreeSet<Uid> {
    let mut marked = BTreeSet::new();
    if depths.max_depth() == 0 {
        return marked;
    }

    let mut worklist: Vec<Uid> = depths.deepest().collect();
    while let Some(uid) = worklist.pop() {
        if !marked.insert(uid) {
            continue;
        }
        let depth = depths.depth(uid);
        if depth <= 1 {
            continue;
        }
        worklist.extend(
            recorder
                .producers_of(uid)
                .iter()
                .copied()
                .filter(|p| depths.depth(*p) == depth - 1),
        );
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::DependencyEdge;

    fn build(edges: &[(u64, u64)]) -> (DepthTracker, DependencyRecorder) {
        let mut recorder = DependencyRecorder::new();
        let mut depths = DepthTracker::new();
        for &(p, c) in edges {
            recorder.record(&mut depths, &DependencyEdge::raw(Uid(p), Uid(c)));
        }
        (depths, recorder)
    }

    fn uids(raw: &[u64]) -> BTreeSet<Uid> {
        raw.iter().copied().map(Uid).collect()
    }

    #[test]
    fn empty_run_has_no_path() {
        let (depths, recorder) = build(&[]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!(path.length, 0);
        assert!(path.members.is_empty());
        assert_eq!(path.avg_ready_instructions, None);
    }

    #[test]
    fn diamond_marks_both_branches() {
        let (depths, recorder) = build(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!(path.length, 3);
        assert_eq!(path.members, uids(&[1, 2, 3, 4]));
    }

    #[test]
    fn shortcut_producer_is_not_marked() {
        // 1 -> 2 -> 3 -> 4 plus a direct 5 -> 4 from a shallow leaf.
        let (depths, recorder) = build(&[(1, 2), (2, 3), (3, 4), (5, 4)]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!(path.members, uids(&[1, 2, 3, 4]));
        assert!(!path.contains(Uid(5)));
    }

    #[test]
    fn side_branch_off_the_path_is_excluded() {
        let (depths, recorder) = build(&[(1, 2), (2, 3), (1, 9)]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!(path.members, uids(&[1, 2, 3]));
    }

    #[test]
    fn avg_ready_is_tracked_over_length() {
        let (depths, recorder) = build(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!(path.avg_ready_instructions, Some(4.0 / 3.0));
        assert_eq!(path.depth_histogram.get(&2), Some(&2));
    }

    #[test]
    fn cycle_terminates() {
        let (depths, recorder) = build(&[(1, 2), (2, 3), (3, 1)]);
        let path = CriticalPath::compute(&depths, &recorder);
        assert!(path.instruction_count() <= 3);
    }

    #[test]
    fn breakdown_uses_committed_class() {
        let (mut depths, recorder) = build(&[(1, 2), (2, 3)]);
        depths.mark_committed(Uid(1), Opcode(30), OpClass::Load);
        depths.mark_committed(Uid(2), Opcode(8), OpClass::Compute);
        depths.mark_committed(Uid(3), Opcode(31), OpClass::Store);
        let path = CriticalPath::compute(&depths, &recorder);
        assert_eq!((path.loads, path.stores, path.computes), (1, 1, 1));
        assert_eq!(path.by_opcode.get(&Opcode(8)), Some(&1));
    }
}
