//! Dependency recorder: the reverse producer index plus depth propagation
//! for each newly resolved edge.

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use smallvec::SmallVec;

use crate::depth::DepthTracker;
use crate::edge::DependencyEdge;
use crate::id::Uid;

/// Producer list of one consumer. Most consumers have at most a few
/// producers, so they stay inline.
pub type ProducerList = SmallVec<[Uid; 4]>;

/// Reverse index from consumer to the producers it was recorded against.
///
/// Lists are append-only and keep recording order. A repeated edge appends
/// the producer again; nothing is deduplicated.
#[derive(Debug, Clone, Default)]
pub struct DependencyRecorder {
    producers: HashMap<Uid, ProducerList>,
    edges: u64,
}

impl DependencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one edge and applies its depth update.
    ///
    /// The producer becomes a tracked leaf if it was unseen, and the consumer
    /// is raised to `depth(producer) + 1` when that is deeper. Returns the new
    /// global maximum depth when this edge moved it.
    pub fn record(&mut self, depths: &mut DepthTracker, edge: &DependencyEdge) -> Option<u32> {
        self.edges += 1;
        self.producers
            .entry(edge.consumer)
            .or_default()
            .push(edge.producer);

        let producer_depth = depths.ensure_tracked(edge.producer);
        depths.raise(edge.consumer, producer_depth.saturating_add(1))
    }

    /// Producers recorded for `consumer`, in recording order.
    pub fn producers_of(&self, consumer: Uid) -> &[Uid] {
        self.producers
            .get(&consumer)
            .map_or(&[][..], |list| list.as_slice())
    }

    /// Number of `record` calls so far, duplicates included.
    pub fn edge_count(&self) -> u64 {
        self.edges
    }

    /// Number of consumers with at least one producer.
    pub fn consumer_count(&self) -> usize {
        self.producers.len()
    }

    /// Builds a producer -> consumer graph of the distinct edges.
    pub fn to_graph(&self) -> DiGraphMap<Uid, ()> {
        let mut graph = DiGraphMap::new();
        for (&consumer, producers) in &self.producers {
            for &producer in producers {
                graph.add_edge(producer, consumer, ());
            }
        }
        graph
    }

    /// Returns `false` when the recorded producer graph contains a cycle,
    /// which the dataflow program should never produce.
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.to_graph())
    }
}
