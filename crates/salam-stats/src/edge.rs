//! Producer/consumer dependency edges.
//!
//! An edge records that `consumer` had to wait on `producer`. The kind is a
//! set of flags rather than a single tag because the queue processor reports
//! RAW, WAR and WAW independently, and each set flag bumps its own counter.
//! Control and memory-ordering flags ride along on the same edge.

use serde::{Deserialize, Serialize};

use crate::id::Uid;

/// Dependency kinds carried by one recorded edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepKinds {
    /// Read-after-write (true dependency).
    #[serde(default)]
    pub raw: bool,
    /// Write-after-read (anti dependency).
    #[serde(default)]
    pub war: bool,
    /// Write-after-write (output dependency).
    #[serde(default)]
    pub waw: bool,
    /// Branch dependency.
    #[serde(default)]
    pub control: bool,
    /// Memory ordering dependency.
    #[serde(default)]
    pub memory: bool,
}

impl DepKinds {
    pub const RAW: DepKinds = DepKinds::new(true, false, false);
    pub const WAR: DepKinds = DepKinds::new(false, true, false);
    pub const WAW: DepKinds = DepKinds::new(false, false, true);
    pub const CONTROL: DepKinds = DepKinds {
        control: true,
        ..DepKinds::new(false, false, false)
    };
    pub const MEMORY: DepKinds = DepKinds {
        memory: true,
        ..DepKinds::new(false, false, false)
    };

    pub const fn new(raw: bool, war: bool, waw: bool) -> Self {
        DepKinds {
            raw,
            war,
            waw,
            control: false,
            memory: false,
        }
    }

    pub fn with_control(self) -> Self {
        DepKinds {
            control: true,
            ..self
        }
    }

    pub fn with_memory(self) -> Self {
        DepKinds {
            memory: true,
            ..self
        }
    }

    /// Returns `true` if no kind flag is set. Such an edge still orders the
    /// two instructions and still counts toward the total edge count.
    pub fn is_empty(&self) -> bool {
        !(self.raw || self.war || self.waw || self.control || self.memory)
    }
}

/// One recorded producer -> consumer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub producer: Uid,
    pub consumer: Uid,
    pub kinds: DepKinds,
}

impl DependencyEdge {
    pub fn new(producer: Uid, consumer: Uid, kinds: DepKinds) -> Self {
        DependencyEdge {
            producer,
            consumer,
            kinds,
        }
    }

    /// Shorthand for a read-after-write edge, the common case.
    pub fn raw(producer: Uid, consumer: Uid) -> Self {
        DependencyEdge::new(producer, consumer, DepKinds::RAW)
    }
}
