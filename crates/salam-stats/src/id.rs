//! Stable ID newtypes for dynamic instructions.
//!
//! Both IDs are distinct newtype wrappers, so a [`Uid`] cannot be handed to a
//! call that expects a raw simulator [`Opcode`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run-scoped identifier of one dynamic instruction instance.
///
/// UIDs are unique within one accelerator's execution only; each accelerator
/// in a cluster has its own disjoint UID space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(pub u64);

/// Raw opcode number reported by the simulator on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Opcode(pub u32);

// Both IDs display as the bare number.

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(raw: u64) -> Self {
        Uid(raw)
    }
}
