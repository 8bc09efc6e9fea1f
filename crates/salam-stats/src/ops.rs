//! Instruction classes for committed accelerator operations.
//!
//! The simulator reports a raw [`Opcode`](crate::id::Opcode) plus load/store
//! flags on commit. The engine folds those flags into a closed [`OpClass`]
//! carried on each instruction record, which is what the critical-path
//! breakdown counts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed category of a dynamic instruction.
///
/// `Other` is the class of an instruction the engine has only seen as a
/// dependency endpoint and that has not committed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpClass {
    Load,
    Store,
    Compute,
    #[default]
    Other,
}

impl OpClass {
    /// Classifies a commit from the queue processor's load/store flags.
    ///
    /// Neither flag set means a compute operation. Both set is not produced by
    /// any queue; it is treated as a load since the read side commits first.
    pub fn from_flags(is_load: bool, is_store: bool) -> Self {
        match (is_load, is_store) {
            (true, _) => OpClass::Load,
            (false, true) => OpClass::Store,
            (false, false) => OpClass::Compute,
        }
    }

    /// Returns `true` for loads and stores.
    pub fn is_memory(&self) -> bool {
        matches!(self, OpClass::Load | OpClass::Store)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpClass::Load => "load",
            OpClass::Store => "store",
            OpClass::Compute => "compute",
            OpClass::Other => "other",
        }
    }
}

impl fmt::Display for OpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flags_covers_queues() {
        assert_eq!(OpClass::from_flags(true, false), OpClass::Load);
        assert_eq!(OpClass::from_flags(false, true), OpClass::Store);
        assert_eq!(OpClass::from_flags(false, false), OpClass::Compute);
        assert_eq!(OpClass::from_flags(true, true), OpClass::Load);
    }

    #[test]
    fn default_is_other() {
        assert_eq!(OpClass::default(), OpClass::Other);
        assert!(!OpClass::Other.is_memory());
        assert!(OpClass::Store.is_memory());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OpClass::Compute).unwrap();
        assert_eq!(json, "\"compute\"");
        let back: OpClass = serde_json::from_str("\"store\"").unwrap();
        assert_eq!(back, OpClass::Store);
    }
}
