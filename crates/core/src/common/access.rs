//! Access descriptors exchanged between the simulator and a policy.
//!
//! These mirror the arguments of the classic LLC replacement plugin contract:
//! the requesting core, the set being accessed, the instruction pointer, the
//! physical address and the access type.

use serde::{Deserialize, Serialize};

/// Kind of LLC access, numbered as trace-driven simulators number them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessType {
    /// Demand load.
    #[default]
    Load,
    /// Read-for-ownership (demand store miss).
    Rfo,
    /// Hardware prefetch.
    Prefetch,
    /// Dirty eviction from an upper level.
    Writeback,
}

impl AccessType {
    /// Decodes the simulator's raw type number (0 = load, 1 = RFO,
    /// 2 = prefetch, 3 = writeback). Unknown values decode as [`AccessType::Load`].
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Rfo,
            2 => Self::Prefetch,
            3 => Self::Writeback,
            _ => Self::Load,
        }
    }

    /// Raw type number, inverse of [`AccessType::from_raw`].
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Load => 0,
            Self::Rfo => 1,
            Self::Prefetch => 2,
            Self::Writeback => 3,
        }
    }
}

/// One LLC access as seen by the replacement policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    /// Requesting core.
    pub cpu: u32,
    /// Set index. Policies reduce it modulo their set count.
    pub set: usize,
    /// Instruction pointer of the triggering instruction.
    pub pc: u64,
    /// Physical address of the access.
    pub paddr: u64,
    /// Access type.
    pub kind: AccessType,
}

impl Access {
    /// Builds a demand-load access from core 0.
    pub const fn load(set: usize, pc: u64, paddr: u64) -> Self {
        Self {
            cpu: 0,
            set,
            pc,
            paddr,
            kind: AccessType::Load,
        }
    }
}

/// The simulator's view of one way of the set being filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockView {
    /// Whether the way currently holds a line.
    pub valid: bool,
    /// Line address held by the way (meaningless when `valid` is false).
    pub addr: u64,
}
