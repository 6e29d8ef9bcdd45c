//! Synthetic access patterns.
//!
//! Each pattern stresses one part of the policy: a pure stream, a working set
//! that fits the cache, a hot set polluted by a scan, and uniform random
//! traffic over four times the cache capacity.

use clap::ValueEnum;
use serde::Serialize;

use llcrepl_core::common::{AccessType, XorShift64};
use llcrepl_core::config::GeometryConfig;

const STREAM_PC: u64 = 0x0040_0100;
const HOT_PC: u64 = 0x0040_0200;
const RANDOM_PC: u64 = 0x0040_0300;
const STREAM_BASE: u64 = 0x1_0000_0000;

/// Access pattern to replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Sequential lines, never revisited.
    Stream,
    /// A working set of half the cache capacity, cycled.
    Reuse,
    /// A hot set of a quarter of the capacity, every 4th access a scan line.
    Mixed,
    /// Uniform random lines over four times the capacity.
    Random,
}

/// One generated access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyntheticAccess {
    pub pc: u64,
    pub addr: u64,
    pub kind: AccessType,
}

/// Infinite access generator for a workload.
#[derive(Debug)]
pub struct Generator {
    workload: Workload,
    line_bytes: u64,
    capacity_lines: u64,
    rng: XorShift64,
    issued: u64,
    scanned: u64,
}

impl Generator {
    pub fn new(workload: Workload, geometry: &GeometryConfig, seed: u64) -> Self {
        Self {
            workload,
            line_bytes: geometry.line_bytes as u64,
            capacity_lines: (geometry.sets * geometry.ways) as u64,
            rng: XorShift64::new(seed),
            issued: 0,
            scanned: 0,
        }
    }

    fn scan_line(&mut self) -> SyntheticAccess {
        let addr = STREAM_BASE + self.scanned * self.line_bytes;
        self.scanned += 1;
        SyntheticAccess {
            pc: STREAM_PC,
            addr,
            kind: AccessType::Load,
        }
    }

    fn hot_line(&self, lines: u64) -> SyntheticAccess {
        SyntheticAccess {
            pc: HOT_PC,
            addr: (self.issued % lines.max(1)) * self.line_bytes,
            kind: AccessType::Load,
        }
    }

    /// Produces the next access of the pattern.
    pub fn next_access(&mut self) -> SyntheticAccess {
        let access = match self.workload {
            Workload::Stream => self.scan_line(),
            Workload::Reuse => self.hot_line(self.capacity_lines / 2),
            Workload::Mixed => {
                if self.issued % 4 == 3 {
                    self.scan_line()
                } else {
                    self.hot_line(self.capacity_lines / 4)
                }
            }
            Workload::Random => {
                let line = self.rng.next_u64() % (self.capacity_lines * 4).max(1);
                let pc = RANDOM_PC + (self.rng.next_u64() % 8) * 4;
                let kind = if self.issued % 8 == 7 {
                    AccessType::Rfo
                } else {
                    AccessType::Load
                };
                SyntheticAccess {
                    pc,
                    addr: line * self.line_bytes,
                    kind,
                }
            }
        };
        self.issued += 1;
        access
    }
}

impl Iterator for Generator {
    type Item = SyntheticAccess;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_access())
    }
}
