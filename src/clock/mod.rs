// src/clock/mod.rs

//! Per-root logical clock.
//!
//! Every change observation for a root is stamped with a [`ClockValue`]
//! taken from that root's [`RootClock`]. Ticks are the only ordering key:
//! the wall-clock instant rides along for display and for `mtime`-style
//! comparisons, but wall clocks can stall or jump backwards, so nothing in
//! the crate orders observations by it.

pub mod deadline;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::errors::WatchqueryError;

pub use deadline::deadline_after;

/// Process-wide source of root numbers. A clock position carrying a root
/// number that doesn't match the root it's evaluated against was issued by
/// another root (or another process) and is treated as a fresh instance.
static NEXT_ROOT_NUMBER: AtomicU32 = AtomicU32::new(1);

/// A tick plus the wall-clock instant it was issued at.
#[derive(Debug, Clone, Copy)]
pub struct ClockValue {
    pub ticks: u64,
    pub observed_at: SystemTime,
}

impl ClockValue {
    pub fn new(ticks: u64, observed_at: SystemTime) -> Self {
        Self { ticks, observed_at }
    }
}

impl PartialEq for ClockValue {
    fn eq(&self, other: &Self) -> bool {
        self.ticks == other.ticks
    }
}

impl Eq for ClockValue {}

impl PartialOrd for ClockValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

/// Compare two clock values. Only ticks participate.
pub fn compare(a: &ClockValue, b: &ClockValue) -> Ordering {
    a.cmp(b)
}

/// The single authoritative tick counter for one root.
#[derive(Debug)]
pub struct RootClock {
    root_number: u32,
    ticks: AtomicU64,
}

impl RootClock {
    pub fn new() -> Self {
        Self {
            root_number: NEXT_ROOT_NUMBER.fetch_add(1, AtomicOrdering::Relaxed),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn root_number(&self) -> u32 {
        self.root_number
    }

    /// Issue the next clock value.
    ///
    /// `fetch_add` hands every caller a distinct tick, so concurrent callers
    /// each get a value strictly greater than anything issued before.
    pub fn tick(&self) -> ClockValue {
        let ticks = self.ticks.fetch_add(1, AtomicOrdering::AcqRel) + 1;
        ClockValue::new(ticks, SystemTime::now())
    }

    /// The most recently issued value, without advancing.
    pub fn current(&self) -> ClockValue {
        ClockValue::new(self.ticks.load(AtomicOrdering::Acquire), SystemTime::now())
    }

    /// Cursor for "everything observed after now".
    pub fn position(&self) -> ClockPosition {
        ClockPosition {
            root_number: self.root_number,
            ticks: self.ticks.load(AtomicOrdering::Acquire),
        }
    }
}

impl Default for RootClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A "changed since" cursor: `c:<root_number>:<ticks>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockPosition {
    pub root_number: u32,
    pub ticks: u64,
}

impl ClockPosition {
    pub fn new(root_number: u32, ticks: u64) -> Self {
        Self { root_number, ticks }
    }

    /// True when this cursor was not issued by the root identified by
    /// `root_number`; every known file then counts as changed.
    pub fn is_fresh_instance_for(&self, root_number: u32) -> bool {
        self.root_number != root_number
    }
}

impl fmt::Display for ClockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c:{}:{}", self.root_number, self.ticks)
    }
}

impl FromStr for ClockPosition {
    type Err = WatchqueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || WatchqueryError::parse(format!("invalid clock position: {s:?}"));

        let mut parts = s.trim().split(':');
        if parts.next() != Some("c") {
            return Err(bad());
        }
        let root_number = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let ticks = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self { root_number, ticks })
    }
}
