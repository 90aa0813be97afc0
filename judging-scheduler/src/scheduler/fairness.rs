/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Starvation-weighted pool of pending assignment units.
//!
//! Each pending unit carries a starvation counter: the number of consecutive
//! time steps (or cross-track sub-slots) it has been passed over.  Picking
//! always takes the most-starved eligible unit; among equals the unit that
//! entered the pool first wins.
//!
//! Entries are keyed by their admission sequence number in a `BTreeMap`, so
//! iteration follows pool order and removal is O(log n).  Removing a unit
//! hands ownership back to the caller; a placed unit can never be picked
//! twice because it is no longer in the pool.

use std::collections::BTreeMap;

use crate::model::{AssignmentUnit, UnitKey};

/// A unit removed from the pool, with the starvation it had accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picked {
    pub unit: AssignmentUnit,
    pub waited: u32,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    unit: AssignmentUnit,
    starvation: u32,
}

impl PoolEntry {
    fn new(unit: AssignmentUnit) -> Self {
        Self {
            unit,
            starvation: 0,
        }
    }
}

/// Pending units plus their starvation counters, in admission order.
#[derive(Debug, Clone, Default)]
pub struct FairPool {
    entries: BTreeMap<u64, PoolEntry>,
}

impl FairPool {
    /// Admit `units` in iteration order with starvation 0.
    pub fn new(units: impl IntoIterator<Item = AssignmentUnit>) -> Self {
        let entries = (0u64..)
            .zip(units)
            .map(|(seq, unit)| (seq, PoolEntry::new(unit)))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending units in pool order.
    pub fn units(&self) -> impl Iterator<Item = &AssignmentUnit> {
        self.entries.values().map(|e| &e.unit)
    }

    /// Current starvation of the unit with `key`, or `None` once it has left
    /// the pool.
    pub fn starvation(&self, key: UnitKey) -> Option<u32> {
        self.entries
            .values()
            .find(|e| e.unit.key() == key)
            .map(|e| e.starvation)
    }

    /// Remove and return the most-starved unit for which `eligible` holds.
    ///
    /// Ties go to the earliest entry in pool order.  The returned unit's
    /// counter is implicitly reset: it is no longer tracked.
    pub fn pick_most_starved<F>(&mut self, eligible: F) -> Option<Picked>
    where
        F: Fn(&AssignmentUnit) -> bool,
    {
        let mut best: Option<(u64, u32)> = None;
        for (&seq, entry) in &self.entries {
            if !eligible(&entry.unit) {
                continue;
            }
            // strict `>` keeps the first-encountered unit on ties
            if best.map_or(true, |(_, s)| entry.starvation > s) {
                best = Some((seq, entry.starvation));
            }
        }

        let (seq, _) = best?;
        self.entries.remove(&seq).map(|e| Picked {
            unit: e.unit,
            waited: e.starvation,
        })
    }

    /// Remove and return the first unit in pool order, ignoring starvation.
    pub fn pop_front(&mut self) -> Option<AssignmentUnit> {
        self.entries.pop_first().map(|(_, e)| e.unit)
    }

    /// Pass over every unit still pending: starvation += 1.
    pub fn age(&mut self) {
        for entry in self.entries.values_mut() {
            entry.starvation = entry.starvation.saturating_add(1);
        }
    }

    /// Highest starvation among pending units (0 for an empty pool).
    pub fn max_starvation(&self) -> u32 {
        self.entries
            .values()
            .map(|e| e.starvation)
            .max()
            .unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
