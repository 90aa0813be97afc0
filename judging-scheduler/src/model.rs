/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures shared by the scheduler, the store and the service.
//!
//! ```text
//! Project ──┬── Track A ──► AssignmentUnit(P, A) ──(scheduler)──► TimeSlot @ table of A
//!           └── Track B ──► AssignmentUnit(P, B) ──(scheduler)──► TimeSlot @ table of B
//! ```
//!
//! A project with N track memberships yields N assignment units, each placed
//! independently.  Identifiers are plain numeric newtypes handed out by the
//! store; they carry no meaning beyond identity and ordering.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Identity of a judging track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

/// Identity of a physical judging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

/// Identity of a submitted project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

// ── Tracks, tables, projects ──────────────────────────────────────────────────

/// A named judging category ("General", "MLH", a sponsor track, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
}

/// A physical judging table bound to exactly one track.
///
/// `number` is the 1-based display ordinal; scheduling visits tables in
/// ascending `number` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Table {
    pub id: TableId,
    pub number: u32,
    pub track: TrackId,
}

/// A submitted project.  Track memberships are kept by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub link: String,
}

impl Project {
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A project as submitted for upload, before the store assigns ids.
///
/// Every submission is implicitly entered in the general track; `tracks`
/// lists the additional tracks by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ProjectSubmission {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// The `{ id, name }` view of a project returned by read queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
}

// ── Assignment units ──────────────────────────────────────────────────────────

/// Stable key of an assignment unit: the `(project, track)` pair.
pub type UnitKey = (ProjectId, TrackId);

/// One (project, track) pair that needs exactly one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssignmentUnit {
    pub project: ProjectId,
    pub track: TrackId,
}

impl AssignmentUnit {
    pub fn new(project: ProjectId, track: TrackId) -> Self {
        Self { project, track }
    }

    pub fn key(&self) -> UnitKey {
        (self.project, self.track)
    }
}

// ── TimeSlot (scheduler output) ───────────────────────────────────────────────

/// One placement: `project` is judged at `table` during `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub table: TableId,
    pub project: ProjectId,
    pub track: TrackId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Builds a slot of `minutes` length starting at `start`.
    ///
    /// # Panics
    /// Panics if the end falls outside the range `DateTime<Utc>` can
    /// represent.  [`SlotScheduler`](crate::scheduler::SlotScheduler) checks
    /// its whole horizon before building any slot.
    pub fn spanning(
        unit: AssignmentUnit,
        table: TableId,
        start: DateTime<Utc>,
        minutes: u32,
    ) -> Self {
        Self {
            table,
            project: unit.project,
            track: unit.track,
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// `true` if `instant` falls inside the half-open range `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// `true` if the two half-open ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
