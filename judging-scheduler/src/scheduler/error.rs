/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the slot scheduler.
//!
//! Every variant is a configuration problem detected **before** the first
//! slot is emitted, so a failed run never produces a partial schedule.  The
//! variants carry the offending ids and counts so the caller can turn them
//! into an actionable message for the administrator ("no table for track X")
//! without further parsing.
//!
//! | Variant | Typical cause |
//! |---|---|
//! | `NoTables` | "create time slots" before "create tables" |
//! | `InvalidSlotDuration` | zero-minute slot requested |
//! | `NoTableForTrack` | tables derived before a track gained projects |
//! | `NoCrossTrackTable` | cross-track projects but no dedicated table |
//! | `MultipleCrossTrackTables` | cross-track split across tables |
//! | `DuplicateUnit` | the same (project, track) listed twice |
//! | `TimeOverflow` | slot duration so long the schedule leaves the calendar |

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ProjectId, TrackId};

/// Top-level error type returned by
/// [`SlotScheduler::schedule()`](super::SlotScheduler::schedule).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The table list is empty.
    #[error("no tables found; create tables before scheduling")]
    NoTables,

    /// `slot_duration_minutes` was zero.
    #[error("slot duration must be a positive number of minutes (got {0})")]
    InvalidSlotDuration(u32),

    /// An ordinary track has pending units but no table bound to it.
    ///
    /// Without this check the time-step loop would never drain the track's
    /// units and would not terminate.
    #[error("no table found for {track} ({pending} pending assignment unit(s))")]
    NoTableForTrack { track: TrackId, pending: usize },

    /// Cross-track units exist but no table is bound to the cross-track.
    #[error("no table bound to the cross-track ({pending} pending assignment unit(s))")]
    NoCrossTrackTable { pending: usize },

    /// More than one table is bound to the cross-track.
    #[error("cross-track {track} is bound to {tables} tables but must have exactly one")]
    MultipleCrossTrackTables { track: TrackId, tables: usize },

    /// The same (project, track) pair appears more than once in the input.
    #[error("assignment unit ({project}, {track}) listed more than once")]
    DuplicateUnit { project: ProjectId, track: TrackId },

    /// The last slot would end past the latest instant `DateTime<Utc>` can
    /// represent.
    #[error("{slot_duration_minutes}-minute slots from {start} run past the last valid instant")]
    TimeOverflow {
        start: DateTime<Utc>,
        slot_duration_minutes: u32,
    },
}
