/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Table derivation from per-track project counts.
//!
//! Each track gets `ceil(projects / projects_per_table)` tables, numbered
//! sequentially from 1 across all tracks in the order the tracks are given.
//! The cross-track is the exception: it is judged at exactly one table no
//! matter how many projects entered it.

use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Track, TrackId};

/// Upper bound accepted for `projects_per_table`.
pub const MAX_PROJECTS_PER_TABLE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("projects per table must be between 1 and 20 (got {0})")]
    InvalidProjectsPerTable(u32),
}

/// A table to be created: its display number and track.  The store assigns
/// the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePlan {
    pub number: u32,
    pub track: TrackId,
}

/// Plan the tables for `track_counts` (track, number of projects in it).
///
/// Tracks with no projects get no table.
pub fn plan_tables(
    track_counts: &[(Track, usize)],
    projects_per_table: u32,
    cross_track: &str,
) -> Result<Vec<TablePlan>, TableError> {
    if !(1..=MAX_PROJECTS_PER_TABLE).contains(&projects_per_table) {
        return Err(TableError::InvalidProjectsPerTable(projects_per_table));
    }

    let mut plans = Vec::new();
    let mut number = 1u32;

    for (track, count) in track_counts {
        let needed = if *count == 0 {
            0
        } else if track.name == cross_track {
            1
        } else {
            count.div_ceil(projects_per_table as usize)
        };

        debug!(track = %track.name, projects = count, tables = needed, "track tables");

        for _ in 0..needed {
            plans.push(TablePlan {
                number,
                track: track.id,
            });
            number += 1;
        }
    }

    info!(
        tracks = track_counts.len(),
        tables = plans.len(),
        projects_per_table,
        "Tables planned"
    );

    Ok(plans)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
