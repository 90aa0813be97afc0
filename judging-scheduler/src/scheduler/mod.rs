//! Judging time-slot scheduler.
//!
//! [`SlotScheduler`] places every assignment unit (one (project, track)
//! pair) into exactly one time slot at a table of its track.  The result is
//! a [`Schedule`]: the flat list of [`TimeSlot`]s plus the end time of the
//! last slot, ready to be written to the store as one batch.
//!
//! # Algorithm
//!
//! Starvation-weighted round robin, one *time step* of
//! `slot_duration_minutes` at a time:
//!
//! 1. Every ordinary table, in ascending table number, takes the most-starved
//!    pending unit of its track whose project has not been placed yet in this
//!    step.  A table with no such unit idles.
//! 2. Every unit still pending ages by one.
//! 3. The cross-track table then fills up to `slot_duration_minutes / 5`
//!    five-minute sub-slots from cross-track units whose project was not
//!    placed by step 1.
//!
//! When the ordinary pool is empty, leftover cross-track units are drained
//! back to back in five-minute blocks.
//!
//! | Topic | Choice |
//! |---|---|
//! | State | All per-run state lives in `RunState`, dropped when `schedule()` returns |
//! | Pools | [`FairPool`]: `BTreeMap` keyed by admission order, O(log n) removal |
//! | Persistence | None; the schedule is computed in full before any write |
//! | Termination | Pre-validated: every pending track has a table |
//! | Tie-break | [`TieBreak`]: caller order, or sorted by (project, track) |
//!
//! # Example
//! ```rust,ignore
//! let scheduler = SlotScheduler::new();
//! let schedule = scheduler.schedule(request)?;
//! println!("judging ends at {}", schedule.end_time);
//! ```

pub mod error;
pub mod fairness;

pub use error::SchedulerError;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::model::{AssignmentUnit, ProjectId, Table, TableId, TimeSlot, TrackId};

use fairness::FairPool;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Length of one cross-track sub-slot, independent of the ordinary slot
/// duration.
pub const CROSS_TRACK_SLOT_MINUTES: u32 = 5;

// ── Inputs / outputs ──────────────────────────────────────────────────────────

/// How ties between equally starved units are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// First unit in the order the caller supplied wins.
    #[default]
    PoolOrder,
    /// Pools are sorted by `(project, track)` before the run, making the
    /// result independent of the caller's ordering.
    UnitKey,
}

/// Everything one scheduling run needs.
///
/// The caller partitions the units: `cross_track` holds the units whose
/// track is `cross_track_id`, `ordinary` holds the rest.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub tables: Vec<Table>,
    pub ordinary: Vec<AssignmentUnit>,
    pub cross_track: Vec<AssignmentUnit>,
    /// The cross-track, if the event has one.
    pub cross_track_id: Option<TrackId>,
    pub start_time: DateTime<Utc>,
    pub slot_duration_minutes: u32,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Every placement, in emission order.
    pub slots: Vec<TimeSlot>,
    /// Clock time after the last time step (or drained sub-slot).
    pub end_time: DateTime<Utc>,
    /// Number of tables the run was given.
    pub num_tables: usize,
    /// Number of ordinary time steps executed.
    pub steps: usize,
    /// Cross-track units placed in the drain phase.
    pub drained: usize,
}

impl Schedule {
    /// Slots at `table`, in emission (= chronological) order.
    pub fn slots_at(&self, table: TableId) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(move |s| s.table == table)
    }

    /// Slots of `project` across all tables, in emission order.
    pub fn slots_for(&self, project: ProjectId) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(move |s| s.project == project)
    }
}

// ── Per-run state ─────────────────────────────────────────────────────────────

struct RunState {
    ordinary: FairPool,
    cross: FairPool,
    current_time: DateTime<Utc>,
    slots: Vec<TimeSlot>,
    steps: usize,
    drained: usize,
}

/// Tables split into the ordinary ones (visited every step) and the single
/// cross-track table.
struct TableLayout {
    ordinary: Vec<Table>,
    cross: Option<Table>,
}

// ── SlotScheduler ─────────────────────────────────────────────────────────────

/// The judging slot scheduler.
///
/// Stateless between runs; holds only the tie-break policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotScheduler {
    tie_break: TieBreak,
}

impl SlotScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Place every unit of `request` and return the full schedule.
    ///
    /// # Errors
    /// Returns a [`SchedulerError`] when the tables cannot serve the pending
    /// units.  Validation runs before the first placement, so an error never
    /// comes with a partial schedule.
    pub fn schedule(&self, request: ScheduleRequest) -> Result<Schedule, SchedulerError> {
        let ScheduleRequest {
            mut tables,
            mut ordinary,
            mut cross_track,
            cross_track_id,
            start_time,
            slot_duration_minutes,
        } = request;

        // ── Preconditions ─────────────────────────────────────────────────────
        tables.sort_by_key(|t| t.number);
        let layout = Self::validate(
            &tables,
            &ordinary,
            &cross_track,
            cross_track_id,
            slot_duration_minutes,
        )?;
        let horizon = Self::horizon(
            start_time,
            ordinary.len(),
            cross_track.len(),
            slot_duration_minutes,
        )?;

        if self.tie_break == TieBreak::UnitKey {
            ordinary.sort_by_key(AssignmentUnit::key);
            cross_track.sort_by_key(AssignmentUnit::key);
        }

        info!(
            tables = tables.len(),
            ordinary_units = ordinary.len(),
            cross_track_units = cross_track.len(),
            slot_minutes = slot_duration_minutes,
            start = %start_time,
            horizon = %horizon,
            tie_break = ?self.tie_break,
            "=== SlotScheduler::schedule() ==="
        );

        let total_units = ordinary.len() + cross_track.len();
        let mut state = RunState {
            ordinary: FairPool::new(ordinary),
            cross: FairPool::new(cross_track),
            current_time: start_time,
            slots: Vec::new(),
            steps: 0,
            drained: 0,
        };

        // ── Main time-step loop ───────────────────────────────────────────────
        while !state.ordinary.is_empty() {
            Self::run_time_step(&mut state, &layout, slot_duration_minutes);
        }

        // ── Drain leftover cross-track units ──────────────────────────────────
        if let Some(cross_table) = layout.cross {
            Self::drain_cross_track(&mut state, cross_table.id);
        }
        debug_assert!(state.cross.is_empty());
        debug_assert_eq!(state.slots.len(), total_units);
        debug_assert!(state.current_time <= horizon);

        info!(
            slots = state.slots.len(),
            steps = state.steps,
            drained = state.drained,
            end = %state.current_time,
            "=== Scheduling complete ==="
        );

        Ok(Schedule {
            slots: state.slots,
            end_time: state.current_time,
            num_tables: tables.len(),
            steps: state.steps,
            drained: state.drained,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Reject every input the loop could not finish, and split the tables
    /// into ordinary ones and the cross-track table.
    fn validate(
        tables: &[Table],
        ordinary: &[AssignmentUnit],
        cross_track: &[AssignmentUnit],
        cross_track_id: Option<TrackId>,
        slot_duration_minutes: u32,
    ) -> Result<TableLayout, SchedulerError> {
        if tables.is_empty() {
            return Err(SchedulerError::NoTables);
        }
        if slot_duration_minutes == 0 {
            return Err(SchedulerError::InvalidSlotDuration(slot_duration_minutes));
        }

        let mut seen = HashSet::with_capacity(ordinary.len() + cross_track.len());
        for unit in ordinary.iter().chain(cross_track) {
            if !seen.insert(unit.key()) {
                return Err(SchedulerError::DuplicateUnit {
                    project: unit.project,
                    track: unit.track,
                });
            }
        }

        // The cross-track table takes part only in the sub-slot loop.
        let (cross_tables, ordinary_tables): (Vec<Table>, Vec<Table>) = tables
            .iter()
            .copied()
            .partition(|t| Some(t.track) == cross_track_id);

        let cross = match (cross_track_id, cross_tables.as_slice()) {
            (Some(track), [_, _, ..]) => {
                return Err(SchedulerError::MultipleCrossTrackTables {
                    track,
                    tables: cross_tables.len(),
                });
            }
            (_, [table]) => Some(*table),
            _ => None,
        };
        if cross.is_none() && !cross_track.is_empty() {
            return Err(SchedulerError::NoCrossTrackTable {
                pending: cross_track.len(),
            });
        }

        // BTreeMap so the first reported track is deterministic
        let mut pending: BTreeMap<TrackId, usize> = BTreeMap::new();
        for unit in ordinary {
            *pending.entry(unit.track).or_default() += 1;
        }
        for (&track, &count) in &pending {
            if !ordinary_tables.iter().any(|t| t.track == track) {
                return Err(SchedulerError::NoTableForTrack {
                    track,
                    pending: count,
                });
            }
        }

        Ok(TableLayout {
            ordinary: ordinary_tables,
            cross,
        })
    }

    /// Latest instant the run can reach, or `TimeOverflow` if it is not
    /// representable.
    ///
    /// Every time step places at least one ordinary unit and every drained
    /// cross-track unit takes one sub-slot, so the clock never passes
    /// `start + ordinary * slot + cross_track * 5 min`.  Once this bound is
    /// known to fit, the unchecked clock arithmetic below cannot overflow.
    fn horizon(
        start_time: DateTime<Utc>,
        ordinary: usize,
        cross_track: usize,
        slot_duration_minutes: u32,
    ) -> Result<DateTime<Utc>, SchedulerError> {
        let steps = i64::from(slot_duration_minutes).checked_mul(ordinary as i64);
        let drain = i64::from(CROSS_TRACK_SLOT_MINUTES).checked_mul(cross_track as i64);

        steps
            .zip(drain)
            .and_then(|(steps, drain)| steps.checked_add(drain))
            .and_then(Duration::try_minutes)
            .and_then(|span| start_time.checked_add_signed(span))
            .ok_or(SchedulerError::TimeOverflow {
                start: start_time,
                slot_duration_minutes,
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Time step
    // ─────────────────────────────────────────────────────────────────────────

    /// One iteration of the main loop: every ordinary table places at most
    /// one unit, then the cross-track table fills its sub-slots.
    fn run_time_step(state: &mut RunState, layout: &TableLayout, slot_minutes: u32) {
        let step_start = state.current_time;
        // Projects placed anywhere during this step.
        let mut busy: HashSet<ProjectId> = HashSet::new();

        for table in &layout.ordinary {
            let picked = state
                .ordinary
                .pick_most_starved(|u| u.track == table.track && !busy.contains(&u.project));

            match picked {
                Some(picked) => {
                    busy.insert(picked.unit.project);
                    debug!(
                        table = table.number,
                        project = %picked.unit.project,
                        track = %picked.unit.track,
                        waited = picked.waited,
                        start = %step_start,
                        "placed"
                    );
                    state.slots.push(TimeSlot::spanning(
                        picked.unit,
                        table.id,
                        step_start,
                        slot_minutes,
                    ));
                }
                None => {
                    debug!(table = table.number, start = %step_start, "table idle");
                }
            }
        }

        state.ordinary.age();

        if let Some(cross_table) = layout.cross {
            Self::interleave_cross_track(state, cross_table.id, &busy, step_start, slot_minutes);
        }

        state.current_time = step_start + Duration::minutes(i64::from(slot_minutes));
        state.steps += 1;
    }

    /// Fill up to `slot_minutes / 5` cross-track sub-slots starting at
    /// `step_start`, skipping projects already placed in this step.
    fn interleave_cross_track(
        state: &mut RunState,
        cross_table: TableId,
        busy: &HashSet<ProjectId>,
        step_start: DateTime<Utc>,
        slot_minutes: u32,
    ) {
        let sub_slots = slot_minutes / CROSS_TRACK_SLOT_MINUTES;
        let free = |u: &AssignmentUnit| !busy.contains(&u.project);
        let mut sub_time = step_start;

        for _ in 0..sub_slots {
            let Some(picked) = state.cross.pick_most_starved(free) else {
                break;
            };
            debug!(
                project = %picked.unit.project,
                waited = picked.waited,
                start = %sub_time,
                "cross-track sub-slot"
            );
            state.slots.push(TimeSlot::spanning(
                picked.unit,
                cross_table,
                sub_time,
                CROSS_TRACK_SLOT_MINUTES,
            ));
            state.cross.age();
            sub_time += Duration::minutes(i64::from(CROSS_TRACK_SLOT_MINUTES));
        }
    }

    /// Place the remaining cross-track units one after another from the
    /// current time.  Nothing else competes for the clock at this point.
    fn drain_cross_track(state: &mut RunState, cross_table: TableId) {
        if state.cross.is_empty() {
            return;
        }
        warn!(
            remaining = state.cross.len(),
            from = %state.current_time,
            "cross-track outlasted the ordinary schedule, draining sequentially"
        );

        while let Some(unit) = state.cross.pop_front() {
            state.slots.push(TimeSlot::spanning(
                unit,
                cross_table,
                state.current_time,
                CROSS_TRACK_SLOT_MINUTES,
            ));
            state.current_time += Duration::minutes(i64::from(CROSS_TRACK_SLOT_MINUTES));
            state.drained += 1;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
