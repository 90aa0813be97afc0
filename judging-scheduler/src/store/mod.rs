/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory judging store.
//!
//! Holds tracks, projects and their track memberships, tables, time slots and
//! judging results.  Time slots are tagged with the store's current *epoch*
//! (the hackathon edition); a scheduling run replaces the current epoch's
//! slots and leaves other epochs alone.
//!
//! All collections are kept in creation order, which is the order
//! [`assignment_units`](JudgingStore::assignment_units) hands to the
//! scheduler and therefore the default tie-break order.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{
    AssignmentUnit, Project, ProjectId, ProjectSubmission, ProjectSummary, Table, TableId,
    TimeSlot, Track, TrackId,
};
use crate::tables::TablePlan;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    UnknownProject(ProjectId),

    #[error("{0} not found")]
    UnknownTable(TableId),
}

// ── Stored records and query views ────────────────────────────────────────────

/// A time slot as stored, tagged with its epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSlot {
    pub epoch: String,
    pub slot: TimeSlot,
}

/// A judge's note that they have seen a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgingResult {
    pub project: ProjectId,
    pub judge: String,
    pub comment: String,
}

/// One of a project's slots, with where it takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSlotView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub table: TableId,
    pub table_number: u32,
    pub track: String,
}

/// One slot at a table, with who presents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSlotView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub project: ProjectSummary,
}

/// A distinct slot window on the schedule timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ── JudgingStore ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct JudgingStore {
    epoch: String,
    next_id: u64,
    tracks: Vec<Track>,
    projects: Vec<Project>,
    memberships: Vec<AssignmentUnit>,
    tables: Vec<Table>,
    slots: Vec<StoredSlot>,
    results: Vec<JudgingResult>,
}

impl JudgingStore {
    pub fn new(epoch: impl Into<String>) -> Self {
        Self {
            epoch: epoch.into(),
            next_id: 1,
            tracks: Vec::new(),
            projects: Vec::new(),
            memberships: Vec::new(),
            tables: Vec::new(),
            slots: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Switch to a new epoch.  Slots of the previous epoch are kept.
    pub fn set_epoch(&mut self, epoch: impl Into<String>) {
        self.epoch = epoch.into();
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── Projects and tracks ───────────────────────────────────────────────────

    /// Replace every project, track, table and result with `submissions`.
    ///
    /// Each project is entered in `general_track` plus its listed tracks;
    /// tracks are created on first mention and shared afterwards.  A track
    /// listed twice for one project yields one membership.
    pub fn upload_projects(&mut self, submissions: &[ProjectSubmission], general_track: &str) {
        self.projects.clear();
        self.memberships.clear();
        self.tracks.clear();
        self.tables.clear();
        self.slots.clear();
        self.results.clear();

        let general = self.upsert_track(general_track);

        for submission in submissions {
            let id = ProjectId(self.allocate_id());
            self.projects.push(Project {
                id,
                name: submission.name.clone(),
                description: submission.description.clone(),
                link: submission.link.clone(),
            });

            let mut entered = HashSet::from([general]);
            self.memberships.push(AssignmentUnit::new(id, general));

            for name in &submission.tracks {
                let track = self.upsert_track(name);
                if entered.insert(track) {
                    self.memberships.push(AssignmentUnit::new(id, track));
                }
            }
        }

        info!(
            projects = self.projects.len(),
            tracks = self.tracks.len(),
            memberships = self.memberships.len(),
            "Projects uploaded"
        );
    }

    /// Return the id of the track called `name`, creating it if needed.
    pub fn upsert_track(&mut self, name: &str) -> TrackId {
        if let Some(track) = self.track_by_name(name) {
            return track.id;
        }
        let id = TrackId(self.allocate_id());
        self.tracks.push(Track {
            id,
            name: name.to_string(),
        });
        debug!(track = name, id = %id, "track created");
        id
    }

    /// Enter `project` in the track called `track_name`, creating the track
    /// if needed.  Entering a track twice is a no-op.
    pub fn enter_track(
        &mut self,
        project: ProjectId,
        track_name: &str,
    ) -> Result<TrackId, StoreError> {
        if self.project(project).is_none() {
            return Err(StoreError::UnknownProject(project));
        }
        let track = self.upsert_track(track_name);
        let unit = AssignmentUnit::new(project, track);
        if !self.memberships.contains(&unit) {
            self.memberships.push(unit);
        }
        Ok(track)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_by_name(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// All projects as summaries, sorted by name.
    pub fn projects(&self) -> Vec<ProjectSummary> {
        let mut all: Vec<_> = self.projects.iter().map(Project::summary).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of projects entered in each track, in track creation order.
    pub fn track_project_counts(&self) -> Vec<(Track, usize)> {
        self.tracks
            .iter()
            .map(|t| {
                let count = self.memberships.iter().filter(|m| m.track == t.id).count();
                (t.clone(), count)
            })
            .collect()
    }

    /// Every (project, track) membership, in creation order.
    pub fn assignment_units(&self) -> Vec<AssignmentUnit> {
        self.memberships.clone()
    }

    // ── Tables ────────────────────────────────────────────────────────────────

    /// Replace all tables with `plans`.  The current epoch's time slots are
    /// discarded too since they refer to the old tables.
    pub fn replace_tables(&mut self, plans: &[TablePlan]) -> Vec<Table> {
        self.clear_epoch_slots();
        self.tables.clear();

        for plan in plans {
            let id = TableId(self.allocate_id());
            self.tables.push(Table {
                id,
                number: plan.number,
                track: plan.track,
            });
        }
        self.tables.clone()
    }

    /// All tables ordered by number.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables = self.tables.clone();
        tables.sort_by_key(|t| t.number);
        tables
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    // ── Time slots ────────────────────────────────────────────────────────────

    /// Discard the current epoch's slots and store `slots` in their place.
    pub fn replace_time_slots(&mut self, slots: Vec<TimeSlot>) {
        let removed = self.clear_epoch_slots();
        let epoch = self.epoch.clone();
        let added = slots.len();
        for slot in slots {
            self.slots.push(StoredSlot {
                epoch: epoch.clone(),
                slot,
            });
        }
        info!(epoch = %epoch, removed, added, "Time slots replaced");
    }

    fn clear_epoch_slots(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|s| s.epoch != self.epoch);
        before - self.slots.len()
    }

    fn epoch_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots
            .iter()
            .filter(move |s| s.epoch == self.epoch)
            .map(|s| &s.slot)
    }

    /// Which project occupies each table at `instant`.
    pub fn assignments_at(&self, instant: DateTime<Utc>) -> BTreeMap<TableId, ProjectSummary> {
        self.epoch_slots()
            .filter(|s| s.contains(instant))
            .filter_map(|s| self.project(s.project).map(|p| (s.table, p.summary())))
            .collect()
    }

    /// Every slot of `project`, ordered by start time.
    pub fn project_time_slots(&self, project: ProjectId) -> Vec<ProjectSlotView> {
        let mut views: Vec<_> = self
            .epoch_slots()
            .filter(|s| s.project == project)
            .map(|s| ProjectSlotView {
                start: s.start,
                end: s.end,
                table: s.table,
                table_number: self.table(s.table).map(|t| t.number).unwrap_or_default(),
                track: self
                    .track(s.track)
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        views.sort_by_key(|v| v.start);
        views
    }

    /// Every slot at `table`, ordered by start time.
    pub fn table_time_slots(&self, table: TableId) -> Vec<TableSlotView> {
        let mut views: Vec<_> = self
            .epoch_slots()
            .filter(|s| s.table == table)
            .filter_map(|s| self.table_slot_view(s))
            .collect();
        views.sort_by_key(|v| v.start);
        views
    }

    fn table_slot_view(&self, slot: &TimeSlot) -> Option<TableSlotView> {
        let project = self.project(slot.project)?;
        Some(TableSlotView {
            start: slot.start,
            end: slot.end,
            project: project.summary(),
        })
    }

    /// Distinct slot windows, one per start time, ordered by start.
    pub fn slot_windows(&self) -> Vec<SlotWindow> {
        let mut by_start: BTreeMap<DateTime<Utc>, DateTime<Utc>> = BTreeMap::new();
        for slot in self.epoch_slots() {
            by_start.entry(slot.start).or_insert(slot.end);
        }
        by_start
            .into_iter()
            .map(|(start, end)| SlotWindow { start, end })
            .collect()
    }

    /// Projects scheduled at `table`, ordered by id.
    pub fn table_projects(&self, table: TableId) -> Vec<ProjectSummary> {
        let ids: BTreeSet<ProjectId> = self
            .epoch_slots()
            .filter(|s| s.table == table)
            .map(|s| s.project)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.project(id).map(Project::summary))
            .collect()
    }

    // ── Judging results ───────────────────────────────────────────────────────

    pub fn record_judging_result(
        &mut self,
        project: ProjectId,
        judge: &str,
        comment: &str,
    ) -> Result<(), StoreError> {
        if self.project(project).is_none() {
            return Err(StoreError::UnknownProject(project));
        }
        self.results.push(JudgingResult {
            project,
            judge: judge.to_string(),
            comment: comment.to_string(),
        });
        Ok(())
    }

    pub fn judging_results(&self) -> &[JudgingResult] {
        &self.results
    }

    /// The earliest project scheduled at `table`, in the table's track, that
    /// `judge` has not judged yet.
    pub fn next_project(
        &self,
        table: TableId,
        judge: &str,
    ) -> Result<Option<ProjectSummary>, StoreError> {
        let table = self.table(table).ok_or(StoreError::UnknownTable(table))?;

        let judged: HashSet<ProjectId> = self
            .results
            .iter()
            .filter(|r| r.judge == judge)
            .map(|r| r.project)
            .collect();

        let mut candidates: Vec<&TimeSlot> = self
            .epoch_slots()
            .filter(|s| s.table == table.id)
            .filter(|s| !judged.contains(&s.project))
            .filter(|s| {
                self.memberships
                    .iter()
                    .any(|m| m.project == s.project && m.track == table.track)
            })
            .collect();
        candidates.sort_by_key(|s| s.start);

        Ok(candidates
            .first()
            .and_then(|s| self.project(s.project))
            .map(Project::summary))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn submission(name: &str, tracks: &[&str]) -> ProjectSubmission {
        ProjectSubmission {
            name: name.to_string(),
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Store with "Lamp" (General, MLH) and "Ledger" (General), one table
    /// per track and a hand-written schedule.
    fn scheduled_store() -> (JudgingStore, Vec<Table>) {
        let mut store = JudgingStore::new("DH11");
        store.upload_projects(
            &[submission("Lamp", &["MLH"]), submission("Ledger", &[])],
            "General",
        );
        let general = store.track_by_name("General").unwrap().id;
        let mlh = store.track_by_name("MLH").unwrap().id;
        let tables = store.replace_tables(&[
            TablePlan {
                number: 1,
                track: general,
            },
            TablePlan {
                number: 2,
                track: mlh,
            },
        ]);
        let lamp = store.project_by_name("Lamp").unwrap().id;
        let ledger = store.project_by_name("Ledger").unwrap().id;

        let lamp_general = AssignmentUnit::new(lamp, general);
        let ledger_general = AssignmentUnit::new(ledger, general);
        let lamp_mlh = AssignmentUnit::new(lamp, mlh);

        store.replace_time_slots(vec![
            TimeSlot::spanning(lamp_general, tables[0].id, at(9, 0), 10),
            TimeSlot::spanning(ledger_general, tables[0].id, at(9, 10), 10),
            TimeSlot::spanning(lamp_mlh, tables[1].id, at(9, 10), 5),
        ]);
        (store, tables)
    }

    // ── upload_projects ───────────────────────────────────────────────────────

    #[test]
    fn upload_enters_every_project_in_general_track() {
        let mut store = JudgingStore::new("DH11");
        store.upload_projects(
            &[submission("A", &["Hardware"]), submission("B", &[])],
            "General",
        );

        let counts = store.track_project_counts();
        assert_eq!(counts[0].0.name, "General");
        assert_eq!(counts[0].1, 2);
        assert_eq!(counts[1].0.name, "Hardware");
        assert_eq!(counts[1].1, 1);
        assert_eq!(store.assignment_units().len(), 3);
    }

    #[test]
    fn upload_shares_tracks_and_ignores_repeated_memberships() {
        let mut store = JudgingStore::new("DH11");
        store.upload_projects(
            &[
                submission("A", &["MLH", "MLH", "General"]),
                submission("B", &["MLH"]),
            ],
            "General",
        );
        assert_eq!(store.tracks().len(), 2);
        assert_eq!(store.assignment_units().len(), 4);
    }

    #[test]
    fn upload_replaces_previous_data() {
        let (mut store, _) = scheduled_store();
        store.upload_projects(&[submission("Fresh", &[])], "General");

        assert_eq!(store.projects().len(), 1);
        assert!(store.tables().is_empty());
        assert!(store.slot_windows().is_empty());
        assert!(store.project_by_name("Lamp").is_none());
    }

    #[test]
    fn enter_track_adds_one_membership() {
        let mut store = JudgingStore::new("DH11");
        store.upload_projects(&[submission("A", &[])], "General");
        let a = store.project_by_name("A").unwrap().id;

        let design = store.enter_track(a, "Design").unwrap();
        store.enter_track(a, "Design").unwrap();
        assert_eq!(store.track_by_name("Design").map(|t| t.id), Some(design));
        assert_eq!(store.assignment_units().len(), 2);
        assert_eq!(
            store.enter_track(ProjectId(999), "Design").unwrap_err(),
            StoreError::UnknownProject(ProjectId(999))
        );
    }

    #[test]
    fn projects_are_listed_by_name() {
        let mut store = JudgingStore::new("DH11");
        store.upload_projects(
            &[submission("Zeta", &[]), submission("Alpha", &[])],
            "General",
        );
        let names: Vec<_> = store.projects().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    // ── Time-slot queries ─────────────────────────────────────────────────────

    #[test]
    fn assignments_at_reports_occupied_tables() {
        let (store, tables) = scheduled_store();

        let at_start = store.assignments_at(at(9, 0));
        assert_eq!(at_start.len(), 1);
        assert_eq!(at_start[&tables[0].id].name, "Lamp");

        let later = store.assignments_at(at(9, 12));
        assert_eq!(later[&tables[0].id].name, "Ledger");
        assert_eq!(later[&tables[1].id].name, "Lamp");

        assert!(store.assignments_at(at(9, 20)).is_empty());
    }

    #[test]
    fn project_time_slots_are_ordered_with_location() {
        let (store, _) = scheduled_store();
        let lamp = store.project_by_name("Lamp").unwrap().id;

        let slots = store.project_time_slots(lamp);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[0].track, "General");
        assert_eq!(slots[0].table_number, 1);
        assert_eq!(slots[1].track, "MLH");
        assert_eq!(slots[1].table_number, 2);
    }

    #[test]
    fn table_time_slots_and_projects() {
        let (store, tables) = scheduled_store();
        let slots = store.table_time_slots(tables[0].id);
        let names: Vec<_> = slots.iter().map(|s| s.project.name.as_str()).collect();
        assert_eq!(names, vec!["Lamp", "Ledger"]);

        let projects = store.table_projects(tables[1].id);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Lamp");
    }

    #[test]
    fn slot_windows_are_distinct_by_start() {
        let (store, _) = scheduled_store();
        let windows = store.slot_windows();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, at(9, 0));
        assert_eq!(windows[1].start, at(9, 10));
    }

    #[test]
    fn replacing_slots_only_touches_current_epoch() {
        let (mut store, _) = scheduled_store();
        store.set_epoch("DH12");
        store.replace_time_slots(vec![]);
        assert!(store.slot_windows().is_empty());

        store.set_epoch("DH11");
        assert_eq!(store.slot_windows().len(), 2, "DH11 slots must survive");
    }

    #[test]
    fn replacing_tables_discards_current_slots() {
        let (mut store, _) = scheduled_store();
        store.replace_tables(&[]);
        assert!(store.slot_windows().is_empty());
        assert!(store.tables().is_empty());
    }

    // ── Judging results ───────────────────────────────────────────────────────

    #[test]
    fn next_project_skips_projects_already_judged() {
        let (mut store, tables) = scheduled_store();
        let lamp = store.project_by_name("Lamp").unwrap().id;

        let first = store.next_project(tables[0].id, "judge-1").unwrap().unwrap();
        assert_eq!(first.name, "Lamp");

        store.record_judging_result(lamp, "judge-1", "demo").unwrap();
        let results = store.judging_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].project, lamp);
        assert_eq!(results[0].judge, "judge-1");
        assert_eq!(results[0].comment, "demo");

        let second = store.next_project(tables[0].id, "judge-1").unwrap().unwrap();
        assert_eq!(second.name, "Ledger");

        // another judge still starts with Lamp
        let other = store.next_project(tables[0].id, "judge-2").unwrap().unwrap();
        assert_eq!(other.name, "Lamp");
    }

    #[test]
    fn next_project_is_none_when_everything_is_judged() {
        let (mut store, tables) = scheduled_store();
        let lamp = store.project_by_name("Lamp").unwrap().id;
        store.record_judging_result(lamp, "j", "").unwrap();
        assert_eq!(store.next_project(tables[1].id, "j").unwrap(), None);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let (mut store, _) = scheduled_store();
        assert_eq!(
            store.next_project(TableId(999), "j").unwrap_err(),
            StoreError::UnknownTable(TableId(999))
        );
        assert_eq!(
            store
                .record_judging_result(ProjectId(999), "j", "")
                .unwrap_err(),
            StoreError::UnknownProject(ProjectId(999))
        );
    }
}
