/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Judging service: the operations an admin dashboard or a project team
//! calls.
//!
//! [`JudgingService`] owns the [`JudgingStore`] behind a
//! `tokio::sync::Mutex`.  Every mutation, and in particular a whole
//! create-time-slots run from reading the tables to writing the new batch,
//! happens under that lock, so two concurrent runs cannot interleave their
//! deletes and inserts.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::EventSettings;
use crate::model::{ProjectId, ProjectSubmission, ProjectSummary, TableId};
use crate::scheduler::{ScheduleRequest, SchedulerError, SlotScheduler};
use crate::store::{JudgingStore, ProjectSlotView, SlotWindow, StoreError, TableSlotView};
use crate::tables::{plan_tables, TableError};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error returned by every [`JudgingService`] operation.
///
/// | Variant | Meaning for the caller |
/// |---|---|
/// | `InvalidArgument` | fix the request |
/// | `NoTableForTrack` | re-create tables, then schedule again |
/// | `Scheduler` / `Tables` | configuration problem, see message |
/// | `Store` | unknown id |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// [`SchedulerError::NoTableForTrack`] with the track's name resolved.
    #[error("no table found for track '{track}' ({pending} pending unit(s)); create tables first")]
    NoTableForTrack { track: String, pending: usize },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Tables(#[from] TableError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ── Requests / responses ──────────────────────────────────────────────────────

/// Input of [`JudgingService::create_time_slots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTimeSlotsRequest {
    pub slot_duration_minutes: u32,
    /// ISO-8601 / RFC 3339 timestamp, e.g. `2026-03-01T09:00:00Z`.
    pub start_time: String,
}

/// Output of [`JudgingService::create_time_slots`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTimeSlotsResponse {
    pub end_time: DateTime<Utc>,
    pub num_tables: usize,
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ServiceError::InvalidArgument(format!("'{raw}' is not an ISO-8601 timestamp: {e}"))
        })
}

// ── JudgingService ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JudgingService {
    store: Arc<Mutex<JudgingStore>>,
    scheduler: SlotScheduler,
    cross_track: String,
    general_track: String,
}

impl JudgingService {
    /// Create a service with an empty store for `settings.epoch`.
    pub fn new(settings: &EventSettings, scheduler: SlotScheduler) -> Self {
        Self {
            store: Arc::new(Mutex::new(JudgingStore::new(settings.epoch.clone()))),
            scheduler,
            cross_track: settings.cross_track.clone(),
            general_track: settings.general_track.clone(),
        }
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Replace all projects (and with them tracks, tables and slots).
    pub async fn upload_projects(&self, submissions: &[ProjectSubmission]) {
        let mut store = self.store.lock().await;
        store.upload_projects(submissions, &self.general_track);
    }

    /// Derive tables from the current per-track project counts.  Returns the
    /// number of tables created.
    pub async fn create_tables(&self, projects_per_table: u32) -> Result<usize, ServiceError> {
        let mut store = self.store.lock().await;
        let plans = plan_tables(
            &store.track_project_counts(),
            projects_per_table,
            &self.cross_track,
        )?;
        let tables = store.replace_tables(&plans);
        info!(tables = tables.len(), projects_per_table, "Tables created");
        Ok(tables.len())
    }

    /// Schedule every (project, track) membership and replace the current
    /// epoch's time slots with the result.
    ///
    /// The full schedule is computed before anything is written; on error the
    /// previous schedule is left untouched.
    pub async fn create_time_slots(
        &self,
        request: CreateTimeSlotsRequest,
    ) -> Result<CreateTimeSlotsResponse, ServiceError> {
        if request.slot_duration_minutes == 0 {
            return Err(ServiceError::InvalidArgument(
                "slot_duration_minutes must be at least 1".to_string(),
            ));
        }
        let start_time = parse_timestamp(&request.start_time)?;

        let mut store = self.store.lock().await;

        let tables = store.tables();
        let cross_track_id = store.track_by_name(&self.cross_track).map(|t| t.id);
        let (cross_track, ordinary): (Vec<_>, Vec<_>) = store
            .assignment_units()
            .into_iter()
            .partition(|u| Some(u.track) == cross_track_id);

        if ordinary.is_empty() && cross_track.is_empty() {
            warn!("No assignment units found; nothing to schedule");
            return Ok(CreateTimeSlotsResponse {
                end_time: start_time,
                num_tables: tables.len(),
            });
        }

        let schedule = self
            .scheduler
            .schedule(ScheduleRequest {
                tables,
                ordinary,
                cross_track,
                cross_track_id,
                start_time,
                slot_duration_minutes: request.slot_duration_minutes,
            })
            .map_err(|e| {
                error!("Scheduling failed: {}", e);
                match e {
                    SchedulerError::NoTableForTrack { track, pending } => {
                        ServiceError::NoTableForTrack {
                            track: store
                                .track(track)
                                .map(|t| t.name.clone())
                                .unwrap_or_else(|| track.to_string()),
                            pending,
                        }
                    }
                    other => other.into(),
                }
            })?;

        let response = CreateTimeSlotsResponse {
            end_time: schedule.end_time,
            num_tables: schedule.num_tables,
        };
        store.replace_time_slots(schedule.slots);

        info!(
            end_time = %response.end_time,
            num_tables = response.num_tables,
            "Time slots created"
        );
        Ok(response)
    }

    pub async fn record_judging_result(
        &self,
        project: ProjectId,
        judge: &str,
        comment: &str,
    ) -> Result<(), ServiceError> {
        let mut store = self.store.lock().await;
        store.record_judging_result(project, judge, comment)?;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Which project occupies each table at `time` (RFC 3339).
    pub async fn assignments_at(
        &self,
        time: &str,
    ) -> Result<BTreeMap<TableId, ProjectSummary>, ServiceError> {
        let instant = parse_timestamp(time)?;
        Ok(self.store.lock().await.assignments_at(instant))
    }

    /// All slots of `project`, ordered by start time.
    pub async fn project_time_slots(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectSlotView>, ServiceError> {
        let store = self.store.lock().await;
        if store.project(project).is_none() {
            return Err(StoreError::UnknownProject(project).into());
        }
        Ok(store.project_time_slots(project))
    }

    /// All slots at `table`, ordered by start time.
    pub async fn table_time_slots(
        &self,
        table: TableId,
    ) -> Result<Vec<TableSlotView>, ServiceError> {
        let store = self.store.lock().await;
        if store.table(table).is_none() {
            return Err(StoreError::UnknownTable(table).into());
        }
        Ok(store.table_time_slots(table))
    }

    /// Distinct slot windows of the current schedule.
    pub async fn time_slots(&self) -> Vec<SlotWindow> {
        self.store.lock().await.slot_windows()
    }

    pub async fn next_project(
        &self,
        table: TableId,
        judge: &str,
    ) -> Result<Option<ProjectSummary>, ServiceError> {
        Ok(self.store.lock().await.next_project(table, judge)?)
    }

    /// Look a project up by its exact name.
    pub async fn find_project(&self, name: &str) -> Option<ProjectSummary> {
        self.store
            .lock()
            .await
            .project_by_name(name)
            .map(|p| p.summary())
    }

    /// Run `f` with shared access to the store (read-only snapshots for
    /// printing).
    pub async fn with_store<R>(&self, f: impl FnOnce(&JudgingStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
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

    fn request(minutes: u32) -> CreateTimeSlotsRequest {
        CreateTimeSlotsRequest {
            slot_duration_minutes: minutes,
            start_time: "2026-03-01T09:00:00Z".to_string(),
        }
    }

    async fn service_with(projects: &[ProjectSubmission], per_table: u32) -> JudgingService {
        let service = JudgingService::new(&EventSettings::default(), SlotScheduler::new());
        service.upload_projects(projects).await;
        service.create_tables(per_table).await.unwrap();
        service
    }

    #[tokio::test]
    async fn create_time_slots_schedules_every_membership() {
        let projects = [
            submission("Lamp", &["MLH"]),
            submission("Ledger", &[]),
            submission("Loom", &["MLH"]),
        ];
        let service = service_with(&projects, 2).await;

        let response = service.create_time_slots(request(10)).await.unwrap();
        // 3 general projects over 2 tables → 2 steps; both MLH fit in sub-slots
        assert_eq!(response.num_tables, 3);
        assert_eq!(response.end_time, at(9, 20));

        let lamp = service.find_project("Lamp").await.unwrap();
        let slots = service.project_time_slots(lamp.id).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[tokio::test]
    async fn rerun_replaces_previous_schedule() {
        let service = service_with(&[submission("Solo", &[])], 1).await;
        service.create_time_slots(request(10)).await.unwrap();

        let later = CreateTimeSlotsRequest {
            slot_duration_minutes: 15,
            start_time: "2026-03-01T13:00:00Z".to_string(),
        };
        let response = service.create_time_slots(later).await.unwrap();
        assert_eq!(response.end_time, at(13, 15));

        let windows = service.time_slots().await;
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, at(13, 0));
    }

    #[tokio::test]
    async fn assignments_at_resolves_the_running_slot() {
        let service = service_with(&[submission("Solo", &[])], 1).await;
        service.create_time_slots(request(10)).await.unwrap();

        let running = "2026-03-01T09:04:00Z";
        let now = service.assignments_at(running).await.unwrap();
        assert_eq!(now.len(), 1);
        assert_eq!(now.values().next().unwrap().name, "Solo");

        let finished = "2026-03-01T09:10:00Z";
        let after = service.assignments_at(finished).await.unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_scheduling() {
        let service = service_with(&[submission("Solo", &[])], 1).await;

        let zero = service.create_time_slots(request(0)).await.unwrap_err();
        assert!(matches!(zero, ServiceError::InvalidArgument(_)));

        let bad_time = CreateTimeSlotsRequest {
            slot_duration_minutes: 10,
            start_time: "tomorrow morning".to_string(),
        };
        let err = service.create_time_slots(bad_time).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn reupload_discards_tables() {
        let service = service_with(&[submission("Solo", &[])], 1).await;
        service
            .upload_projects(&[submission("Solo", &[]), submission("Late", &["Design"])])
            .await;

        let err = service.create_time_slots(request(10)).await.unwrap_err();
        assert_eq!(err, ServiceError::Scheduler(SchedulerError::NoTables));
    }

    #[tokio::test]
    async fn track_without_table_names_the_track() {
        let service = service_with(&[submission("Solo", &[])], 1).await;
        service.create_time_slots(request(10)).await.unwrap();
        // a Design membership appears after the tables were derived
        {
            let mut store = service.store.lock().await;
            let solo = store.project_by_name("Solo").unwrap().id;
            store.enter_track(solo, "Design").unwrap();
        }

        let err = service.create_time_slots(request(10)).await.unwrap_err();
        match err {
            ServiceError::NoTableForTrack { track, pending } => {
                assert_eq!(track, "Design");
                assert_eq!(pending, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        // the previous schedule is untouched
        assert_eq!(service.time_slots().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_event_ends_at_start_time() {
        let service = JudgingService::new(&EventSettings::default(), SlotScheduler::new());
        service.upload_projects(&[]).await;
        let response = service.create_time_slots(request(10)).await.unwrap();
        assert_eq!(response.end_time, at(9, 0));
        assert_eq!(response.num_tables, 0);
    }

    #[tokio::test]
    async fn concurrent_runs_leave_one_consistent_schedule() {
        let projects: Vec<_> = (0..8)
            .map(|i| submission(&format!("P{i}"), &["MLH"]))
            .collect();
        let service = service_with(&projects, 2).await;

        let a = service.clone();
        let b = service.clone();
        let (ra, rb) = tokio::join!(
            a.create_time_slots(request(10)),
            b.create_time_slots(request(15))
        );
        ra.unwrap();
        rb.unwrap();

        // 8 general + 8 MLH memberships, each placed exactly once
        let total: usize = service
            .with_store(|s| {
                s.tables()
                    .iter()
                    .map(|t| s.table_time_slots(t.id).len())
                    .sum()
            })
            .await;
        assert_eq!(total, 16);
    }

    #[tokio::test]
    async fn next_project_follows_judging_results() {
        let service = service_with(&[submission("A", &[]), submission("B", &[])], 2).await;
        service.create_time_slots(request(10)).await.unwrap();

        let table = service.with_store(|s| s.tables()[0].id).await;
        let first = service.next_project(table, "j").await.unwrap().unwrap();
        service
            .record_judging_result(first.id, "j", "solid demo")
            .await
            .unwrap();
        let second = service.next_project(table, "j").await.unwrap().unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let service = service_with(&[submission("Solo", &[])], 1).await;
        service.create_time_slots(request(10)).await.unwrap();

        let missing = ProjectId(999);
        let err = service.project_time_slots(missing).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Store(StoreError::UnknownProject(missing))
        );

        let table = TableId(999);
        let err = service.table_time_slots(table).await.unwrap_err();
        assert_eq!(err, ServiceError::Store(StoreError::UnknownTable(table)));
    }
}
