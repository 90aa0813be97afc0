/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use judging_scheduler::config::EventConfigManager;
use judging_scheduler::scheduler::{SlotScheduler, TieBreak};
use judging_scheduler::service::{CreateTimeSlotsRequest, CreateTimeSlotsResponse, JudgingService};
use judging_scheduler::store::{ProjectSlotView, TableSlotView};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Hackathon judging time-slot scheduler.
///
/// Example:
///   judging-scheduler -c event.yaml -s 2026-03-01T09:00:00Z -d 10 \
///                     --at 2026-03-01T09:12:00Z
#[derive(Debug, Parser)]
#[command(
    name = "judging-scheduler",
    about = "Hackathon judging time-slot scheduler",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML event configuration file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Start of judging (RFC 3339); overrides `event.start_time`.
    #[arg(short = 's', long = "start")]
    start: Option<String>,

    /// Length of one ordinary slot in minutes; overrides the config file.
    #[arg(short = 'd', long = "slot-minutes")]
    slot_minutes: Option<u32>,

    /// Projects judged per table when deriving tables; overrides the config file.
    #[arg(short = 'p', long = "projects-per-table")]
    per_table: Option<u32>,

    /// How ties between equally starved projects are broken.
    #[arg(long = "tie-break", value_enum, default_value_t = TieBreakArg::PoolOrder)]
    tie_break: TieBreakArg,

    /// Print which project occupies each table at this instant (RFC 3339).
    #[arg(long = "at")]
    at: Option<String>,

    /// Print the time slots of the project with this name.
    #[arg(long = "project")]
    project: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TieBreakArg {
    PoolOrder,
    UnitKey,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::PoolOrder => TieBreak::PoolOrder,
            TieBreakArg::UnitKey => TieBreak::UnitKey,
        }
    }
}

// ── Printed report ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ScheduleReport {
    epoch: String,
    #[serde(flatten)]
    summary: CreateTimeSlotsResponse,
    tables: Vec<TableReport>,
}

#[derive(Debug, Serialize)]
struct TableReport {
    number: u32,
    track: String,
    slots: Vec<TableSlotView>,
}

#[derive(Debug, Serialize)]
struct ProjectReport {
    project: String,
    slots: Vec<ProjectSlotView>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr so stdout carries only the YAML schedule.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(
        config = %cli.config.display(),
        start = ?cli.start,
        slot_minutes = ?cli.slot_minutes,
        projects_per_table = ?cli.per_table,
        tie_break = ?cli.tie_break,
        "Configuration"
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load event configuration ──────────────────────────────────────────────
    let mut config = EventConfigManager::new();
    config.load_from_file(&cli.config)?;
    let settings = config.settings();

    let start = match (&cli.start, settings.start_time) {
        (Some(raw), _) => raw.clone(),
        (None, Some(t)) => t.to_rfc3339(),
        (None, None) => bail!("no start time: pass --start or set event.start_time"),
    };
    let slot_minutes = cli.slot_minutes.unwrap_or(settings.slot_duration_minutes);
    let projects_per_table = cli.per_table.unwrap_or(settings.projects_per_table);

    // ── Upload, derive tables, schedule ───────────────────────────────────────
    let scheduler = SlotScheduler::with_tie_break(cli.tie_break.into());
    let service = JudgingService::new(settings, scheduler);
    service.upload_projects(config.projects()).await;

    let tables = service
        .create_tables(projects_per_table)
        .await
        .context("Failed to create tables")?;
    if tables == 0 {
        warn!("No tables were created; the event has no projects");
    }

    let summary = service
        .create_time_slots(CreateTimeSlotsRequest {
            slot_duration_minutes: slot_minutes,
            start_time: start,
        })
        .await
        .context("Failed to create time slots")?;

    // ── Print schedule ────────────────────────────────────────────────────────
    let tables = service
        .with_store(|store| {
            store
                .tables()
                .into_iter()
                .map(|t| TableReport {
                    number: t.number,
                    track: store
                        .track(t.track)
                        .map(|tr| tr.name.clone())
                        .unwrap_or_default(),
                    slots: store.table_time_slots(t.id),
                })
                .collect::<Vec<_>>()
        })
        .await;

    let report = ScheduleReport {
        epoch: settings.epoch.clone(),
        summary,
        tables,
    };
    print!("{}", serde_yaml::to_string(&report)?);

    // ── Optional queries ──────────────────────────────────────────────────────
    if let Some(at) = &cli.at {
        let assignments = service.assignments_at(at).await?;
        let by_number = service
            .with_store(|store| {
                assignments
                    .into_iter()
                    .map(|(table, project)| {
                        let number = store.table(table).map(|t| t.number).unwrap_or_default();
                        (format!("table {number}"), project.name)
                    })
                    .collect::<std::collections::BTreeMap<_, _>>()
            })
            .await;
        println!("---");
        print!("{}", serde_yaml::to_string(&by_number)?);
    }

    if let Some(name) = &cli.project {
        let Some(project) = service.find_project(name).await else {
            bail!("no project named '{name}'");
        };
        let slots = service.project_time_slots(project.id).await?;
        println!("---");
        let project_report = ProjectReport {
            project: project.name,
            slots,
        };
        print!("{}", serde_yaml::to_string(&project_report)?);
    }

    Ok(())
}
