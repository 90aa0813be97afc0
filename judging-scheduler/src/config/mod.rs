//! Event configuration loading.
//!
//! One YAML file describes a judging event: the scheduling settings and the
//! projects to upload.
//!
//! ```yaml
//! event:
//!   epoch: "DH11"
//!   cross_track: "MLH"
//!   general_track: "General"
//!   projects_per_table: 4
//!   slot_duration_minutes: 10
//!   start_time: "2026-03-01T09:00:00Z"
//! projects:
//!   - name: "Lamp"
//!     description: "A lamp that listens"
//!     link: "https://example.org/lamp"
//!     tracks: ["MLH", "Hardware"]
//! ```
//!
//! Every `event` field is optional; missing values fall back to
//! [`EventSettings::default()`].

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::model::ProjectSubmission;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct EventConfigFile {
    #[serde(default)]
    event: EventSettingsEntry,
    #[serde(default)]
    projects: Vec<ProjectSubmission>,
}

#[derive(Debug, Default, Deserialize)]
struct EventSettingsEntry {
    epoch: Option<String>,
    cross_track: Option<String>,
    general_track: Option<String>,
    projects_per_table: Option<u32>,
    slot_duration_minutes: Option<u32>,
    start_time: Option<DateTime<Utc>>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Scheduling settings for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSettings {
    /// Scheduling scope; time slots are tagged with it and replaced per epoch.
    pub epoch: String,
    /// Name of the track judged in 5-minute sub-slots at a single table.
    pub cross_track: String,
    /// Track every uploaded project is entered in.
    pub general_track: String,
    pub projects_per_table: u32,
    pub slot_duration_minutes: u32,
    /// `None` when the file leaves it to the command line.
    pub start_time: Option<DateTime<Utc>>,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            epoch: String::from("DH11"),
            cross_track: String::from("MLH"),
            general_track: String::from("General"),
            projects_per_table: 4,
            slot_duration_minutes: 10,
            start_time: None,
        }
    }
}

// ── EventConfigManager ────────────────────────────────────────────────────────

/// Loads and holds the event configuration from a YAML file.
#[derive(Debug, Default)]
pub struct EventConfigManager {
    settings: EventSettings,
    projects: Vec<ProjectSubmission>,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl EventConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces the held settings and projects.
    ///
    /// Projects with an empty name are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading event configuration from: {}", path.display());

        self.settings = EventSettings::default();
        self.projects.clear();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: EventConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let defaults = EventSettings::default();
        let entry = file.event;
        self.settings = EventSettings {
            epoch: entry.epoch.unwrap_or(defaults.epoch),
            cross_track: entry.cross_track.unwrap_or(defaults.cross_track),
            general_track: entry.general_track.unwrap_or(defaults.general_track),
            projects_per_table: entry
                .projects_per_table
                .unwrap_or(defaults.projects_per_table),
            slot_duration_minutes: entry
                .slot_duration_minutes
                .unwrap_or(defaults.slot_duration_minutes),
            start_time: entry.start_time,
        };

        for project in file.projects {
            if project.name.trim().is_empty() {
                warn!("Skipping project with empty name");
                continue;
            }
            debug!(project = %project.name, tracks = ?project.tracks, "project loaded");
            self.projects.push(project);
        }

        if self.projects.is_empty() {
            warn!("No projects found in configuration file");
        }

        self.loaded = true;

        info!(
            epoch = %self.settings.epoch,
            cross_track = %self.settings.cross_track,
            projects = self.projects.len(),
            "Successfully loaded event configuration"
        );

        Ok(())
    }

    pub fn settings(&self) -> &EventSettings {
        &self.settings
    }

    pub fn projects(&self) -> &[ProjectSubmission] {
        &self.projects
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
