/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Judging time-slot scheduler for hackathon project judging.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/      – YAML event configuration (epoch, track names, projects)
//! ├── model        – tracks, tables, projects, assignment units, time slots
//! ├── tables/      – table derivation from per-track project counts
//! ├── scheduler/   – starvation-weighted slot scheduler
//! ├── store/       – epoch-scoped judging store and read queries
//! └── service/     – async judging service serialising scheduling runs
//! ```

pub mod config;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tables;
