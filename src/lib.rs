//! Sprint planning server: SQLite persistence, HTTP API and CLI helpers on
//! top of [`planner_core`].

pub mod api;
pub mod config;
pub mod db;
pub mod render;

pub use planner_core::models;
pub use planner_core::{calendar, PlanError, Planner};
