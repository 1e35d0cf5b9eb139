//! Sprint planning engine.
//!
//! Converts a sprint into business-day columns, orders its work items into a
//! Feature → Story/Task → Subtask hierarchy, packs each member's Subtasks
//! sequentially, and validates capacity rules before items are written.
//!
//! # Modules
//!
//! - [`calendar`]: business-day arithmetic
//! - [`hierarchy`]: display ordering over an id-indexed arena
//! - [`allocation`]: start day and duration for every row
//! - [`priority`]: explicit Subtask sibling order
//! - [`validation`]: write-time hierarchy and capacity rules
//! - [`store`]: storage interfaces and an in-memory store
//! - [`planner`]: facade used by servers and CLIs

pub mod allocation;
pub mod calendar;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod planner;
pub mod priority;
pub mod store;
pub mod validation;

pub use error::{PlanError, Result};
pub use planner::Planner;
pub use store::{ItemStore, MemberStore, MemoryStore, SprintStore, Store};
pub use validation::ValidationError;
