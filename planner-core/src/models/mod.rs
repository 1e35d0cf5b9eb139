//! Domain models for sprint planning.
//!
//! # Core Concepts
//!
//! - [`Sprint`]: a fixed number of working weeks with a derived end date.
//! - [`Member`]: a person Subtasks are assigned to.
//! - [`WorkItem`]: a Feature, Story, Task or Subtask. Items reference their
//!   parent by id and are validated through a [`WorkItemDraft`] before they
//!   are stored.
//!
//! ## Derived Views
//!
//! These are recomputed on every call and never persisted:
//!
//! - [`TimelineRow`]: an item with its start day and duration inside a sprint.
//! - [`MemberLoad`]: a member's committed and free days in a sprint.

mod item;
mod member;
mod sprint;
mod timeline;

pub use item::*;
pub use member::*;
pub use sprint::*;
pub use timeline::*;
