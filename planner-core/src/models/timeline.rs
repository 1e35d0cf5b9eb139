use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::item::{ItemKind, WorkItem};
use super::sprint::Sprint;

/// One placed row of a sprint timeline.
///
/// Rows are derived on every allocation pass and have no identity beyond the
/// item they wrap. A renderer marks day columns
/// `[start_day, start_day + duration_days)` as occupied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineRow {
    pub item: WorkItem,
    /// 0 for Features and orphans, 1 for Stories/Tasks, 2 for Subtasks.
    pub indent_level: u8,
    pub start_day: u32,
    pub duration_days: u32,
}

impl TimelineRow {
    /// Exclusive end day.
    pub fn end_day(&self) -> u32 {
        self.start_day + self.duration_days
    }

    pub fn occupies(&self, day: u32) -> bool {
        day >= self.start_day && day < self.end_day()
    }
}

/// Everything a renderer needs: the sprint, its business-day columns and the
/// placed rows in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintTimeline {
    pub sprint: Sprint,
    pub days: Vec<NaiveDate>,
    pub rows: Vec<TimelineRow>,
}

/// Display filter applied to an already-allocated timeline.
///
/// Filtering never changes placements. A row with no member always passes the
/// member filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineFilter {
    /// Kinds to keep. Empty keeps every kind.
    #[serde(default)]
    pub kinds: Vec<ItemKind>,
    #[serde(default)]
    pub member_id: Option<i64>,
}

impl TimelineFilter {
    pub fn matches(&self, row: &TimelineRow) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&row.item.kind) {
            return false;
        }
        match (self.member_id, row.item.member_id) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }

    pub fn apply(&self, rows: Vec<TimelineRow>) -> Vec<TimelineRow> {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

/// How much of a sprint one member has committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberLoad {
    pub member_id: i64,
    pub member_name: String,
    /// Sum of the member's Subtask days in the sprint.
    pub allocated_days: u32,
    /// Business days in the sprint.
    pub capacity_days: u32,
    /// Day index where the member's sequential packing ends.
    pub busy_until: u32,
    /// Business-day dates from `busy_until` to the end of the sprint.
    pub free_days: Vec<NaiveDate>,
}

impl MemberLoad {
    pub fn is_overloaded(&self) -> bool {
        self.allocated_days > self.capacity_days
    }
}
