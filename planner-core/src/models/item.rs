use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Working days in one sprint week.
pub const DAYS_PER_WEEK: u32 = 5;

/// A unit of planned work inside a sprint.
///
/// Items form a three-level hierarchy through `parent_id`:
/// Feature → Story | Task → Subtask. An item only references its parent,
/// it never owns it; relationships are resolved by id lookup.
///
/// `project_id`, `application_id` and `external_code` are display tags and
/// never influence allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    pub id: i64,
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub status: ItemStatus,
    pub sprint_id: i64,
    pub parent_id: Option<i64>,
    pub member_id: Option<i64>,
    /// Explicit order among Subtask siblings. Lower runs first.
    pub priority: Option<i32>,
    pub duration: Option<ItemDuration>,
    pub project_id: Option<i64>,
    pub application_id: Option<i64>,
    pub external_code: Option<String>,
    pub completed_on: Option<NaiveDate>,
}

impl WorkItem {
    /// Duration expressed in working days.
    pub fn own_days(&self) -> u32 {
        self.duration.map(|d| d.days()).unwrap_or(0)
    }

    pub fn is_subtask(&self) -> bool {
        self.kind == ItemKind::Subtask
    }

    /// Draft carrying this item's current values, for re-validation on update.
    pub fn to_draft(&self) -> WorkItemDraft {
        WorkItemDraft {
            id: Some(self.id),
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            status: Some(self.status),
            sprint_id: Some(self.sprint_id),
            parent_id: self.parent_id,
            member_id: self.member_id,
            priority: self.priority,
            duration: self.duration,
            project_id: self.project_id,
            application_id: self.application_id,
            external_code: self.external_code.clone(),
            completed_on: self.completed_on,
        }
    }
}

/// The four work-item kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Feature,
    Story,
    Task,
    Subtask,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [Self::Feature, Self::Story, Self::Task, Self::Subtask];

    /// Kinds this kind may be nested under. Empty means "root only".
    pub fn allowed_parents(&self) -> &'static [ItemKind] {
        match self {
            Self::Feature => &[],
            Self::Story | Self::Task => &[Self::Feature],
            Self::Subtask => &[Self::Story, Self::Task],
        }
    }

    pub fn can_be_child_of(&self, parent: ItemKind) -> bool {
        self.allowed_parents().contains(&parent)
    }

    /// Whether durations of this kind are recorded in days rather than weeks.
    pub fn uses_days(&self) -> bool {
        matches!(self, Self::Subtask)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Story => "story",
            Self::Task => "task",
            Self::Subtask => "subtask",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "story" => Some(Self::Story),
            "task" => Some(Self::Task),
            "subtask" => Some(Self::Subtask),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status. Carried through untouched by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Created,
    Planned,
    Refined,
    InProgress,
    InTesting,
    Done,
    Cancelled,
    Blocked,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Planned => "planned",
            Self::Refined => "refined",
            Self::InProgress => "in_progress",
            Self::InTesting => "in_testing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "planned" => Some(Self::Planned),
            "refined" => Some(Self::Refined),
            "in_progress" => Some(Self::InProgress),
            "in_testing" => Some(Self::InTesting),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Planned length of an item.
///
/// Feature, Story and Task are sized in weeks; Subtasks in days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemDuration {
    Weeks(u32),
    Days(u32),
}

impl ItemDuration {
    pub fn days(&self) -> u32 {
        match *self {
            Self::Weeks(w) => w * DAYS_PER_WEEK,
            Self::Days(d) => d,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Weeks(0) | Self::Days(0))
    }

    /// Split into the `(weeks, days)` column pair used by row stores.
    pub fn to_columns(duration: Option<Self>) -> (Option<u32>, Option<u32>) {
        match duration {
            Some(Self::Weeks(w)) => (Some(w), None),
            Some(Self::Days(d)) => (None, Some(d)),
            None => (None, None),
        }
    }

    /// Inverse of [`ItemDuration::to_columns`]. A positive day count wins
    /// over a week count.
    pub fn from_columns(weeks: Option<u32>, days: Option<u32>) -> Option<Self> {
        match (weeks, days) {
            (_, Some(d)) if d > 0 => Some(Self::Days(d)),
            (Some(w), _) if w > 0 => Some(Self::Weeks(w)),
            (_, Some(d)) => Some(Self::Days(d)),
            (Some(w), None) => Some(Self::Weeks(w)),
            (None, None) => None,
        }
    }
}

/// Write-side shape of a work item, checked by the validator before it is
/// persisted. `id` is `None` for a create and `Some` for an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemDraft {
    #[serde(default)]
    pub id: Option<i64>,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub sprint_id: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub member_id: Option<i64>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub duration: Option<ItemDuration>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub application_id: Option<i64>,
    #[serde(default)]
    pub external_code: Option<String>,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}

impl WorkItemDraft {
    /// Minimal draft; everything optional is left empty.
    pub fn new(kind: ItemKind, title: impl Into<String>, sprint_id: i64) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            description: None,
            status: Some(ItemStatus::Created),
            sprint_id: Some(sprint_id),
            parent_id: None,
            member_id: None,
            priority: None,
            duration: None,
            project_id: None,
            application_id: None,
            external_code: None,
            completed_on: None,
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_member(mut self, member_id: i64) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn with_duration(mut self, duration: ItemDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn own_days(&self) -> u32 {
        self.duration.map(|d| d.days()).unwrap_or(0)
    }

    /// Materialize the draft under `id`.
    pub fn into_item(self, id: i64) -> Result<WorkItem, ValidationError> {
        let status = self
            .status
            .ok_or(ValidationError::MissingField { field: "status" })?;
        let sprint_id = self
            .sprint_id
            .ok_or(ValidationError::MissingField { field: "sprint_id" })?;

        Ok(WorkItem {
            id,
            kind: self.kind,
            title: self.title.trim().to_string(),
            description: self.description,
            status,
            sprint_id,
            parent_id: self.parent_id,
            member_id: self.member_id,
            priority: self.priority,
            duration: self.duration,
            project_id: self.project_id,
            application_id: self.application_id,
            external_code: self.external_code,
            completed_on: self.completed_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_parent_table() {
        assert!(ItemKind::Feature.allowed_parents().is_empty());
        assert!(ItemKind::Story.can_be_child_of(ItemKind::Feature));
        assert!(ItemKind::Task.can_be_child_of(ItemKind::Feature));
        assert!(!ItemKind::Story.can_be_child_of(ItemKind::Story));
        assert!(ItemKind::Subtask.can_be_child_of(ItemKind::Story));
        assert!(ItemKind::Subtask.can_be_child_of(ItemKind::Task));
        assert!(!ItemKind::Subtask.can_be_child_of(ItemKind::Feature));
        assert!(!ItemKind::Subtask.can_be_child_of(ItemKind::Subtask));
    }

    #[test]
    fn test_duration_in_days() {
        assert_eq!(ItemDuration::Weeks(2).days(), 10);
        assert_eq!(ItemDuration::Days(3).days(), 3);
    }

    #[test]
    fn test_duration_columns_prefer_positive_days() {
        assert_eq!(
            ItemDuration::from_columns(Some(2), Some(4)),
            Some(ItemDuration::Days(4))
        );
        assert_eq!(
            ItemDuration::from_columns(Some(2), Some(0)),
            Some(ItemDuration::Weeks(2))
        );
        assert_eq!(ItemDuration::from_columns(None, None), None);
    }

    #[test]
    fn test_kind_strings() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::from_str("epic"), None);
    }
}
