//! Write-time checks for work items.
//!
//! Checks run in a fixed order and stop at the first violation:
//! required fields, hierarchy kind, sprint capacity, parent capacity,
//! existing children (updates only), member capacity.

use thiserror::Error;

use crate::error::{PlanError, Result};
use crate::models::{ItemDuration, ItemKind, Sprint, WorkItem, WorkItemDraft, DAYS_PER_WEEK};
use crate::store::Store;

/// A rule the item would break. Carries the numbers behind the decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("sprint {sprint_id} does not exist")]
    UnknownSprint { sprint_id: i64 },

    #[error("parent item {parent_id} does not exist")]
    UnknownParent { parent_id: i64 },

    #[error("a {child} cannot be a child of a {parent}")]
    InvalidHierarchy { child: ItemKind, parent: ItemKind },

    #[error("a {kind} duration must be a positive number of {unit}")]
    InvalidDuration { kind: ItemKind, unit: &'static str },

    #[error("item duration ({requested} {unit}) exceeds the sprint ({available} {unit})")]
    SprintCapacity {
        requested: u32,
        available: u32,
        unit: &'static str,
    },

    #[error("item duration ({requested} days) exceeds its parent ({parent_days} days)")]
    ParentCapacity { requested: u32, parent_days: u32 },

    #[error("children of the parent would total {total} days, more than its {parent_days} days")]
    SiblingCapacity { total: u32, parent_days: u32 },

    #[error(
        "member '{member}' already has {allocated} days allocated; adding {requested} more would exceed the sprint's {capacity} business days"
    )]
    MemberCapacity {
        member: String,
        allocated: u32,
        requested: u32,
        capacity: u32,
    },
}

/// Validates drafts against the current contents of a store.
pub struct Validator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> Validator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Check `draft` before it is created (`id` is `None`) or updated.
    ///
    /// Rule violations come back as [`PlanError::Validation`]; store failures
    /// pass through unchanged.
    pub fn validate(&self, draft: &WorkItemDraft) -> Result<()> {
        let outcome = self.check(draft);
        if let Err(PlanError::Validation(e)) = &outcome {
            tracing::warn!(
                item_id = ?draft.id,
                kind = %draft.kind,
                "Rejected item: {}",
                e
            );
        }
        outcome
    }

    fn check(&self, draft: &WorkItemDraft) -> Result<()> {
        let sprint_id = check_required(draft)?;
        check_duration_unit(draft)?;

        let parent = match draft.parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_item(parent_id)?
                    .ok_or(ValidationError::UnknownParent { parent_id })?;
                check_hierarchy(draft.kind, parent.kind)?;
                Some(parent)
            }
            None => None,
        };

        let sprint = self
            .store
            .find_sprint(sprint_id)?
            .ok_or(ValidationError::UnknownSprint { sprint_id })?;
        let business_days = sprint.business_day_count();
        check_sprint_capacity(draft, business_days)?;

        if let Some(parent) = &parent {
            self.check_parent_capacity(draft, parent)?;
        }
        if let Some(id) = draft.id {
            self.check_children(id, draft)?;
        }

        self.check_member_capacity(draft, &sprint, business_days)
    }

    fn check_parent_capacity(&self, draft: &WorkItemDraft, parent: &WorkItem) -> Result<()> {
        let requested = draft.own_days();
        let parent_days = parent.own_days();
        if requested > parent_days {
            return Err(ValidationError::ParentCapacity {
                requested,
                parent_days,
            }
            .into());
        }

        let siblings: u32 = self
            .store
            .list_by_parent(parent.id)?
            .iter()
            .filter(|s| Some(s.id) != draft.id)
            .map(WorkItem::own_days)
            .sum();
        let total = siblings + requested;
        if total > parent_days {
            return Err(ValidationError::SiblingCapacity { total, parent_days }.into());
        }
        Ok(())
    }

    /// An updated container must still accept its current children, in kind
    /// and in total length.
    fn check_children(&self, id: i64, draft: &WorkItemDraft) -> Result<()> {
        let children = self.store.list_by_parent(id)?;
        if let Some(child) = children.iter().find(|c| !c.kind.can_be_child_of(draft.kind)) {
            return Err(ValidationError::InvalidHierarchy {
                child: child.kind,
                parent: draft.kind,
            }
            .into());
        }

        let total: u32 = children.iter().map(WorkItem::own_days).sum();
        let parent_days = draft.own_days();
        if total > parent_days {
            return Err(ValidationError::SiblingCapacity { total, parent_days }.into());
        }
        Ok(())
    }

    fn check_member_capacity(
        &self,
        draft: &WorkItemDraft,
        sprint: &Sprint,
        capacity: u32,
    ) -> Result<()> {
        let Some(member_id) = draft.member_id.filter(|_| draft.kind == ItemKind::Subtask) else {
            return Ok(());
        };

        let allocated: u32 = self
            .store
            .list_by_sprint(sprint.id)?
            .iter()
            .filter(|i| i.is_subtask() && i.member_id == Some(member_id))
            .filter(|i| Some(i.id) != draft.id)
            .map(WorkItem::own_days)
            .sum();
        let requested = draft.own_days();

        if allocated + requested > capacity {
            let member = self
                .store
                .find_member(member_id)?
                .map(|m| m.name)
                .unwrap_or_else(|| format!("member {member_id}"));
            return Err(ValidationError::MemberCapacity {
                member,
                allocated,
                requested,
                capacity,
            }
            .into());
        }
        Ok(())
    }
}

fn check_required(draft: &WorkItemDraft) -> std::result::Result<i64, ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "title" });
    }
    if draft.status.is_none() {
        return Err(ValidationError::MissingField { field: "status" });
    }
    draft
        .sprint_id
        .ok_or(ValidationError::MissingField { field: "sprint_id" })
}

/// Weeks for Feature/Story/Task, days for Subtask, and never zero.
fn check_duration_unit(draft: &WorkItemDraft) -> std::result::Result<(), ValidationError> {
    let Some(duration) = draft.duration else {
        return Ok(());
    };
    let unit_matches = match duration {
        ItemDuration::Days(_) => draft.kind.uses_days(),
        ItemDuration::Weeks(_) => !draft.kind.uses_days(),
    };
    if !unit_matches || duration.is_zero() {
        return Err(ValidationError::InvalidDuration {
            kind: draft.kind,
            unit: unit_name(draft.kind),
        });
    }
    Ok(())
}

/// A Feature never has a parent; everything else must sit under an allowed kind.
fn check_hierarchy(kind: ItemKind, parent: ItemKind) -> std::result::Result<(), ValidationError> {
    if kind.can_be_child_of(parent) {
        Ok(())
    } else {
        Err(ValidationError::InvalidHierarchy {
            child: kind,
            parent,
        })
    }
}

fn check_sprint_capacity(
    draft: &WorkItemDraft,
    business_days: u32,
) -> std::result::Result<(), ValidationError> {
    match draft.duration {
        Some(ItemDuration::Weeks(weeks)) => {
            let available = business_days / DAYS_PER_WEEK;
            if weeks > available {
                return Err(ValidationError::SprintCapacity {
                    requested: weeks,
                    available,
                    unit: "weeks",
                });
            }
        }
        Some(ItemDuration::Days(days)) if days > business_days => {
            return Err(ValidationError::SprintCapacity {
                requested: days,
                available: business_days,
                unit: "days",
            });
        }
        _ => {}
    }
    Ok(())
}

fn unit_name(kind: ItemKind) -> &'static str {
    if kind.uses_days() {
        "days"
    } else {
        "weeks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::store::{ItemStore, MemoryStore};
    use chrono::NaiveDate;

    struct Fixture {
        store: MemoryStore,
        sprint: Sprint,
        feature: i64,
        story: i64,
        member: Member,
    }

    /// Four-week sprint with a 4-week Feature and a 2-week Story under it.
    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let sprint = store
            .create_sprint(NewSprint {
                name: "Sprint 1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                duration_weeks: 4,
            })
            .unwrap();
        let member = store.create_member(NewMember {
            name: "Ana".to_string(),
            role: MemberRole::Backend,
            active: true,
            specialties: None,
        });

        let feature = save(
            &store,
            WorkItemDraft::new(ItemKind::Feature, "Checkout", sprint.id)
                .with_duration(ItemDuration::Weeks(4)),
        );
        let story = save(
            &store,
            WorkItemDraft::new(ItemKind::Story, "Pay by card", sprint.id)
                .with_parent(feature)
                .with_duration(ItemDuration::Weeks(2)),
        );

        Fixture {
            store,
            sprint,
            feature,
            story,
            member,
        }
    }

    fn save(store: &MemoryStore, draft: WorkItemDraft) -> i64 {
        store.save_item(&draft.into_item(0).unwrap()).unwrap()
    }

    fn validate(f: &Fixture, draft: &WorkItemDraft) -> std::result::Result<(), ValidationError> {
        match Validator::new(&f.store).validate(draft) {
            Ok(()) => Ok(()),
            Err(PlanError::Validation(e)) => Err(e),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    fn subtask(f: &Fixture, days: u32) -> WorkItemDraft {
        WorkItemDraft::new(ItemKind::Subtask, "Wire gateway", f.sprint.id)
            .with_parent(f.story)
            .with_duration(ItemDuration::Days(days))
    }

    #[test]
    fn test_accepts_valid_subtask() {
        let f = fixture();
        assert_eq!(validate(&f, &subtask(&f, 3).with_member(f.member.id)), Ok(()));
    }

    #[test]
    fn test_blank_title_rejected() {
        let f = fixture();
        let mut draft = subtask(&f, 1);
        draft.title = "   ".to_string();
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::MissingField { field: "title" })
        );
    }

    #[test]
    fn test_missing_status_and_sprint_rejected() {
        let f = fixture();
        let mut draft = subtask(&f, 1);
        draft.status = None;
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::MissingField { field: "status" })
        );

        let mut draft = subtask(&f, 1);
        draft.sprint_id = None;
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::MissingField { field: "sprint_id" })
        );
    }

    #[test]
    fn test_story_under_story_rejected() {
        let f = fixture();
        let draft = WorkItemDraft::new(ItemKind::Story, "Nested", f.sprint.id)
            .with_parent(f.story)
            .with_duration(ItemDuration::Weeks(1));
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::InvalidHierarchy {
                child: ItemKind::Story,
                parent: ItemKind::Story,
            })
        );
    }

    #[test]
    fn test_feature_with_parent_rejected() {
        let f = fixture();
        let draft = WorkItemDraft::new(ItemKind::Feature, "Nested", f.sprint.id)
            .with_parent(f.feature)
            .with_duration(ItemDuration::Weeks(1));
        assert!(matches!(
            validate(&f, &draft),
            Err(ValidationError::InvalidHierarchy {
                child: ItemKind::Feature,
                ..
            })
        ));
    }

    #[test]
    fn test_subtask_under_feature_rejected() {
        let f = fixture();
        let draft = subtask(&f, 1).with_parent(f.feature);
        assert!(matches!(
            validate(&f, &draft),
            Err(ValidationError::InvalidHierarchy { .. })
        ));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let f = fixture();
        let draft = subtask(&f, 1).with_parent(9999);
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::UnknownParent { parent_id: 9999 })
        );
    }

    #[test]
    fn test_wrong_unit_rejected() {
        let f = fixture();
        let draft = subtask(&f, 1).with_duration(ItemDuration::Weeks(1));
        assert!(matches!(
            validate(&f, &draft),
            Err(ValidationError::InvalidDuration { unit: "days", .. })
        ));
    }

    #[test]
    fn test_sprint_capacity_in_weeks() {
        let f = fixture();
        let draft = WorkItemDraft::new(ItemKind::Feature, "Too long", f.sprint.id)
            .with_duration(ItemDuration::Weeks(5));
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::SprintCapacity {
                requested: 5,
                available: 4,
                unit: "weeks",
            })
        );
    }

    #[test]
    fn test_sprint_capacity_in_days() {
        let f = fixture();
        assert_eq!(
            validate(&f, &subtask(&f, 21)),
            Err(ValidationError::SprintCapacity {
                requested: 21,
                available: 20,
                unit: "days",
            })
        );
    }

    #[test]
    fn test_parent_capacity_cites_both_numbers() {
        let f = fixture();
        let err = validate(&f, &subtask(&f, 20)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ParentCapacity {
                requested: 20,
                parent_days: 10,
            }
        );
        let message = err.to_string();
        assert!(message.contains("20") && message.contains("10"));
    }

    #[test]
    fn test_sibling_total_capped_by_parent() {
        let f = fixture();
        save(&f.store, subtask(&f, 6));
        assert_eq!(
            validate(&f, &subtask(&f, 5)),
            Err(ValidationError::SiblingCapacity {
                total: 11,
                parent_days: 10,
            })
        );
        assert_eq!(validate(&f, &subtask(&f, 4)), Ok(()));
    }

    #[test]
    fn test_update_excludes_previous_value() {
        let f = fixture();
        let id = save(&f.store, subtask(&f, 8));
        save(&f.store, subtask(&f, 2));

        let mut draft = subtask(&f, 7);
        draft.id = Some(id);
        assert_eq!(validate(&f, &draft), Ok(()));

        draft.duration = Some(ItemDuration::Days(9));
        assert!(matches!(
            validate(&f, &draft),
            Err(ValidationError::SiblingCapacity { total: 11, .. })
        ));
    }

    fn story_update(f: &Fixture) -> WorkItemDraft {
        let mut draft = WorkItemDraft::new(ItemKind::Story, "Pay by card", f.sprint.id)
            .with_parent(f.feature)
            .with_duration(ItemDuration::Weeks(2));
        draft.id = Some(f.story);
        draft
    }

    #[test]
    fn test_shrinking_story_below_its_subtasks_rejected() {
        let f = fixture();
        save(&f.store, subtask(&f, 10));
        assert_eq!(validate(&f, &story_update(&f)), Ok(()));

        let draft = story_update(&f).with_duration(ItemDuration::Weeks(1));
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::SiblingCapacity {
                total: 10,
                parent_days: 5,
            })
        );
    }

    #[test]
    fn test_story_with_subtasks_cannot_become_feature() {
        let f = fixture();
        save(&f.store, subtask(&f, 3));

        let mut draft = story_update(&f);
        draft.kind = ItemKind::Feature;
        draft.parent_id = None;
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::InvalidHierarchy {
                child: ItemKind::Subtask,
                parent: ItemKind::Feature,
            })
        );
    }

    #[test]
    fn test_shrinking_feature_below_its_stories_rejected() {
        let f = fixture();
        let mut draft = WorkItemDraft::new(ItemKind::Feature, "Checkout", f.sprint.id)
            .with_duration(ItemDuration::Weeks(1));
        draft.id = Some(f.feature);
        assert_eq!(
            validate(&f, &draft),
            Err(ValidationError::SiblingCapacity {
                total: 10,
                parent_days: 5,
            })
        );
    }

    #[test]
    fn test_member_capacity_names_member() {
        let f = fixture();
        let mut sprint_wide = Vec::new();
        for title in ["A", "B"] {
            sprint_wide.push(save(
                &f.store,
                WorkItemDraft::new(ItemKind::Story, title, f.sprint.id)
                    .with_parent(f.feature)
                    .with_duration(ItemDuration::Weeks(2)),
            ));
        }
        save(
            &f.store,
            subtask(&f, 10)
                .with_parent(sprint_wide[0])
                .with_member(f.member.id),
        );
        save(
            &f.store,
            subtask(&f, 8)
                .with_parent(sprint_wide[1])
                .with_member(f.member.id),
        );

        let draft = subtask(&f, 3).with_member(f.member.id);
        let err = validate(&f, &draft).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MemberCapacity {
                member: "Ana".to_string(),
                allocated: 18,
                requested: 3,
                capacity: 20,
            }
        );
        assert!(err.to_string().contains("'Ana' already has 18 days"));
    }
}
