use std::collections::BTreeMap;

use crate::allocation::{self, Cursor};
use crate::error::{PlanError, Result};
use crate::hierarchy::{self, ItemIndex};
use crate::models::*;
use crate::priority::PriorityOrdering;
use crate::store::Store;
use crate::validation::Validator;

/// Entry point tying the engine to a store.
///
/// Every computation reads a fresh snapshot from the store and keeps its
/// member cursor local to the call, so one planner can serve many sprints
/// concurrently.
#[derive(Debug, Clone)]
pub struct Planner<S> {
    store: S,
}

impl<S: Store> Planner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn sprint(&self, sprint_id: i64) -> Result<Sprint> {
        self.store
            .find_sprint(sprint_id)?
            .ok_or_else(|| PlanError::not_found("sprint", sprint_id))
    }

    fn allocate(&self, sprint_id: i64) -> Result<(Vec<TimelineRow>, Cursor)> {
        let index = ItemIndex::new(self.store.list_by_sprint(sprint_id)?);
        let rows = hierarchy::build(&index);
        Ok(allocation::allocate(&index, &rows))
    }

    /// Placed rows of a sprint in display order.
    pub fn build_timeline(&self, sprint_id: i64) -> Result<Vec<TimelineRow>> {
        self.sprint(sprint_id)?;
        let (rows, _) = self.allocate(sprint_id)?;
        Ok(rows)
    }

    /// Placed rows plus the sprint's day columns, with `filter` applied after
    /// allocation.
    pub fn sprint_timeline(
        &self,
        sprint_id: i64,
        filter: &TimelineFilter,
    ) -> Result<SprintTimeline> {
        let sprint = self.sprint(sprint_id)?;
        let (rows, _) = self.allocate(sprint_id)?;
        Ok(SprintTimeline {
            days: sprint.business_days(),
            sprint,
            rows: filter.apply(rows),
        })
    }

    /// Committed and free days for every active member, and for any inactive
    /// or unknown member that still holds Subtasks in the sprint.
    pub fn member_workload(&self, sprint_id: i64) -> Result<Vec<MemberLoad>> {
        let sprint = self.sprint(sprint_id)?;
        let days = sprint.business_days();
        let capacity = days.len() as u32;
        let items = self.store.list_by_sprint(sprint_id)?;
        let (_, cursor) = self.allocate(sprint_id)?;

        let mut allocated: BTreeMap<i64, u32> = BTreeMap::new();
        for member in self.store.list_members()?.iter().filter(|m| m.active) {
            allocated.insert(member.id, 0);
        }
        for item in items.iter().filter(|i| i.is_subtask()) {
            if let Some(member_id) = item.member_id {
                *allocated.entry(member_id).or_insert(0) += item.own_days();
            }
        }

        allocated
            .into_iter()
            .map(|(member_id, allocated_days)| -> Result<MemberLoad> {
                let member_name = self
                    .store
                    .find_member(member_id)?
                    .map(|m| m.name)
                    .unwrap_or_else(|| format!("member {member_id}"));
                let busy_until = cursor.get(&member_id).copied().unwrap_or(0);
                let free_days = days.iter().skip(busy_until as usize).copied().collect();
                Ok(MemberLoad {
                    member_id,
                    member_name,
                    allocated_days,
                    capacity_days: capacity,
                    busy_until,
                    free_days,
                })
            })
            .collect()
    }

    pub fn validate(&self, draft: &WorkItemDraft) -> Result<()> {
        Validator::new(&self.store).validate(draft)
    }

    /// Validate and persist a draft. Creates when `draft.id` is `None`,
    /// otherwise replaces the stored item.
    pub fn save_item(&self, draft: WorkItemDraft) -> Result<WorkItem> {
        if let Some(id) = draft.id {
            if self.store.find_item(id)?.is_none() {
                return Err(PlanError::not_found("item", id));
            }
        }
        self.validate(&draft)?;

        match draft.id {
            Some(id) => {
                let item = draft.into_item(id)?;
                self.store.update_item(&item)?;
                tracing::info!(item_id = id, kind = %item.kind, "Updated item");
                Ok(item)
            }
            None => {
                let mut item = draft.into_item(0)?;
                item.id = self.store.save_item(&item)?;
                tracing::info!(item_id = item.id, kind = %item.kind, "Created item");
                Ok(item)
            }
        }
    }

    /// Delete one item. Children are left in place and show up as orphans.
    pub fn delete_item(&self, id: i64) -> Result<bool> {
        let deleted = self.store.delete_item(id)?;
        if deleted {
            tracing::info!(item_id = id, "Deleted item");
        }
        Ok(deleted)
    }

    pub fn ordered_subtasks(&self, parent_id: i64) -> Result<Vec<WorkItem>> {
        PriorityOrdering::new(&self.store).ordered(parent_id)
    }

    pub fn initialize_priorities(&self, parent_id: i64) -> Result<usize> {
        PriorityOrdering::new(&self.store).initialize(parent_id)
    }

    pub fn reorder(&self, sub_id: i64, new_position: usize) -> Result<Vec<WorkItem>> {
        PriorityOrdering::new(&self.store).reorder(sub_id, new_position)
    }
}
