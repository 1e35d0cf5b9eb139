//! Storage interfaces the planner needs, plus an in-memory implementation.
//!
//! The planner never assumes a storage technology. Each call is expected to
//! see one coherent snapshot; the planner itself holds no locks.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{PlanError, Result};
use crate::models::*;

pub trait ItemStore {
    fn list_by_sprint(&self, sprint_id: i64) -> Result<Vec<WorkItem>>;

    fn list_by_parent(&self, parent_id: i64) -> Result<Vec<WorkItem>>;

    fn find_item(&self, id: i64) -> Result<Option<WorkItem>>;

    /// Persist a new item and return its assigned id. `item.id` is ignored.
    fn save_item(&self, item: &WorkItem) -> Result<i64>;

    fn update_item(&self, item: &WorkItem) -> Result<()>;

    fn delete_item(&self, id: i64) -> Result<bool>;

    /// Persist several updates.
    ///
    /// The default writes one item at a time: a failure part-way leaves the
    /// earlier items written and the rest untouched. Stores with transactions
    /// should override this to apply all or nothing.
    fn update_items(&self, items: &[WorkItem]) -> Result<()> {
        for item in items {
            self.update_item(item)?;
        }
        Ok(())
    }
}

pub trait SprintStore {
    fn find_sprint(&self, id: i64) -> Result<Option<Sprint>>;

    fn list_sprints(&self) -> Result<Vec<Sprint>>;
}

pub trait MemberStore {
    fn find_member(&self, id: i64) -> Result<Option<Member>>;

    fn list_members(&self) -> Result<Vec<Member>>;
}

/// Everything the planner reads and writes.
pub trait Store: ItemStore + SprintStore + MemberStore {}

impl<T: ItemStore + SprintStore + MemberStore> Store for T {}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    sprints: BTreeMap<i64, Sprint>,
    members: BTreeMap<i64, Member>,
    items: BTreeMap<i64, WorkItem>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store, used by tests and quick experiments.
///
/// Ids come from one shared counter, so they ascend in creation order across
/// all entity types. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_sprint(&self, input: NewSprint) -> Result<Sprint> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let id = state.next_id + 1;
        let sprint = Sprint::from_input(id, input)?;

        let existing: Vec<Sprint> = state.sprints.values().cloned().collect();
        if let Some(clash) = find_overlap(&existing, &sprint) {
            return Err(PlanError::SprintOverlap {
                name: clash.name.clone(),
                start: clash.start_date,
                end: clash.end_date,
            });
        }

        state.next_id();
        state.sprints.insert(id, sprint.clone());
        Ok(sprint)
    }

    pub fn create_member(&self, input: NewMember) -> Member {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let member = Member {
            id: state.next_id(),
            name: input.name,
            role: input.role,
            active: input.active,
            specialties: input.specialties,
        };
        state.members.insert(member.id, member.clone());
        member
    }
}

impl ItemStore for MemoryStore {
    fn list_by_sprint(&self, sprint_id: i64) -> Result<Vec<WorkItem>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state
            .items
            .values()
            .filter(|i| i.sprint_id == sprint_id)
            .cloned()
            .collect())
    }

    fn list_by_parent(&self, parent_id: i64) -> Result<Vec<WorkItem>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state
            .items
            .values()
            .filter(|i| i.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    fn find_item(&self, id: i64) -> Result<Option<WorkItem>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.items.get(&id).cloned())
    }

    fn save_item(&self, item: &WorkItem) -> Result<i64> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let id = state.next_id();
        let mut item = item.clone();
        item.id = id;
        state.items.insert(id, item);
        Ok(id)
    }

    fn update_item(&self, item: &WorkItem) -> Result<()> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        match state.items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(PlanError::not_found("item", item.id)),
        }
    }

    fn delete_item(&self, id: i64) -> Result<bool> {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.items.remove(&id).is_some())
    }
}

impl SprintStore for MemoryStore {
    fn find_sprint(&self, id: i64) -> Result<Option<Sprint>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.sprints.get(&id).cloned())
    }

    fn list_sprints(&self) -> Result<Vec<Sprint>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        let mut sprints: Vec<Sprint> = state.sprints.values().cloned().collect();
        sprints.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(sprints)
    }
}

impl MemberStore for MemoryStore {
    fn find_member(&self, id: i64) -> Result<Option<Member>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.members.get(&id).cloned())
    }

    fn list_members(&self) -> Result<Vec<Member>> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state.members.values().cloned().collect())
    }
}
