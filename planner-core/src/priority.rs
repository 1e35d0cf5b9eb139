//! Explicit ordering of Subtasks under one parent.
//!
//! Siblings sort by `(priority, id)`, with a missing priority sorting after
//! every explicit one.

use std::cmp::Reverse;

use crate::error::{PlanError, Result};
use crate::models::WorkItem;
use crate::store::ItemStore;

/// Sort key for Subtask siblings.
pub fn sibling_order_key(item: &WorkItem) -> (Reverse<bool>, i32, i64) {
    // `Reverse(true)` sorts before `Reverse(false)`, so explicit priorities lead.
    (
        Reverse(item.priority.is_some()),
        item.priority.unwrap_or(i32::MAX),
        item.id,
    )
}

pub fn sort_siblings(items: &mut [WorkItem]) {
    items.sort_by_key(sibling_order_key);
}

fn subtasks_of(items: Vec<WorkItem>) -> Vec<WorkItem> {
    items.into_iter().filter(WorkItem::is_subtask).collect()
}

/// Reads and rewrites Subtask priorities through an [`ItemStore`].
pub struct PriorityOrdering<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ItemStore + ?Sized> PriorityOrdering<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Subtask children of `parent_id` in sibling order.
    pub fn ordered(&self, parent_id: i64) -> Result<Vec<WorkItem>> {
        let mut subs = subtasks_of(self.store.list_by_parent(parent_id)?);
        sort_siblings(&mut subs);
        Ok(subs)
    }

    /// Give every Subtask without a priority its position in id order.
    ///
    /// Only items that were missing a priority are written. Returns how many
    /// were updated.
    pub fn initialize(&self, parent_id: i64) -> Result<usize> {
        let mut subs = subtasks_of(self.store.list_by_parent(parent_id)?);
        subs.sort_by_key(|s| s.id);

        let changed: Vec<WorkItem> = subs
            .into_iter()
            .enumerate()
            .filter(|(_, s)| s.priority.is_none())
            .map(|(i, mut s)| {
                s.priority = Some(i as i32);
                s
            })
            .collect();

        if !changed.is_empty() {
            self.store.update_items(&changed)?;
            tracing::info!(
                parent_id,
                updated = changed.len(),
                "Initialized subtask priorities"
            );
        }
        Ok(changed.len())
    }

    /// Move `sub_id` to `new_position` among its siblings and renumber the
    /// whole sibling set `0..n`.
    ///
    /// A move to the current position changes nothing. Returns the siblings in
    /// their new order.
    pub fn reorder(&self, sub_id: i64, new_position: usize) -> Result<Vec<WorkItem>> {
        let parent_id = self
            .store
            .find_item(sub_id)?
            .filter(WorkItem::is_subtask)
            .and_then(|s| s.parent_id)
            .ok_or_else(|| PlanError::not_found("subtask", sub_id))?;

        let mut subs = self.ordered(parent_id)?;
        let current = subs
            .iter()
            .position(|s| s.id == sub_id)
            .ok_or_else(|| PlanError::not_found("subtask", sub_id))?;

        if new_position >= subs.len() {
            return Err(PlanError::InvalidPosition {
                position: new_position,
                len: subs.len(),
            });
        }
        if new_position == current {
            tracing::debug!(sub_id, position = current, "Reorder is a no-op");
            return Ok(subs);
        }

        let moved = subs.remove(current);
        subs.insert(new_position, moved);

        let mut changed = Vec::new();
        for (i, sub) in subs.iter_mut().enumerate() {
            let priority = Some(i as i32);
            if sub.priority != priority {
                sub.priority = priority;
                changed.push(sub.clone());
            }
        }
        self.store.update_items(&changed)?;

        tracing::info!(
            sub_id,
            from = current,
            to = new_position,
            updated = changed.len(),
            "Reordered subtask"
        );
        Ok(subs)
    }
}
