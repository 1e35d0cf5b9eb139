//! Orders a sprint's flat item set into display order.
//!
//! Features come first (by id), each followed by its Stories/Tasks (by id),
//! each followed by its Subtasks (sibling order). Orphans come last.

use std::collections::{HashMap, HashSet};

use crate::models::{ItemKind, WorkItem};
use crate::priority::{sibling_order_key, sort_siblings};

/// Arena over one sprint's items. Parent and child links are ids resolved
/// through lookup tables, never embedded references.
#[derive(Debug)]
pub struct ItemIndex {
    items: Vec<WorkItem>,
    by_id: HashMap<i64, usize>,
    children: HashMap<i64, Vec<usize>>,
}

impl ItemIndex {
    pub fn new(mut items: Vec<WorkItem>) -> Self {
        items.sort_by_key(|i| i.id);

        let by_id: HashMap<i64, usize> =
            items.iter().enumerate().map(|(pos, i)| (i.id, pos)).collect();

        let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
        for (pos, item) in items.iter().enumerate() {
            if let Some(parent_id) = item.parent_id {
                children.entry(parent_id).or_default().push(pos);
            }
        }

        Self {
            items,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: i64) -> Option<&WorkItem> {
        self.by_id.get(&id).map(|&pos| &self.items[pos])
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Direct children of `parent_id` whose kind is in `kinds`, by id.
    pub fn children_of(&self, parent_id: i64, kinds: &[ItemKind]) -> Vec<&WorkItem> {
        self.children
            .get(&parent_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&pos| &self.items[pos])
                    .filter(|i| kinds.contains(&i.kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subtask children of `parent_id` in sibling order.
    pub fn ordered_subtasks(&self, parent_id: i64) -> Vec<WorkItem> {
        let mut subs: Vec<WorkItem> = self
            .children_of(parent_id, &[ItemKind::Subtask])
            .into_iter()
            .cloned()
            .collect();
        sort_siblings(&mut subs);
        subs
    }

    fn has_parent_in_set(&self, item: &WorkItem) -> bool {
        item.parent_id.and_then(|p| self.get(p)).is_some()
    }
}

/// One entry of the display order.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyRow<'a> {
    pub item: &'a WorkItem,
    pub indent_level: u8,
}

/// Walk the index in display order.
///
/// An item whose parent is absent from the set is an orphan. No item is
/// emitted twice.
pub fn build(index: &ItemIndex) -> Vec<HierarchyRow<'_>> {
    let mut rows = Vec::with_capacity(index.items().len());
    let mut seen = HashSet::new();

    let features = index
        .items()
        .iter()
        .filter(|i| i.kind == ItemKind::Feature);

    for feature in features {
        push_row(&mut rows, &mut seen, feature, 0);

        for child in index.children_of(feature.id, &[ItemKind::Story, ItemKind::Task]) {
            push_row(&mut rows, &mut seen, child, 1);

            let mut subs = index.children_of(child.id, &[ItemKind::Subtask]);
            subs.sort_by_key(|s| sibling_order_key(s));
            for sub in subs {
                push_row(&mut rows, &mut seen, sub, 2);
            }
        }
    }

    let orphans = index
        .items()
        .iter()
        .filter(|i| i.kind != ItemKind::Feature && !index.has_parent_in_set(i));
    for orphan in orphans {
        push_row(&mut rows, &mut seen, orphan, 0);
    }

    tracing::debug!(
        items = index.items().len(),
        rows = rows.len(),
        "Built sprint hierarchy"
    );
    rows
}

fn push_row<'a>(
    rows: &mut Vec<HierarchyRow<'a>>,
    seen: &mut HashSet<i64>,
    item: &'a WorkItem,
    indent_level: u8,
) {
    if seen.insert(item.id) {
        rows.push(HierarchyRow { item, indent_level });
    }
}
