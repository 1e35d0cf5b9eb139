//! Greedy per-member sequential packing of a sprint's items.
//!
//! Every member has a day cursor starting at 0. Walking the hierarchy in
//! display order, each assigned Subtask starts at its member's cursor and
//! pushes the cursor past itself. Stories and Tasks span their Subtasks;
//! Features show their own declared length.

use std::collections::HashMap;

use crate::hierarchy::{HierarchyRow, ItemIndex};
use crate::models::{ItemKind, TimelineRow, WorkItem};

/// Day cursor per member id. A member with no entry is at day 0.
pub type Cursor = HashMap<i64, u32>;

/// Place every row. Returns the rows and the final cursor.
pub fn allocate(index: &ItemIndex, rows: &[HierarchyRow<'_>]) -> (Vec<TimelineRow>, Cursor) {
    let mut cursor = Cursor::new();
    let placed = rows
        .iter()
        .map(|row| {
            let (start_day, duration_days) = place(index, row.item, &mut cursor);
            TimelineRow {
                item: row.item.clone(),
                indent_level: row.indent_level,
                start_day,
                duration_days,
            }
        })
        .collect();
    (placed, cursor)
}

fn place(index: &ItemIndex, item: &WorkItem, cursor: &mut Cursor) -> (u32, u32) {
    match item.kind {
        ItemKind::Feature => (0, item.own_days()),
        ItemKind::Story | ItemKind::Task => {
            let span = container_span(&index.ordered_subtasks(item.id), cursor);
            tracing::debug!(
                item_id = item.id,
                start = span.0,
                duration = span.1,
                "Rolled up container span"
            );
            span
        }
        ItemKind::Subtask => place_subtask(item, cursor),
    }
}

/// Place one Subtask and advance its member's cursor.
///
/// A Subtask without a member starts at day 0 and reserves nothing.
fn place_subtask(item: &WorkItem, cursor: &mut Cursor) -> (u32, u32) {
    let days = item.own_days();
    let Some(member_id) = item.member_id else {
        return (0, days);
    };

    let start = cursor.get(&member_id).copied().unwrap_or(0);
    cursor.insert(member_id, start + days);
    (start, days)
}

/// Span of a Story/Task over its ordered Subtasks, simulated on a copy of
/// the cursor. Only member-bearing Subtasks count.
///
/// The real cursor is left untouched; the same Subtasks commit to it when
/// their own rows are reached, with the same order and starting state.
fn container_span(subtasks: &[WorkItem], cursor: &Cursor) -> (u32, u32) {
    let mut simulated = cursor.clone();
    let mut bounds: Option<(u32, u32)> = None;

    for sub in subtasks {
        let Some(member_id) = sub.member_id else {
            continue;
        };
        let start = simulated.get(&member_id).copied().unwrap_or(0);
        let end = start + sub.own_days();
        simulated.insert(member_id, end);

        bounds = Some(match bounds {
            Some((min_start, max_end)) => (min_start.min(start), max_end.max(end)),
            None => (start, end),
        });
    }

    match bounds {
        Some((min_start, max_end)) => (min_start, max_end.saturating_sub(min_start)),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy;
    use crate::models::*;

    fn item(id: i64, kind: ItemKind, parent: Option<i64>, duration: ItemDuration) -> WorkItem {
        let mut draft = WorkItemDraft::new(kind, format!("{kind} {id}"), 1).with_duration(duration);
        draft.parent_id = parent;
        draft.into_item(id).unwrap()
    }

    fn sub(id: i64, parent: i64, days: u32, member: Option<i64>) -> WorkItem {
        let mut s = item(id, ItemKind::Subtask, Some(parent), ItemDuration::Days(days));
        s.member_id = member;
        s
    }

    fn run(items: Vec<WorkItem>) -> (HashMap<i64, (u32, u32)>, Cursor) {
        let index = ItemIndex::new(items);
        let rows = hierarchy::build(&index);
        let (placed, cursor) = allocate(&index, &rows);
        let spans = placed
            .iter()
            .map(|r| (r.item.id, (r.start_day, r.duration_days)))
            .collect();
        (spans, cursor)
    }

    #[test]
    fn test_story_with_two_subtasks_same_member() {
        let (spans, cursor) = run(vec![
            item(1, ItemKind::Feature, None, ItemDuration::Weeks(4)),
            item(2, ItemKind::Story, Some(1), ItemDuration::Weeks(2)),
            sub(3, 2, 3, Some(7)),
            sub(4, 2, 4, Some(7)),
        ]);

        assert_eq!(spans[&1], (0, 20));
        assert_eq!(spans[&2], (0, 7));
        assert_eq!(spans[&3], (0, 3));
        assert_eq!(spans[&4], (3, 4));
        assert_eq!(cursor[&7], 7);
    }

    #[test]
    fn test_second_story_continues_member_cursor() {
        let (spans, _) = run(vec![
            item(1, ItemKind::Feature, None, ItemDuration::Weeks(4)),
            item(2, ItemKind::Story, Some(1), ItemDuration::Weeks(1)),
            item(3, ItemKind::Task, Some(1), ItemDuration::Weeks(1)),
            sub(4, 2, 2, Some(7)),
            sub(5, 3, 3, Some(7)),
            sub(6, 3, 1, Some(8)),
        ]);

        assert_eq!(spans[&5], (2, 3));
        assert_eq!(spans[&6], (0, 1));
        // Task spans from member 8's day 0 to member 7's day 5.
        assert_eq!(spans[&3], (0, 5));
    }

    #[test]
    fn test_unassigned_subtask_reserves_nothing() {
        let (spans, cursor) = run(vec![
            item(1, ItemKind::Feature, None, ItemDuration::Weeks(2)),
            item(2, ItemKind::Story, Some(1), ItemDuration::Weeks(2)),
            sub(3, 2, 5, None),
            sub(4, 2, 2, Some(7)),
        ]);

        assert_eq!(spans[&3], (0, 5));
        assert_eq!(spans[&4], (0, 2));
        // Only member-bearing subtasks shape the container.
        assert_eq!(spans[&2], (0, 2));
        assert_eq!(cursor.len(), 1);
    }

    #[test]
    fn test_container_without_assigned_children_is_empty() {
        let (spans, _) = run(vec![
            item(1, ItemKind::Feature, None, ItemDuration::Weeks(2)),
            item(2, ItemKind::Task, Some(1), ItemDuration::Weeks(2)),
        ]);
        assert_eq!(spans[&2], (0, 0));
    }

    #[test]
    fn test_subtask_sized_in_weeks_counts_five_days() {
        let mut s = item(3, ItemKind::Subtask, Some(2), ItemDuration::Weeks(1));
        s.member_id = Some(7);
        let (spans, _) = run(vec![
            item(1, ItemKind::Feature, None, ItemDuration::Weeks(2)),
            item(2, ItemKind::Story, Some(1), ItemDuration::Weeks(2)),
            s,
        ]);
        assert_eq!(spans[&3], (0, 5));
    }

    #[test]
    fn test_member_intervals_never_overlap() {
        let mut items = vec![item(1, ItemKind::Feature, None, ItemDuration::Weeks(4))];
        for story in 0..3 {
            let story_id = 10 + story;
            items.push(item(story_id, ItemKind::Story, Some(1), ItemDuration::Weeks(2)));
            for n in 0..4 {
                let id = 100 + story * 10 + n;
                let member = Some(1000 + (id % 3));
                items.push(sub(id, story_id, (id % 4 + 1) as u32, member));
            }
        }

        let index = ItemIndex::new(items);
        let rows = hierarchy::build(&index);
        let (placed, _) = allocate(&index, &rows);

        let mut by_member: HashMap<i64, Vec<(u32, u32)>> = HashMap::new();
        for row in placed.iter().filter(|r| r.item.is_subtask()) {
            if let Some(m) = row.item.member_id {
                by_member.entry(m).or_default().push((row.start_day, row.end_day()));
            }
        }
        for intervals in by_member.values_mut() {
            intervals.sort();
            for pair in intervals.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlap in {:?}", intervals);
            }
        }

        // Every container matches its children's real placement.
        for row in placed.iter().filter(|r| r.item.kind == ItemKind::Story) {
            let children: Vec<_> = placed
                .iter()
                .filter(|c| c.item.parent_id == Some(row.item.id))
                .collect();
            let min = children.iter().map(|c| c.start_day).min().unwrap();
            let max = children.iter().map(|c| c.end_day()).max().unwrap();
            assert_eq!(row.start_day, min);
            assert_eq!(row.end_day(), max);
        }
    }
}
