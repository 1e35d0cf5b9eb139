//! Plain-text rendering of sprint timelines and workload reports.

use std::collections::HashMap;

use crate::models::{ItemKind, MemberLoad, SprintTimeline, TimelineRow};

/// One glyph per Feature, cycled by the Feature's position in the sprint.
const PALETTE: [char; 10] = ['█', '▓', '▒', '░', '#', '=', '+', '*', '%', '@'];
const UNGROUPED: char = '-';
const EMPTY: char = '.';
const INDENT: &str = "  ";

/// Render a timeline as a grid with one column per business day.
///
/// Example output:
/// ```text
/// Sprint 1: 2024-01-01 to 2024-01-05
///            MTWTF
/// Search     █████
///   Filters  ██...
///     Facets ██...
/// ```
pub fn render_timeline(timeline: &SprintTimeline) -> String {
    let sprint = &timeline.sprint;
    let mut output = format!(
        "{}: {} to {}\n",
        sprint.name, sprint.start_date, sprint.end_date
    );

    let labels: Vec<String> = timeline
        .rows
        .iter()
        .map(|row| {
            format!(
                "{}{}",
                INDENT.repeat(row.indent_level as usize),
                row.item.title
            )
        })
        .collect();
    let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let header: String = timeline
        .days
        .iter()
        .filter_map(|d| d.format("%a").to_string().chars().next())
        .collect();
    output.push_str(&format!("{:width$} {}\n", "", header));

    let glyphs = feature_glyphs(&timeline.rows);
    for (row, label) in timeline.rows.iter().zip(&labels) {
        let glyph = glyphs.get(&row.item.id).copied().unwrap_or(UNGROUPED);
        let cells: String = (0..timeline.days.len() as u32)
            .map(|day| if row.occupies(day) { glyph } else { EMPTY })
            .collect();
        output.push_str(&format!("{label:width$} {cells}\n"));
    }

    output
}

/// Glyph per row id, inherited from the enclosing Feature.
///
/// Rows arrive in display order, so a parent is always resolved before its
/// children. Rows with no Feature above them are left out.
fn feature_glyphs(rows: &[TimelineRow]) -> HashMap<i64, char> {
    let mut glyphs = HashMap::new();
    let mut features = 0usize;

    for row in rows {
        let glyph = if row.item.kind == ItemKind::Feature {
            let glyph = PALETTE[features % PALETTE.len()];
            features += 1;
            Some(glyph)
        } else {
            row.item.parent_id.and_then(|p| glyphs.get(&p).copied())
        };
        if let Some(glyph) = glyph {
            glyphs.insert(row.item.id, glyph);
        }
    }

    glyphs
}

/// One line per member: allocation against capacity and free days.
pub fn render_workload(loads: &[MemberLoad]) -> String {
    let mut output = String::new();
    for load in loads {
        output.push_str(&format!(
            "{}: {}/{} days allocated, busy until day {}, {} free",
            load.member_name,
            load.allocated_days,
            load.capacity_days,
            load.busy_until,
            load.free_days.len()
        ));
        if load.is_overloaded() {
            output.push_str(" (overloaded)");
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::NaiveDate;

    fn row(id: i64, kind: ItemKind, parent: Option<i64>, indent: u8, span: (u32, u32)) -> TimelineRow {
        let mut draft = WorkItemDraft::new(kind, format!("{kind} {id}"), 1);
        draft.parent_id = parent;
        TimelineRow {
            item: draft.into_item(id).unwrap(),
            indent_level: indent,
            start_day: span.0,
            duration_days: span.1,
        }
    }

    fn timeline(rows: Vec<TimelineRow>) -> SprintTimeline {
        let sprint = Sprint::from_input(
            1,
            NewSprint {
                name: "Sprint 1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                duration_weeks: 1,
            },
        )
        .unwrap();
        SprintTimeline {
            days: sprint.business_days(),
            sprint,
            rows,
        }
    }

    #[test]
    fn test_grid_marks_occupied_days() {
        let mut feature = row(1, ItemKind::Feature, None, 0, (0, 5));
        feature.item.title = "Search".into();
        let mut story = row(2, ItemKind::Story, Some(1), 1, (0, 2));
        story.item.title = "Filters".into();
        let mut sub = row(3, ItemKind::Subtask, Some(2), 2, (0, 2));
        sub.item.title = "Facets".into();

        let output = render_timeline(&timeline(vec![feature, story, sub]));
        assert_eq!(
            output,
            "Sprint 1: 2024-01-01 to 2024-01-05\n           MTWTF\nSearch     █████\n  Filters  ██...\n    Facets ██...\n"
        );
    }

    #[test]
    fn test_features_cycle_through_palette() {
        let rows: Vec<_> = (0..11)
            .map(|i| row(i + 1, ItemKind::Feature, None, 0, (0, 1)))
            .collect();
        let glyphs = feature_glyphs(&rows);
        assert_eq!(glyphs[&1], PALETTE[0]);
        assert_eq!(glyphs[&2], PALETTE[1]);
        assert_eq!(glyphs[&11], PALETTE[0]);
    }

    #[test]
    fn test_orphans_use_ungrouped_glyph() {
        let orphan = row(5, ItemKind::Subtask, Some(99), 0, (1, 2));
        let output = render_timeline(&timeline(vec![orphan]));
        assert!(output.ends_with("subtask 5 .--..\n"));
    }

    #[test]
    fn test_workload_flags_overload() {
        let load = MemberLoad {
            member_id: 1,
            member_name: "Ana".to_string(),
            allocated_days: 12,
            capacity_days: 10,
            busy_until: 12,
            free_days: vec![],
        };
        assert_eq!(
            render_workload(&[load]),
            "Ana: 12/10 days allocated, busy until day 12, 0 free (overloaded)\n"
        );
    }
}
