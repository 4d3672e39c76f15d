use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::persistency::PersistencyRecord;

pub const LINES_PER_PAGE: usize = 54;
const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub total_edits: usize,
    pub distinct_editors: usize,
    pub first_edit: DateTime<Utc>,
    pub last_edit: DateTime<Utc>,
}

/// Aggregate persistency of one editor's revisions.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorStats {
    pub name: CompactString,
    pub edits: usize,
    pub mean_persistency_hours: f64,
    pub total_persistency_hours: f64,
}

/// Totals over a record set; `None` when it is empty.
pub fn overview(records: &[PersistencyRecord]) -> Option<Overview> {
    let first_edit = records.iter().map(|r| r.revision.timestamp).min()?;
    let last_edit = records.iter().map(|r| r.revision.timestamp).max()?;
    let distinct_editors = records
        .iter()
        .map(|r| &r.revision.author.name)
        .collect::<FxHashSet<_>>()
        .len();

    Some(Overview {
        total_edits: records.len(),
        distinct_editors,
        first_edit,
        last_edit,
    })
}

fn group_by_editor(records: &[PersistencyRecord]) -> Vec<EditorStats> {
    let mut hours_by_editor: FxHashMap<&CompactString, (usize, f64)> = FxHashMap::default();
    for record in records {
        let entry = hours_by_editor
            .entry(&record.revision.author.name)
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.persistency_hours();
    }

    hours_by_editor
        .into_iter()
        .map(|(name, (edits, total))| EditorStats {
            name: name.clone(),
            edits,
            mean_persistency_hours: total / edits as f64,
            total_persistency_hours: total,
        })
        .collect()
}

/// Per-editor statistics, most active editor first.
pub fn editor_summary(records: &[PersistencyRecord]) -> Vec<EditorStats> {
    let mut stats = group_by_editor(records);
    stats.sort_by(|a, b| b.edits.cmp(&a.edits).then_with(|| a.name.cmp(&b.name)));
    stats
}

/// Per-editor statistics, longest mean persistency first.
pub fn mean_persistency_by_editor(records: &[PersistencyRecord]) -> Vec<EditorStats> {
    let mut stats = group_by_editor(records);
    stats.sort_by(|a, b| {
        b.mean_persistency_hours
            .total_cmp(&a.mean_persistency_hours)
            .then_with(|| a.name.cmp(&b.name))
    });
    stats
}

pub fn top_editors(records: &[PersistencyRecord], n: usize) -> Vec<EditorStats> {
    let mut stats = mean_persistency_by_editor(records);
    stats.truncate(n);
    stats
}

/// Number of edits per calendar day (UTC), from the first to the last edit.
///
/// Days without edits are included with a count of zero.
pub fn daily_edit_counts(records: &[PersistencyRecord]) -> Vec<(NaiveDate, usize)> {
    let Some(overview) = overview(records) else {
        return Vec::new();
    };

    let mut counts: FxHashMap<NaiveDate, usize> = FxHashMap::default();
    for record in records {
        *counts.entry(record.revision.timestamp.date_naive()).or_default() += 1;
    }

    overview
        .first_edit
        .date_naive()
        .iter_days()
        .take_while(|day| *day <= overview.last_edit.date_naive())
        .map(|day| (day, counts.get(&day).copied().unwrap_or(0)))
        .collect()
}

/// Header information of a summary report.
#[derive(Debug, Clone)]
pub struct SummaryHeader<'a> {
    pub page_label: &'a str,
    pub language: &'a str,
    pub start: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

/// Render the plain-text summary report.
///
/// The report is split into pages of [`LINES_PER_PAGE`] lines separated by a form feed, each page
/// ending with a page number.
pub fn render_summary(
    header: &SummaryHeader<'_>,
    records: &[PersistencyRecord],
    top_n: usize,
) -> String {
    let mut lines = vec![
        "Wikipedia Edit Persistency Report".to_string(),
        String::new(),
        format!("Page: {} ({})", header.page_label, header.language),
        format!("Start date filter: {}", header.start),
        format!(
            "Generated on: {}",
            header.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        String::new(),
    ];

    match overview(records) {
        Some(overview) => {
            lines.push(format!("Total edits (filtered): {}", overview.total_edits));
            lines.push(format!("Distinct editors: {}", overview.distinct_editors));
            lines.push(format!(
                "Date range in data: {} -> {}",
                overview.first_edit.date_naive(),
                overview.last_edit.date_naive()
            ));
        }
        None => lines.push("No revisions in the selected range.".to_string()),
    }
    lines.push(String::new());

    lines.push("Top editors by mean persistency (hours)".to_string());
    for stats in top_editors(records, top_n) {
        lines.push(format!(
            "{}: {:.2} h",
            display_name(&stats.name),
            stats.mean_persistency_hours
        ));
    }

    paginate(&lines)
}

pub fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "(hidden)"
    } else {
        name
    }
}

fn paginate(lines: &[String]) -> String {
    // one line per page is taken by the page number
    let body_lines = LINES_PER_PAGE - 1;
    let pages: Vec<&[String]> = lines.chunks(body_lines).collect();
    let page_count = pages.len();

    let mut output = String::new();
    for (index, page) in pages.into_iter().enumerate() {
        if index > 0 {
            output.push(PAGE_BREAK);
        }
        for line in page {
            output.push_str(line);
            output.push('\n');
        }
        // writing into a String cannot fail
        let _ = writeln!(output, "Page {} of {}", index + 1, page_count);
    }
    output
}
