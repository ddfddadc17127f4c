use std::io::{self, IsTerminal};

use time::Date;

use crate::columns::{visible_columns, Column};
use crate::domain::defaults::DefaultValues;
use crate::domain::issue::{Issue, IssueStatus};
use crate::due::{calendar_date, due_info, format_day, DueBucket};
use crate::view::{FilterCriteria, FilterOptions, SortDirection, SortDirective, SortField};

const MAX_CELL_WIDTH: usize = 40;
const EMPTY_CELL: &str = "--";

pub struct TableContext<'a> {
    pub columns: &'a [Column],
    pub defaults: &'a DefaultValues,
    pub filters: &'a FilterCriteria,
    pub sort: SortDirective,
    pub today: Date,
    pub selected: Option<&'a str>,
}

pub fn print_issue_table(issues: &[Issue], ctx: &TableContext<'_>) {
    let palette = Palette::auto();
    print!("{}", format_issue_table(issues, ctx, &palette));
}

fn format_issue_table(issues: &[Issue], ctx: &TableContext<'_>, palette: &Palette) -> String {
    let mut out = String::new();
    out.push_str(&palette.heading("Deviations"));
    out.push('\n');
    let mut header_notes = vec![format!("sort: {}", ctx.sort)];
    if let Some(summary) = filter_summary(ctx.filters) {
        header_notes.push(format!("filters: {summary}"));
    }
    out.push_str(&palette.dim(&header_notes.join("  ")));
    out.push('\n');

    if issues.is_empty() {
        out.push_str(&palette.dim("no issues matched"));
        out.push('\n');
        return out;
    }

    let columns = visible_columns(ctx.columns);
    let cells: Vec<Vec<String>> = issues
        .iter()
        .map(|issue| {
            columns
                .iter()
                .map(|column| clip(&cell_text(issue, &column.id, ctx.today)))
                .collect()
        })
        .collect();
    let labels: Vec<String> = columns
        .iter()
        .map(|column| header_label(column, ctx.sort))
        .collect();
    let position_width = issues.len().to_string().len().max(1);
    let widths: Vec<usize> = labels
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut header = format!(" {:>position_width$}", "");
    for (label, width) in labels.iter().zip(&widths) {
        header.push_str("  ");
        header.push_str(&pad(label, *width));
    }
    out.push_str(&palette.dim(header.trim_end()));
    out.push('\n');

    for (position, (issue, row)) in issues.iter().zip(&cells).enumerate() {
        let marker = if ctx.selected == Some(issue.id.as_str()) {
            ">"
        } else {
            " "
        };
        let mut line = format!(
            "{}{}",
            marker,
            palette.dim(&format!("{:>position_width$}", position + 1))
        );
        for ((column, width), text) in columns.iter().zip(&widths).zip(row) {
            line.push_str("  ");
            line.push_str(&paint_cell(issue, &column.id, &pad(text, *width), ctx, palette));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push_str(&palette.dim(&format!("{} issue(s)", issues.len())));
    out.push('\n');
    out
}

fn header_label(column: &Column, sort: SortDirective) -> String {
    if SortField::for_column(&column.id) != Some(sort.field) {
        return column.label.clone();
    }
    match sort.direction {
        SortDirection::Ascending => format!("{} ^", column.label),
        SortDirection::Descending => format!("{} v", column.label),
    }
}

/// Plain text of one cell, before padding and colour.
fn cell_text(issue: &Issue, column_id: &str, today: Date) -> String {
    let text = match column_id {
        "deviationNo" => issue.deviation_no.to_string(),
        "title" => issue.title.clone(),
        "author" => issue.author.clone(),
        "priority" => issue.priority.clone(),
        "status" => issue.status.as_str().to_string(),
        "assignedTo" => issue.assigned_to.clone(),
        "problemDescription" => issue.problem_description.clone(),
        "solutionDescription" => issue.solution_description.clone().unwrap_or_default(),
        "technology" => issue.technology.clone(),
        "dueDate" => issue
            .due_date
            .as_deref()
            .and_then(calendar_date)
            .map(format_day)
            .unwrap_or_default(),
        "dueIn" => due_info(issue.due_date.as_deref(), today)
            .map(|info| info.label())
            .unwrap_or_default(),
        "createdAt" => calendar_date(&issue.created_at)
            .map(format_day)
            .unwrap_or_default(),
        _ => String::new(),
    };
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        single_line
    }
}

fn paint_cell(
    issue: &Issue,
    column_id: &str,
    padded: &str,
    ctx: &TableContext<'_>,
    palette: &Palette,
) -> String {
    match column_id {
        "deviationNo" => palette.id(padded),
        "status" => palette.status(issue.status, padded),
        "priority" => palette.priority(&issue.priority, padded),
        "assignedTo" => {
            let emphasized = ctx
                .defaults
                .person(&issue.assigned_to)
                .is_some_and(|person| person.has_email());
            palette.assignee(padded, emphasized)
        }
        "dueIn" => match due_info(issue.due_date.as_deref(), ctx.today) {
            Some(info) => palette.due(info.bucket, padded),
            None => palette.dim(padded),
        },
        _ => padded.to_string(),
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{text}{}", " ".repeat(width - len))
    }
}

pub fn print_issue_detail(
    issue: &Issue,
    defaults: &DefaultValues,
    link: Option<&str>,
    today: Date,
) {
    let palette = Palette::auto();
    print!("{}", format_issue_detail(issue, defaults, link, today, &palette));
}

fn format_issue_detail(
    issue: &Issue,
    defaults: &DefaultValues,
    link: Option<&str>,
    today: Date,
    palette: &Palette,
) -> String {
    let mut out = format!(
        "{} {}\n",
        palette.id(&format!("#{}", issue.deviation_no)),
        palette.heading(&issue.title)
    );
    let emphasized = defaults
        .person(&issue.assigned_to)
        .is_some_and(|person| person.has_email());
    let assignee = if issue.assigned_to.is_empty() {
        palette.dim(EMPTY_CELL)
    } else {
        palette.assignee(&issue.assigned_to, emphasized)
    };
    let due = match issue.due_date.as_deref().and_then(calendar_date) {
        Some(day) => {
            let info = due_info(issue.due_date.as_deref(), today);
            match info {
                Some(info) => format!(
                    "{} ({})",
                    format_day(day),
                    palette.due(info.bucket, &info.label())
                ),
                None => format_day(day),
            }
        }
        None => palette.dim(EMPTY_CELL),
    };

    let fields = [
        ("id", issue.id.clone()),
        ("progress", palette.status(issue.status, issue.status.as_str())),
        ("priority", palette.priority(&issue.priority, &issue.priority)),
        ("assigned to", assignee),
        ("technology", issue.technology.clone()),
        ("due", due),
        ("created by", issue.author.clone()),
        ("created", issue.created_at.clone()),
    ];
    for (label, value) in fields {
        out.push_str(&format!("{} {}\n", palette.dim(&format!("{label:>12}:")), value));
    }
    if let Some(link) = link {
        out.push_str(&format!("{} {}\n", palette.dim(&format!("{:>12}:", "link")), link));
    }

    out.push('\n');
    out.push_str(&palette.heading("Problem"));
    out.push('\n');
    out.push_str(&issue.problem_description);
    out.push('\n');
    out.push('\n');
    out.push_str(&palette.heading("Solution"));
    out.push('\n');
    match issue.solution_description.as_deref() {
        Some(solution) if !solution.trim().is_empty() => out.push_str(solution),
        _ => out.push_str(&palette.dim("no solution recorded")),
    }
    out.push('\n');
    out
}

pub fn print_defaults(defaults: &DefaultValues) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Assignees"));
    if defaults.assigned_to.is_empty() {
        println!("  {}", palette.dim("none"));
    }
    for person in &defaults.assigned_to {
        if person.has_email() {
            println!(
                "  {} {}",
                palette.assignee(&person.name, true),
                palette.dim(&format!("<{}>", person.email))
            );
        } else {
            println!("  {}", person.name);
        }
    }
    println!("{}", palette.heading("Priorities"));
    for priority in &defaults.priority {
        println!("  {}", palette.priority(priority, priority));
    }
    println!("{}", palette.heading("Technologies"));
    for technology in &defaults.technology {
        println!("  {technology}");
    }
}

pub fn print_columns(columns: &[Column]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Columns"));
    let mut position = 0usize;
    for column in columns {
        if column.visible {
            position += 1;
            println!(
                "  {:>2}  {} {}",
                position,
                column.label,
                palette.dim(&format!("({})", column.id))
            );
        } else {
            println!(
                "  {}  {}",
                palette.dim(" -"),
                palette.dim(&format!("{} ({}) hidden", column.label, column.id))
            );
        }
    }
}

pub fn print_filter_options(options: &FilterOptions) {
    let palette = Palette::auto();
    let groups = [
        ("status", &options.status),
        ("author", &options.author),
        ("assigned-to", &options.assigned_to),
        ("priority", &options.priority),
        ("technology", &options.technology),
    ];
    for (label, values) in groups {
        let rendered = if values.is_empty() {
            palette.dim("none")
        } else {
            values.join(", ")
        };
        println!("{} {}", palette.heading(&format!("{label}:")), rendered);
    }
}

fn filter_summary(filter: &FilterCriteria) -> Option<String> {
    if filter.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !filter.status.is_empty() {
        let labels = filter
            .status
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>();
        parts.push(format!("status={}", labels.join(",")));
    }
    for (name, values) in [
        ("author", &filter.author),
        ("assigned-to", &filter.assigned_to),
        ("priority", &filter.priority),
        ("technology", &filter.technology),
    ] {
        let values = values
            .iter()
            .filter_map(|value| non_empty(value))
            .collect::<Vec<_>>();
        if !values.is_empty() {
            parts.push(format!("{name}={}", values.join(",")));
        }
    }
    if let Some(bound) = filter.due_on_or_before {
        parts.push(format!("due<={}", format_day(bound)));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn status(&self, status: IssueStatus, text: &str) -> String {
        let code = match status {
            IssueStatus::Open => "31",
            IssueStatus::WorkInProgress => "33",
            IssueStatus::Closed => "32",
        };
        self.paint(code, text)
    }

    fn priority(&self, priority: &str, text: &str) -> String {
        let code = match priority.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => "31",
            "medium" => "33",
            "low" => "32",
            _ => "37",
        };
        self.paint(code, text)
    }

    fn assignee(&self, text: &str, emphasized: bool) -> String {
        if emphasized {
            self.paint("1;34", text)
        } else {
            text.to_string()
        }
    }

    fn due(&self, bucket: DueBucket, text: &str) -> String {
        let code = match bucket {
            DueBucket::Overdue => "1;31",
            DueBucket::Soon => "33",
            DueBucket::Upcoming => "36",
            DueBucket::Later => "32",
        };
        self.paint(code, text)
    }
}
