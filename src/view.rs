use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::domain::issue::{Issue, IssueStatus};
use crate::due::{calendar_date, parse_timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: Vec<IssueStatus>,
    pub author: Vec<String>,
    pub assigned_to: Vec<String>,
    pub priority: Vec<String>,
    pub technology: Vec<String>,
    pub due_on_or_before: Option<Date>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
            && self.author.is_empty()
            && self.assigned_to.is_empty()
            && self.priority.is_empty()
            && self.technology.is_empty()
            && self.due_on_or_before.is_none()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        if !self.status.is_empty() && !self.status.contains(&issue.status) {
            return false;
        }
        if !selected(&self.author, &issue.author)
            || !selected(&self.assigned_to, &issue.assigned_to)
            || !selected(&self.priority, &issue.priority)
            || !selected(&self.technology, &issue.technology)
        {
            return false;
        }
        if let Some(bound) = self.due_on_or_before {
            return match issue.due_date.as_deref().and_then(calendar_date) {
                Some(due) => due <= bound,
                None => false,
            };
        }
        true
    }
}

fn selected(selection: &[String], value: &str) -> bool {
    selection.is_empty() || selection.iter().any(|candidate| candidate == value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    DeviationNo,
    Title,
    Author,
    Priority,
    Status,
    AssignedTo,
    ProblemDescription,
    SolutionDescription,
    Technology,
    DueDate,
    CreatedAt,
    Order,
}

impl SortField {
    pub const ALL: [SortField; 12] = [
        SortField::DeviationNo,
        SortField::Title,
        SortField::Author,
        SortField::Priority,
        SortField::Status,
        SortField::AssignedTo,
        SortField::ProblemDescription,
        SortField::SolutionDescription,
        SortField::Technology,
        SortField::DueDate,
        SortField::CreatedAt,
        SortField::Order,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::DeviationNo => "deviationNo",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::AssignedTo => "assignedTo",
            SortField::ProblemDescription => "problemDescription",
            SortField::SolutionDescription => "solutionDescription",
            SortField::Technology => "technology",
            SortField::DueDate => "dueDate",
            SortField::CreatedAt => "createdAt",
            SortField::Order => "order",
        }
    }

    /// Sort field behind a list column id, if the column is sortable.
    pub fn for_column(column_id: &str) -> Option<SortField> {
        column_id.parse().ok()
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ParseSortFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        let field = match normalized.as_str() {
            "deviationno" | "no" | "#" => SortField::DeviationNo,
            "title" => SortField::Title,
            "author" | "createdby" => SortField::Author,
            "priority" => SortField::Priority,
            "status" | "progress" => SortField::Status,
            "assignedto" | "assignee" => SortField::AssignedTo,
            "problemdescription" | "problem" => SortField::ProblemDescription,
            "solutiondescription" | "solution" => SortField::SolutionDescription,
            "technology" => SortField::Technology,
            "duedate" | "due" | "duein" => SortField::DueDate,
            "createdat" | "created" => SortField::CreatedAt,
            "order" => SortField::Order,
            _ => {
                return Err(ParseSortFieldError {
                    value: value.to_string(),
                })
            }
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortFieldError {
    value: String,
}

impl fmt::Display for ParseSortFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = SortField::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "unknown sort field '{}'; use one of: {}", self.value, known)
    }
}

impl Error for ParseSortFieldError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SortDirective {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortDirective {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl Default for SortDirective {
    fn default() -> Self {
        Self::new(SortField::Order, SortDirection::Ascending)
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Header-click semantics: a new field starts ascending, the same field goes
/// ascending → descending → back to the default directive.
pub fn request_sort(current: SortDirective, field: SortField) -> SortDirective {
    if current.field == field {
        return match current.direction {
            SortDirection::Ascending => SortDirective::new(field, SortDirection::Descending),
            SortDirection::Descending => SortDirective::default(),
        };
    }
    SortDirective::new(field, SortDirection::Ascending)
}

/// The displayed sequence: filter, then sort, then the sequence-number
/// tie-break. Pure; recomputed whenever the raw snapshot or view state
/// changes.
pub fn derive_view(raw: &[Issue], filters: &FilterCriteria, sort: SortDirective) -> Vec<Issue> {
    let mut view: Vec<Issue> = raw
        .iter()
        .filter(|issue| filters.matches(issue))
        .cloned()
        .collect();
    sort_issues(&mut view, sort);
    view
}

pub fn sort_issues(issues: &mut [Issue], sort: SortDirective) {
    issues.sort_by(|left, right| compare_issues(left, right, sort));
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Int(i64),
    Text(&'a str),
    Time(OffsetDateTime),
}

fn sort_key(issue: &Issue, field: SortField) -> Option<SortKey<'_>> {
    match field {
        SortField::DeviationNo => Some(SortKey::Int(issue.deviation_no)),
        SortField::Title => Some(SortKey::Text(&issue.title)),
        SortField::Author => Some(SortKey::Text(&issue.author)),
        SortField::Priority => Some(SortKey::Text(&issue.priority)),
        SortField::Status => Some(SortKey::Text(issue.status.as_str())),
        SortField::AssignedTo => Some(SortKey::Text(&issue.assigned_to)),
        SortField::ProblemDescription => Some(SortKey::Text(&issue.problem_description)),
        SortField::SolutionDescription => issue.solution_description.as_deref().map(SortKey::Text),
        SortField::Technology => Some(SortKey::Text(&issue.technology)),
        SortField::DueDate => issue
            .due_date
            .as_deref()
            .and_then(parse_timestamp)
            .map(SortKey::Time),
        SortField::CreatedAt => parse_timestamp(&issue.created_at).map(SortKey::Time),
        SortField::Order => issue.order.map(SortKey::Int),
    }
}

fn compare_issues(left: &Issue, right: &Issue, sort: SortDirective) -> Ordering {
    let primary = match (sort_key(left, sort.field), sort_key(right, sort.field)) {
        (Some(a), Some(b)) => sort.direction.apply(a.cmp(&b)),
        // Missing values sit at the tail in either direction.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    if primary != Ordering::Equal || sort.field == SortField::DeviationNo {
        return primary;
    }
    right.deviation_no.cmp(&left.deviation_no)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub status: Vec<String>,
    pub author: Vec<String>,
    pub assigned_to: Vec<String>,
    pub priority: Vec<String>,
    pub technology: Vec<String>,
}

/// Distinct non-empty values per filter dimension, sorted, taken from the raw
/// collection rather than the filtered view.
pub fn filter_options(raw: &[Issue]) -> FilterOptions {
    let mut status = BTreeSet::new();
    let mut author = BTreeSet::new();
    let mut assigned_to = BTreeSet::new();
    let mut priority = BTreeSet::new();
    let mut technology = BTreeSet::new();
    for issue in raw {
        status.insert(issue.status.as_str().to_string());
        insert_non_empty(&mut author, &issue.author);
        insert_non_empty(&mut assigned_to, &issue.assigned_to);
        insert_non_empty(&mut priority, &issue.priority);
        insert_non_empty(&mut technology, &issue.technology);
    }
    FilterOptions {
        status: status.into_iter().collect(),
        author: author.into_iter().collect(),
        assigned_to: assigned_to.into_iter().collect(),
        priority: priority.into_iter().collect(),
        technology: technology.into_iter().collect(),
    }
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: &str) {
    if !value.is_empty() {
        set.insert(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{
        derive_view, filter_options, request_sort, FilterCriteria, SortDirection, SortDirective,
        SortField,
    };
    use crate::domain::issue::{Issue, IssueStatus};

    fn issue(id: &str, order: Option<i64>, deviation_no: i64) -> Issue {
        Issue {
            id: id.to_string(),
            deviation_no,
            title: format!("Issue {id}"),
            problem_description: "problem".to_string(),
            solution_description: None,
            status: IssueStatus::Open,
            priority: "Medium".to_string(),
            assigned_to: String::new(),
            technology: "Electrical".to_string(),
            due_date: None,
            author: "qa@example.com".to_string(),
            author_id: "uid-1".to_string(),
            created_at: "2026-03-01T08:00:00Z".to_string(),
            order,
        }
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|issue| issue.id.as_str()).collect()
    }

    fn asc(field: SortField) -> SortDirective {
        SortDirective::new(field, SortDirection::Ascending)
    }

    fn desc(field: SortField) -> SortDirective {
        SortDirective::new(field, SortDirection::Descending)
    }

    #[test]
    fn default_sort_uses_order_field() {
        let raw = vec![
            issue("C", Some(2), 2),
            issue("A", Some(0), 3),
            issue("B", Some(1), 1),
        ];
        let view = derive_view(&raw, &FilterCriteria::default(), SortDirective::default());
        assert_eq!(ids(&view), vec!["A", "B", "C"]);
    }

    #[test]
    fn equal_values_break_ties_by_descending_sequence_number() {
        let mut raw = vec![issue("A", Some(5), 1), issue("B", Some(5), 9)];
        raw.push(issue("C", Some(5), 4));
        let view = derive_view(&raw, &FilterCriteria::default(), SortDirective::default());
        assert_eq!(ids(&view), vec!["B", "C", "A"]);

        let view = derive_view(&raw, &FilterCriteria::default(), desc(SortField::Order));
        assert_eq!(ids(&view), vec!["B", "C", "A"]);
    }

    #[test]
    fn ascending_and_descending_reverse_each_other_outside_tie_groups() {
        let mut raw = Vec::new();
        for (idx, priority) in ["High", "Low", "Medium", "Low", "High", "Critical"]
            .iter()
            .enumerate()
        {
            let mut item = issue(&format!("I{idx}"), None, idx as i64 + 1);
            item.priority = priority.to_string();
            raw.push(item);
        }

        let ascending = derive_view(&raw, &FilterCriteria::default(), asc(SortField::Priority));
        let descending = derive_view(&raw, &FilterCriteria::default(), desc(SortField::Priority));

        let priorities = |issues: &[Issue]| -> Vec<String> {
            issues.iter().map(|issue| issue.priority.clone()).collect()
        };
        let mut reversed = priorities(&descending);
        reversed.reverse();
        assert_eq!(priorities(&ascending), reversed);

        // Inside each tie group both directions keep descending sequence numbers.
        assert_eq!(ids(&ascending), vec!["I5", "I4", "I0", "I3", "I1", "I2"]);
        assert_eq!(ids(&descending), vec!["I2", "I3", "I1", "I4", "I0", "I5"]);
    }

    #[test]
    fn sequence_number_sort_has_no_secondary_tie_break() {
        let raw = vec![issue("A", Some(1), 2), issue("B", Some(0), 1)];
        let ascending = derive_view(&raw, &FilterCriteria::default(), asc(SortField::DeviationNo));
        assert_eq!(ids(&ascending), vec!["B", "A"]);
        let descending =
            derive_view(&raw, &FilterCriteria::default(), desc(SortField::DeviationNo));
        assert_eq!(ids(&descending), vec!["A", "B"]);
    }

    #[test]
    fn missing_due_dates_sort_last_in_both_directions() {
        let mut early = issue("early", Some(0), 1);
        early.due_date = Some("2026-03-01T00:00:00Z".to_string());
        let mut late = issue("late", Some(1), 2);
        late.due_date = Some("2026-04-01T00:00:00Z".to_string());
        let undated_a = issue("undated-a", Some(2), 3);
        let undated_b = issue("undated-b", Some(3), 4);
        let raw = vec![undated_a, early, undated_b, late];

        let ascending = derive_view(&raw, &FilterCriteria::default(), asc(SortField::DueDate));
        assert_eq!(ids(&ascending), vec!["early", "late", "undated-b", "undated-a"]);

        let descending = derive_view(&raw, &FilterCriteria::default(), desc(SortField::DueDate));
        assert_eq!(
            ids(&descending),
            vec!["late", "early", "undated-b", "undated-a"]
        );
    }

    #[test]
    fn missing_order_values_sort_after_ordered_ones() {
        let raw = vec![
            issue("legacy", None, 1),
            issue("B", Some(1), 2),
            issue("A", Some(0), 3),
        ];
        let view = derive_view(&raw, &FilterCriteria::default(), SortDirective::default());
        assert_eq!(ids(&view), vec!["A", "B", "legacy"]);
    }

    #[test]
    fn status_sorts_by_label_text() {
        let mut open = issue("open", Some(0), 1);
        open.status = IssueStatus::Open;
        let mut closed = issue("closed", Some(1), 2);
        closed.status = IssueStatus::Closed;
        let mut wip = issue("wip", Some(2), 3);
        wip.status = IssueStatus::WorkInProgress;
        let view = derive_view(
            &[open, closed, wip],
            &FilterCriteria::default(),
            asc(SortField::Status),
        );
        assert_eq!(ids(&view), vec!["closed", "open", "wip"]);
    }

    #[test]
    fn filter_dimensions_combine_as_intersection() {
        let mut raw = Vec::new();
        for (idx, (priority, tech)) in [
            ("High", "Software"),
            ("High", "Civil"),
            ("Low", "Software"),
            ("Medium", "Software"),
            ("High", "Mechanical"),
        ]
        .iter()
        .enumerate()
        {
            let mut item = issue(&format!("I{idx}"), Some(idx as i64), idx as i64 + 1);
            item.priority = priority.to_string();
            item.technology = tech.to_string();
            raw.push(item);
        }

        let by_priority = FilterCriteria {
            priority: vec!["High".to_string(), "Low".to_string()],
            ..FilterCriteria::default()
        };
        let by_technology = FilterCriteria {
            technology: vec!["Software".to_string()],
            ..FilterCriteria::default()
        };
        let both = FilterCriteria {
            priority: by_priority.priority.clone(),
            technology: by_technology.technology.clone(),
            ..FilterCriteria::default()
        };

        let sort = SortDirective::default();
        let priority_ids = ids(&derive_view(&raw, &by_priority, sort))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let technology_ids = ids(&derive_view(&raw, &by_technology, sort))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let intersection: Vec<String> = priority_ids
            .into_iter()
            .filter(|id| technology_ids.contains(id))
            .collect();

        let combined = derive_view(&raw, &both, sort);
        assert_eq!(ids(&combined), intersection.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(ids(&combined), vec!["I0", "I2"]);
    }

    #[test]
    fn status_and_assignee_filters_use_membership() {
        let mut wip = issue("wip", Some(0), 1);
        wip.status = IssueStatus::WorkInProgress;
        wip.assigned_to = "Dana".to_string();
        let mut open = issue("open", Some(1), 2);
        open.assigned_to = "Lee".to_string();
        let raw = vec![wip, open];

        let filters = FilterCriteria {
            status: vec![IssueStatus::WorkInProgress, IssueStatus::Closed],
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_view(&raw, &filters, SortDirective::default())), vec!["wip"]);

        let filters = FilterCriteria {
            assigned_to: vec!["Lee".to_string()],
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&derive_view(&raw, &filters, SortDirective::default())), vec!["open"]);
    }

    #[test]
    fn due_bound_compares_calendar_dates_and_drops_undated() {
        let mut on_bound = issue("on-bound", Some(0), 1);
        on_bound.due_date = Some("2026-03-10T22:00:00Z".to_string());
        let mut after = issue("after", Some(1), 2);
        after.due_date = Some("2026-03-11T00:00:00Z".to_string());
        let mut before = issue("before", Some(2), 3);
        before.due_date = Some("2026-02-01T00:00:00Z".to_string());
        let undated = issue("undated", Some(3), 4);
        let raw = vec![on_bound, after, before, undated];

        let filters = FilterCriteria {
            due_on_or_before: Some(date!(2026 - 03 - 10)),
            ..FilterCriteria::default()
        };
        let view = derive_view(&raw, &filters, SortDirective::default());
        assert_eq!(ids(&view), vec!["on-bound", "before"]);
    }

    #[test]
    fn empty_criteria_keep_everything() {
        let raw = vec![issue("A", Some(0), 1), issue("B", Some(1), 2)];
        assert!(FilterCriteria::default().is_empty());
        assert_eq!(
            derive_view(&raw, &FilterCriteria::default(), SortDirective::default()).len(),
            2
        );
    }

    #[test]
    fn repeated_header_clicks_cycle_back_to_default() {
        let first = request_sort(SortDirective::default(), SortField::DeviationNo);
        assert_eq!(first, asc(SortField::DeviationNo));
        let second = request_sort(first, SortField::DeviationNo);
        assert_eq!(second, desc(SortField::DeviationNo));
        let third = request_sort(second, SortField::DeviationNo);
        assert_eq!(third, SortDirective::default());
        assert_eq!(third, asc(SortField::Order));
    }

    #[test]
    fn clicking_a_new_field_starts_ascending() {
        let current = desc(SortField::Title);
        assert_eq!(
            request_sort(current, SortField::Priority),
            asc(SortField::Priority)
        );
        // The default field cycles like any other.
        assert_eq!(
            request_sort(SortDirective::default(), SortField::Order),
            desc(SortField::Order)
        );
    }

    #[test]
    fn parses_column_ids_and_aliases() {
        assert_eq!("deviationNo".parse::<SortField>(), Ok(SortField::DeviationNo));
        assert_eq!("deviation_no".parse::<SortField>(), Ok(SortField::DeviationNo));
        assert_eq!("assigned-to".parse::<SortField>(), Ok(SortField::AssignedTo));
        assert_eq!(SortField::for_column("dueIn"), Some(SortField::DueDate));
        assert!("colour".parse::<SortField>().is_err());
        for field in SortField::ALL {
            assert_eq!(field.as_str().parse::<SortField>(), Ok(field));
        }
    }

    #[test]
    fn filter_options_are_distinct_sorted_and_skip_blanks() {
        let mut a = issue("A", Some(0), 1);
        a.assigned_to = "Lee".to_string();
        a.priority = "High".to_string();
        let mut b = issue("B", Some(1), 2);
        b.assigned_to = "Dana".to_string();
        b.status = IssueStatus::Closed;
        let c = issue("C", Some(2), 3);
        let options = filter_options(&[a, b, c]);
        assert_eq!(options.assigned_to, vec!["Dana", "Lee"]);
        assert_eq!(options.priority, vec!["High", "Medium"]);
        assert_eq!(options.status, vec!["Closed", "Open"]);
        assert_eq!(options.author, vec!["qa@example.com"]);
    }
}
