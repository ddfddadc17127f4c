use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Work In Progress")]
    WorkInProgress,
    #[serde(rename = "Closed")]
    Closed,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Open,
        IssueStatus::WorkInProgress,
        IssueStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Open => "Open",
            IssueStatus::WorkInProgress => "Work In Progress",
            IssueStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = ParseIssueStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ");
        match normalized.as_str() {
            "open" => Ok(IssueStatus::Open),
            "work in progress" | "in progress" | "wip" => Ok(IssueStatus::WorkInProgress),
            "closed" | "done" => Ok(IssueStatus::Closed),
            _ => Err(ParseIssueStatusError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssueStatusError {
    value: String,
}

impl fmt::Display for ParseIssueStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown status '{}'; use one of: Open, Work In Progress, Closed",
            self.value
        )
    }
}

impl Error for ParseIssueStatusError {}

/// One tracked deviation as stored in the shared issue collection.
///
/// `deviation_no` is minted by the transactional counter and never changes.
/// `order` is the user-controlled display rank and is unrelated to either
/// `deviation_no` or `created_at`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub deviation_no: i64,
    pub title: String,
    pub problem_description: String,
    pub solution_description: Option<String>,
    pub status: IssueStatus,
    pub priority: String,
    pub assigned_to: String,
    pub technology: String,
    pub due_date: Option<String>,
    pub author: String,
    pub author_id: String,
    pub created_at: String,
    pub order: Option<i64>,
}

/// Caller-supplied fields of a new issue, already validated and resolved
/// against the defaults. Identity, sequence number and timestamps are added
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub problem_description: String,
    pub solution_description: Option<String>,
    pub priority: String,
    pub assigned_to: String,
    pub technology: String,
    pub due_date: Option<String>,
}

/// Partial update of the mutable issue fields. `author`, `author_id`,
/// `created_at` and `deviation_no` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub problem_description: Option<String>,
    pub solution_description: Option<Option<String>>,
    pub status: Option<IssueStatus>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub technology: Option<String>,
    pub due_date: Option<Option<String>>,
}

impl IssuePatch {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.problem_description.is_some()
            || self.solution_description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.assigned_to.is_some()
            || self.technology.is_some()
            || self.due_date.is_some()
    }

    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(title) = &self.title {
            issue.title = title.clone();
        }
        if let Some(problem) = &self.problem_description {
            issue.problem_description = problem.clone();
        }
        if let Some(solution) = &self.solution_description {
            issue.solution_description = solution.clone();
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = &self.priority {
            issue.priority = priority.clone();
        }
        if let Some(assigned_to) = &self.assigned_to {
            issue.assigned_to = assigned_to.clone();
        }
        if let Some(technology) = &self.technology {
            issue.technology = technology.clone();
        }
        if let Some(due_date) = &self.due_date {
            issue.due_date = due_date.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderAssignment {
    pub issue_id: String,
    pub order: i64,
}
