use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::columns::{self, Column, ColumnMoveRejected};
use crate::deeplink;
use crate::domain::defaults::{DefaultValues, DefaultsError, LabelKind};
use crate::domain::issue::{
    Issue, IssueDraft, IssuePatch, IssueStatus, OrderAssignment, ParseIssueStatusError,
};
use crate::due::{day_timestamp, parse_day, parse_timestamp};
use crate::identity::Identity;
use crate::prefs::{PrefsError, PrefsStore};
use crate::reorder::{plan_reorder, ReorderRejected};
use crate::store::{IssueStore, SqliteStore, StoreError};
use crate::subscription::{self, Subscription};
use crate::view::{derive_view, filter_options, FilterCriteria, FilterOptions, SortDirective};

pub struct App<S: IssueStore = SqliteStore> {
    store: S,
    identity: Identity,
    prefs: PrefsStore,
}

#[derive(Debug, Clone, Default)]
pub struct NewIssueInput {
    pub title: String,
    pub problem_description: String,
    pub solution_description: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub technology: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIssueInput {
    pub title: Option<String>,
    pub problem_description: Option<String>,
    pub solution_description: Option<String>,
    pub clear_solution: bool,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub technology: Option<String>,
    pub due_date: Option<String>,
    pub clear_due_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    Applied(Vec<OrderAssignment>),
    Skipped(ReorderRejected),
}

impl App<SqliteStore> {
    pub fn open(db_path: &str, identity: Identity, prefs: PrefsStore) -> Result<Self, AppError> {
        let store = SqliteStore::open(db_path)?;
        Ok(Self::with_store(store, identity, prefs))
    }

    pub fn subscribe(&self, interval: Duration) -> Result<Subscription, AppError> {
        Ok(subscription::subscribe(self.store.db_path(), interval)?)
    }
}

impl<S: IssueStore> App<S> {
    pub fn with_store(store: S, identity: Identity, prefs: PrefsStore) -> Self {
        Self {
            store,
            identity,
            prefs,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn create_issue(&self, input: NewIssueInput) -> Result<Issue, AppError> {
        let title = required("title", &input.title)?;
        let problem_description = required("problem", &input.problem_description)?;
        let defaults = self.store.load_defaults()?;

        let draft = IssueDraft {
            title,
            problem_description,
            solution_description: input.solution_description.as_deref().and_then(non_empty),
            priority: input
                .priority
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_else(|| defaults.initial_priority().to_string()),
            assigned_to: input
                .assigned_to
                .as_deref()
                .map(|value| value.trim().to_string())
                .unwrap_or_default(),
            technology: input
                .technology
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_else(|| defaults.initial_technology().to_string()),
            due_date: parse_due_input(input.due_date.as_deref())?,
        };
        Ok(self.store.create_issue(&draft, &self.identity)?)
    }

    pub fn update_issue(&self, id: &str, input: UpdateIssueInput) -> Result<Issue, AppError> {
        let patch = build_patch(input)?;
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field change".to_string(),
            ));
        }
        Ok(self.store.update_issue(id, &patch)?)
    }

    pub fn list_issues(
        &self,
        filters: &FilterCriteria,
        sort: SortDirective,
    ) -> Result<Vec<Issue>, AppError> {
        let raw = self.store.load_issues()?;
        Ok(derive_view(&raw, filters, sort))
    }

    pub fn show_issue(&self, id: &str) -> Result<Issue, AppError> {
        self.store
            .get_issue(id)?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Issue selected by an `#issue/<id>` link within the current view.
    pub fn resolve_link(
        &self,
        location: &str,
        filters: &FilterCriteria,
        sort: SortDirective,
    ) -> Result<Issue, AppError> {
        let id = deeplink::parse_fragment(location).ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "'{}' is not an issue link; expected {}<id>",
                location,
                deeplink::ISSUE_FRAGMENT_PREFIX
            ))
        })?;
        let view = self.list_issues(filters, sort)?;
        deeplink::resolve(location, &view, false, None)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    pub fn issue_link(&self, base: &str, id: &str) -> Result<String, AppError> {
        let issue = self.show_issue(id)?;
        Ok(deeplink::issue_link(base, &issue.id))
    }

    /// Moves the displayed row at `from` to `to` under the given view state
    /// and persists the resulting order of the whole collection.
    pub fn reorder_issues(
        &self,
        filters: &FilterCriteria,
        sort: SortDirective,
        from: usize,
        to: usize,
    ) -> Result<ReorderOutcome, AppError> {
        let raw = self.store.load_issues()?;
        let displayed = derive_view(&raw, filters, sort);
        let plan = match plan_reorder(&displayed, &raw, from, to) {
            Ok(plan) => plan,
            Err(rejected) => {
                tracing::debug!(from, to, reason = %rejected, "reorder skipped");
                return Ok(ReorderOutcome::Skipped(rejected));
            }
        };
        if let Err(err) = self.store.write_orders(&plan) {
            tracing::error!(error = %err, "reorder failed");
            return Err(AppError::ReorderFailed(err));
        }
        tracing::info!(from, to, count = plan.len(), "reordered issues");
        Ok(ReorderOutcome::Applied(plan))
    }

    pub fn filter_options(&self) -> Result<FilterOptions, AppError> {
        let raw = self.store.load_issues()?;
        Ok(filter_options(&raw))
    }

    pub fn defaults(&self) -> Result<DefaultValues, AppError> {
        Ok(self.store.load_defaults()?)
    }

    pub fn add_person(&self, name: &str, email: Option<&str>) -> Result<DefaultValues, AppError> {
        self.edit_defaults(|defaults| Ok(defaults.add_person(name, email)?))
    }

    pub fn remove_person(&self, name: &str) -> Result<DefaultValues, AppError> {
        self.edit_defaults(|defaults| {
            if defaults.remove_person(name) {
                Ok(())
            } else {
                Err(AppError::InvalidArgument(format!(
                    "assignee '{}' is not in the roster",
                    name
                )))
            }
        })
    }

    pub fn add_label(&self, kind: LabelKind, value: &str) -> Result<DefaultValues, AppError> {
        self.edit_defaults(|defaults| {
            if defaults.add_label(kind, value) {
                Ok(())
            } else {
                Err(AppError::InvalidArgument(format!(
                    "{} '{}' is blank or already listed",
                    kind.as_str(),
                    value.trim()
                )))
            }
        })
    }

    pub fn remove_label(&self, kind: LabelKind, value: &str) -> Result<DefaultValues, AppError> {
        self.edit_defaults(|defaults| {
            if defaults.remove_label(kind, value) {
                Ok(())
            } else {
                Err(AppError::InvalidArgument(format!(
                    "{} '{}' is not listed",
                    kind.as_str(),
                    value
                )))
            }
        })
    }

    fn edit_defaults<F>(&self, edit: F) -> Result<DefaultValues, AppError>
    where
        F: FnOnce(&mut DefaultValues) -> Result<(), AppError>,
    {
        self.store.edit_defaults(edit)
    }

    pub fn columns(&self) -> Vec<Column> {
        self.prefs.load_columns(&self.identity.uid)
    }

    pub fn toggle_column(&self, id: &str) -> Result<Vec<Column>, AppError> {
        let mut layout = self.columns();
        columns::toggle_column(&mut layout, id)?;
        self.prefs.save_columns(&self.identity.uid, &layout)?;
        Ok(layout)
    }

    /// Positions are among visible columns. A rejected move leaves the stored
    /// layout untouched.
    pub fn move_column(&self, from: usize, to: usize) -> Result<Vec<Column>, AppError> {
        let mut layout = self.columns();
        match columns::move_visible_column(&mut layout, from, to) {
            Ok(true) => self.prefs.save_columns(&self.identity.uid, &layout)?,
            Ok(false) => {}
            Err(rejected) => {
                tracing::debug!(from, to, reason = %rejected, "column move skipped");
                return Ok(self.columns());
            }
        }
        Ok(layout)
    }

    pub fn reset_columns(&self) -> Result<Vec<Column>, AppError> {
        self.prefs.clear_columns(&self.identity.uid)?;
        Ok(columns::default_columns())
    }
}

fn build_patch(input: UpdateIssueInput) -> Result<IssuePatch, AppError> {
    if input.clear_solution && input.solution_description.is_some() {
        return Err(AppError::InvalidArgument(
            "--solution and --clear-solution are mutually exclusive".to_string(),
        ));
    }
    if input.clear_due_date && input.due_date.is_some() {
        return Err(AppError::InvalidArgument(
            "--due and --clear-due are mutually exclusive".to_string(),
        ));
    }

    let title = input
        .title
        .as_deref()
        .map(|value| required("title", value))
        .transpose()?;
    let problem_description = input
        .problem_description
        .as_deref()
        .map(|value| required("problem", value))
        .transpose()?;
    let solution_description = if input.clear_solution {
        Some(None)
    } else {
        input
            .solution_description
            .as_deref()
            .map(non_empty)
    };
    let status = input
        .status
        .as_deref()
        .map(str::parse::<IssueStatus>)
        .transpose()?;
    let due_date = if input.clear_due_date {
        Some(None)
    } else {
        match input.due_date.as_deref() {
            Some(raw) => Some(parse_due_input(Some(raw))?),
            None => None,
        }
    };

    Ok(IssuePatch {
        title,
        problem_description,
        solution_description,
        status,
        priority: input.priority.as_deref().and_then(non_empty),
        assigned_to: input.assigned_to.map(|value| value.trim().to_string()),
        technology: input.technology.as_deref().and_then(non_empty),
        due_date,
    })
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    non_empty(value).ok_or_else(|| AppError::InvalidArgument(format!("{field} is required")))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Due dates are entered as `YYYY-MM-DD` and stored as midnight UTC. Full
/// RFC3339 timestamps pass through unchanged.
fn parse_due_input(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if let Ok(day) = parse_day(raw) {
        return day_timestamp(day).map(Some).map_err(|_| {
            AppError::InvalidArgument(format!(
                "invalid due date '{}'; year must be between 0000 and 9999",
                raw
            ))
        });
    }
    if parse_timestamp(raw).is_some() {
        return Ok(Some(raw.to_string()));
    }
    Err(AppError::InvalidArgument(format!(
        "invalid due date '{}'; use YYYY-MM-DD",
        raw
    )))
}

#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Prefs(PrefsError),
    ReorderFailed(StoreError),
    ParseStatus(ParseIssueStatusError),
    InvalidArgument(String),
    NotFound(String),
    Unauthenticated,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Prefs(err) => write!(f, "{}", err),
            AppError::ReorderFailed(err) => write!(f, "failed to save new order: {}", err),
            AppError::ParseStatus(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(id) => write!(f, "issue '{}' not found", id),
            AppError::Unauthenticated => write!(
                f,
                "not signed in; set DVT_USER_ID or pass --user-id"
            ),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Store(err) => Some(err),
            AppError::Prefs(err) => Some(err),
            AppError::ReorderFailed(err) => Some(err),
            AppError::ParseStatus(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
            AppError::Unauthenticated => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => AppError::NotFound(id),
            other => AppError::Store(other),
        }
    }
}

impl From<PrefsError> for AppError {
    fn from(value: PrefsError) -> Self {
        AppError::Prefs(value)
    }
}

impl From<ParseIssueStatusError> for AppError {
    fn from(value: ParseIssueStatusError) -> Self {
        AppError::ParseStatus(value)
    }
}

impl From<DefaultsError> for AppError {
    fn from(value: DefaultsError) -> Self {
        AppError::InvalidArgument(value.to_string())
    }
}

impl From<ColumnMoveRejected> for AppError {
    fn from(value: ColumnMoveRejected) -> Self {
        AppError::InvalidArgument(value.to_string())
    }
}
