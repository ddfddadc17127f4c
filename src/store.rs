use std::error::Error;
use std::fmt;
use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::db::{self, DEFAULTS_DOCUMENT, ISSUE_COUNTER};
use crate::domain::defaults::DefaultValues;
use crate::domain::issue::{Issue, IssueDraft, IssuePatch, IssueStatus, OrderAssignment};
use crate::due::{now_unix_millis, now_utc_rfc3339};
use crate::identity::Identity;

/// The shared issue collection plus its counter and defaults singletons.
pub trait IssueStore {
    fn load_issues(&self) -> Result<Vec<Issue>, StoreError>;
    fn get_issue(&self, id: &str) -> Result<Option<Issue>, StoreError>;
    /// Mints the next sequence number and inserts the issue atomically.
    fn create_issue(&self, draft: &IssueDraft, identity: &Identity) -> Result<Issue, StoreError>;
    fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue, StoreError>;
    /// Persists every assignment or none of them.
    fn write_orders(&self, assignments: &[OrderAssignment]) -> Result<(), StoreError>;
    /// Reads the defaults singleton, creating it with the built-ins when it
    /// does not exist yet.
    fn load_defaults(&self) -> Result<DefaultValues, StoreError>;
    /// Reads, edits and saves the defaults as one write. Nothing is saved
    /// when `edit` fails.
    fn edit_defaults<E, F>(&self, edit: F) -> Result<DefaultValues, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut DefaultValues) -> Result<(), E>;
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::Json(err) => write!(f, "invalid stored document: {}", err),
            StoreError::NotFound(id) => write!(f, "issue '{}' not found", id),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Db(err) => Some(err),
            StoreError::Json(err) => Some(err),
            StoreError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

pub struct SqliteStore {
    conn: Connection,
    db_path: String,
}

impl SqliteStore {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        Ok(Self {
            conn,
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn immediate(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl IssueStore for SqliteStore {
    fn load_issues(&self) -> Result<Vec<Issue>, StoreError> {
        Ok(db::list_issues(&self.conn)?)
    }

    fn get_issue(&self, id: &str) -> Result<Option<Issue>, StoreError> {
        Ok(db::get_issue(&self.conn, id)?)
    }

    fn create_issue(&self, draft: &IssueDraft, identity: &Identity) -> Result<Issue, StoreError> {
        let tx = self.immediate()?;
        let deviation_no = db::next_counter_value(&tx, ISSUE_COUNTER)?;
        let issue = Issue {
            id: Uuid::now_v7().simple().to_string(),
            deviation_no,
            title: draft.title.clone(),
            problem_description: draft.problem_description.clone(),
            solution_description: draft.solution_description.clone(),
            status: IssueStatus::Open,
            priority: draft.priority.clone(),
            assigned_to: draft.assigned_to.clone(),
            technology: draft.technology.clone(),
            due_date: draft.due_date.clone(),
            author: identity.author_label(),
            author_id: identity.uid.clone(),
            created_at: now_utc_rfc3339(),
            order: Some(now_unix_millis()),
        };
        db::insert_issue(&tx, &issue)?;
        tx.commit()?;
        tracing::info!(id = %issue.id, deviation_no, "created issue");
        Ok(issue)
    }

    fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue, StoreError> {
        let tx = self.immediate()?;
        let mut issue =
            db::get_issue(&tx, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(&mut issue);
        db::update_issue_fields(&tx, &issue)?;
        tx.commit()?;
        tracing::info!(id, "updated issue");
        Ok(issue)
    }

    fn write_orders(&self, assignments: &[OrderAssignment]) -> Result<(), StoreError> {
        let tx = self.immediate()?;
        for assignment in assignments {
            let touched = db::set_issue_order(&tx, &assignment.issue_id, assignment.order)?;
            if touched == 0 {
                return Err(StoreError::NotFound(assignment.issue_id.clone()));
            }
        }
        tx.commit()?;
        tracing::debug!(count = assignments.len(), "wrote issue orders");
        Ok(())
    }

    fn load_defaults(&self) -> Result<DefaultValues, StoreError> {
        read_or_create_defaults(&self.conn)
    }

    fn edit_defaults<E, F>(&self, edit: F) -> Result<DefaultValues, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut DefaultValues) -> Result<(), E>,
    {
        let tx = self.immediate()?;
        let mut defaults = read_or_create_defaults(&tx)?;
        edit(&mut defaults)?;
        let body = defaults.to_document().map_err(StoreError::from)?;
        db::put_document(&tx, DEFAULTS_DOCUMENT, &body).map_err(StoreError::from)?;
        tx.commit().map_err(StoreError::from)?;
        tracing::info!("saved default values");
        Ok(defaults)
    }
}

fn read_or_create_defaults(conn: &Connection) -> Result<DefaultValues, StoreError> {
    if let Some(raw) = db::get_document(conn, DEFAULTS_DOCUMENT)? {
        return Ok(DefaultValues::from_document(&raw)?);
    }
    let builtin = DefaultValues::default();
    if db::insert_document_if_absent(conn, DEFAULTS_DOCUMENT, &builtin.to_document()?)? {
        tracing::info!("created default values document");
        return Ok(builtin);
    }
    // Another writer created it first.
    let raw = db::get_document(conn, DEFAULTS_DOCUMENT)?
        .ok_or_else(|| StoreError::NotFound(DEFAULTS_DOCUMENT.to_string()))?;
    Ok(DefaultValues::from_document(&raw)?)
}

fn ensure_parent_dir(path: &str) -> Result<(), StoreError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
