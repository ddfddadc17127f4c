use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{
    params, Connection, DatabaseName, OptionalExtension, Result, Row, TransactionBehavior,
};

use crate::domain::issue::{Issue, IssueStatus};
use crate::due::now_utc_rfc3339;

pub const CURRENT_SCHEMA_VERSION: i64 = 2;
pub const ISSUE_COUNTER: &str = "issueCounter";
pub const DEFAULTS_DOCUMENT: &str = "defaultValues";

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_issue_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    deviation_no INTEGER NOT NULL UNIQUE,
    title TEXT NOT NULL,
    problem_description TEXT NOT NULL,
    solution_description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    assigned_to TEXT NOT NULL DEFAULT '',
    technology TEXT NOT NULL,
    due_date TEXT,
    author TEXT NOT NULL,
    author_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    sort_order INTEGER
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    current INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
    },
    Migration {
        version: 2,
        name: "issue_list_indexes_v1",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_issues_sort_order ON issues(sort_order);
CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_connection(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(5000))?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    // Several processes may open a fresh database at once.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

const ISSUE_COLUMNS: &str = r#"
id, deviation_no, title, problem_description, solution_description, status,
priority, assigned_to, technology, due_date, author, author_id, created_at,
sort_order
"#;

fn issue_from_row(row: &Row<'_>) -> Result<Issue> {
    let status: String = row.get(5)?;
    let status = status
        .parse::<IssueStatus>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err)))?;
    Ok(Issue {
        id: row.get(0)?,
        deviation_no: row.get(1)?,
        title: row.get(2)?,
        problem_description: row.get(3)?,
        solution_description: row.get(4)?,
        status,
        priority: row.get(6)?,
        assigned_to: row.get(7)?,
        technology: row.get(8)?,
        due_date: row.get(9)?,
        author: row.get(10)?,
        author_id: row.get(11)?,
        created_at: row.get(12)?,
        order: row.get(13)?,
    })
}

pub fn insert_issue(conn: &Connection, issue: &Issue) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO issues (
    id, deviation_no, title, problem_description, solution_description, status,
    priority, assigned_to, technology, due_date, author, author_id, created_at,
    sort_order
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
"#,
        params![
            issue.id,
            issue.deviation_no,
            issue.title,
            issue.problem_description,
            issue.solution_description,
            issue.status.as_str(),
            issue.priority,
            issue.assigned_to,
            issue.technology,
            issue.due_date,
            issue.author,
            issue.author_id,
            issue.created_at,
            issue.order
        ],
    )?;
    Ok(())
}

pub fn get_issue(conn: &Connection, id: &str) -> Result<Option<Issue>> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
        params![id],
        issue_from_row,
    )
    .optional()
}

/// All issues by stored order, issues without one last.
pub fn list_issues(conn: &Connection) -> Result<Vec<Issue>> {
    let mut stmt = conn.prepare(&format!(
        r#"
SELECT {ISSUE_COLUMNS}
FROM issues
ORDER BY sort_order IS NULL, sort_order ASC, deviation_no ASC
"#
    ))?;

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(issue_from_row(row)?);
    }
    Ok(result)
}

/// Rewrites the mutable fields of an existing issue. Returns the number of
/// rows touched.
pub fn update_issue_fields(conn: &Connection, issue: &Issue) -> Result<usize> {
    conn.execute(
        r#"
UPDATE issues SET
    title = ?2,
    problem_description = ?3,
    solution_description = ?4,
    status = ?5,
    priority = ?6,
    assigned_to = ?7,
    technology = ?8,
    due_date = ?9
WHERE id = ?1
"#,
        params![
            issue.id,
            issue.title,
            issue.problem_description,
            issue.solution_description,
            issue.status.as_str(),
            issue.priority,
            issue.assigned_to,
            issue.technology,
            issue.due_date
        ],
    )
}

pub fn set_issue_order(conn: &Connection, id: &str, order: i64) -> Result<usize> {
    conn.execute(
        "UPDATE issues SET sort_order = ?2 WHERE id = ?1",
        params![id, order],
    )
}

/// Increments a named counter, creating it at 1, and returns the new value.
/// Callers run this inside the transaction that consumes the value.
pub fn next_counter_value(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO counters (name, current)
VALUES (?1, 1)
ON CONFLICT(name) DO UPDATE SET current = current + 1
"#,
        params![name],
    )?;
    conn.query_row(
        "SELECT current FROM counters WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

pub fn get_document(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT body FROM documents WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn put_document(conn: &Connection, key: &str, body: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO documents (key, body, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
    body = excluded.body,
    updated_at = excluded.updated_at
"#,
        params![key, body, now_utc_rfc3339()],
    )?;
    Ok(())
}

/// Inserts a document only when the key is still free. Returns whether this
/// call created it.
pub fn insert_document_if_absent(conn: &Connection, key: &str, body: &str) -> Result<bool> {
    let inserted = conn.execute(
        r#"
INSERT INTO documents (key, body, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO NOTHING
"#,
        params![key, body, now_utc_rfc3339()],
    )?;
    Ok(inserted > 0)
}

/// SQLite's per-connection change marker: it moves whenever another
/// connection commits to the database file.
pub fn data_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA data_version;", [], |row| row.get(0))
}
