use std::collections::HashSet;
use std::thread;

use uuid::Uuid;

use super::{IssueStore, SqliteStore, StoreError};
use crate::db;
use crate::domain::defaults::{DefaultValues, LabelKind};
use crate::domain::issue::{IssueDraft, IssuePatch, IssueStatus, OrderAssignment};
use crate::identity::Identity;

fn unique_db_path() -> String {
    std::env::temp_dir()
        .join(format!("dvt-store-{}", Uuid::now_v7()))
        .join("state.sqlite")
        .display()
        .to_string()
}

fn cleanup(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}

fn identity() -> Identity {
    Identity::new("uid-qa", Some("qa@example.com"), Some("QA Lead")).expect("identity")
}

fn draft(title: &str) -> IssueDraft {
    IssueDraft {
        title: title.to_string(),
        problem_description: "Out of tolerance".to_string(),
        solution_description: None,
        priority: "High".to_string(),
        assigned_to: "Dana".to_string(),
        technology: "Mechanical".to_string(),
        due_date: Some("2026-05-01T00:00:00Z".to_string()),
    }
}

#[test]
fn creates_issues_with_consecutive_numbers_and_identity_fields() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");

    let first = store.create_issue(&draft("first"), &identity()).expect("create");
    let second = store.create_issue(&draft("second"), &identity()).expect("create");
    assert_eq!(first.deviation_no, 1);
    assert_eq!(second.deviation_no, 2);
    assert_ne!(first.id, second.id);
    assert_eq!(first.status, IssueStatus::Open);
    assert_eq!(first.author, "qa@example.com");
    assert_eq!(first.author_id, "uid-qa");
    assert!(first.order.is_some());

    let loaded = store.get_issue(&first.id).expect("get").expect("issue exists");
    assert_eq!(loaded, first);
    assert_eq!(store.load_issues().expect("load").len(), 2);

    cleanup(&path);
}

#[test]
fn concurrent_creations_mint_distinct_consecutive_numbers() {
    let path = unique_db_path();
    // Creates the schema before the writers race.
    drop(SqliteStore::open(&path).expect("store should open"));

    let writers = 4;
    let per_writer = 5;
    let handles: Vec<_> = (0..writers)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let store = SqliteStore::open(&path).expect("writer store should open");
                (0..per_writer)
                    .map(|n| {
                        store
                            .create_issue(&draft(&format!("w{writer}-{n}")), &identity())
                            .expect("concurrent create should succeed")
                            .deviation_no
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut numbers: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("writer thread should finish"))
        .collect();
    numbers.sort_unstable();
    let expected: Vec<i64> = (1..=(writers * per_writer) as i64).collect();
    assert_eq!(numbers, expected);

    let store = SqliteStore::open(&path).expect("store should reopen");
    let stored: HashSet<i64> = store
        .load_issues()
        .expect("load")
        .into_iter()
        .map(|issue| issue.deviation_no)
        .collect();
    assert_eq!(stored.len(), writers * per_writer);

    cleanup(&path);
}

#[test]
fn failed_insert_does_not_consume_a_number() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let blocker = store.create_issue(&draft("blocker"), &identity()).expect("create");
    // Rewind the counter so the next insert collides with the blocker.
    let conn = db::open_connection(&path).expect("side connection");
    conn.execute("UPDATE counters SET current = 0", [])
        .expect("counter rewind");

    let err = store
        .create_issue(&draft("collides"), &identity())
        .expect_err("duplicate number should fail");
    assert!(matches!(err, StoreError::Db(_)));
    let current: i64 = conn
        .query_row("SELECT current FROM counters", [], |row| row.get(0))
        .expect("counter should exist");
    assert_eq!(current, 0);
    assert_eq!(store.load_issues().expect("load").len(), 1);
    assert_eq!(blocker.deviation_no, 1);

    cleanup(&path);
}

#[test]
fn updates_patch_only_the_named_fields() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let created = store.create_issue(&draft("pump"), &identity()).expect("create");

    let patch = IssuePatch {
        status: Some(IssueStatus::Closed),
        due_date: Some(None),
        ..IssuePatch::default()
    };
    let updated = store.update_issue(&created.id, &patch).expect("update");
    assert_eq!(updated.status, IssueStatus::Closed);
    assert_eq!(updated.due_date, None);
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.deviation_no, created.deviation_no);
    assert_eq!(updated.created_at, created.created_at);

    let err = store
        .update_issue("missing", &patch)
        .expect_err("unknown id should fail");
    assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));

    cleanup(&path);
}

#[test]
fn order_writes_are_all_or_nothing() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let a = store.create_issue(&draft("a"), &identity()).expect("create");
    let b = store.create_issue(&draft("b"), &identity()).expect("create");

    store
        .write_orders(&[
            OrderAssignment {
                issue_id: b.id.clone(),
                order: 0,
            },
            OrderAssignment {
                issue_id: a.id.clone(),
                order: 1,
            },
        ])
        .expect("orders should persist");
    let ids: Vec<String> = store
        .load_issues()
        .expect("load")
        .into_iter()
        .map(|issue| issue.id)
        .collect();
    assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);

    let err = store
        .write_orders(&[
            OrderAssignment {
                issue_id: a.id.clone(),
                order: 0,
            },
            OrderAssignment {
                issue_id: "ghost".to_string(),
                order: 1,
            },
        ])
        .expect_err("unknown issue should fail the batch");
    assert!(matches!(err, StoreError::NotFound(_)));
    let reloaded = store.get_issue(&a.id).expect("get").expect("exists");
    assert_eq!(reloaded.order, Some(1));

    cleanup(&path);
}

#[test]
fn defaults_are_created_once_and_saved_whole() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let first = store.load_defaults().expect("defaults");
    assert_eq!(first, DefaultValues::default());

    let edited = store
        .edit_defaults(|defaults| -> Result<(), StoreError> {
            defaults
                .add_person("Dana", Some("dana@example.com"))
                .expect("new person");
            assert!(defaults.add_label(LabelKind::Technology, "Hydraulic"));
            Ok(())
        })
        .expect("save");

    let reopened = SqliteStore::open(&path).expect("store should reopen");
    assert_eq!(reopened.load_defaults().expect("defaults"), edited);

    cleanup(&path);
}

#[test]
fn failed_defaults_edit_saves_nothing() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let before = store.load_defaults().expect("defaults");

    let result = store.edit_defaults(|defaults| {
        defaults.add_label(LabelKind::Priority, "Critical");
        Err(StoreError::NotFound("rejected".to_string()))
    });
    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert_eq!(store.load_defaults().expect("defaults"), before);

    cleanup(&path);
}

#[test]
fn concurrent_defaults_edits_keep_every_label() {
    let path = unique_db_path();
    drop(SqliteStore::open(&path).expect("store should open"));

    let writers = 4;
    let per_writer = 5;
    let handles: Vec<_> = (0..writers)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let store = SqliteStore::open(&path).expect("writer store should open");
                for n in 0..per_writer {
                    store
                        .edit_defaults(|defaults| -> Result<(), StoreError> {
                            assert!(
                                defaults.add_label(LabelKind::Priority, &format!("P{writer}-{n}"))
                            );
                            Ok(())
                        })
                        .expect("concurrent edit should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread should finish");
    }

    let store = SqliteStore::open(&path).expect("store should reopen");
    let priorities = store.load_defaults().expect("defaults").priority;
    for writer in 0..writers {
        for n in 0..per_writer {
            assert!(priorities.contains(&format!("P{writer}-{n}")));
        }
    }

    cleanup(&path);
}

#[test]
fn legacy_roster_is_upgraded_without_rewriting() {
    let path = unique_db_path();
    let store = SqliteStore::open(&path).expect("store should open");
    let legacy = r#"{"assignedTo":["Dana"],"priority":["P1"],"technology":["Civil"]}"#;
    db::put_document(&store.conn, db::DEFAULTS_DOCUMENT, legacy).expect("seed legacy");

    let defaults = store.load_defaults().expect("defaults");
    assert_eq!(defaults.assigned_to[0].name, "Dana");
    assert_eq!(defaults.assigned_to[0].email, "");
    let raw = db::get_document(&store.conn, db::DEFAULTS_DOCUMENT)
        .expect("get")
        .expect("document exists");
    assert_eq!(raw, legacy);

    cleanup(&path);
}
