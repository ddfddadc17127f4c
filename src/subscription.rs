use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db;
use crate::domain::defaults::DefaultValues;
use crate::domain::issue::Issue;
use crate::store::StoreError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Full contents of the collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub issues: Vec<Issue>,
    pub defaults: DefaultValues,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Snapshot(Snapshot),
    Failed(String),
}

/// Live feed of snapshots. Dropping it stops the watcher.
pub struct Subscription {
    events: Receiver<SubscriptionEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn recv(&self) -> Option<SubscriptionEvent> {
        self.events.recv().ok()
    }

    #[cfg(test)]
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<SubscriptionEvent, mpsc::RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Watches the database at `db_path` and delivers a full snapshot now and
/// after every committed change from any connection.
pub fn subscribe(db_path: &str, interval: Duration) -> Result<Subscription, StoreError> {
    let conn = db::open_connection(db_path)?;
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let handle = thread::Builder::new()
        .name("dvt-watch".to_string())
        .spawn(move || watch(conn, tx, thread_stop, interval))?;
    Ok(Subscription {
        events: rx,
        stop,
        handle: Some(handle),
    })
}

fn watch(
    conn: Connection,
    events: Sender<SubscriptionEvent>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut delivered: Option<i64> = None;
    while !stop.load(Ordering::Relaxed) {
        match db::data_version(&conn) {
            Ok(version) if delivered != Some(version) => {
                let event = match read_snapshot(&conn, version) {
                    Ok(snapshot) => {
                        delivered = Some(version);
                        tracing::debug!(version, issues = snapshot.issues.len(), "snapshot");
                        SubscriptionEvent::Snapshot(snapshot)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "snapshot read failed");
                        SubscriptionEvent::Failed(err.to_string())
                    }
                };
                if events.send(event).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "change check failed");
                if events
                    .send(SubscriptionEvent::Failed(err.to_string()))
                    .is_err()
                {
                    return;
                }
            }
        }
        thread::sleep(interval);
    }
}

/// Issues and defaults are read under one transaction so both come from the
/// same commit.
fn read_snapshot(conn: &Connection, version: i64) -> Result<Snapshot, String> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)
        .map_err(|err| err.to_string())?;
    let issues = db::list_issues(&tx).map_err(|err| err.to_string())?;
    let defaults = match db::get_document(&tx, db::DEFAULTS_DOCUMENT) {
        Ok(Some(raw)) => DefaultValues::from_document(&raw).map_err(|err| err.to_string())?,
        Ok(None) => DefaultValues::default(),
        Err(err) => return Err(err.to_string()),
    };
    tx.commit().map_err(|err| err.to_string())?;
    Ok(Snapshot {
        issues,
        defaults,
        version,
    })
}

/// Consumer-side copy of the last good snapshot.
#[derive(Debug, Clone)]
pub struct IssueCache {
    issues: Vec<Issue>,
    defaults: DefaultValues,
    loading: bool,
    last_error: Option<String>,
}

impl Default for IssueCache {
    fn default() -> Self {
        Self {
            issues: Vec::new(),
            defaults: DefaultValues::default(),
            loading: true,
            last_error: None,
        }
    }
}

impl IssueCache {
    /// Applies one event. Snapshots replace the cache wholesale; failures
    /// keep the previous contents. Either way loading is over.
    pub fn apply(&mut self, event: SubscriptionEvent) {
        match event {
            SubscriptionEvent::Snapshot(snapshot) => {
                self.issues = snapshot.issues;
                self.defaults = snapshot.defaults;
                self.last_error = None;
            }
            SubscriptionEvent::Failed(message) => {
                self.last_error = Some(message);
            }
        }
        self.loading = false;
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn defaults(&self) -> &DefaultValues {
        &self.defaults
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
