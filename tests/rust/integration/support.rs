//! Shared fakes for the integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rdfbridge::{Database, DatabaseCapabilities, DriverError, RowCursor, SqlConnection, SqlValue};

/// Canned results matched by SQL substring; counts opened and closed
/// cursors so tests can assert the open/close balance on every exit path.
#[derive(Debug, Default)]
pub struct FakeConnection {
    canned: Mutex<Vec<(String, Vec<Vec<SqlValue>>)>>,
    executed: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    /// Per-row fetch delay, for deadline tests.
    row_delay: Mutex<Option<Duration>>,
}

impl FakeConnection {
    pub fn new() -> Arc<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        Arc::new(FakeConnection::default())
    }

    /// Serve `rows` for any statement whose SQL contains `fragment`.
    /// Earlier registrations win.
    pub fn serve(self: &Arc<Self>, fragment: &str, rows: Vec<Vec<SqlValue>>) -> Arc<Self> {
        if let Ok(mut canned) = self.canned.lock() {
            canned.push((fragment.to_string(), rows));
        }
        Arc::clone(self)
    }

    pub fn delay_rows(self: &Arc<Self>, delay: Duration) -> Arc<Self> {
        if let Ok(mut slot) = self.row_delay.lock() {
            *slot = Some(delay);
        }
        Arc::clone(self)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlConnection for FakeConnection {
    async fn execute(&self, sql: &str) -> Result<Box<dyn RowCursor>, DriverError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        let rows: VecDeque<Vec<SqlValue>> = self
            .canned
            .lock()
            .ok()
            .and_then(|canned| {
                canned
                    .iter()
                    .find(|(fragment, _)| sql.contains(fragment.as_str()))
                    .map(|(_, rows)| rows.clone())
            })
            .unwrap_or_default()
            .into_iter()
            .collect();
        self.opened.fetch_add(1, Ordering::SeqCst);
        let delay = self.row_delay.lock().ok().and_then(|d| *d);
        Ok(Box::new(FakeCursor {
            rows,
            closed: Arc::clone(&self.closed),
            delay,
            done: false,
        }))
    }
}

struct FakeCursor {
    rows: VecDeque<Vec<SqlValue>>,
    closed: Arc<AtomicUsize>,
    delay: Option<Duration>,
    done: bool,
}

#[async_trait]
impl RowCursor for FakeCursor {
    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>, DriverError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.done {
            self.done = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A database over a fake connection with default capabilities.
pub fn fake_database(connection: Arc<FakeConnection>) -> Arc<Database> {
    Arc::new(Database::new(
        "integration_db",
        connection,
        DatabaseCapabilities::default(),
    ))
}
