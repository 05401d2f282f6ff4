use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use time::Date;

use crate::{
    Error, UserId,
    transaction::{TransactionRecord, TransactionStore},
};

/// An in-memory transaction feed with scriptable latency and failures.
///
/// The records are returned in the order given, so pass them newest first.
pub(crate) struct FakeTransactionStore {
    records: Vec<TransactionRecord>,
    failures: Arc<AtomicBool>,
    delays: Mutex<HashMap<Date, Duration>>,
}

impl FakeTransactionStore {
    pub(crate) fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            records,
            failures: Arc::new(AtomicBool::new(false)),
            delays: Mutex::new(HashMap::new()),
        }
    }

    /// While set, fetches fail. The flag is read when a fetch starts.
    pub(crate) fn failures(&self) -> Arc<AtomicBool> {
        self.failures.clone()
    }

    /// Slow down every fetch for the window starting on `since`.
    pub(crate) fn delay_for(&self, since: Date, delay: Duration) {
        self.delays.lock().unwrap().insert(since, delay);
    }
}

#[async_trait]
impl TransactionStore for FakeTransactionStore {
    async fn fetch_transactions(
        &self,
        _user_id: UserId,
        since: Date,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, Error> {
        let fail = self.failures.load(Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(&since).copied();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(Error::DatabaseLockError);
        }

        Ok(self
            .records
            .iter()
            .filter(|record| record.occurred_on >= since)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
