use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    Error, UserId,
    notification::{
        ChannelRegistry, NotificationId, NotificationPayload, NotificationRecord,
        NotificationStore, Subscription,
    },
};

/// An in-memory notification store with scriptable failures and latency.
///
/// The records are returned in the order given, so pass them newest first.
pub(crate) struct FakeNotificationStore {
    records: Mutex<Vec<NotificationRecord>>,
    registry: ChannelRegistry,
    persisted: Mutex<Vec<String>>,
    fetch_failures: AtomicBool,
    persistence_failures: AtomicBool,
    channel_failures: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeNotificationStore {
    pub(crate) fn new(records: Vec<NotificationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            registry: ChannelRegistry::new(),
            persisted: Mutex::new(Vec::new()),
            fetch_failures: AtomicBool::new(false),
            persistence_failures: AtomicBool::new(false),
            channel_failures: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// While set, loads fail.
    pub(crate) fn fetch_failures(&self) -> &AtomicBool {
        &self.fetch_failures
    }

    /// While set, read and delete calls fail.
    pub(crate) fn persistence_failures(&self) -> &AtomicBool {
        &self.persistence_failures
    }

    /// While set, the push channel cannot be opened.
    pub(crate) fn channel_failures(&self) -> &AtomicBool {
        &self.channel_failures
    }

    /// Slow down every read and delete call.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// The successful read and delete calls, e.g. "read a" or "delete b".
    pub(crate) fn persisted(&self) -> Vec<String> {
        self.persisted.lock().unwrap().clone()
    }

    pub(crate) fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Deliver `record` over the push channel without storing it.
    pub(crate) fn push(&self, record: NotificationRecord) {
        self.registry.publish(&record);
    }

    async fn persist(
        &self,
        call: String,
        apply: impl FnOnce(&mut Vec<NotificationRecord>) -> bool,
    ) -> Result<(), Error> {
        let fail = self.persistence_failures.load(Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(Error::DatabaseLockError);
        }

        if !apply(&mut self.records.lock().unwrap()) {
            return Err(Error::NotFound);
        }

        self.persisted.lock().unwrap().push(call);

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for FakeNotificationStore {
    async fn fetch_recent(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, Error> {
        if self.fetch_failures.load(Ordering::SeqCst) {
            return Err(Error::DatabaseLockError);
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_unread_count(&self, user_id: UserId) -> Result<u64, Error> {
        if self.fetch_failures.load(Ordering::SeqCst) {
            return Err(Error::DatabaseLockError);
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.user_id == user_id && !record.read)
            .count() as u64)
    }

    async fn persist_read(&self, id: &NotificationId) -> Result<(), Error> {
        self.persist(format!("read {id}"), |records| {
            records
                .iter_mut()
                .find(|record| &record.id == id)
                .map(|record| record.read = true)
                .is_some()
        })
        .await
    }

    async fn persist_read_all(&self, user_id: UserId) -> Result<(), Error> {
        self.persist("read all".to_owned(), |records| {
            records
                .iter_mut()
                .filter(|record| record.user_id == user_id)
                .for_each(|record| record.read = true);
            true
        })
        .await
    }

    async fn persist_delete(&self, id: &NotificationId) -> Result<(), Error> {
        self.persist(format!("delete {id}"), |records| {
            records.retain(|record| &record.id != id);
            true
        })
        .await
    }

    async fn open_channel(&self, user_id: UserId) -> Result<Subscription, Error> {
        if self.channel_failures.load(Ordering::SeqCst) {
            return Err(Error::SubscriptionError("connection refused".to_owned()));
        }

        self.registry.subscribe(user_id)
    }

    async fn create(
        &self,
        user_id: UserId,
        payload: NotificationPayload,
    ) -> Result<NotificationRecord, Error> {
        let record = NotificationRecord {
            id: NotificationId::generate(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            read: false,
            payload,
        };

        self.records.lock().unwrap().insert(0, record.clone());
        self.registry.publish(&record);

        Ok(record)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<usize, Error> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();

        records.retain(|record| {
            record
                .payload
                .expires_at
                .is_none_or(|expires_at| expires_at >= now)
        });

        Ok(before - records.len())
    }
}
