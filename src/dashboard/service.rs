//! The fetch-then-aggregate flow behind the dashboard.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    Error, SessionContext,
    dashboard::{aggregation::aggregate, summary::SummaryResult},
    transaction::{AggregationWindow, TransactionStore},
};

/// A summary together with the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// The epoch of the request that produced the summary.
    pub epoch: u64,
    /// The window the summary covers.
    pub window: AggregationWindow,
    /// The computed summary.
    pub summary: SummaryResult,
    /// Whether the fetch hit the transaction fetch cap.
    ///
    /// When set, older transactions in the window were dropped and the
    /// summary may be incomplete.
    pub possibly_truncated: bool,
}

/// Computes summaries for the current user, one window at a time.
///
/// Every call to [DashboardService::refresh] is tagged with a new epoch. A
/// result is only published when its epoch is still the latest when it
/// completes, so a slow fetch for an old window never overwrites the summary
/// of a newer one.
pub struct DashboardService<S: TransactionStore> {
    store: Arc<S>,
    context: Arc<SessionContext>,
    epoch: AtomicU64,
    latest: watch::Sender<Option<DashboardSnapshot>>,
}

impl<S: TransactionStore> DashboardService<S> {
    /// Create a service that reads transactions from `store`.
    pub fn new(store: Arc<S>, context: Arc<SessionContext>) -> Self {
        let (latest, _) = watch::channel(None);

        Self {
            store,
            context,
            epoch: AtomicU64::new(0),
            latest,
        }
    }

    /// Fetch the transactions for `window` and summarise them.
    ///
    /// Returns `Ok(None)` when a newer request was made while this one was
    /// in flight. The stale result is dropped and the published snapshot is
    /// left alone.
    ///
    /// # Errors
    /// Returns [Error::DataUnavailable] if the fetch failed. Aggregation is
    /// not attempted and the previously published snapshot is kept.
    pub async fn refresh(
        &self,
        window: AggregationWindow,
    ) -> Result<Option<DashboardSnapshot>, Error> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        match self
            .fetch_and_aggregate(epoch, window)
            .await
            .and_then(|snapshot| self.publish(snapshot))
        {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(Error::StaleRequest { epoch, current }) => {
                tracing::debug!("Discarding summary for epoch {epoch}, current epoch is {current}");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Option<DashboardSnapshot> {
        self.latest.borrow().clone()
    }

    /// Watch for newly published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardSnapshot>> {
        self.latest.subscribe()
    }

    /// The epoch of the most recent request.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    async fn fetch_and_aggregate(
        &self,
        epoch: u64,
        window: AggregationWindow,
    ) -> Result<DashboardSnapshot, Error> {
        let cap = self.context.transaction_fetch_cap;
        let fetched = self
            .store
            .fetch_transactions(self.context.user_id, window.start, cap)
            .await;

        // A failed fetch for a superseded window is as irrelevant as a
        // successful one.
        self.ensure_current(epoch)?;

        let transactions = fetched.map_err(|error| {
            tracing::warn!("Could not fetch transactions for epoch {epoch}: {error}");
            Error::DataUnavailable(error.to_string())
        })?;

        let possibly_truncated = transactions.len() as u64 >= cap;
        if possibly_truncated {
            tracing::debug!("Transaction fetch hit the cap of {cap}, summary may be incomplete");
        }

        let summary = aggregate(&transactions, &window);

        Ok(DashboardSnapshot {
            epoch,
            window,
            summary,
            possibly_truncated,
        })
    }

    /// Publish `snapshot` unless a newer request has started since it was made.
    ///
    /// The epoch is checked while the watch channel is locked, so a newer
    /// snapshot that has already been published is never overwritten.
    fn publish(&self, snapshot: DashboardSnapshot) -> Result<DashboardSnapshot, Error> {
        let mut current = snapshot.epoch;

        let published = self.latest.send_if_modified(|latest| {
            current = self.current_epoch();
            let is_newest = latest
                .as_ref()
                .is_none_or(|published| published.epoch < snapshot.epoch);

            if current == snapshot.epoch && is_newest {
                *latest = Some(snapshot.clone());
                true
            } else {
                false
            }
        });

        if published {
            Ok(snapshot)
        } else {
            Err(Error::StaleRequest {
                epoch: snapshot.epoch,
                current,
            })
        }
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), Error> {
        let current = self.current_epoch();

        if epoch == current {
            Ok(())
        } else {
            Err(Error::StaleRequest { epoch, current })
        }
    }
}
