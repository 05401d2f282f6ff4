//! Defines the transaction store trait.

use async_trait::async_trait;
use time::Date;

use crate::{Error, UserId, transaction::TransactionRecord};

/// Supplies the transaction feed that summaries are computed from.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fetch up to `limit` transactions for `user_id` that happened on or after `since`.
    ///
    /// Implementers must return the newest transactions first. When more than
    /// `limit` transactions match, the oldest ones are dropped.
    ///
    /// # Errors
    /// Returns an error if the backend could not be read. No retry is made.
    async fn fetch_transactions(
        &self,
        user_id: UserId,
        since: Date,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, Error>;
}
