//! Defines the core data model for transactions.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::TransactionId};

/// The category used for transactions that do not name one.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The lower case name used in storage and exports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::ValidationError(format!(
                "unknown transaction kind \"{other}\""
            ))),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Records are immutable once fetched. To create a new record, use
/// [TransactionRecord::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned, always stored as a magnitude.
    ///
    /// Whether it counts as income or expense is decided by `kind`.
    pub amount: Decimal,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// The category name, e.g. "Groceries".
    pub category: String,
    /// When the transaction happened.
    pub occurred_on: Date,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
}

impl TransactionRecord {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: Decimal, kind: TransactionKind, occurred_on: Date) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            category: String::new(),
            occurred_on,
            description: None,
        }
    }

    /// The category this record is aggregated under.
    ///
    /// Blank category names fall back to [UNCATEGORIZED_LABEL].
    pub fn category_label(&self) -> &str {
        let category = self.category.trim();

        if category.is_empty() {
            UNCATEGORIZED_LABEL
        } else {
            category
        }
    }
}

/// A builder for creating [TransactionRecord] instances.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::date;
///
/// let groceries = TransactionRecord::build(dec!(45.99), TransactionKind::Expense, date!(2025 - 01 - 15))
///     .category("Groceries")
///     .description("Weekly shop")
///     .finalise(1);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The magnitude of the transaction.
    pub amount: Decimal,
    /// Whether the amount was earned or spent.
    pub kind: TransactionKind,
    /// The category name, empty for uncategorized transactions.
    pub category: String,
    /// When the transaction happened.
    pub occurred_on: Date,
    /// An optional description.
    pub description: Option<String>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Check that the builder describes a valid transaction.
    ///
    /// # Errors
    /// Returns [Error::ValidationError] if the amount is negative. The sign of
    /// a transaction is carried by its kind.
    pub fn validate(&self) -> Result<(), Error> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(Error::ValidationError(format!(
                "transaction amount {} must not be negative",
                self.amount
            )));
        }

        Ok(())
    }

    /// Build the record with the given `id`.
    pub fn finalise(self, id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            id,
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            occurred_on: self.occurred_on,
            description: self.description,
        }
    }
}
