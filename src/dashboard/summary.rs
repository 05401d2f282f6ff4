//! The summary types handed to the presentation layer.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use time::{Date, Month};

use crate::transaction::TransactionRecord;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    /// The calendar year.
    pub year: i32,
    /// The month number, 1 for January through 12 for December.
    pub month: u8,
}

impl MonthKey {
    /// The three-letter month name, e.g. "Jan".
    pub fn label(&self) -> &'static str {
        match Month::try_from(self.month) {
            Ok(Month::January) => "Jan",
            Ok(Month::February) => "Feb",
            Ok(Month::March) => "Mar",
            Ok(Month::April) => "Apr",
            Ok(Month::May) => "May",
            Ok(Month::June) => "Jun",
            Ok(Month::July) => "Jul",
            Ok(Month::August) => "Aug",
            Ok(Month::September) => "Sep",
            Ok(Month::October) => "Oct",
            Ok(Month::November) => "Nov",
            Ok(Month::December) => "Dec",
            Err(_) => "???",
        }
    }
}

impl From<Date> for MonthKey {
    fn from(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The expense total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// The sum of expenses in the category.
    pub total: Decimal,
    /// The number of expense transactions in the category.
    pub transaction_count: usize,
}

/// Income and expense totals for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// The month the totals are for.
    pub month_key: MonthKey,
    /// The three-letter month name, derived from `month_key`.
    pub label: &'static str,
    /// Money earned in the month.
    pub income: Decimal,
    /// Money spent in the month.
    pub expense: Decimal,
    /// `income - expense`.
    pub net: Decimal,
}

/// The windowed summary of a transaction snapshot.
///
/// Invariants:
/// - `balance == total_income - total_expense`
/// - the category totals add up to `total_expense`
/// - every transaction is counted in exactly one month of `monthly_trend`
/// - `top_categories` is a prefix of `category_breakdown`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryResult {
    /// The sum of income.
    pub total_income: Decimal,
    /// The sum of expenses.
    pub total_expense: Decimal,
    /// `total_income - total_expense`.
    pub balance: Decimal,
    /// Expense totals per category, largest first, ties by name.
    pub category_breakdown: Vec<CategoryTotal>,
    /// Income and expense per month, oldest first.
    pub monthly_trend: Vec<MonthlyTrend>,
    /// The largest categories.
    pub top_categories: Vec<CategoryTotal>,
    /// The newest transactions.
    pub recent_transactions: Vec<TransactionRecord>,
}
