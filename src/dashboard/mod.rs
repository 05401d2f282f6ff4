//! Dashboard module
//!
//! Provides the windowed financial summary: totals, category breakdown,
//! monthly trend, top categories and recent transactions.

mod aggregation;
mod service;
mod summary;

pub use aggregation::aggregate;
pub use service::{DashboardService, DashboardSnapshot};
pub use summary::{CategoryTotal, MonthKey, MonthlyTrend, SummaryResult};
