//! Transactions and the feed that summaries are computed from.
//!
//! This module contains:
//! - The `TransactionRecord` model and `TransactionBuilder` for creating records
//! - The `TransactionStore` trait implemented by storage backends
//! - Aggregation windows and the presets offered to users
//! - CSV export

mod core;
mod export;
mod store;
mod window;

pub use self::core::{TransactionBuilder, TransactionKind, TransactionRecord, UNCATEGORIZED_LABEL};
pub use export::{ExportColumns, export_csv};
pub use store::TransactionStore;
pub use window::{AggregationWindow, WindowEnd, WindowPreset};
