//! Writes transactions as CSV.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{Error, transaction::TransactionRecord};

/// The columns to include in a CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumns {
    /// Include the date the transaction happened.
    pub date: bool,
    /// Include whether it was income or expense.
    pub kind: bool,
    /// Include the category name.
    pub category: bool,
    /// Include the description.
    pub description: bool,
    /// Include the amount.
    pub amount: bool,
}

impl Default for ExportColumns {
    fn default() -> Self {
        Self {
            date: true,
            kind: true,
            category: true,
            description: true,
            amount: true,
        }
    }
}

impl ExportColumns {
    fn headers(&self) -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(5);

        if self.date {
            headers.push("Date");
        }
        if self.kind {
            headers.push("Type");
        }
        if self.category {
            headers.push("Category");
        }
        if self.description {
            headers.push("Description");
        }
        if self.amount {
            headers.push("Amount");
        }

        headers
    }

    fn row(&self, transaction: &TransactionRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(5);

        if self.date {
            row.push(transaction.occurred_on.to_string());
        }
        if self.kind {
            row.push(transaction.kind.to_string());
        }
        if self.category {
            row.push(transaction.category_label().to_owned());
        }
        if self.description {
            row.push(transaction.description.clone().unwrap_or_default());
        }
        if self.amount {
            row.push(transaction.amount.to_string());
        }

        row
    }
}

/// Write `transactions` to `writer` as CSV with a header row.
///
/// Quoting of descriptions that contain commas or quotes is handled by the
/// CSV writer.
///
/// # Errors
/// Returns [Error::ValidationError] if no column is selected, or
/// [Error::CsvError] if writing fails.
pub fn export_csv<W: Write>(
    transactions: &[TransactionRecord],
    columns: ExportColumns,
    writer: W,
) -> Result<(), Error> {
    let headers = columns.headers();

    if headers.is_empty() {
        return Err(Error::ValidationError(
            "select at least one column to export".to_owned(),
        ));
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&headers)?;

    for transaction in transactions {
        csv_writer.write_record(columns.row(transaction))?;
    }

    csv_writer
        .flush()
        .map_err(|error| Error::CsvError(error.to_string()))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        transaction::{TransactionKind, TransactionRecord},
    };

    use super::{ExportColumns, export_csv};

    fn export_to_string(transactions: &[TransactionRecord], columns: ExportColumns) -> String {
        let mut buffer = Vec::new();
        export_csv(transactions, columns, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn exports_all_columns() {
        let transactions = vec![
            TransactionRecord::build(dec!(12.50), TransactionKind::Expense, date!(2024 - 01 - 20))
                .category("Food")
                .description("Lunch, with \"friends\"")
                .finalise(1),
        ];

        let got = export_to_string(&transactions, ExportColumns::default());

        assert_eq!(
            got,
            "Date,Type,Category,Description,Amount\n\
             2024-01-20,expense,Food,\"Lunch, with \"\"friends\"\"\",12.50\n"
        );
    }

    #[test]
    fn exports_selected_columns_only() {
        let transactions = vec![
            TransactionRecord::build(dec!(100), TransactionKind::Income, date!(2024 - 01 - 15))
                .finalise(1),
        ];
        let columns = ExportColumns {
            date: false,
            kind: true,
            category: true,
            description: false,
            amount: true,
        };

        let got = export_to_string(&transactions, columns);

        assert_eq!(got, "Type,Category,Amount\nincome,Uncategorized,100\n");
    }

    #[test]
    fn rejects_empty_column_selection() {
        let columns = ExportColumns {
            date: false,
            kind: false,
            category: false,
            description: false,
            amount: false,
        };

        let result = export_csv(&[], columns, Vec::new());

        assert!(matches!(result, Err(Error::ValidationError(_))));
    }
}
