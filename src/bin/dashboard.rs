use std::{
    error::Error,
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, macros::format_description};

use budget_pulse::{
    DEFAULT_TRANSACTION_FETCH_CAP, DashboardService, ExportColumns, NotificationHub,
    NotificationId, NotificationPayload, NotificationState, NotificationStore, SessionContext,
    TransactionKind, TransactionRecord, TransactionStore, WindowPreset, bill_reminder,
    budget_warning, export_csv, format_relative, goal_achievement, init_logging,
    stores::sqlite::{SQLiteStores, create_stores},
    system_update,
};

/// A command line dashboard for budget_pulse.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The user to act as.
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// The canonical name of the local timezone, used to work out "today".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// The maximum number of transactions fetched for a summary.
    #[arg(long, default_value_t = DEFAULT_TRANSACTION_FETCH_CAP)]
    fetch_cap: u64,

    /// Where to write debug logs.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database tables.
    Init,

    /// Record a transaction.
    AddTransaction {
        /// The amount of money, always positive.
        amount: Decimal,

        /// Either "income" or "expense".
        kind: TransactionKind,

        /// The date of the transaction as YYYY-MM-DD, defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// The category of an expense.
        #[arg(long, default_value = "")]
        category: String,

        /// A free text description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Print the summary for a window.
    Summary {
        /// One of today, this-week, this-month or this-year.
        #[arg(long, default_value_t = WindowPreset::default_preset())]
        window: WindowPreset,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write the transactions in a window as CSV.
    Export {
        /// One of today, this-week, this-month or this-year.
        #[arg(long, default_value_t = WindowPreset::default_preset())]
        window: WindowPreset,

        /// The columns to include.
        #[arg(
            long,
            value_enum,
            value_delimiter = ',',
            default_values_t = [
                Column::Date,
                Column::Type,
                Column::Category,
                Column::Description,
                Column::Amount,
            ]
        )]
        columns: Vec<Column>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Send a notification to the user.
    Notify {
        #[command(subcommand)]
        notification: NotificationCommand,
    },

    /// Show the notification inbox.
    Inbox {
        /// The number of notifications to load, defaults to the session limit.
        #[arg(long)]
        limit: Option<u64>,

        /// Mark these notifications as read first.
        #[arg(long, value_delimiter = ',')]
        mark_read: Vec<String>,

        /// Mark every notification as read first.
        #[arg(long)]
        mark_all_read: bool,

        /// Delete these notifications first.
        #[arg(long, value_delimiter = ',')]
        delete: Vec<String>,

        /// Delete expired notifications first.
        #[arg(long)]
        purge_expired: bool,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    /// Warn about spending in a budget category.
    Budget {
        category: String,
        budget: Decimal,
        spent: Decimal,
    },
    /// Remind about an upcoming bill.
    Bill {
        description: String,
        amount: Decimal,
        #[arg(value_parser = parse_date)]
        due: Date,
    },
    /// Celebrate a reached savings goal.
    Goal { name: String, target: Decimal },
    /// Announce a change to the application.
    System {
        title: String,
        message: String,
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Column {
    Date,
    Type,
    Category,
    Description,
    Amount,
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("invalid date \"{text}\": {error}"))
}

fn export_columns(columns: &[Column]) -> ExportColumns {
    ExportColumns {
        date: columns.contains(&Column::Date),
        kind: columns.contains(&Column::Type),
        category: columns.contains(&Column::Category),
        description: columns.contains(&Column::Description),
        amount: columns.contains(&Column::Amount),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_logging(&args.log_path)?;

    let context = Arc::new(
        SessionContext::new(args.user_id, &args.timezone).transaction_fetch_cap(args.fetch_cap),
    );
    let stores = open_stores(&args.db_path)?;

    match args.command {
        Command::Init => {
            println!("Database ready at {:#?}", args.db_path);
        }
        Command::AddTransaction {
            amount,
            kind,
            date,
            category,
            description,
        } => {
            let date = match date {
                Some(date) => date,
                None => context.today()?,
            };
            let mut builder = TransactionRecord::build(amount, kind, date).category(&category);
            if let Some(description) = description {
                builder = builder.description(&description);
            }

            let transaction = stores.transactions.create(context.user_id, builder)?;
            println!("Created transaction {}", transaction.id);
        }
        Command::Summary { window, json } => summary(&stores, context, window, json).await?,
        Command::Export {
            window,
            columns,
            output,
        } => export(&stores, &context, window, &columns, output.as_deref()).await?,
        Command::Notify { notification } => {
            let payload = notification_payload(notification)?;
            let record = stores
                .notifications
                .create(context.user_id, payload)
                .await?;
            println!("Created notification {}", record.id);
        }
        Command::Inbox {
            limit,
            mark_read,
            mark_all_read,
            delete,
            purge_expired,
        } => {
            if purge_expired {
                let deleted = stores
                    .notifications
                    .delete_expired(OffsetDateTime::now_utc())
                    .await?;
                println!("Deleted {deleted} expired notifications");
            }

            let hub = NotificationHub::start(stores.notifications.clone(), context.clone());
            let mut state = match limit {
                Some(limit) => hub.load(limit).await?,
                None => hub.refresh().await?,
            };

            for id in &mark_read {
                hub.mark_as_read(&NotificationId::new(id)?).await?;
            }
            if mark_all_read {
                hub.mark_all_as_read().await?;
            }
            for id in &delete {
                hub.delete(&NotificationId::new(id)?).await?;
            }
            if !mark_read.is_empty() || mark_all_read || !delete.is_empty() {
                state = hub.snapshot().await?;
            }

            print_inbox(&state);
            hub.shutdown().await?;
        }
    }

    Ok(())
}

fn open_stores(db_path: &Path) -> Result<SQLiteStores, Box<dyn Error>> {
    let connection = Connection::open(db_path)?;

    Ok(create_stores(connection)?)
}

async fn summary(
    stores: &SQLiteStores,
    context: Arc<SessionContext>,
    preset: WindowPreset,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let window = preset.window_for(context.today()?);
    let fetch_cap = context.transaction_fetch_cap;
    let service = DashboardService::new(stores.transactions.clone(), context);

    let Some(snapshot) = service.refresh(window).await? else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let summary = &snapshot.summary;
    println!("{} (since {})", preset.label(), window.start);
    println!("  Income:  {:>12.2}", summary.total_income);
    println!("  Expense: {:>12.2}", summary.total_expense);
    println!("  Balance: {:>12.2}", summary.balance);

    if !summary.top_categories.is_empty() {
        println!("\nTop categories");
        for category in &summary.top_categories {
            println!(
                "  {:<20} {:>12.2} ({} transactions)",
                category.category, category.total, category.transaction_count
            );
        }
    }

    if !summary.monthly_trend.is_empty() {
        println!("\nMonthly trend");
        for month in &summary.monthly_trend {
            println!(
                "  {} {}  income {:>10.2}  expense {:>10.2}  net {:>10.2}",
                month.label, month.month_key.year, month.income, month.expense, month.net
            );
        }
    }

    if !summary.recent_transactions.is_empty() {
        println!("\nRecent transactions");
        for transaction in &summary.recent_transactions {
            println!(
                "  {}  {:<7} {:<20} {:>10.2}  {}",
                transaction.occurred_on,
                transaction.kind,
                transaction.category_label(),
                transaction.amount,
                transaction.description.as_deref().unwrap_or_default()
            );
        }
    }

    if snapshot.possibly_truncated {
        println!(
            "\nOnly the newest {fetch_cap} transactions were included, the summary may be incomplete."
        );
    }

    Ok(())
}

async fn export(
    stores: &SQLiteStores,
    context: &SessionContext,
    preset: WindowPreset,
    columns: &[Column],
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let window = preset.window_for(context.today()?);
    let transactions: Vec<TransactionRecord> = stores
        .transactions
        .fetch_transactions(context.user_id, window.start, u64::MAX)
        .await?
        .into_iter()
        .filter(|transaction| window.contains(transaction.occurred_on))
        .collect();

    let columns = export_columns(columns);
    match output {
        Some(path) => export_csv(&transactions, columns, File::create(path)?)?,
        None => export_csv(&transactions, columns, io::stdout().lock())?,
    }

    tracing::info!("Exported {} transactions", transactions.len());

    Ok(())
}

fn notification_payload(
    command: NotificationCommand,
) -> Result<NotificationPayload, Box<dyn Error>> {
    let payload = match command {
        NotificationCommand::Budget {
            category,
            budget,
            spent,
        } => budget_warning(&category, budget, spent)?,
        NotificationCommand::Bill {
            description,
            amount,
            due,
        } => bill_reminder(&description, amount, due),
        NotificationCommand::Goal { name, target } => goal_achievement(&name, target),
        NotificationCommand::System {
            title,
            message,
            url,
        } => system_update(&title, &message, url.as_deref()),
    };

    Ok(payload)
}

fn print_inbox(state: &NotificationState) {
    let now = OffsetDateTime::now_utc();

    println!(
        "{} unread",
        state.unread_count as u64 + state.older_unread_count
    );

    for item in &state.items {
        let marker = if item.read { " " } else { "*" };
        println!(
            "{marker} [{}] {} ({}, {:?})\n    {}\n    id: {}",
            format_relative(item.created_at, now),
            item.payload.title,
            item.payload.kind.label(),
            item.payload.priority,
            item.payload.message,
            item.id,
        );
    }
}
