// resale - marketplace CSV import and inventory/order store CLI

mod edit;
mod exit_codes;
mod import;
mod query;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use resale_config::Settings;
use resale_feed::{FeedError, ReportKind};

use exit_codes::{feed_exit_code, EXIT_ERROR, EXIT_NOT_FOUND, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "resale")]
#[command(about = "Import marketplace listing and order exports into a local store")]
#[command(version)]
struct Cli {
    /// SQLite database file (defaults to settings, then the app data dir)
    #[arg(long, global = true, env = "RESALE_DB")]
    db: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a listings or orders CSV (type detected from headers)
    #[command(after_help = "\
Examples:
  resale import eBay-active-listings-2025-01-06.csv
  resale import orders.csv --kind orders --json
  resale import            # configured/default inventory + orders files")]
    Import {
        /// CSV file; omit to import the configured inventory and orders files
        path: Option<PathBuf>,

        /// Skip detection: active_listings or orders
        #[arg(long)]
        kind: Option<ReportKind>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any row was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Print which report type a CSV is, without importing it
    Classify {
        path: PathBuf,
    },

    /// Listings
    #[command(subcommand)]
    Inventory(InventoryCommands),

    /// Orders, lines and shipments
    #[command(subcommand)]
    Orders(OrderCommands),

    /// Change user-owned fields (custom SKU, categories)
    #[command(subcommand)]
    Edit(EditCommands),

    /// Edit history of an item or order line
    #[command(subcommand)]
    History(HistoryCommands),

    /// Persisted error log
    #[command(subcommand)]
    Errors(ErrorCommands),

    /// Header mapping overrides per report type
    #[command(subcommand)]
    Mapping(MappingCommands),
}

#[derive(Subcommand)]
enum InventoryCommands {
    /// List all listings
    List {
        #[arg(long)]
        json: bool,
        /// Read through the flat compatibility view
        #[arg(long)]
        compat: bool,
    },
    /// Show one listing
    Show {
        item_number: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// List all orders
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one order with its lines and shipments
    Show {
        order_number: String,
        #[arg(long)]
        json: bool,
    },
    /// List order lines, optionally for one order
    Items {
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        json: bool,
        /// Read through the flat compatibility view
        #[arg(long)]
        compat: bool,
    },
    /// List shipments, optionally for one order
    Shipments {
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum EditCommands {
    /// Edit a listing: --set custom_sku=ABC --set ebay_category1_name=Toys
    Inventory {
        item_number: String,
        /// field=value; an empty value clears the field
        #[arg(long = "set", required = true)]
        sets: Vec<String>,
        /// Recorded as the editor (defaults to import.editedBy)
        #[arg(long)]
        by: Option<String>,
    },
    /// Edit an order line by id: --set custom_sku=ABC
    OrderItem {
        id: i64,
        #[arg(long = "set", required = true)]
        sets: Vec<String>,
        #[arg(long)]
        by: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    Inventory {
        item_number: String,
        #[arg(long)]
        json: bool,
    },
    OrderItem {
        id: i64,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ErrorCommands {
    /// Most recent entries first
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete all entries
    Clear,
}

#[derive(Subcommand)]
enum MappingCommands {
    /// Print the stored mapping for a report type
    Show { kind: ReportKind },
    /// Replace the mapping: field="Header A|Header B" ...
    Set {
        kind: ReportKind,
        #[arg(required = true)]
        entries: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let settings = Settings::load();
    let result = run(cli.command, cli.db, &settings);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, db: Option<PathBuf>, settings: &Settings) -> Result<(), CliError> {
    // classify reads header mappings from the store too
    let mut conn = open_db(db, settings)?;

    match command {
        Commands::Import { path, kind, json, strict } => import::cmd_import(&mut conn, settings, path, kind, json, strict),
        Commands::Classify { path } => import::cmd_classify(&conn, &path),
        Commands::Inventory(cmd) => match cmd {
            InventoryCommands::List { json, compat } => query::cmd_inventory_list(&conn, json, compat),
            InventoryCommands::Show { item_number, json } => query::cmd_inventory_show(&conn, &item_number, json),
        },
        Commands::Orders(cmd) => match cmd {
            OrderCommands::List { json } => query::cmd_orders_list(&conn, json),
            OrderCommands::Show { order_number, json } => query::cmd_order_show(&conn, &order_number, json),
            OrderCommands::Items { order, json, compat } => {
                query::cmd_order_items(&conn, order.as_deref(), json, compat)
            }
            OrderCommands::Shipments { order, json } => query::cmd_shipments(&conn, order.as_deref(), json),
        },
        Commands::Edit(cmd) => match cmd {
            EditCommands::Inventory { item_number, sets, by } => {
                edit::cmd_edit_inventory(&conn, &item_number, &sets, editor(by, settings).as_deref())
            }
            EditCommands::OrderItem { id, sets, by } => {
                edit::cmd_edit_order_item(&conn, id, &sets, editor(by, settings).as_deref())
            }
        },
        Commands::History(cmd) => match cmd {
            HistoryCommands::Inventory { item_number, json } => {
                query::cmd_history(&conn, resale_feed::edit_log::ENTITY_INVENTORY_ITEM, &item_number, json)
            }
            HistoryCommands::OrderItem { id, json } => {
                query::cmd_history(&conn, resale_feed::edit_log::ENTITY_SALES_ORDER_ITEM, &id.to_string(), json)
            }
        },
        Commands::Errors(cmd) => match cmd {
            ErrorCommands::List { limit, json } => query::cmd_errors_list(&conn, limit, json),
            ErrorCommands::Clear => query::cmd_errors_clear(&conn),
        },
        Commands::Mapping(cmd) => match cmd {
            MappingCommands::Show { kind } => edit::cmd_mapping_show(&conn, kind),
            MappingCommands::Set { kind, entries } => edit::cmd_mapping_set(&conn, kind, &entries),
        },
    }
}

fn open_db(db: Option<PathBuf>, settings: &Settings) -> Result<Connection, CliError> {
    let path = db.unwrap_or_else(|| settings.database_path());
    log::debug!("opening database {}", path.display());
    resale_feed::open(&path).map_err(|e| {
        CliError::feed(e).with_hint(format!("database path: {}", path.display()))
    })
}

fn editor(by: Option<String>, settings: &Settings) -> Option<String> {
    by.or_else(|| settings.edited_by.clone())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { code: EXIT_NOT_FOUND, message: msg.into(), hint: None }
    }

    /// Create error from a core error with the matching exit code.
    pub fn feed(err: FeedError) -> Self {
        let hint = match &err {
            FeedError::UnknownReport { .. } => {
                Some("pass --kind active_listings|orders, or add a header mapping".to_string())
            }
            FeedError::Encoding { .. } => Some("re-save the export as UTF-8 CSV".to_string()),
            FeedError::UnknownField { .. } => {
                Some("editable fields: custom_sku, ebay_category1_name, ebay_category1_number".to_string())
            }
            _ => None,
        };
        Self { code: feed_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<FeedError> for CliError {
    fn from(err: FeedError) -> Self {
        Self::feed(err)
    }
}

/// Pretty JSON to stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{text}");
    Ok(())
}
