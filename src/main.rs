//! Fridge Sync - Smart Fridge Management
//!
//! Thin CLI over the library: scans a receipt and merges its items into a
//! user's fridge, or prints the current fridge contents.

use clap::{Parser, Subcommand};
use fridge_sync::{total_value, FridgeStore, FridgeUpdater, ReceiptScanner};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smart fridge tracker - scans grocery receipts into per-user inventory
#[derive(Parser, Debug)]
#[command(name = "fridge_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Seconds a store operation waits on a locked database before failing
    #[arg(long, default_value_t = 5)]
    busy_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a receipt image and add its items to a user's fridge
    Scan {
        /// Path to the receipt image
        image_path: PathBuf,

        /// User whose fridge receives the items
        #[arg(long)]
        user_id: String,

        /// Scan and print items without updating the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Show the current contents of a user's fridge
    Fridge {
        /// User whose fridge to display
        user_id: String,
    },
}

/// Returns the default database path: ~/.local/share/fridge_sync/fridge.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fridge_sync")
        .join("fridge.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let store = match FridgeStore::open(&db_path, Duration::from_secs(args.busy_timeout_secs)) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open fridge database: {}", e);
            std::process::exit(1);
        }
    };
    let updater = FridgeUpdater::new(store);

    let ok = match args.command {
        Command::Scan {
            image_path,
            user_id,
            dry_run,
        } => run_scan(&updater, &image_path, &user_id, dry_run).await,
        Command::Fridge { user_id } => show_fridge(&updater, &user_id),
    };

    if !ok {
        std::process::exit(1);
    }
}

/// Scan a receipt and merge its items into the user's fridge
async fn run_scan(
    updater: &FridgeUpdater,
    image_path: &Path,
    user_id: &str,
    dry_run: bool,
) -> bool {
    let scanner = ReceiptScanner::from_env();

    let batch = match scanner.scan(image_path).await {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("Receipt scan failed: {}", e);
            return false;
        }
    };

    println!("Found {} items in receipt:", batch.len());
    for (name, item) in &batch {
        println!(
            "  {}: {} @ {}",
            name,
            raw_field(&item.quantity),
            raw_field(&item.unit_price)
        );
    }

    if dry_run {
        println!("Dry run - no database changes made");
        return true;
    }

    match updater.update(user_id, &batch) {
        Ok(report) => {
            println!(
                "Added {} items to fridge {} ({} distinct items stored)",
                report.items_added,
                user_id,
                report.inventory.len()
            );
            true
        }
        Err(e) => {
            log::error!("Fridge update failed: {}", e);
            false
        }
    }
}

/// Print the fridge contents, distinguishing "no fridge" from "empty fridge"
fn show_fridge(updater: &FridgeUpdater, user_id: &str) -> bool {
    match updater.get_inventory(user_id) {
        Ok(None) => {
            println!("No fridge found for user {}", user_id);
            false
        }
        Ok(Some(inventory)) if inventory.is_empty() => {
            println!("Fridge {} is empty", user_id);
            true
        }
        Ok(Some(inventory)) => {
            println!("Fridge {} contains {} items:", user_id, inventory.len());
            for (name, item) in &inventory {
                let line_total = (item.quantity * item.unit_price).round_dp(2);
                println!(
                    "  {}: {} @ ${} (${})",
                    name, item.quantity, item.unit_price, line_total
                );
            }
            println!("Total value: ${}", total_value(&inventory).round_dp(2));
            true
        }
        Err(e) => {
            log::error!("Failed to read fridge: {}", e);
            false
        }
    }
}

/// Display a raw scanned field, which may be absent or non-numeric
fn raw_field(value: &Option<serde_json::Value>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}
