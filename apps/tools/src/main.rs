use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shared::domain::Order;
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/orders.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load orders from a JSON array in the backend's document shape.
    Seed {
        file: PathBuf,
        /// Give documents without `_id` a generated one instead of rejecting them.
        #[arg(long)]
        assign_ids: bool,
    },
    /// Print every stored order as JSON.
    Dump,
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open '{}'", cli.database_url))?;

    match cli.command {
        Command::Seed { file, assign_ids } => {
            let orders = read_fixture(&file, assign_ids)?;
            for order in &orders {
                storage.upsert_order(order).await?;
            }
            info!(count = orders.len(), file = %file.display(), "tools: seeded orders");
            println!("seeded {} orders", orders.len());
        }
        Command::Dump => {
            let orders = storage.list_orders().await?;
            println!("{}", serde_json::to_string_pretty(&orders)?);
        }
        Command::Health => {
            storage.health_check().await?;
            println!("ok: {} orders", storage.count_orders().await?);
        }
    }

    Ok(())
}

fn read_fixture(path: &Path, assign_ids: bool) -> Result<Vec<Order>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
    parse_fixture(&raw, assign_ids)
        .with_context(|| format!("invalid fixture '{}'", path.display()))
}

fn parse_fixture(raw: &str, assign_ids: bool) -> Result<Vec<Order>> {
    let Value::Array(documents) = serde_json::from_str::<Value>(raw)? else {
        bail!("expected a JSON array of order documents");
    };

    documents
        .into_iter()
        .enumerate()
        .map(|(index, mut document)| {
            let Some(fields) = document.as_object_mut() else {
                bail!("entry {index} is not an object");
            };
            let has_id = fields
                .get("_id")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.trim().is_empty());
            if !has_id {
                if !assign_ids {
                    bail!("entry {index} has no _id (pass --assign-ids to generate one)");
                }
                fields.insert(
                    "_id".to_string(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
            serde_json::from_value::<Order>(document)
                .with_context(|| format!("entry {index} is not an order"))
        })
        .collect()
}
