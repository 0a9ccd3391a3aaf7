use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ContentOrderStore, DashboardController, DashboardError, DeleteOutcome,
    ImageResolver, LocalOrderStore, NoImageResolver, OrderStore,
};
use shared::domain::{OrderId, OrderStatus, StatusFilter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod notifier;
mod render;

use config::{load_settings, Backend, Settings};
use notifier::TerminalNotifier;
use render::{render_orders, render_summary};

#[derive(Parser, Debug)]
#[command(name = "admin", about = "Order admin dashboard")]
struct Cli {
    #[arg(long, default_value = "admin.toml")]
    config: PathBuf,
    /// Overrides the backend chosen by config or environment.
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the status summary and the order table.
    List {
        /// all, pending, dispatch, success or unset
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Print the order table with one order's details expanded.
    Show { order_id: String },
    SetStatus {
        order_id: String,
        /// pending, dispatch or success
        status: OrderStatus,
    },
    Delete {
        order_id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut settings, notes) = load_settings(&cli.config);
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    for note in notes {
        warn!("config: {note}");
    }

    let (store, images) = open_backend(&settings).await?;
    let assume_yes = matches!(cli.command, Command::Delete { yes: true, .. });
    let dashboard = DashboardController::new(store, Arc::new(TerminalNotifier::new(assume_yes)));

    let result = run(&dashboard, cli.command, images.as_ref()).await;
    dashboard.close();
    result
}

async fn open_backend(
    settings: &Settings,
) -> Result<(Arc<dyn OrderStore>, Box<dyn ImageResolver>)> {
    match settings.backend {
        Backend::Content => {
            let config = settings.content_config()?;
            info!(
                project_id = %config.project_id,
                dataset = %config.dataset,
                authenticated = config.api_token.is_some(),
                "admin: using content backend"
            );
            let images = settings.image_resolver(&config);
            let store = ContentOrderStore::new(config).context("failed to set up content backend")?;
            Ok((Arc::new(store), Box::new(images)))
        }
        Backend::Local => {
            let database_url = settings.local_database_url();
            info!(database_url = %database_url, "admin: using local order store");
            let store = LocalOrderStore::open(&database_url)
                .await
                .with_context(|| format!("failed to open local order store '{database_url}'"))?;
            Ok((Arc::new(store), Box::new(NoImageResolver)))
        }
    }
}

async fn run(
    dashboard: &DashboardController,
    command: Command,
    images: &dyn ImageResolver,
) -> Result<()> {
    dashboard
        .load_orders()
        .await
        .context("could not load orders")?;

    match command {
        Command::List { status } => {
            let filter = StatusFilter::parse(&status)
                .ok_or_else(|| anyhow!("unknown status filter '{status}'"))?;
            println!("{}", render_summary(&dashboard.counts().await));
            let orders = dashboard.filtered_orders(filter).await;
            print!("{}", render_orders(&orders, None, images));
        }
        Command::Show { order_id } => {
            let order_id = OrderId::new(order_id);
            if dashboard.order(&order_id).await.is_none() {
                return Err(DashboardError::UnknownOrder(order_id).into());
            }
            let expanded = dashboard.toggle_details(&order_id).await;
            let orders = dashboard.orders().await;
            print!("{}", render_orders(&orders, expanded.as_ref(), images));
        }
        Command::SetStatus { order_id, status } => {
            dashboard
                .set_status(&OrderId::new(order_id), status)
                .await?;
            println!("{}", render_summary(&dashboard.counts().await));
        }
        Command::Delete { order_id, .. } => {
            match dashboard.delete_order(&OrderId::new(order_id)).await? {
                DeleteOutcome::Deleted => {
                    println!("{}", render_summary(&dashboard.counts().await))
                }
                DeleteOutcome::Cancelled => println!("Delete cancelled."),
            }
        }
    }

    Ok(())
}
