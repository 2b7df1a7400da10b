use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;
use crate::ordering::MAX_QUANTITY;

pub mod auth;
pub mod chat;
pub mod menu;
pub mod order;

#[derive(Subcommand)]
enum Command {
    /// Start a chat session with calendar, email and ordering tools
    Chat {},
    /// Authorize Google Calendar and Gmail access and save the token
    Auth {},
    /// Add an item to the cart on the ordering site without the model
    Order {
        /// Menu item to look for, partial names match
        #[arg(long)]
        item: String,
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=MAX_QUANTITY as i64))]
        quantity: u32,
    },
    /// Print the ordering site's menu as JSON
    Menu {
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();
    let config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Chat {}) => {
            chat::run(&config).await?;
        }
        Some(Command::Auth {}) => {
            auth::run(&config).await?;
        }
        Some(Command::Order { item, quantity }) => {
            order::run(&config, &item, quantity).await?;
        }
        Some(Command::Menu { category }) => {
            menu::run(&config, category.as_deref()).await?;
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_bounds_the_order_quantity() {
        let cli = Cli::try_parse_from(["errand", "order", "--item", "bagel", "--quantity", "99"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Order { quantity: 99, .. })));

        for quantity in ["0", "100"] {
            let parsed =
                Cli::try_parse_from(["errand", "order", "--item", "bagel", "--quantity", quantity]);
            assert!(parsed.is_err(), "{} was accepted", quantity);
        }
    }
}
