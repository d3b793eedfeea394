//! Cablestore CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password via --password or CABLESTORE_PASSWORD)
//! CABLESTORE_PASSWORD=... cablestore login -e buyer@acme.test
//!
//! # Browse and buy
//! cablestore products --refresh
//! cablestore cart add 100 --quantity 50
//! cablestore cart set 7 20
//! cablestore checkout
//!
//! # Check where a page would take you
//! cablestore route /admin
//! ```
//!
//! The session is kept in a credential file between invocations
//! (`CABLESTORE_CREDENTIALS_PATH`, default `<config dir>/cablestore/credentials.json`).
//! Toasts raised while a command runs are printed to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cablestore_client::credentials::FileCredentialStore;
use cablestore_client::{ClientConfig, Storefront};
use cablestore_core::{CartItemId, NewInquiryItem, NewsId, VariantId};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use error::CliError;

#[derive(Parser)]
#[command(name = "cablestore")]
#[command(author, version, about = "Cablestore B2B storefront")]
struct Cli {
    /// Credential file location
    #[arg(long, global = true, env = "CABLESTORE_CREDENTIALS_PATH")]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to a business account
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "CABLESTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a business account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "CABLESTORE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Company the account belongs to
        #[arg(short, long)]
        company: String,
    },
    /// Log out
    Logout {
        /// Only forget local credentials; do not contact the server
        #[arg(long)]
        local: bool,
    },
    /// Show the logged-in account
    Whoami,
    /// List products
    Products {
        /// Ignore the cache and reload from the server
        #[arg(long)]
        refresh: bool,
    },
    /// List categories
    Categories,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Place an order for everything in the cart
    Checkout,
    /// List your orders
    Orders,
    /// Request or review quotes
    Inquiry {
        #[command(subcommand)]
        action: InquiryAction,
    },
    /// Read company news
    News {
        /// Show one article in full
        id: Option<NewsId>,
    },
    /// Resolve a location through the route table and guard
    Route { path: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines
    Show,
    /// Add a product variant
    Add {
        variant: VariantId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line's quantity; zero or less removes it
    Set {
        item: CartItemId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { item: CartItemId },
}

#[derive(Subcommand)]
enum InquiryAction {
    /// Ask for a quote
    Create {
        /// Free-text requirements
        #[arg(short, long)]
        remark: Option<String>,

        /// Requested line as `VARIANT:QUANTITY`, repeatable
        #[arg(short, long = "item", value_parser = parse_inquiry_item)]
        items: Vec<NewInquiryItem>,
    },
    /// List your inquiries
    List,
}

fn parse_inquiry_item(raw: &str) -> Result<NewInquiryItem, String> {
    let (variant, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected VARIANT:QUANTITY, got {raw:?}"))?;
    Ok(NewInquiryItem {
        variant_id: variant.parse().map_err(|e| format!("bad variant id: {e}"))?,
        quantity: quantity.trim().parse().map_err(|e| format!("bad quantity: {e}"))?,
    })
}

/// Initialize Sentry error tracking if `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cablestore=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

fn credentials_path(cli: &Cli) -> Result<PathBuf, CliError> {
    if let Some(path) = &cli.credentials {
        return Ok(path.clone());
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("cablestore").join("credentials.json"))
        .ok_or(CliError::NoCredentialsPath)
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env may carry the credential path and password read by clap
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            output::failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let store = FileCredentialStore::new(credentials_path(&cli)?);
    let shop = Storefront::new(config, Arc::new(store))?;
    let mut toasts = shop.notifications().events();

    if let Err(e) = shop.session().initialize().await {
        shop.handle_error(&e);
    }

    let result = dispatch(&shop, cli.command).await;
    if let Err(CliError::Client(e)) = &result {
        shop.handle_error(e);
    }

    while let Ok(toast) = toasts.try_recv() {
        output::toast(&toast);
    }
    result
}

async fn dispatch(shop: &Storefront, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Login { email, password } => {
            commands::account::login(shop, &email, password.into()).await
        }
        Commands::Register {
            email,
            password,
            company,
        } => commands::account::register(shop, &email, password.into(), &company).await,
        Commands::Logout { local } => commands::account::logout(shop, local).await,
        Commands::Whoami => commands::account::whoami(shop),
        Commands::Products { refresh } => commands::shop::products(shop, refresh).await,
        Commands::Categories => commands::shop::categories(shop).await,
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::shop::show_cart(shop).await,
            CartAction::Add { variant, quantity } => {
                commands::shop::add_to_cart(shop, variant, quantity).await
            }
            CartAction::Set { item, quantity } => {
                commands::shop::set_quantity(shop, item, quantity).await
            }
            CartAction::Remove { item } => commands::shop::remove(shop, item).await,
        },
        Commands::Checkout => commands::shop::checkout(shop).await,
        Commands::Orders => commands::shop::orders(shop).await,
        Commands::Inquiry { action } => match action {
            InquiryAction::Create { remark, items } => {
                commands::content::create_inquiry(shop, remark, items).await
            }
            InquiryAction::List => commands::content::inquiries(shop).await,
        },
        Commands::News { id } => commands::content::news(shop, id).await,
        Commands::Route { path } => {
            commands::content::route(shop, &path);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_inquiry_item() {
        let item = parse_inquiry_item("100:500").unwrap();
        assert_eq!(item.variant_id, VariantId::new(100));
        assert_eq!(item.quantity, 500);

        assert!(parse_inquiry_item("100").is_err());
        assert!(parse_inquiry_item("x:1").is_err());
    }

    #[test]
    fn test_cart_defaults_to_show() {
        let cli = Cli::try_parse_from(["cablestore", "cart"]).unwrap();
        assert!(matches!(cli.command, Commands::Cart { action: None }));

        let cli = Cli::try_parse_from(["cablestore", "cart", "set", "7", "-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: Some(CartAction::Set { quantity: -1, .. })
            }
        ));
    }
}
