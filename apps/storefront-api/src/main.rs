//! # Storefront Checkout CLI
//!
//! Runs one cart-and-checkout round against the configured database and
//! prints the results as JSON. Useful with a catalog created by the
//! `storefront-db` seed binary.
//!
//! ## Usage
//! ```bash
//! # List a few available products
//! STOREFRONT_DB_PATH=./storefront_dev.db cargo run -p storefront-api -- --list
//!
//! # Add two lines and purchase them as user "alice"
//! cargo run -p storefront-api -- --user alice \
//!     --add 0b7c…:2 --add 91ef…:1 --purchase
//! ```

use anyhow::{bail, Context};
use std::env;
use storefront_api::{init_tracing, RequestContext, SqliteStorefront, StoreConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut user_id = String::from("demo-user");
    let mut additions: Vec<(String, i64)> = Vec::new();
    let mut purchase = false;
    let mut list = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-u" | "--user" => {
                user_id = args.get(i + 1).context("--user needs a value")?.clone();
                i += 1;
            }
            "-a" | "--add" => {
                let value = args.get(i + 1).context("--add needs PRODUCT_ID:QTY")?;
                additions.push(parse_addition(value)?);
                i += 1;
            }
            "-p" | "--purchase" => purchase = true,
            "-l" | "--list" => list = true,
            "-h" | "--help" => {
                println!("Storefront Checkout CLI");
                println!();
                println!("Usage: storefront-api [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --user <ID>            Purchasing user (default: demo-user)");
                println!("  -a, --add <PRODUCT:QTY>    Add a line to the user's cart (repeatable)");
                println!("  -p, --purchase             Check out the cart after adding");
                println!("  -l, --list                 List available products");
                println!("  -h, --help                 Show this help message");
                println!();
                println!("Configuration: STOREFRONT_CONFIG, STOREFRONT_DB_PATH, ...");
                return Ok(());
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
        i += 1;
    }

    let config = StoreConfig::load()?;
    info!(
        db = %config.database_path,
        timeout_ms = config.storage_timeout_ms,
        compensate = config.compensate_on_abort,
        "Configuration loaded"
    );

    let (storefront, db) = SqliteStorefront::open(&config).await?;

    if list {
        let products = storefront.engine().inventory().list_available(20).await?;
        println!("{}", serde_json::to_string_pretty(&products)?);
    }

    let ctx = RequestContext::new(user_id);
    let cart = storefront.create_cart(&ctx).await?;

    for (product_id, quantity) in &additions {
        storefront
            .add_to_cart(&ctx, &cart.id, product_id, *quantity)
            .await?;
    }

    let view = storefront.get_cart(&ctx, &cart.id).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);

    if purchase {
        let outcome = storefront.purchase(&ctx, &cart.id).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    db.close().await;
    Ok(())
}

fn parse_addition(value: &str) -> anyhow::Result<(String, i64)> {
    let (product_id, quantity) = value
        .rsplit_once(':')
        .with_context(|| format!("expected PRODUCT_ID:QTY, got '{value}'"))?;
    let quantity = quantity
        .parse()
        .with_context(|| format!("invalid quantity in '{value}'"))?;
    Ok((product_id.to_string(), quantity))
}
