//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p storefront-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p storefront-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db
//! ```
//!
//! Each product gets a name `{Item} {Edition}`, a price between $1.99
//! and $89.98, and stock between 0 and 25 (so some lines will come back
//! unfulfilled at checkout). Every 17th product is marked unavailable.

use anyhow::{bail, Context};
use std::env;
use storefront_core::Product;
use storefront_db::{Database, DbConfig};

const ITEMS: &[&str] = &[
    "Concert Ticket",
    "Festival Pass",
    "Museum Entry",
    "Theatre Seat",
    "Workshop Seat",
    "Gallery Tour",
    "Comedy Night",
    "Cinema Voucher",
    "Boat Cruise",
    "City Walk",
];

const EDITIONS: &[(&str, i64)] = &[
    ("Standard", 0),
    ("Early Bird", -250),
    ("Premium", 1500),
    ("VIP", 4000),
    ("Student", -300),
    ("Family", 2500),
    ("Weekend", 800),
    ("Evening", 300),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./storefront_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--count" => {
                let value = args.get(i + 1).context("--count needs a value")?;
                count = value
                    .parse()
                    .with_context(|| format!("invalid --count '{value}'"))?;
                i += 1;
            }
            "-d" | "--db" => {
                db_path = args.get(i + 1).context("--db needs a value")?.clone();
                i += 1;
            }
            "-h" | "--help" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
        i += 1;
    }

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let products = db.products();
    let mut generated = 0;

    for seed in 0..count {
        let product = generate_product(seed);

        if let Err(e) = products.insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} products...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let sample = products.list_available(5).await?;
    println!();
    println!("Sample of available products:");
    for product in sample {
        println!(
            "  {:<40} {:>10}  stock {}",
            product.name,
            product.price().to_string(),
            product.stock
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a deterministic demo product from its index.
fn generate_product(seed: usize) -> Product {
    let item = ITEMS[seed % ITEMS.len()];
    let (edition, price_addon) = EDITIONS[(seed / ITEMS.len()) % EDITIONS.len()];
    let batch = seed / (ITEMS.len() * EDITIONS.len());

    let name = if batch == 0 {
        format!("{} {}", item, edition)
    } else {
        format!("{} {} #{}", item, edition, batch + 1)
    };

    // $4.99 - $49.99 base, plus the edition surcharge or discount
    let base_price = 499 + ((seed * 37) % 4500) as i64;
    let price_cents = (base_price + price_addon).max(0);

    let stock = (seed % 26) as i64;

    let mut product = Product::new(name, price_cents, stock);
    product.available = seed % 17 != 16;
    product
}
