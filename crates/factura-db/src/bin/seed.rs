//! # Seed Data Generator
//!
//! Populates a development database with a sample catalog.
//!
//! ## Usage
//! ```bash
//! # 60 products into ./factura_dev.db (default)
//! cargo run -p factura-db --bin seed
//!
//! cargo run -p factura-db --bin seed -- --count 30 --db ./data/factura.db
//! ```
//!
//! Names combine a base product with a size, e.g. `Yerba Mate grande`.
//! Prices fall between $1.99 and $19.97, stock between 0 and 100.

use clap::Parser;
use factura_core::{validation::validate_new_product, NewProduct};
use factura_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const BASE_PRODUCTS: &[&str] = &[
    "Yerba Mate",
    "Cafe Molido",
    "Te Negro",
    "Azucar",
    "Harina 000",
    "Arroz Largo Fino",
    "Fideos Tirabuzon",
    "Aceite de Girasol",
    "Leche Entera",
    "Dulce de Leche",
    "Queso Cremoso",
    "Galletitas de Agua",
    "Gaseosa Cola",
    "Agua Mineral",
    "Vino Tinto",
    "Jabon en Polvo",
    "Lavandina",
    "Papel Higienico",
    "Mermelada de Durazno",
    "Pan Lactal",
];

/// (label, price addon in cents)
const SIZES: &[(&str, i64)] = &[("chico", 0), ("mediano", 350), ("grande", 999)];

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Factura POS sample catalog generator")]
struct Args {
    /// Number of products to generate
    #[arg(short, long, default_value_t = 60)]
    count: usize,

    /// Database file path
    #[arg(short, long, default_value = "./factura_dev.db")]
    db: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    println!("🌱 Factura POS Seed Data Generator");
    println!("==================================");
    println!("Database: {}", args.db);
    println!("Products: {}", args.count);
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    let combos = BASE_PRODUCTS
        .iter()
        .flat_map(|name| SIZES.iter().map(move |size| (*name, *size)));

    for (seed, (name, (size, addon))) in combos.enumerate().take(args.count) {
        let product = generate_product(name, size, addon, seed);

        if let Err(e) = validate_new_product(&product) {
            eprintln!("Skipping {}: {}", product.name, e);
            continue;
        }

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }

        generated += 1;
    }

    println!();
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let total_stock: i64 = db.products().list().await?.iter().map(|p| p.stock).sum();
    println!("  Units in stock: {}", total_stock);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_product(name: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    // $1.99 - $9.98 base
    let base_price = 199 + ((seed * 17) % 800) as i64;

    NewProduct {
        name: format!("{} {}", name, size),
        price_cents: base_price + price_addon,
        stock: (seed % 101) as i64,
    }
}
