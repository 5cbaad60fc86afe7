//! # Seed Data Generator
//!
//! Populates the database with a small development catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p layerline-db --bin seed
//!
//! # Specify database path
//! cargo run -p layerline-db --bin seed -- --db ./data/layerline.db
//! ```
//!
//! ## Generated Catalog
//! - A filament color registry (one color out of stock)
//! - Products in every color mode: single color, per-section colors and
//!   no color choice
//! - Accessories, bulk tiers, a discounted product and a sold-out one
//!
//! Rows are upserted, so running the seed twice resets the catalog to the
//! same state.

use std::env;

use layerline_core::{
    Accessory, BulkPricingRule, ColorMode, ColorSection, ColorWithName, Product, RegistryColor,
};
use layerline_db::{Database, DbConfig};

/// (id, name, hex, in stock)
const REGISTRY: &[(&str, &str, &str, bool)] = &[
    ("galaxy-black", "Galaxy Black", "#1a1a1a", true),
    ("snow-white", "Snow White", "#f5f5f5", true),
    ("signal-red", "Signal Red", "#d32f2f", true),
    ("ocean-blue", "Ocean Blue", "#1565c0", true),
    ("forest-green", "Forest Green", "#2e7d32", true),
    ("silk-gold", "Silk Gold", "#c9a227", false),
];

fn registry_color(id: &str) -> ColorWithName {
    REGISTRY
        .iter()
        .find(|(rid, ..)| *rid == id)
        .map(|(_, name, hex, _)| ColorWithName::new(*name, *hex))
        .unwrap_or_else(|| ColorWithName::new(id, ""))
}

fn with_image(mut color: ColorWithName, index: usize) -> ColorWithName {
    color.image_index = Some(index);
    color
}

fn tier(min_quantity: u32, unit_price_cents: i64) -> BulkPricingRule {
    BulkPricingRule {
        min_quantity,
        unit_price_cents,
    }
}

fn accessory(name: &str, price_cents: i64, original: Option<i64>) -> Accessory {
    Accessory {
        name: name.to_string(),
        price_cents,
        original_price_cents: original,
    }
}

fn section(id: &str, label: &str, colors: &[&str]) -> ColorSection {
    ColorSection {
        id: id.to_string(),
        label: label.to_string(),
        color_ids: colors.iter().map(|c| c.to_string()).collect(),
    }
}

fn catalog() -> Vec<Product> {
    let base = |id: &str, name: &str, price_cents: i64, stock: u32| Product {
        id: id.to_string(),
        name: name.to_string(),
        price_cents,
        original_price_cents: None,
        stock,
        images: vec![format!("{}.jpg", id)],
        available_colors: Vec::new(),
        color_mode: ColorMode::Default,
        color_sections: Vec::new(),
        accessories: Vec::new(),
        bulk_pricing_rules: Vec::new(),
    };

    vec![
        Product {
            images: vec![
                "fox-black.jpg".into(),
                "fox-white.jpg".into(),
                "fox-red.jpg".into(),
            ],
            available_colors: vec![
                with_image(registry_color("galaxy-black"), 0),
                with_image(registry_color("snow-white"), 1),
                with_image(registry_color("signal-red"), 2),
                registry_color("silk-gold"),
            ],
            bulk_pricing_rules: vec![tier(5, 1350), tier(10, 1200)],
            accessories: vec![accessory("Display stand", 400, None)],
            ..base("low-poly-fox", "Low Poly Fox", 1500, 25)
        },
        Product {
            original_price_cents: Some(5200),
            color_mode: ColorMode::Sections,
            color_sections: vec![
                section("roof", "Roof", &["signal-red", "galaxy-black"]),
                section("walls", "Walls", &["snow-white", "ocean-blue", "silk-gold"]),
            ],
            accessories: vec![accessory("LED kit", 900, Some(1200))],
            ..base("cottage-lamp", "Cottage Lamp", 4500, 6)
        },
        Product {
            color_mode: ColorMode::Disabled,
            bulk_pricing_rules: vec![tier(3, 700), tier(1, 100), tier(6, 0)],
            ..base("marble-planter", "Marble Planter", 800, 40)
        },
        Product {
            available_colors: vec![
                registry_color("ocean-blue"),
                registry_color("forest-green"),
            ],
            ..base("articulated-dragon", "Articulated Dragon", 3200, 0)
        },
        Product {
            available_colors: vec![registry_color("galaxy-black")],
            accessories: vec![
                accessory("Keychain ring", 150, None),
                accessory("Gift box", 300, None),
            ],
            bulk_pricing_rules: vec![tier(10, 450), tier(25, 380)],
            ..base("dice-tower", "Dice Tower", 500, 120)
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./layerline_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Layerline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./layerline_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Layerline Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    for (id, name, hex, in_stock) in REGISTRY {
        db.colors()
            .upsert(&RegistryColor {
                id: id.to_string(),
                name: name.to_string(),
                hex: hex.to_string(),
                in_stock: *in_stock,
            })
            .await?;
    }
    println!("✓ {} registry colors", REGISTRY.len());

    let products = catalog();
    for product in &products {
        if let Err(e) = db.products().upsert(product).await {
            eprintln!("Failed to upsert {}: {}", product.id, e);
            continue;
        }
        println!("  {} ({:?}, stock {})", product.name, product.color_mode, product.stock);
    }

    let listed = db.products().list_active(100).await?;
    println!();
    println!("✓ {} active products", listed.len());

    db.close().await;
    println!("✓ Seed complete!");

    Ok(())
}
