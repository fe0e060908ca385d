//! # Seed Data Generator
//!
//! Populates the database with development data for the pre-order flow.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p request-db --bin seed
//!
//! # Specify database path
//! cargo run -p request-db --bin seed -- --db ./data/requests.db
//! ```
//!
//! ## Generated Data
//! - A bakery catalogue (cakes, tarts, breads) with VAT attached
//! - Two terminal configurations (counter with procurements, kiosk without)
//! - A reduced-VAT fiscal position
//! - A couple of customers
//! - One sample pre-order walked through to the to-deliver state

use chrono::Utc;
use std::env;
use uuid::Uuid;

use request_core::tax::{FiscalPosition, Tax, TaxMapping};
use request_core::{Partner, Product, RequestConfig};
use request_db::{Database, DbConfig, NewLine, NewRequest};

/// Bakery catalogue: (sku, name, price in cents, pre-orderable).
const PRODUCTS: &[(&str, &str, i64, bool)] = &[
    ("CAKE-CHOC", "Chocolate cake", 1850, true),
    ("CAKE-CARROT", "Carrot cake", 1650, true),
    ("CAKE-CHEESE", "Cheesecake", 1950, true),
    ("TART-APPLE", "Apple tart", 1200, true),
    ("TART-LEMON", "Lemon tart", 1250, true),
    ("PIE-MEAT", "Meat pie", 950, true),
    ("BREAD-SOUR", "Sourdough loaf", 420, true),
    ("BREAD-RYE", "Rye bread", 380, false),
    ("CROIS-PLAIN", "Plain croissant", 140, false),
    ("CROIS-ALM", "Almond croissant", 210, false),
    ("ECLAIR-CHOC", "Chocolate eclair", 320, true),
    ("MACARON-BOX", "Macaron box (12)", 1450, true),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./requests_dev.db");

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
                println!("POS Request Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./requests_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 POS Request Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db
        .products()
        .list_requestable(false, 1)
        .await?;
    if !existing.is_empty() {
        println!("⚠ Database already has products, skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Taxes and the reduced-VAT fiscal position
    let taxes = db.taxes();
    taxes
        .insert_tax(&Tax {
            id: "vat21".to_string(),
            name: "VAT 21%".to_string(),
            rate_bps: 2100,
            price_included: false,
            company_id: None,
            is_active: true,
        })
        .await?;
    taxes
        .insert_tax(&Tax {
            id: "vat10".to_string(),
            name: "VAT 10%".to_string(),
            rate_bps: 1000,
            price_included: false,
            company_id: None,
            is_active: true,
        })
        .await?;
    taxes
        .insert_fiscal_position(&FiscalPosition {
            id: "fp-reduced".to_string(),
            name: "Reduced VAT regime".to_string(),
            mappings: vec![TaxMapping {
                src_tax_id: "vat21".to_string(),
                dst_tax_id: Some("vat10".to_string()),
            }],
        })
        .await?;
    println!("✓ Taxes and fiscal position");

    // Catalogue
    let now = Utc::now();
    let mut first_product_id = None;
    for (sku, name, price_cents, requestable) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            barcode: Some(format!("841{:010}", price_cents)),
            name: name.to_string(),
            list_price_cents: *price_cents,
            available_for_request: *requestable,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
        db.taxes().link_product_tax(&product.id, "vat10").await?;
        first_product_id.get_or_insert(product.id);
    }
    println!("✓ {} products", PRODUCTS.len());

    // Terminals: the counter creates procurements, the kiosk does not
    let counter = RequestConfig {
        id: "terminal-counter".to_string(),
        name: "Counter".to_string(),
        request_product_id: first_product_id.clone(),
        previous_days: RequestConfig::DEFAULT_PREVIOUS_DAYS,
        create_procurements: true,
        warehouse_id: Some("wh-main".to_string()),
        virtual_location_id: Some("loc-preorders".to_string()),
        allow_reference: true,
        filter_products: true,
        show_all: false,
        customer_required: true,
        delivery_date_required: false,
        default_fiscal_position_id: None,
    };
    db.configs().upsert(&counter).await?;
    db.configs()
        .upsert(&RequestConfig {
            id: "terminal-kiosk".to_string(),
            name: "Kiosk".to_string(),
            request_product_id: None,
            previous_days: 7,
            create_procurements: false,
            warehouse_id: None,
            virtual_location_id: None,
            allow_reference: false,
            filter_products: true,
            show_all: true,
            customer_required: false,
            delivery_date_required: false,
            default_fiscal_position_id: None,
        })
        .await?;
    println!("✓ 2 terminal configurations");

    // Customers
    let requests = db.requests();
    requests
        .insert_partner(&Partner {
            id: "partner-alice".to_string(),
            name: "Alice Dupont".to_string(),
            fiscal_position_id: None,
        })
        .await?;
    requests
        .insert_partner(&Partner {
            id: "partner-bob".to_string(),
            name: "Bob's Catering".to_string(),
            fiscal_position_id: Some("fp-reduced".to_string()),
        })
        .await?;
    println!("✓ 2 customers");

    // A sample pre-order, walked to the to-deliver state
    let mut input = NewRequest::new("user-dev", "sess-01", "terminal-counter");
    input.partner_id = Some("partner-alice".to_string());
    input.reference = Some("Birthday Saturday".to_string());
    input.receipt_snapshot = Some(
        serde_json::json!({
            "terminal": "Counter",
            "cashier": "user-dev",
            "lines": [{"name": "Chocolate cake", "qty": 2, "price": "18.50"}],
        })
        .to_string(),
    );
    let request = requests.create_request(input).await?;

    let line = requests
        .add_line(NewLine {
            request_id: request.id.clone(),
            product_id: first_product_id.ok_or("catalogue was just seeded")?,
            quantity: 2,
            note: Some("Happy Birthday on top".to_string()),
            price_unit_cents: None,
        })
        .await?;
    requests.set_prepaid(&request.id, 1000).await?;
    requests.mark_line_done(&line.id).await?;

    let request = requests
        .get_by_id(&request.id)
        .await?
        .ok_or("request was just created")?;
    println!(
        "✓ Sample request {} ({}): total {} cents, due {} cents",
        request.number,
        request.state.as_str(),
        request.total_cents,
        request.amount_due_cents
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
