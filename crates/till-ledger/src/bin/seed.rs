//! # Ledger Seed Data Generator
//!
//! Populates a ledger with sample tickets for development.
//!
//! ## Usage
//! ```bash
//! # Record 50 documents (default)
//! cargo run -p till-ledger --bin seed
//!
//! # Custom amount and database
//! cargo run -p till-ledger --bin seed -- --count 200 --db ./data/ledger.db
//! ```
//!
//! ## Generated Documents
//! One drawer is opened, then documents rotate through:
//! - Open table drafts
//! - Event quotations (banquets, birthdays) dated in the coming weeks
//! - Cash invoices
//! - Card and mobile money invoices
//!
//! The first cash invoice is refunded, and the drawer is closed 5.00 short
//! so the variance shows up in the summary.

use chrono::{Duration, Utc};
use std::env;

use till_core::{
    CandidateDocument, DocumentBody, DocumentFilter, EventReservation, Money, PaymentMethod,
    Product, SaleItem,
};
use till_ledger::telemetry::init_tracing;
use till_ledger::{LedgerConfig, LedgerEngine};

/// Sample menu: (id, name, price in cents)
const MENU: &[(&str, &str, i64)] = &[
    ("m-jollof", "Jollof Rice", 1250),
    ("m-attieke", "Attieke Fish", 1800),
    ("m-alloco", "Alloco", 600),
    ("m-yassa", "Chicken Yassa", 1650),
    ("m-bissap", "Bissap Juice", 350),
    ("m-ginger", "Ginger Juice", 350),
    ("m-water", "Mineral Water", 150),
    ("m-cake", "Coconut Cake", 450),
];

const CUSTOMERS: &[&str] = &["", "Awa Kone", "Koffi Mensah", "Fatou Diallo", "Yao Kouassi"];

const EVENTS: &[&str] = &["Wedding", "Birthday", "Corporate Lunch", "Baptism"];

const CASHIER: &str = "cashier-01";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of documents to record (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load_or_default(None);
    config.database.path = Some(db_path.unwrap_or_else(|| "./till_dev.db".to_string()).into());

    println!("Till Ledger Seed Data Generator");
    println!("===============================");
    println!("Database:  {}", config.database_path().display());
    println!("Documents: {}", count);
    println!();

    let engine = LedgerEngine::open(&config).await?;
    println!("✓ Ledger opened, next invoice {}", engine.next_invoice_number()?);

    let existing = engine.list_documents(DocumentFilter::all()).count();
    if existing > 0 {
        println!("⚠ Ledger already has {} documents", existing);
        println!("  Skipping seed to avoid mixing sample data.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let session = match engine.current_open_session(Some(CASHIER)) {
        Some(open) => open,
        None => {
            engine
                .open_session(CASHIER, "Seed Cashier", Money::from_cents(20_000))
                .await?
        }
    };
    println!("✓ Drawer {} open with {}", session.id, session.opening_balance);

    let start = std::time::Instant::now();
    let mut first_cash = None;

    for n in 0..count {
        let body = sample_body(n);
        let candidate = CandidateDocument::new(body);

        let result = match n % 5 {
            0 => engine.save_draft(candidate).await,
            1 => engine.save_quotation(with_event(candidate, n)).await,
            2 | 3 => engine.confirm(candidate, PaymentMethod::Cash).await,
            _ if n % 2 == 0 => engine.confirm(candidate, PaymentMethod::Card).await,
            _ => engine.confirm(candidate, PaymentMethod::MobileMoney).await,
        };

        match result {
            Ok(doc) => {
                if first_cash.is_none() && doc.payment_method() == Some(PaymentMethod::Cash) {
                    first_cash = doc.invoice_number().map(|_| doc.id().clone());
                }
            }
            Err(e) => eprintln!("Failed to record document {}: {}", n, e),
        }

        if (n + 1) % 25 == 0 {
            println!("  Recorded {} documents...", n + 1);
        }
    }

    if let Some(id) = first_cash {
        let refunded = engine.refund(&id, CASHIER).await?;
        println!(
            "✓ Refunded {} ({})",
            refunded
                .invoice_number()
                .map(|n| n.as_str())
                .unwrap_or_default(),
            refunded.total()
        );
    }

    println!();
    println!("✓ Recorded {} documents in {:?}", count, start.elapsed());

    let summary = engine.revenue_summary(&DocumentFilter::all());
    println!();
    println!("Revenue");
    println!("  Posted:   {} invoices, {}", summary.posted_count, summary.gross);
    println!("  Refunded: {} invoices, {}", summary.refunded_count, summary.refunded);
    println!("  Net:      {} (cash {})", summary.net, summary.cash_net);

    let expected = engine.session(&session.id)?.expected_balance;
    let declared = expected - Money::from_cents(500);
    let closure = engine.close_session(&session.id, declared).await?;
    println!();
    println!("Drawer");
    println!("  Expected: {}", closure.session.expected_balance);
    println!("  Declared: {}", declared);
    println!("  Variance: {}", closure.variance);

    let today = Utc::now().date_naive();
    let booked = engine.reservations(today, today + Duration::days(60));
    println!();
    println!("✓ {} reservations in the next 60 days", booked.len());
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a ticket of one to three menu lines.
fn sample_body(seed: usize) -> DocumentBody {
    let mut body = DocumentBody::new(CASHIER);
    body.customer = CUSTOMERS[seed % CUSTOMERS.len()].to_string();
    body.location = Some(format!("Table {}", seed % 12 + 1));

    for line in 0..(seed % 3 + 1) {
        let (id, name, price) = MENU[(seed * 7 + line * 3) % MENU.len()];
        let product = Product {
            id: id.to_string(),
            sku: id.to_uppercase(),
            name: name.to_string(),
            price: Money::from_cents(price),
            stock: 100,
        };
        let quantity = (seed % 4 + 1) as i64;
        if let Err(e) = body.add_item(SaleItem::from_product(&product, quantity)) {
            eprintln!("Skipping line for {}: {}", name, e);
        }
    }
    body
}

/// Turns a ticket into an event quotation with a named customer.
fn with_event(mut candidate: CandidateDocument, seed: usize) -> CandidateDocument {
    if candidate.body.customer.trim().is_empty() {
        candidate.body.customer = "Event Guest".to_string();
    }
    candidate.body.location = None;
    candidate.body.event = Some(EventReservation {
        event_date: Utc::now().date_naive() + Duration::days((seed % 45 + 3) as i64),
        event_type: EVENTS[seed % EVENTS.len()].to_string(),
        guest_count: (seed % 8 + 2) as u32 * 10,
        venue: Some("Main Hall".to_string()),
    });
    candidate
}
