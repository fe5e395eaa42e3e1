//! # Seed Data Generator
//!
//! Populates the database with demo master data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p sanbill-db --bin seed
//!
//! # Generate more jobs
//! cargo run -p sanbill-db --bin seed -- --jobs 50
//!
//! # Specify database path
//! cargo run -p sanbill-db --bin seed -- --db ./data/sanbill.db
//! ```
//!
//! ## Generated Data
//! - Charge master: freight, handling, documentation and customs charges
//!   with their usual SAC codes and GST rates
//! - Customers with GSTIN and a default address
//! - Jobs `SE/1001..` (sea export) spread over the customers; every fifth
//!   job is closed

use rust_decimal::Decimal;
use sanbill_core::{ConsignmentDetails, GstRate, ShipmentDetails};
use sanbill_db::{AddressInput, ChargeInput, Database, DbConfig, NewJob};
use std::env;

/// (name, SAC, currency, CGST %, SGST %)
const CHARGES: &[(&str, &str, &str, u32, u32)] = &[
    ("Ocean Freight", "996521", "USD", 0, 0),
    ("Air Freight", "996531", "USD", 0, 0),
    ("Terminal Handling Charges", "996719", "INR", 9, 9),
    ("Documentation Charges", "998599", "INR", 9, 9),
    ("Bill of Lading Fee", "998599", "INR", 9, 9),
    ("Customs Clearance", "998599", "INR", 9, 9),
    ("Transportation", "996511", "INR", 6, 6),
    ("Container Detention", "996729", "INR", 9, 9),
    ("Warehousing", "996729", "INR", 9, 9),
    ("Courier Charges", "996812", "INR", 9, 9),
];

/// (name, GSTIN, city, state, state code, pincode)
const CUSTOMERS: &[(&str, &str, &str, &str, &str, &str)] = &[
    ("Acme Traders Pvt Ltd", "27AAPFU0939F1ZV", "Mumbai", "Maharashtra", "27", "400001"),
    ("Blue Coast Exports", "33AABCB1234C1Z5", "Chennai", "Tamil Nadu", "33", "600001"),
    ("Deccan Spices LLP", "36AAGFD5678D1Z2", "Hyderabad", "Telangana", "36", "500001"),
    ("Ganga Textiles", "09AACCG4321E1Z9", "Kanpur", "Uttar Pradesh", "09", "208001"),
    ("Malabar Cashew Co", "32AADCM8765F1Z1", "Kochi", "Kerala", "32", "682001"),
];

/// (port of loading, port of discharge, vessel)
const ROUTES: &[(&str, &str, &str)] = &[
    ("INNSA", "AEJEA", "MSC ARINA"),
    ("INMAA", "SGSIN", "MAERSK KOLKATA"),
    ("INCOK", "NLRTM", "CMA CGM TAGE"),
    ("INMUN", "USNYC", "EVER GIVEN"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut job_count: usize = 20;
    let mut db_path = String::from("./sanbill_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--jobs" | "-j" => {
                if i + 1 < args.len() {
                    job_count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sanbill Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -j, --jobs <N>     Number of jobs to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./sanbill_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Sanbill Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Jobs:     {}", job_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.charges().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} charges", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding charge master...");
    for (name, sac, currency, cgst, sgst) in CHARGES {
        db.charges()
            .add(&ChargeInput {
                charge_name: name.to_string(),
                hsn_sac: sac.to_string(),
                currency: currency.to_string(),
                cgst_rate: GstRate::from_percent(Decimal::from(*cgst)),
                sgst_rate: GstRate::from_percent(Decimal::from(*sgst)),
            })
            .await?;
    }
    println!("  {} charges", CHARGES.len());

    println!("Seeding customers...");
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, gstin, city, state, state_code, pincode) in CUSTOMERS {
        let pan = &gstin[2..12];
        let customer = db.consignees().add(name, Some(*gstin), Some(pan)).await?;
        db.consignees()
            .add_address(
                &customer.id,
                &AddressInput {
                    label: "Head Office".to_string(),
                    address: format!("1 Harbour Road, {}", city),
                    state: state.to_string(),
                    state_code: state_code.to_string(),
                    pincode: pincode.to_string(),
                    country: "India".to_string(),
                    is_default: true,
                },
            )
            .await?;
        customer_ids.push((customer.id, name.to_string()));
    }
    println!("  {} customers", customer_ids.len());

    println!("Seeding jobs...");
    let mut generated = 0;
    let mut closed = 0;
    for seed in 0..job_count {
        let (customer_id, customer_name) = &customer_ids[seed % customer_ids.len()];
        let (pol, pod, vessel) = ROUTES[seed % ROUTES.len()];
        let job_no = format!("SE/{}", 1001 + seed);

        let job = NewJob {
            job_no: job_no.clone(),
            customer_id: Some(customer_id.clone()),
            shipment: ShipmentDetails {
                shipper: customer_name.clone(),
                consignee: "To Order".to_string(),
                pol: pol.to_string(),
                pod: pod.to_string(),
                vessel_flight: format!("{} V.{:03}", vessel, seed + 1),
                mbl_no: format!("MBL{:07}", 4_200_000 + seed),
                hbl_no: format!("SAN{:06}", 100 + seed),
                ..Default::default()
            },
            consignment: ConsignmentDetails {
                gross_weight: format!("{} KGS", 1_000 + (seed * 137) % 9_000),
                packages: format!("{} PKGS", 10 + seed % 90),
                volume_cbm: format!("{}", 5 + seed % 28),
                ..Default::default()
            },
        };

        if let Err(e) = db.jobs().insert(&job).await {
            eprintln!("Failed to insert {}: {}", job_no, e);
            continue;
        }
        generated += 1;

        if seed % 5 == 4 {
            db.jobs().close(&job_no).await?;
            closed += 1;
        }
    }
    println!("  {} jobs ({} closed)", generated, closed);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
