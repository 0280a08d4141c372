//! Seed script for the contract_hub clause library
//!
//! Populates Sled storage with:
//! - Public clauses served by GET /api/clauses
//! - A couple of private (unlisted) clauses
//! - Optionally a demo user (SEED_DEMO_USER=1) owning one draft contract
//! Run: cargo run --bin seed_clauses

use contract_hub::auth::hash_password;
use contract_hub::config::Config;
use contract_hub::logging::init_logging;
use contract_hub::models::{Clause, Contract, NewContract, User};
use contract_hub::storage::{Storage, StorageError};
use tracing::info;

const CLAUSES: &[(&str, &str, &str, bool)] = &[
    (
        "Mutual Confidentiality",
        "Each party shall hold the other party's confidential information in strict confidence and use it only to perform this agreement.",
        "confidentiality",
        true,
    ),
    (
        "Termination for Convenience",
        "Either party may terminate this agreement for any reason with thirty (30) days prior written notice.",
        "termination",
        true,
    ),
    (
        "Net 30 Payment",
        "Invoices are payable within thirty (30) days of receipt. Late amounts accrue interest at 1% per month.",
        "payment",
        true,
    ),
    (
        "Limitation of Liability",
        "Neither party's aggregate liability shall exceed the fees paid under this agreement in the twelve months preceding the claim.",
        "liability",
        true,
    ),
    (
        "Governing Law",
        "This agreement is governed by the laws of the jurisdiction in which the provider is incorporated.",
        "general",
        true,
    ),
    (
        "Internal Escalation Matrix",
        "Disputes above the agreed threshold are escalated to the account director before legal review.",
        "internal",
        false,
    ),
    (
        "Draft Non-Compete",
        "Under legal review; not for client use.",
        "internal",
        false,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let _log_guard = init_logging(&config);

    // Open the same Sled database the server uses
    let storage = Storage::open(&config.data_dir)?;

    let existing = storage.clauses()?;
    for (title, content, category, is_public) in CLAUSES {
        if existing.iter().any(|c| c.title == *title) {
            continue;
        }
        storage.insert_clause(&Clause::new(title, content, category, *is_public))?;
    }
    info!(
        public = storage.public_clauses()?.len(),
        "clause library seeded"
    );

    if std::env::var("SEED_DEMO_USER").ok().as_deref() == Some("1") {
        let hash = hash_password("demo", config.bcrypt_cost)?;
        let demo = User::new("Demo".to_string(), "demo@example.com".to_string(), hash);
        match storage.create_user(&demo) {
            Ok(()) => {
                let contract = Contract::new(
                    &demo.id,
                    NewContract {
                        title: "Sample Services Agreement".to_string(),
                        content: "The provider will deliver the services described in Schedule A.".to_string(),
                        client_name: "Acme Corp".to_string(),
                        provider_name: "Demo Studio".to_string(),
                        collaborators: vec!["reviewer@example.com".to_string()],
                    },
                );
                storage.insert_contract(&contract)?;
                info!(user_id = %demo.id, contract_id = %contract.id, "demo user created (demo@example.com / demo)");
            }
            Err(StorageError::EmailTaken) => info!("demo user already present"),
            Err(e) => return Err(e.into()),
        }
    }

    storage.flush().await?;
    Ok(())
}
