//! Demo data seeder for Ledgerline development and testing.
//!
//! Creates a few users with their default account sets, gives one of them a
//! credit card, and prints a development bearer token per user.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use uuid::Uuid;

use ledgerline_core::ledger::{Account, AccountType, DefaultAccounts, UserProfile};
use ledgerline_db::{AccountRepository, UserRepository, connect_with};
use ledgerline_shared::types::{Money, UserId};
use ledgerline_shared::{AppConfig, JwtConfig, JwtService};

/// Fixed demo users so tokens stay stable across reseeds.
const DEMO_USERS: [(&str, &str, &str, &str); 3] = [
    ("00000000-0000-0000-0000-00000000a11c", "alice@ledgerline.dev", "alice", "Alice Archer"),
    ("00000000-0000-0000-0000-000000000b0b", "bob@ledgerline.dev", "bob", "Bob Baker"),
    ("00000000-0000-0000-0000-0000000ca201", "carol@ledgerline.dev", "carol", "Carol Chen"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;

    let users = UserRepository::new(db.clone());
    let accounts = AccountRepository::new(db);
    let defaults = DefaultAccounts {
        checking_balance: Money::from_decimal(config.ledger.default_checking_balance),
        savings_balance: Money::from_decimal(config.ledger.default_savings_balance),
    };
    let jwt = JwtService::new(JwtConfig::from(&config.jwt));

    for (id, email, username, display_name) in DEMO_USERS {
        let user_id = UserId::from_uuid(Uuid::parse_str(id)?);

        if users.find_by_id(user_id.into_inner()).await?.is_some() {
            println!("  {username} already exists, skipping profile...");
        } else {
            users
                .create(&UserProfile {
                    id: user_id,
                    email: email.to_string(),
                    username: username.to_string(),
                    display_name: display_name.to_string(),
                })
                .await?;
            println!("  Created {username}");
        }

        let opened = accounts.provision_defaults(user_id, &defaults).await?;
        println!("  {username} has {} default account(s)", opened.len());
    }

    seed_credit_card(&accounts).await?;

    println!();
    println!("Development tokens (valid {} s):", config.jwt.access_token_expiry_secs);
    for (id, _, username, _) in DEMO_USERS {
        let user_id = UserId::from_uuid(Uuid::parse_str(id)?);
        let token = jwt.generate_access_token(user_id)?;
        println!("  {username}: {token}");
    }

    println!("Seeding complete!");
    Ok(())
}

/// Gives alice a credit card with a 2500.00 limit, once.
async fn seed_credit_card(accounts: &AccountRepository) -> anyhow::Result<()> {
    let alice = UserId::from_uuid(Uuid::parse_str(DEMO_USERS[0].0)?);

    let existing = accounts.list_for_user(alice.into_inner()).await?;
    if existing
        .iter()
        .any(|a| AccountType::from(a.account_type) == AccountType::Credit)
    {
        println!("  alice already has a credit card, skipping...");
        return Ok(());
    }

    let card = Account::open(alice, AccountType::Credit, Money::ZERO)
        .with_credit_limit(Money::from_cents(2_500_00));
    accounts.insert(&card).await?;
    println!("  Opened credit card {} for alice", card.account_number);
    Ok(())
}
