//! Property-based tests for the Transfer Engine.
//!
//! - Conservation: balances change only by deposits and withdrawals
//! - Balance floor: checking/savings never negative, credit never past its limit
//! - Atomicity: a rejected operation leaves balances and journal untouched

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use ledgerline_shared::types::{AccountId, Money, UserId};

use super::account::{Account, AccountType};
use super::engine::{CashRequest, TransferEngine, TransferRequest};
use super::memory::MemoryLedgerStore;
use super::transaction::TransactionKind;

const CREDIT_LIMIT_CENTS: i64 = 500_00;

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, cents: i64 },
    Deposit { account: usize, cents: i64 },
    Withdraw { account: usize, cents: i64 },
}

/// Amounts from 0.01 to 3,000.00 so that some operations overdraw.
fn cents() -> impl Strategy<Value = i64> {
    1i64..300_000i64
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..3, 0usize..3, cents()).prop_map(|(from, to, cents)| Op::Transfer { from, to, cents }),
        1 => (0usize..3, cents()).prop_map(|(account, cents)| Op::Deposit { account, cents }),
        1 => (0usize..3, cents()).prop_map(|(account, cents)| Op::Withdraw { account, cents }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded(user: UserId) -> (MemoryLedgerStore, Vec<Account>) {
    let store = MemoryLedgerStore::new();
    let accounts = vec![
        Account::open(user, AccountType::Checking, Money::from_cents(1_000_00)),
        Account::open(user, AccountType::Savings, Money::from_cents(5_000_00)),
        Account::open(user, AccountType::Credit, Money::ZERO)
            .with_credit_limit(Money::from_cents(CREDIT_LIMIT_CENTS)),
    ];
    for account in &accounts {
        store.insert_account(account.clone()).await;
    }
    (store, accounts)
}

fn total(accounts: &[Account]) -> Money {
    accounts.iter().map(|a| a.balance).sum()
}

fn assert_floor(accounts: &[Account]) -> Result<(), TestCaseError> {
    for account in accounts {
        let floor = if account.account_type.is_credit() {
            -account.credit_limit
        } else {
            Money::ZERO
        };
        prop_assert!(account.balance >= floor, "{account:?} below floor");
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Σ balances − Σ deposits + Σ withdrawals never changes, no balance
    /// breaks its floor, and failed operations change nothing.
    #[test]
    fn prop_conservation_and_floor(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let user = UserId::new();
            let (store, accounts) = seeded(user).await;
            let ids: Vec<AccountId> = accounts.iter().map(|a| a.id).collect();
            let engine = TransferEngine::new(Arc::new(store.clone()), 255);
            let initial = total(&accounts);

            for op in ops {
                let before = store.all_accounts().await;
                let journal_len = store.journal_entries().await.len();
                let cash = |account: usize, cents: i64| CashRequest {
                    account_id: ids[account],
                    amount: Decimal::new(cents, 2),
                    description: None,
                    idempotency_key: None,
                };
                let result = match op {
                    Op::Transfer { from, to, cents } => engine.transfer(user, TransferRequest {
                        source_account_id: ids[from],
                        destination_account_id: ids[to],
                        amount: Decimal::new(cents, 2),
                        description: None,
                        idempotency_key: None,
                    }).await,
                    Op::Deposit { account, cents } => engine.deposit(user, cash(account, cents)).await,
                    Op::Withdraw { account, cents } => engine.withdraw(user, cash(account, cents)).await,
                };

                let after = store.all_accounts().await;
                if result.is_err() {
                    prop_assert_eq!(&before, &after);
                    prop_assert_eq!(store.journal_entries().await.len(), journal_len);
                }
                assert_floor(&after)?;
            }

            let journal = store.journal_entries().await;
            let deposits: Money = journal.iter()
                .filter(|t| t.kind == TransactionKind::Deposit)
                .map(|t| t.amount)
                .sum();
            let withdrawals: Money = journal.iter()
                .filter(|t| t.kind == TransactionKind::Withdrawal)
                .map(|t| t.amount)
                .sum();
            let final_accounts = store.all_accounts().await;
            prop_assert_eq!(total(&final_accounts) - deposits + withdrawals, initial);
            Ok(())
        })?;
    }

    /// Concurrent transfers out of one checking account never overdraw it,
    /// and every committed transfer is reflected exactly once.
    #[test]
    fn prop_concurrent_transfers_never_overdraw(amounts in prop::collection::vec(1i64..60_000i64, 2..16)) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let user = UserId::new();
            let (store, accounts) = seeded(user).await;
            let (checking, savings) = (accounts[0].id, accounts[1].id);
            let engine = TransferEngine::new(Arc::new(store.clone()), 255);

            let handles: Vec<_> = amounts
                .iter()
                .map(|&cents| {
                    let engine = engine.clone();
                    tokio::spawn(async move {
                        engine.transfer(user, TransferRequest {
                            source_account_id: checking,
                            destination_account_id: savings,
                            amount: Decimal::new(cents, 2),
                            description: None,
                            idempotency_key: None,
                        }).await
                    })
                })
                .collect();

            let mut moved = Money::ZERO;
            for handle in handles {
                if let Ok(receipt) = handle.await.unwrap() {
                    moved = moved + receipt.transaction.amount;
                }
            }

            let final_accounts = store.all_accounts().await;
            assert_floor(&final_accounts)?;
            let checking_after = final_accounts.iter().find(|a| a.id == checking).unwrap();
            prop_assert_eq!(checking_after.balance, Money::from_cents(1_000_00) - moved);
            prop_assert_eq!(total(&final_accounts), total(&accounts));
            Ok(())
        })?;
    }
}
