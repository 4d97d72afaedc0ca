//! Transfer Engine: validates and executes money movements.
//!
//! Every operation follows the same sequence:
//! 1. Validate the request without touching the store
//! 2. Short-circuit on a repeated idempotency key
//! 3. Open a unit of work and lock the participating accounts (ascending id)
//! 4. Check ownership of the source, then the destination, then sufficiency
//! 5. Debit, credit, append one `completed` journal entry, commit
//!
//! Any failure after step 3 rolls the unit of work back.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use ledgerline_shared::types::{AccountId, Money, TransactionId, UserId};

use super::error::{ErrorCategory, LedgerError, LedgerResult};
use super::store::{LedgerStore, LedgerUnitOfWork, owned_account};
use super::transaction::{Transaction, TransactionKind};
use super::validation::{
    validate_amount, validate_description, validate_distinct_accounts, validate_idempotency_key,
};

/// Own-account transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Debited account, owned by the requester.
    pub source_account_id: AccountId,
    /// Credited account, owned by the requester.
    pub destination_account_id: AccountId,
    /// Amount; rounded to cents.
    pub amount: Decimal,
    /// Optional free text.
    pub description: Option<String>,
    /// Optional client idempotency key.
    pub idempotency_key: Option<String>,
}

/// Transfer to an account owned by another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTransferRequest {
    /// Debited account, owned by the requester.
    pub source_account_id: AccountId,
    /// Recipient's receiving account.
    pub destination_account_id: AccountId,
    /// Expected owner of the destination.
    pub recipient_user_id: UserId,
    /// Amount; rounded to cents.
    pub amount: Decimal,
    /// Optional free text.
    pub description: Option<String>,
    /// Optional client idempotency key.
    pub idempotency_key: Option<String>,
}

/// Deposit into or withdrawal from a single owned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashRequest {
    /// Target account, owned by the requester.
    pub account_id: AccountId,
    /// Amount; rounded to cents.
    pub amount: Decimal,
    /// Optional free text.
    pub description: Option<String>,
    /// Optional client idempotency key.
    pub idempotency_key: Option<String>,
}

/// Outcome of a successful engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The committed (or previously committed) journal entry.
    pub transaction: Transaction,
    /// True when an earlier request with the same idempotency key is returned.
    pub replayed: bool,
}

impl Receipt {
    /// Id of the journal entry.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction.id
    }
}

/// A validated movement ready to run.
#[derive(Debug)]
struct Movement {
    kind: TransactionKind,
    source: Option<AccountId>,
    destination: Option<AccountId>,
    destination_owner: UserId,
    amount: Money,
    description: Option<String>,
    idempotency_key: Option<String>,
}

/// Executes money movements against a [`LedgerStore`].
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    max_description_len: usize,
}

impl TransferEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, max_description_len: usize) -> Self {
        Self {
            store,
            max_description_len,
        }
    }

    /// Moves money between two accounts owned by `user_id`.
    pub async fn transfer(&self, user_id: UserId, request: TransferRequest) -> LedgerResult<Receipt> {
        let kind = TransactionKind::Transfer;
        let movement = self
            .validate(
                kind,
                Some(request.source_account_id),
                Some(request.destination_account_id),
                user_id,
                request.amount,
                request.description.as_deref(),
                request.idempotency_key.as_deref(),
            )
            .inspect_err(|err| log_failure(kind, user_id, err))?;
        self.run(user_id, movement).await
    }

    /// Moves money from an account owned by `user_id` to another user's account.
    pub async fn peer_transfer(
        &self,
        user_id: UserId,
        request: PeerTransferRequest,
    ) -> LedgerResult<Receipt> {
        let kind = TransactionKind::Payment;
        let movement = self
            .validate(
                kind,
                Some(request.source_account_id),
                Some(request.destination_account_id),
                request.recipient_user_id,
                request.amount,
                request.description.as_deref(),
                request.idempotency_key.as_deref(),
            )
            .inspect_err(|err| log_failure(kind, user_id, err))?;
        self.run(user_id, movement).await
    }

    /// Credits external money to an account owned by `user_id`.
    pub async fn deposit(&self, user_id: UserId, request: CashRequest) -> LedgerResult<Receipt> {
        let kind = TransactionKind::Deposit;
        let movement = self
            .validate(
                kind,
                None,
                Some(request.account_id),
                user_id,
                request.amount,
                request.description.as_deref(),
                request.idempotency_key.as_deref(),
            )
            .inspect_err(|err| log_failure(kind, user_id, err))?;
        self.run(user_id, movement).await
    }

    /// Debits an account owned by `user_id` to the outside.
    pub async fn withdraw(&self, user_id: UserId, request: CashRequest) -> LedgerResult<Receipt> {
        let kind = TransactionKind::Withdrawal;
        let movement = self
            .validate(
                kind,
                Some(request.account_id),
                None,
                user_id,
                request.amount,
                request.description.as_deref(),
                request.idempotency_key.as_deref(),
            )
            .inspect_err(|err| log_failure(kind, user_id, err))?;
        self.run(user_id, movement).await
    }

    #[allow(clippy::too_many_arguments)]
    fn validate(
        &self,
        kind: TransactionKind,
        source: Option<AccountId>,
        destination: Option<AccountId>,
        destination_owner: UserId,
        amount: Decimal,
        description: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> LedgerResult<Movement> {
        let amount = validate_amount(amount)?;
        let description = validate_description(description, self.max_description_len)?;
        if let (Some(source), Some(destination)) = (source, destination) {
            validate_distinct_accounts(source, destination)?;
        }
        let idempotency_key = validate_idempotency_key(idempotency_key)?;

        Ok(Movement {
            kind,
            source,
            destination,
            destination_owner,
            amount,
            description,
            idempotency_key,
        })
    }

    async fn run(&self, user_id: UserId, movement: Movement) -> LedgerResult<Receipt> {
        let kind = movement.kind;
        let result = self.execute(user_id, &movement).await;
        match &result {
            Ok(receipt) => {
                info!(
                    transaction_id = %receipt.transaction.id,
                    user_id = %user_id,
                    kind = %kind,
                    amount = %receipt.transaction.amount,
                    replayed = receipt.replayed,
                    "Ledger operation completed"
                );
            }
            Err(err) => log_failure(kind, user_id, err),
        }
        result
    }

    async fn execute(&self, user_id: UserId, movement: &Movement) -> LedgerResult<Receipt> {
        if let Some(key) = &movement.idempotency_key
            && let Some(existing) = self.store.find_by_idempotency_key(user_id, key).await?
        {
            return replay(existing, movement, key);
        }

        let mut uow = self.store.begin().await?;
        let transaction = match apply(uow.as_mut(), user_id, movement).await {
            Ok(transaction) => transaction,
            Err(err) => {
                rollback(uow).await;
                return self.settle_duplicate(user_id, movement, err).await;
            }
        };

        match uow.commit().await {
            Ok(()) => Ok(Receipt {
                transaction,
                replayed: false,
            }),
            Err(err) => self.settle_duplicate(user_id, movement, err).await,
        }
    }

    /// A concurrent request with the same key committed first: return its
    /// result (or a conflict). Every other error passes through.
    async fn settle_duplicate(
        &self,
        user_id: UserId,
        movement: &Movement,
        err: LedgerError,
    ) -> LedgerResult<Receipt> {
        let LedgerError::DuplicateIdempotencyKey(key) = err else {
            return Err(err);
        };
        match self.store.find_by_idempotency_key(user_id, &key).await? {
            Some(existing) => replay(existing, movement, &key),
            None => Err(LedgerError::Storage(format!(
                "idempotency key '{key}' reported as duplicate but not found"
            ))),
        }
    }
}

async fn apply(
    uow: &mut dyn LedgerUnitOfWork,
    user_id: UserId,
    movement: &Movement,
) -> LedgerResult<Transaction> {
    let ids: Vec<AccountId> = movement.source.into_iter().chain(movement.destination).collect();
    let locked = uow.lock_accounts(&ids).await?;

    // 1. Source exists and belongs to the requester
    let source = movement
        .source
        .map(|id| owned_account(&locked, id, user_id))
        .transpose()?;

    // 2. Destination exists and belongs to the expected owner
    if let Some(id) = movement.destination {
        owned_account(&locked, id, movement.destination_owner)?;
    }

    // 3. Source covers the amount
    if let Some(source) = source {
        source.ensure_can_debit(movement.amount)?;
    }

    if let Some(id) = movement.source {
        uow.adjust_balance(id, -movement.amount).await?;
    }
    if let Some(id) = movement.destination {
        uow.adjust_balance(id, movement.amount).await?;
    }

    let transaction = Transaction::completed(
        movement.kind,
        movement.source,
        movement.destination,
        movement.amount,
        user_id,
    )
    .with_description(movement.description.clone())
    .with_idempotency_key(movement.idempotency_key.clone());

    uow.append(&transaction).await?;
    Ok(transaction)
}

fn replay(existing: Transaction, movement: &Movement, key: &str) -> LedgerResult<Receipt> {
    if existing.matches_request(
        movement.kind,
        movement.source,
        movement.destination,
        movement.amount,
    ) {
        Ok(Receipt {
            transaction: existing,
            replayed: true,
        })
    } else {
        Err(LedgerError::IdempotencyConflict(key.to_string()))
    }
}

async fn rollback(uow: Box<dyn LedgerUnitOfWork>) {
    if let Err(e) = uow.rollback().await {
        error!(error = %e, "Failed to roll back ledger unit of work");
    }
}

fn log_failure(kind: TransactionKind, user_id: UserId, err: &LedgerError) {
    match err.category() {
        ErrorCategory::Storage => {
            error!(user_id = %user_id, kind = %kind, error = %err, "Ledger operation failed");
        }
        _ => {
            warn!(user_id = %user_id, kind = %kind, code = err.error_code(), error = %err, "Ledger operation rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::{Account, AccountType, DefaultAccounts};
    use crate::ledger::memory::{Fault, MemoryLedgerStore};
    use crate::ledger::store::LedgerStore as _;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: MemoryLedgerStore,
        engine: TransferEngine,
        user: UserId,
        checking: AccountId,
        savings: AccountId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryLedgerStore::new();
        let user = UserId::new();
        let accounts = store
            .provision_accounts(user, &DefaultAccounts::default())
            .await
            .unwrap();
        let engine = TransferEngine::new(Arc::new(store.clone()), 255);
        Fixture {
            store,
            engine,
            user,
            checking: accounts[0].id,
            savings: accounts[1].id,
        }
    }

    fn transfer(source: AccountId, destination: AccountId, amount: Decimal) -> TransferRequest {
        TransferRequest {
            source_account_id: source,
            destination_account_id: destination,
            amount,
            description: None,
            idempotency_key: None,
        }
    }

    async fn balance(store: &MemoryLedgerStore, id: AccountId) -> Money {
        store.get_account(id).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn test_transfer_moves_money_and_records_entry() {
        let f = fixture().await;
        let mut request = transfer(f.checking, f.savings, dec!(250.00));
        request.description = Some("move".into());

        let receipt = f.engine.transfer(f.user, request).await.unwrap();

        assert!(!receipt.replayed);
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(750_00));
        assert_eq!(balance(&f.store, f.savings).await, Money::from_cents(5_250_00));
        let journal = f.store.journal_entries().await;
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].id, receipt.transaction_id());
        assert_eq!(journal[0].kind, TransactionKind::Transfer);
        assert_eq!(journal[0].description.as_deref(), Some("move"));
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let f = fixture().await;
        f.engine
            .transfer(f.user, transfer(f.checking, f.savings, dec!(250.00)))
            .await
            .unwrap();

        let err = f
            .engine
            .transfer(f.user, transfer(f.checking, f.savings, dec!(1000.00)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { available, requested, .. }
                if available == Money::from_cents(750_00) && requested == Money::from_cents(1_000_00)
        ));
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(750_00));
        assert_eq!(balance(&f.store, f.savings).await, Money::from_cents(5_250_00));
        assert_eq!(f.store.journal_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_precedes_store_access() {
        let f = fixture().await;
        f.store.close().await.unwrap();

        let err = f
            .engine
            .transfer(f.user, transfer(f.checking, f.checking, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SameAccount));

        let err = f
            .engine
            .transfer(f.user, transfer(f.checking, f.savings, dec!(0.004)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ZeroAmount));
    }

    #[tokio::test]
    async fn test_foreign_or_missing_source_is_invalid_access() {
        let f = fixture().await;
        let stranger = UserId::new();

        let err = f
            .engine
            .transfer(stranger, transfer(f.checking, f.savings, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountAccess(id) if id == f.checking));

        let missing = AccountId::new();
        let err = f
            .engine
            .transfer(f.user, transfer(missing, f.savings, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountAccess(id) if id == missing));
    }

    #[tokio::test]
    async fn test_source_checked_before_destination() {
        let f = fixture().await;
        let foreign = Account::open(UserId::new(), AccountType::Checking, Money::ZERO);
        f.store.insert_account(foreign.clone()).await;

        // unowned source and unowned destination: source reported
        let err = f
            .engine
            .transfer(f.user, transfer(foreign.id, AccountId::new(), dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountAccess(id) if id == foreign.id));

        // own-account transfer to someone else's account is rejected
        let err = f
            .engine
            .transfer(f.user, transfer(f.checking, foreign.id, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountAccess(id) if id == foreign.id));
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(1_000_00));
    }

    #[tokio::test]
    async fn test_peer_transfer_requires_recipient_ownership() {
        let f = fixture().await;
        let recipient = UserId::new();
        let theirs = Account::open(recipient, AccountType::Checking, Money::ZERO);
        f.store.insert_account(theirs.clone()).await;

        let request = PeerTransferRequest {
            source_account_id: f.checking,
            destination_account_id: theirs.id,
            recipient_user_id: UserId::new(),
            amount: dec!(10),
            description: None,
            idempotency_key: None,
        };
        let err = f.engine.peer_transfer(f.user, request.clone()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountAccess(_)));

        let receipt = f
            .engine
            .peer_transfer(
                f.user,
                PeerTransferRequest {
                    recipient_user_id: recipient,
                    ..request
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.transaction.kind, TransactionKind::Payment);
        assert_eq!(balance(&f.store, theirs.id).await, Money::from_cents(10_00));
    }

    #[tokio::test]
    async fn test_deposit_and_withdrawal() {
        let f = fixture().await;
        let cash = |amount| CashRequest {
            account_id: f.checking,
            amount,
            description: None,
            idempotency_key: None,
        };

        let deposit = f.engine.deposit(f.user, cash(dec!(50.005))).await.unwrap();
        assert_eq!(deposit.transaction.source_account_id, None);
        assert_eq!(deposit.transaction.amount, Money::from_cents(50_00));
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(1_050_00));

        let withdrawal = f.engine.withdraw(f.user, cash(dec!(1050))).await.unwrap();
        assert_eq!(withdrawal.transaction.destination_account_id, None);
        assert_eq!(balance(&f.store, f.checking).await, Money::ZERO);

        let err = f.engine.withdraw(f.user, cash(dec!(0.01))).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_credit_account_limits() {
        let f = fixture().await;
        let card = Account::open(f.user, AccountType::Credit, Money::ZERO)
            .with_credit_limit(Money::from_cents(300_00));
        f.store.insert_account(card.clone()).await;

        f.engine
            .transfer(f.user, transfer(card.id, f.checking, dec!(300)))
            .await
            .unwrap();
        assert_eq!(balance(&f.store, card.id).await, Money::from_cents(-300_00));

        let err = f
            .engine
            .transfer(f.user, transfer(card.id, f.checking, dec!(0.01)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCredit { .. }));
    }

    #[tokio::test]
    async fn test_amounts_at_column_precision_never_overflow() {
        let f = fixture().await;
        let card = Account::open(f.user, AccountType::Credit, Money::ZERO)
            .with_credit_limit(Money::from_cents(500_00));
        f.store.insert_account(card.clone()).await;
        let cash = |amount| CashRequest {
            account_id: card.id,
            amount,
            description: None,
            idempotency_key: None,
        };

        let err = f
            .engine
            .deposit(f.user, cash(dec!(79228162514264337593543950335)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountTooLarge { .. }));
        assert!(f.store.journal_entries().await.is_empty());

        f.engine
            .deposit(f.user, cash(Money::MAX.amount()))
            .await
            .unwrap();
        assert_eq!(balance(&f.store, card.id).await, Money::MAX);

        f.engine
            .transfer(f.user, transfer(card.id, f.checking, dec!(1.00)))
            .await
            .unwrap();
        assert_eq!(balance(&f.store, card.id).await, Money::MAX - Money::from_cents(1_00));

        let err = f.engine.deposit(f.user, cash(dec!(1.01))).await.unwrap_err();
        assert!(matches!(err, LedgerError::BalanceLimitExceeded(id) if id == card.id));
        assert_eq!(balance(&f.store, card.id).await, Money::MAX - Money::from_cents(1_00));
        assert_eq!(f.store.journal_entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_idempotent_replay_and_conflict() {
        let f = fixture().await;
        let mut request = transfer(f.checking, f.savings, dec!(100));
        request.idempotency_key = Some("order-42".into());

        let first = f.engine.transfer(f.user, request.clone()).await.unwrap();
        let second = f.engine.transfer(f.user, request.clone()).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.transaction_id(), second.transaction_id());
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(900_00));
        assert_eq!(f.store.journal_entries().await.len(), 1);

        request.amount = dec!(101);
        let err = f.engine.transfer(f.user, request).await.unwrap_err();
        assert!(matches!(err, LedgerError::IdempotencyConflict(key) if key == "order-42"));
    }

    #[tokio::test]
    async fn test_concurrent_same_key_moves_money_once() {
        let f = fixture().await;
        let mut request = transfer(f.checking, f.savings, dec!(10));
        request.idempotency_key = Some("dup".into());

        let calls = (0..10).map(|_| f.engine.transfer(f.user, request.clone()));
        let receipts: Vec<Receipt> = futures::future::join_all(calls)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        let first_id = receipts[0].transaction_id();
        assert!(receipts.iter().all(|r| r.transaction_id() == first_id));
        assert_eq!(receipts.iter().filter(|r| !r.replayed).count(), 1);
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(990_00));
    }

    #[tokio::test]
    async fn test_injected_faults_roll_back() {
        let f = fixture().await;
        for fault in [Fault::JournalAppend, Fault::Commit] {
            f.store.inject_fault(fault).await;
            let err = f
                .engine
                .transfer(f.user, transfer(f.checking, f.savings, dec!(5)))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Storage(_)));
            assert!(err.is_retryable());
        }
        assert_eq!(balance(&f.store, f.checking).await, Money::from_cents(1_000_00));
        assert_eq!(balance(&f.store, f.savings).await, Money::from_cents(5_000_00));
        assert!(f.store.journal_entries().await.is_empty());
    }
}
