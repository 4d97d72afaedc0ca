//! Ledger service: the single entry point the API layer talks to.
//!
//! Wires the Transfer Engine, Statement Reader and Recipient Resolver to one
//! injected [`LedgerStore`] and adds default-account provisioning.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use ledgerline_shared::LedgerConfig;
use ledgerline_shared::types::{AccountId, Money, PageRequest, PageResponse, UserId};

use super::account::{Account, DefaultAccounts};
use super::engine::{CashRequest, PeerTransferRequest, Receipt, TransferEngine, TransferRequest};
use super::error::{LedgerError, LedgerResult};
use super::recipient::{Recipient, RecipientResolver};
use super::statement::{StatementLine, StatementReader};
use super::store::LedgerStore;
use super::validation::{validate_amount, validate_description, validate_idempotency_key};

/// Person-to-person payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Debited account, owned by the requester.
    pub source_account_id: AccountId,
    /// Recipient email or username.
    pub recipient: String,
    /// Amount; rounded to cents.
    pub amount: Decimal,
    /// Optional free text.
    pub description: Option<String>,
    /// Optional client idempotency key.
    pub idempotency_key: Option<String>,
}

/// Facade over the ledger components.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    defaults: DefaultAccounts,
    max_description_len: usize,
    engine: TransferEngine,
    statements: StatementReader,
    recipients: RecipientResolver,
}

impl LedgerService {
    /// Builds the service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            defaults: DefaultAccounts {
                checking_balance: Money::from_decimal(config.default_checking_balance),
                savings_balance: Money::from_decimal(config.default_savings_balance),
            },
            max_description_len: config.max_description_len,
            engine: TransferEngine::new(Arc::clone(&store), config.max_description_len),
            statements: StatementReader::new(
                Arc::clone(&store),
                config.default_page_size,
                config.max_page_size,
            ),
            recipients: RecipientResolver::new(Arc::clone(&store)),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Lists the user's accounts, provisioning the default set on first use.
    pub async fn list_accounts(&self, user_id: UserId) -> LedgerResult<Vec<Account>> {
        let accounts = self.store.accounts_for_user(user_id).await?;
        if !accounts.is_empty() {
            return Ok(accounts);
        }

        let accounts = self.store.provision_accounts(user_id, &self.defaults).await?;
        info!(user_id = %user_id, count = accounts.len(), "Default accounts ready");
        Ok(accounts)
    }

    /// Own-account transfer.
    pub async fn transfer(&self, user_id: UserId, request: TransferRequest) -> LedgerResult<Receipt> {
        self.engine.transfer(user_id, request).await
    }

    /// Person-to-person payment to the recipient's receiving account.
    pub async fn send_payment(&self, user_id: UserId, request: PaymentRequest) -> LedgerResult<Receipt> {
        validate_amount(request.amount)?;
        validate_description(request.description.as_deref(), self.max_description_len)?;
        validate_idempotency_key(request.idempotency_key.as_deref())?;

        // source ownership is settled before any recipient lookup
        match self.store.get_account(request.source_account_id).await? {
            Some(source) if source.is_owned_by(user_id) => {}
            _ => return Err(LedgerError::InvalidAccountAccess(request.source_account_id)),
        }

        let recipient = self.recipients.resolve(&request.recipient).await?;
        if recipient.user_id == user_id {
            return Err(LedgerError::InvalidRecipient(
                "cannot send a payment to yourself".to_string(),
            ));
        }

        self.engine
            .peer_transfer(
                user_id,
                PeerTransferRequest {
                    source_account_id: request.source_account_id,
                    destination_account_id: recipient.account.id,
                    recipient_user_id: recipient.user_id,
                    amount: request.amount,
                    description: request.description,
                    idempotency_key: request.idempotency_key,
                },
            )
            .await
    }

    /// External deposit into an owned account.
    pub async fn deposit(&self, user_id: UserId, request: CashRequest) -> LedgerResult<Receipt> {
        self.engine.deposit(user_id, request).await
    }

    /// External withdrawal from an owned account.
    pub async fn withdraw(&self, user_id: UserId, request: CashRequest) -> LedgerResult<Receipt> {
        self.engine.withdraw(user_id, request).await
    }

    /// One page of the user's statement.
    pub async fn statement(
        &self,
        user_id: UserId,
        page: PageRequest,
        before: Option<&str>,
    ) -> LedgerResult<PageResponse<StatementLine>> {
        self.statements.statement(user_id, page, before).await
    }

    /// Resolves a payment recipient.
    pub async fn resolve_recipient(&self, identifier: &str) -> LedgerResult<Recipient> {
        self.recipients.resolve(identifier).await
    }

    /// Checks the store is reachable.
    pub async fn health(&self) -> LedgerResult<()> {
        self.store.ping().await
    }
}
