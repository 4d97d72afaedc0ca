//! Recipient Resolver: finds the user and receiving account behind an
//! email address or username.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ledgerline_shared::types::UserId;

use super::account::{AccountSummary, AccountType};
use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerStore, RecipientLookup};
use super::validation::validate_recipient_identifier;

/// A resolved payment counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Recipient user ID.
    pub user_id: UserId,
    /// Name shown to the sender.
    pub display_name: String,
    /// Account that receives payments.
    pub account: AccountSummary,
}

/// Resolves recipients without mutating anything.
#[derive(Clone)]
pub struct RecipientResolver {
    store: Arc<dyn LedgerStore>,
}

impl RecipientResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Resolves `identifier` (an email when it contains `@`, else a username).
    ///
    /// The receiving account is the user's earliest-created checking account.
    pub async fn resolve(&self, identifier: &str) -> LedgerResult<Recipient> {
        let identifier = validate_recipient_identifier(identifier)?;
        let lookup = RecipientLookup::parse(identifier);

        let Some(user) = self.store.find_user(&lookup).await? else {
            debug!(?lookup, "No user matched recipient lookup");
            return Err(LedgerError::RecipientNotFound);
        };

        let accounts = self.store.accounts_for_user(user.id).await?;
        let Some(account) = accounts
            .iter()
            .find(|a| a.account_type == AccountType::Checking)
        else {
            debug!(user_id = %user.id, "Recipient has no checking account");
            return Err(LedgerError::RecipientNotFound);
        };

        Ok(Recipient {
            user_id: user.id,
            display_name: user.display_name,
            account: account.summary(),
        })
    }
}
