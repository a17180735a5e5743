//! GetProfileHandler - the caller's account, created on first sight.

use std::sync::Arc;

use crate::application::services::CreditLedgerEngine;
use crate::domain::billing::{LedgerError, ProfileDetails, UserAccount};
use crate::domain::foundation::UserId;

#[derive(Debug, Clone)]
pub struct GetProfileQuery {
    pub user_id: UserId,
    /// Profile hints from the session token, used only when creating.
    pub profile: ProfileDetails,
}

pub struct GetProfileHandler {
    ledger: Arc<CreditLedgerEngine>,
}

impl GetProfileHandler {
    pub fn new(ledger: Arc<CreditLedgerEngine>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetProfileQuery) -> Result<UserAccount, LedgerError> {
        self.ledger.ensure_account(&query.user_id, query.profile).await
    }
}
