//! Data Transfer Objects for account and billing endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::UserAccount;
use crate::ports::CheckoutSession;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a checkout for a paid plan.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// `pro_individual`, `pro_agency` or `custom`.
    pub plan: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_status: String,
    pub credits_remaining: u32,
    pub max_generations: u32,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<UserAccount> for ProfileResponse {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.profile.email,
            first_name: account.profile.first_name,
            last_name: account.profile.last_name,
            display_name: account.profile.display_name,
            avatar_url: account.profile.avatar_url,
            subscription_status: account.subscription_status.as_str().to_string(),
            credits_remaining: account.credits_remaining,
            max_generations: account.max_generations,
            last_login_at: account.last_login_at.map(|t| t.to_rfc3339()),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            session_id: session.id,
            url: session.url,
        }
    }
}
