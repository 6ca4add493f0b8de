use super::{AdminId, PaymentId};
use crate::error::RaceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An administrator as far as the lifecycle cares: an id to authorize and
/// audit against. Credentials live with the session provider.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AdminUser {
    pub id: AdminId,
    pub username: String,
    pub last_verified_at: Option<DateTime<Utc>>,
    /// Lookup only; nothing cascades from it.
    pub last_verified_payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn new(id: AdminId, username: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            last_verified_at: None,
            last_verified_payment_id: None,
            created_at: now,
        }
    }
}

/// What the session provider reports for an inbound call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdminSession {
    pub authenticated: bool,
    pub admin_id: String,
}

impl AdminSession {
    pub fn authenticated(admin_id: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            admin_id: admin_id.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolves the session to an admin id, or fails with `Unauthorized`.
    pub fn require_admin(&self) -> Result<AdminId, RaceError> {
        if !self.authenticated {
            return Err(RaceError::Unauthorized(
                "an admin session is required".to_string(),
            ));
        }
        self.admin_id.trim().parse().map_err(|_| {
            RaceError::Unauthorized(format!("invalid admin id: {}", self.admin_id))
        })
    }
}
