use super::money::Amount;
use super::status::PaymentStatus;
use super::{AdminId, PaymentId, RegistrationId};
use crate::error::RaceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
}

impl FromStr for PaymentMethod {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bank_transfer" | "bank-transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(RaceError::ValidationError(format!(
                "Unsupported payment method: {}",
                other
            ))),
        }
    }
}

/// The financial record tied one-to-one to a registration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub registration_id: RegistrationId,
    /// Fixed at creation from the price table.
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<DateTime<Utc>>,
    pub receipt_image: Option<String>,
    pub verification_note: Option<String>,
    pub status: PaymentStatus,
    /// Bumped by every committed transition.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a payment; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub registration_id: RegistrationId,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn into_payment(self, id: PaymentId) -> Payment {
        Payment {
            id,
            registration_id: self.registration_id,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_date: None,
            receipt_image: None,
            verification_note: None,
            status: PaymentStatus::Pending,
            version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Audit stamp written onto the acting admin by a verification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdminAudit {
    pub admin_id: AdminId,
    pub at: DateTime<Utc>,
}

/// The payment a transition applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTarget {
    /// A stored payment as the caller read it. The ledger refuses the write if
    /// the row's status or version moved since.
    Existing {
        payment_id: PaymentId,
        status: PaymentStatus,
        version: u64,
    },
    /// A payment inserted by the same commit that applies the transition.
    Create(NewPayment),
}

impl TransitionTarget {
    pub fn observed(payment: &Payment) -> Self {
        TransitionTarget::Existing {
            payment_id: payment.id,
            status: payment.status,
            version: payment.version,
        }
    }
}

/// A status change for one payment, applied together with the registration
/// mirror and, for admin actions, the audit stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransition {
    pub target: TransitionTarget,
    pub next: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub verification_note: Option<String>,
    /// `Some` replaces the stored receipt path; `None` keeps it.
    pub receipt_image: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub audit: Option<AdminAudit>,
    pub at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn apply_to(&self, payment: &mut Payment) {
        payment.status = self.next;
        payment.payment_date = self.payment_date;
        payment.verification_note = self.verification_note.clone();
        if let Some(path) = &self.receipt_image {
            payment.receipt_image = Some(path.clone());
        }
        if let Some(method) = self.payment_method {
            payment.payment_method = method;
        }
        payment.version += 1;
        payment.updated_at = self.at;
    }
}
