//! Read-side projections returned by the engine.

use crate::domain::money::Amount;
use crate::domain::payment::Payment;
use crate::domain::registration::{EventType, Registration, ShippingAddress, ShippingStatus};
use crate::domain::status::PaymentStatus;
use crate::domain::{PaymentId, RegistrationId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RegistrationWithPayment {
    #[serde(flatten)]
    pub registration: Registration,
    pub payment: Option<Payment>,
}

/// The payment fields a registrant sees when checking their status.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentSnapshot {
    pub amount: Amount,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub verification_note: Option<String>,
}

impl From<&Payment> for PaymentSnapshot {
    fn from(payment: &Payment) -> Self {
        Self {
            amount: payment.amount,
            status: payment.status,
            payment_date: payment.payment_date,
            verification_note: payment.verification_note.clone(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct StatusReport {
    pub registration_id: RegistrationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
    pub payment: Option<PaymentSnapshot>,
}

/// What a registrant still has to transfer.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentQuote {
    pub registration_id: RegistrationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub event_type: EventType,
    pub amount: Amount,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct ReviewItem {
    #[serde(flatten)]
    pub payment: Payment,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub event_type: EventType,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct ReceiptSummary {
    pub payment_id: PaymentId,
    pub registration_id: RegistrationId,
    pub receipt_image: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct ShippingEntry {
    pub registration_id: RegistrationId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub event_type: EventType,
    pub shirt_size: String,
    pub address: ShippingAddress,
    pub shipping_status: ShippingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct StatusCounts {
    pub completed: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: PaymentStatus) {
        match status {
            PaymentStatus::Completed => self.completed += 1,
            PaymentStatus::Rejected => self.rejected += 1,
            PaymentStatus::Pending | PaymentStatus::PendingReview => self.pending += 1,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct RegistrationSummary {
    pub total: usize,
    #[serde(flatten)]
    pub overall: StatusCounts,
    pub by_event: BTreeMap<EventType, StatusCounts>,
}
