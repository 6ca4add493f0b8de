use super::admin::AdminUser;
use super::payment::{NewPayment, Payment, StatusTransition};
use super::registration::{Registration, RegistrationDetails, ShippingStatus};
use super::{AdminId, PaymentId, RegistrationId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Registrations keyed by id, with email as a unique secondary key.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Fails with `DuplicateEmail` if the email is taken.
    async fn insert(&self, details: RegistrationDetails, now: DateTime<Utc>)
    -> Result<Registration>;
    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>>;
    /// Replaces the editable fields. Never touches `payment_status`.
    async fn update(
        &self,
        id: RegistrationId,
        details: RegistrationDetails,
        now: DateTime<Utc>,
    ) -> Result<Registration>;
    async fn find_by_email(&self, email: &str) -> Result<Vec<Registration>>;
    async fn get_all(&self) -> Result<Vec<Registration>>;
    async fn set_shipping_status(
        &self,
        id: RegistrationId,
        status: ShippingStatus,
        now: DateTime<Utc>,
    ) -> Result<Registration>;
}

/// Payments keyed by id, unique per registration.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Fails with `PaymentAlreadyExists` if the registration already has one.
    async fn insert(&self, payment: NewPayment) -> Result<Payment>;
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn get_by_registration(&self, registration_id: RegistrationId)
    -> Result<Option<Payment>>;
    async fn get_all(&self) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn insert(&self, username: &str, now: DateTime<Utc>) -> Result<AdminUser>;
    async fn get(&self, id: AdminId) -> Result<Option<AdminUser>>;
}

/// The only write path for payment status.
///
/// A commit updates the payment, mirrors the status onto its registration and
/// stamps the admin audit fields as one unit. Implementations must serialize
/// commits for the same payment and fail with `StaleStatus` when the stored
/// row no longer matches the status and version the caller read.
///
/// A `TransitionTarget::Create` commit inserts the payment in the same unit
/// and fails with `PaymentAlreadyExists` if the registration already has one.
#[async_trait]
pub trait StatusLedger: Send + Sync {
    async fn commit(&self, transition: StatusTransition) -> Result<(Payment, Registration)>;
}

/// Blob storage for receipt images.
#[async_trait]
pub trait ReceiptStorage: Send + Sync {
    /// Stores `bytes` under `name` and returns the path to record.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
}

pub type RegistrationStoreBox = Box<dyn RegistrationStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type AdminStoreBox = Box<dyn AdminStore>;
pub type StatusLedgerBox = Box<dyn StatusLedger>;
pub type ReceiptStorageBox = Box<dyn ReceiptStorage>;

/// The four record ports, usually backed by one database.
pub struct Stores {
    pub registrations: RegistrationStoreBox,
    pub payments: PaymentStoreBox,
    pub admins: AdminStoreBox,
    pub ledger: StatusLedgerBox,
}

impl Stores {
    /// Shares one backend across every port.
    pub fn from_backend<S>(backend: S) -> Self
    where
        S: RegistrationStore + PaymentStore + AdminStore + StatusLedger + Clone + 'static,
    {
        Self {
            registrations: Box::new(backend.clone()),
            payments: Box::new(backend.clone()),
            admins: Box::new(backend.clone()),
            ledger: Box::new(backend),
        }
    }
}
