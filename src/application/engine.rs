use crate::domain::AdminId;
use crate::domain::admin::AdminUser;
use crate::domain::money::PriceTable;
use crate::domain::ports::{
    AdminStoreBox, PaymentStoreBox, ReceiptStorageBox, RegistrationStoreBox, StatusLedgerBox,
    Stores,
};
use crate::error::{RaceError, Result};
use crate::infrastructure::in_memory::{InMemoryReceiptStorage, InMemoryStore};
use chrono::Utc;
use tracing::info;

/// Receipts larger than this are refused: 5 MiB.
pub const DEFAULT_MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;

/// The main entry point for the registration and payment lifecycle.
///
/// `RaceDesk` owns the storage backends and exposes the lifecycle operations:
/// registering, pricing a payment, ingesting receipts, verifying payments and
/// the read-side projections built on top of them. Every status change goes
/// through the `StatusLedger`, which keeps the registration mirror in step.
pub struct RaceDesk {
    pub(crate) registrations: RegistrationStoreBox,
    pub(crate) payments: PaymentStoreBox,
    pub(crate) admins: AdminStoreBox,
    pub(crate) ledger: StatusLedgerBox,
    pub(crate) receipts: ReceiptStorageBox,
    pub(crate) prices: PriceTable,
    pub(crate) max_receipt_bytes: usize,
}

impl RaceDesk {
    /// Creates a new `RaceDesk` instance.
    ///
    /// # Arguments
    ///
    /// * `stores` - The record stores, usually sharing one backend.
    /// * `receipts` - Blob storage for uploaded receipt images.
    pub fn new(stores: Stores, receipts: ReceiptStorageBox) -> Self {
        Self {
            registrations: stores.registrations,
            payments: stores.payments,
            admins: stores.admins,
            ledger: stores.ledger,
            receipts,
            prices: PriceTable::standard(),
            max_receipt_bytes: DEFAULT_MAX_RECEIPT_BYTES,
        }
    }

    /// An engine backed entirely by memory.
    pub fn in_memory() -> Self {
        Self::new(
            Stores::from_backend(InMemoryStore::new()),
            Box::new(InMemoryReceiptStorage::new()),
        )
    }

    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_max_receipt_bytes(mut self, limit: usize) -> Self {
        self.max_receipt_bytes = limit;
        self
    }

    /// Registers an admin so verifications have an audit target.
    pub async fn create_admin(&self, username: &str) -> Result<AdminUser> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RaceError::ValidationError(
                "username is required".to_string(),
            ));
        }
        let admin = self.admins.insert(username, Utc::now()).await?;
        info!(admin_id = admin.id, username = %admin.username, "admin created");
        Ok(admin)
    }

    pub async fn admin(&self, id: AdminId) -> Result<Option<AdminUser>> {
        self.admins.get(id).await
    }
}
