use crate::domain::admin::AdminUser;
use crate::domain::payment::{NewPayment, Payment, StatusTransition, TransitionTarget};
use crate::domain::ports::{
    AdminStore, PaymentStore, ReceiptStorage, RegistrationStore, StatusLedger,
};
use crate::domain::registration::{Registration, RegistrationDetails, ShippingStatus};
use crate::domain::{AdminId, PaymentId, RegistrationId};
use crate::error::{RaceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    registrations: BTreeMap<RegistrationId, Registration>,
    emails: HashMap<String, RegistrationId>,
    payments: BTreeMap<PaymentId, Payment>,
    payment_by_registration: HashMap<RegistrationId, PaymentId>,
    admins: BTreeMap<AdminId, AdminUser>,
    next_registration_id: RegistrationId,
    next_payment_id: PaymentId,
    next_admin_id: AdminId,
}

fn next_id(counter: &mut u32) -> u32 {
    *counter += 1;
    *counter
}

/// A thread-safe in-memory database holding every table behind one lock.
///
/// A single `RwLock` makes each ledger commit atomic and serializes commits,
/// so concurrent verifications of the same payment cannot interleave.
/// Ideal for tests and one-shot replays where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryStore {
    async fn insert(
        &self,
        details: RegistrationDetails,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let mut tables = self.tables.write().await;
        if tables.emails.contains_key(&details.email) {
            return Err(RaceError::DuplicateEmail(details.email));
        }
        let id = next_id(&mut tables.next_registration_id);
        let registration = Registration::new(id, details, now);
        tables.emails.insert(registration.email().to_string(), id);
        tables.registrations.insert(id, registration.clone());
        Ok(registration)
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables.registrations.get(&id).cloned())
    }

    async fn update(
        &self,
        id: RegistrationId,
        details: RegistrationDetails,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;
        if let Some(owner) = tables.emails.get(&details.email)
            && *owner != id
        {
            return Err(RaceError::DuplicateEmail(details.email));
        }
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(RaceError::RegistrationNotFound(id))?;
        tables.emails.remove(registration.email());
        tables.emails.insert(details.email.clone(), id);
        registration.apply_details(details, now);
        Ok(registration.clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Registration> = tables
            .registrations
            .values()
            .filter(|r| r.email() == email)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(found)
    }

    async fn get_all(&self) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables.registrations.values().cloned().collect())
    }

    async fn set_shipping_status(
        &self,
        id: RegistrationId,
        status: ShippingStatus,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let mut tables = self.tables.write().await;
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(RaceError::RegistrationNotFound(id))?;
        registration.shipping_status = Some(status);
        registration.updated_at = now;
        Ok(registration.clone())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert(&self, payment: NewPayment) -> Result<Payment> {
        let mut tables = self.tables.write().await;
        let registration_id = payment.registration_id;
        if !tables.registrations.contains_key(&registration_id) {
            return Err(RaceError::RegistrationNotFound(registration_id));
        }
        if tables.payment_by_registration.contains_key(&registration_id) {
            return Err(RaceError::PaymentAlreadyExists(registration_id));
        }
        let id = next_id(&mut tables.next_payment_id);
        let payment = payment.into_payment(id);
        tables.payment_by_registration.insert(registration_id, id);
        tables.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).cloned())
    }

    async fn get_by_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payment_by_registration
            .get(&registration_id)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.values().cloned().collect())
    }
}

#[async_trait]
impl AdminStore for InMemoryStore {
    async fn insert(&self, username: &str, now: DateTime<Utc>) -> Result<AdminUser> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_admin_id);
        let admin = AdminUser::new(id, username.to_string(), now);
        tables.admins.insert(id, admin.clone());
        Ok(admin)
    }

    async fn get(&self, id: AdminId) -> Result<Option<AdminUser>> {
        let tables = self.tables.read().await;
        Ok(tables.admins.get(&id).cloned())
    }
}

#[async_trait]
impl StatusLedger for InMemoryStore {
    async fn commit(&self, transition: StatusTransition) -> Result<(Payment, Registration)> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;

        // Stage every row first; nothing is written back until all three resolve.
        let (mut payment, created) = match &transition.target {
            TransitionTarget::Existing {
                payment_id,
                status,
                version,
            } => {
                let payment = tables
                    .payments
                    .get(payment_id)
                    .cloned()
                    .ok_or(RaceError::PaymentNotFound(*payment_id))?;
                if payment.status != *status || payment.version != *version {
                    return Err(RaceError::StaleStatus {
                        payment_id: payment.id,
                        expected: *status,
                        actual: payment.status,
                    });
                }
                (payment, false)
            }
            TransitionTarget::Create(new) => {
                let registration_id = new.registration_id;
                if tables.payment_by_registration.contains_key(&registration_id) {
                    return Err(RaceError::PaymentAlreadyExists(registration_id));
                }
                (new.clone().into_payment(tables.next_payment_id + 1), true)
            }
        };
        let mut registration = match tables.registrations.get(&payment.registration_id) {
            Some(registration) => registration.clone(),
            None if created => {
                return Err(RaceError::RegistrationNotFound(payment.registration_id));
            }
            None => {
                return Err(RaceError::PersistenceFailure(format!(
                    "registration {} for payment {} is missing",
                    payment.registration_id, payment.id
                )));
            }
        };
        let admin = match transition.audit {
            Some(audit) => {
                let mut admin = tables.admins.get(&audit.admin_id).cloned().ok_or_else(|| {
                    RaceError::PersistenceFailure(format!("admin {} not found", audit.admin_id))
                })?;
                admin.last_verified_at = Some(audit.at);
                admin.last_verified_payment_id = Some(payment.id);
                Some(admin)
            }
            None => None,
        };

        transition.apply_to(&mut payment);
        registration.payment_status = payment.status;

        if created {
            tables.next_payment_id = payment.id;
            tables
                .payment_by_registration
                .insert(payment.registration_id, payment.id);
        }
        tables.payments.insert(payment.id, payment.clone());
        tables
            .registrations
            .insert(registration.id, registration.clone());
        if let Some(admin) = admin {
            tables.admins.insert(admin.id, admin);
        }
        Ok((payment, registration))
    }
}

/// Receipt blobs kept in a map, for tests.
#[derive(Default, Clone)]
pub struct InMemoryReceiptStorage {
    blobs: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryReceiptStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl ReceiptStorage for InMemoryReceiptStorage {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(name.to_string())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(path).map(|_| ()).ok_or_else(|| {
            RaceError::StorageFailure(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no receipt stored at {}", path),
            ))
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.read().await.keys().cloned().collect())
    }
}
