use crate::domain::admin::AdminUser;
use crate::domain::payment::{NewPayment, Payment, StatusTransition, TransitionTarget};
use crate::domain::ports::{AdminStore, PaymentStore, RegistrationStore, StatusLedger};
use crate::domain::registration::{Registration, RegistrationDetails, ShippingStatus};
use crate::domain::{AdminId, PaymentId, RegistrationId};
use crate::error::{RaceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for registration records.
pub const CF_REGISTRATIONS: &str = "registrations";
/// Column Family for payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for admin records.
pub const CF_ADMINS: &str = "admins";
/// Unique index: email -> registration id.
pub const CF_EMAIL_INDEX: &str = "registration_emails";
/// Unique index: registration id -> payment id.
pub const CF_PAYMENT_INDEX: &str = "payment_registrations";
/// Id counters.
pub const CF_META: &str = "meta";

const NEXT_REGISTRATION_ID: &[u8] = b"next_registration_id";
const NEXT_PAYMENT_ID: &[u8] = b"next_payment_id";
const NEXT_ADMIN_ID: &[u8] = b"next_admin_id";

/// A persistent store implementation using RocksDB.
///
/// Each table lives in its own Column Family; uniqueness of email and of the
/// registration/payment pairing is enforced by index families. Every write
/// holds `write_lock` and lands as a single `WriteBatch`, so multi-record
/// commits are atomic and commits never interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| RaceError::PersistenceFailure(format!("Serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| RaceError::PersistenceFailure(format!("Deserialization error: {}", e)))
}

fn decode_id(bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes
        .try_into()
        .map_err(|_| RaceError::PersistenceFailure("Corrupt id in index".to_string()))?;
    Ok(u32::from_be_bytes(raw))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that every required column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [
            CF_REGISTRATIONS,
            CF_PAYMENTS,
            CF_ADMINS,
            CF_EMAIL_INDEX,
            CF_PAYMENT_INDEX,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            RaceError::PersistenceFailure(format!("{} column family not found", name))
        })
    }

    fn read<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(decode(&value)?);
        }
        Ok(items)
    }

    fn index_lookup(&self, family: &str, key: &[u8]) -> Result<Option<u32>> {
        let cf = self.cf(family)?;
        self.db
            .get_pinned_cf(cf, key)?
            .map(|bytes| decode_id(&bytes))
            .transpose()
    }

    /// Reserves the next id from `counter`, staging the bump into `batch`.
    fn next_id(&self, batch: &mut WriteBatch, counter: &[u8]) -> Result<u32> {
        let current = self.index_lookup(CF_META, counter)?.unwrap_or(0);
        let next = current + 1;
        batch.put_cf(self.cf(CF_META)?, counter, next.to_be_bytes());
        Ok(next)
    }
}

#[async_trait]
impl RegistrationStore for RocksDBStore {
    async fn insert(
        &self,
        details: RegistrationDetails,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let _guard = self.write_lock.lock().await;
        if self
            .index_lookup(CF_EMAIL_INDEX, details.email.as_bytes())?
            .is_some()
        {
            return Err(RaceError::DuplicateEmail(details.email));
        }

        let mut batch = WriteBatch::default();
        let id = self.next_id(&mut batch, NEXT_REGISTRATION_ID)?;
        let registration = Registration::new(id, details, now);
        batch.put_cf(
            self.cf(CF_EMAIL_INDEX)?,
            registration.email().as_bytes(),
            id.to_be_bytes(),
        );
        batch.put_cf(
            self.cf(CF_REGISTRATIONS)?,
            id.to_be_bytes(),
            encode(&registration)?,
        );
        self.db.write(batch)?;
        Ok(registration)
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>> {
        self.read(CF_REGISTRATIONS, &id.to_be_bytes())
    }

    async fn update(
        &self,
        id: RegistrationId,
        details: RegistrationDetails,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let _guard = self.write_lock.lock().await;
        if let Some(owner) = self.index_lookup(CF_EMAIL_INDEX, details.email.as_bytes())?
            && owner != id
        {
            return Err(RaceError::DuplicateEmail(details.email));
        }
        let mut registration: Registration = self
            .read(CF_REGISTRATIONS, &id.to_be_bytes())?
            .ok_or(RaceError::RegistrationNotFound(id))?;

        let mut batch = WriteBatch::default();
        let index = self.cf(CF_EMAIL_INDEX)?;
        batch.delete_cf(index, registration.email().as_bytes());
        batch.put_cf(index, details.email.as_bytes(), id.to_be_bytes());
        registration.apply_details(details, now);
        batch.put_cf(
            self.cf(CF_REGISTRATIONS)?,
            id.to_be_bytes(),
            encode(&registration)?,
        );
        self.db.write(batch)?;
        Ok(registration)
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Registration>> {
        let mut found: Vec<Registration> = self
            .read_all::<Registration>(CF_REGISTRATIONS)?
            .into_iter()
            .filter(|r| r.email() == email)
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(found)
    }

    async fn get_all(&self) -> Result<Vec<Registration>> {
        self.read_all(CF_REGISTRATIONS)
    }

    async fn set_shipping_status(
        &self,
        id: RegistrationId,
        status: ShippingStatus,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let _guard = self.write_lock.lock().await;
        let mut registration: Registration = self
            .read(CF_REGISTRATIONS, &id.to_be_bytes())?
            .ok_or(RaceError::RegistrationNotFound(id))?;
        registration.shipping_status = Some(status);
        registration.updated_at = now;
        self.db.put_cf(
            self.cf(CF_REGISTRATIONS)?,
            id.to_be_bytes(),
            encode(&registration)?,
        )?;
        Ok(registration)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: NewPayment) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let registration_id = payment.registration_id;
        if self
            .read::<Registration>(CF_REGISTRATIONS, &registration_id.to_be_bytes())?
            .is_none()
        {
            return Err(RaceError::RegistrationNotFound(registration_id));
        }
        if self
            .index_lookup(CF_PAYMENT_INDEX, &registration_id.to_be_bytes())?
            .is_some()
        {
            return Err(RaceError::PaymentAlreadyExists(registration_id));
        }

        let mut batch = WriteBatch::default();
        let id = self.next_id(&mut batch, NEXT_PAYMENT_ID)?;
        let payment = payment.into_payment(id);
        batch.put_cf(
            self.cf(CF_PAYMENT_INDEX)?,
            registration_id.to_be_bytes(),
            id.to_be_bytes(),
        );
        batch.put_cf(self.cf(CF_PAYMENTS)?, id.to_be_bytes(), encode(&payment)?);
        self.db.write(batch)?;
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, &id.to_be_bytes())
    }

    async fn get_by_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Option<Payment>> {
        match self.index_lookup(CF_PAYMENT_INDEX, &registration_id.to_be_bytes())? {
            Some(id) => self.read(CF_PAYMENTS, &id.to_be_bytes()),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Payment>> {
        self.read_all(CF_PAYMENTS)
    }
}

#[async_trait]
impl AdminStore for RocksDBStore {
    async fn insert(&self, username: &str, now: DateTime<Utc>) -> Result<AdminUser> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        let id = self.next_id(&mut batch, NEXT_ADMIN_ID)?;
        let admin = AdminUser::new(id, username.to_string(), now);
        batch.put_cf(self.cf(CF_ADMINS)?, id.to_be_bytes(), encode(&admin)?);
        self.db.write(batch)?;
        Ok(admin)
    }

    async fn get(&self, id: AdminId) -> Result<Option<AdminUser>> {
        self.read(CF_ADMINS, &id.to_be_bytes())
    }
}

#[async_trait]
impl StatusLedger for RocksDBStore {
    async fn commit(&self, transition: StatusTransition) -> Result<(Payment, Registration)> {
        let _guard = self.write_lock.lock().await;

        let mut batch = WriteBatch::default();
        let mut payment: Payment = match &transition.target {
            TransitionTarget::Existing {
                payment_id,
                status,
                version,
            } => {
                let payment: Payment = self
                    .read(CF_PAYMENTS, &payment_id.to_be_bytes())?
                    .ok_or(RaceError::PaymentNotFound(*payment_id))?;
                if payment.status != *status || payment.version != *version {
                    return Err(RaceError::StaleStatus {
                        payment_id: payment.id,
                        expected: *status,
                        actual: payment.status,
                    });
                }
                payment
            }
            TransitionTarget::Create(new) => {
                let registration_id = new.registration_id;
                if self
                    .read::<Registration>(CF_REGISTRATIONS, &registration_id.to_be_bytes())?
                    .is_none()
                {
                    return Err(RaceError::RegistrationNotFound(registration_id));
                }
                if self
                    .index_lookup(CF_PAYMENT_INDEX, &registration_id.to_be_bytes())?
                    .is_some()
                {
                    return Err(RaceError::PaymentAlreadyExists(registration_id));
                }
                let id = self.next_id(&mut batch, NEXT_PAYMENT_ID)?;
                batch.put_cf(
                    self.cf(CF_PAYMENT_INDEX)?,
                    registration_id.to_be_bytes(),
                    id.to_be_bytes(),
                );
                new.clone().into_payment(id)
            }
        };
        let mut registration: Registration = self
            .read(CF_REGISTRATIONS, &payment.registration_id.to_be_bytes())?
            .ok_or_else(|| {
                RaceError::PersistenceFailure(format!(
                    "registration {} for payment {} is missing",
                    payment.registration_id, payment.id
                ))
            })?;

        if let Some(audit) = transition.audit {
            let mut admin: AdminUser = self
                .read(CF_ADMINS, &audit.admin_id.to_be_bytes())?
                .ok_or_else(|| {
                    RaceError::PersistenceFailure(format!("admin {} not found", audit.admin_id))
                })?;
            admin.last_verified_at = Some(audit.at);
            admin.last_verified_payment_id = Some(payment.id);
            batch.put_cf(self.cf(CF_ADMINS)?, admin.id.to_be_bytes(), encode(&admin)?);
        }

        transition.apply_to(&mut payment);
        registration.payment_status = payment.status;
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            payment.id.to_be_bytes(),
            encode(&payment)?,
        );
        batch.put_cf(
            self.cf(CF_REGISTRATIONS)?,
            registration.id.to_be_bytes(),
            encode(&registration)?,
        );
        self.db.write(batch)?;
        Ok((payment, registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::payment::{AdminAudit, PaymentMethod};
    use crate::domain::registration::tests::pickup_form;
    use crate::domain::status::PaymentStatus;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_REGISTRATIONS, CF_PAYMENTS, CF_ADMINS, CF_EMAIL_INDEX] {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_registration_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let details = pickup_form("runner@example.com").validate().unwrap();

        let created = RegistrationStore::insert(&store, details.clone(), Utc::now())
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let retrieved = RegistrationStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(retrieved, created);

        assert!(matches!(
            RegistrationStore::insert(&store, details, Utc::now()).await,
            Err(RaceError::DuplicateEmail(_))
        ));
        assert!(RegistrationStore::get(&store, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_commit_survives_reopen() {
        let dir = tempdir().unwrap();
        let now = Utc::now();
        let payment_id = {
            let store = RocksDBStore::open(dir.path()).unwrap();
            let registration = RegistrationStore::insert(
                &store,
                pickup_form("runner@example.com").validate().unwrap(),
                now,
            )
            .await
            .unwrap();
            let payment = PaymentStore::insert(
                &store,
                NewPayment {
                    registration_id: registration.id,
                    amount: Amount::new(dec!(500)).unwrap(),
                    payment_method: PaymentMethod::BankTransfer,
                    created_at: now,
                },
            )
            .await
            .unwrap();
            let admin = AdminStore::insert(&store, "staff", now).await.unwrap();
            store
                .commit(StatusTransition {
                    target: TransitionTarget::observed(&payment),
                    next: PaymentStatus::Rejected,
                    payment_date: None,
                    verification_note: Some("No transfer found".to_string()),
                    receipt_image: None,
                    payment_method: None,
                    audit: Some(AdminAudit {
                        admin_id: admin.id,
                        at: now,
                    }),
                    at: now,
                })
                .await
                .unwrap();
            payment.id
        };

        let store = RocksDBStore::open(dir.path()).unwrap();
        let payment = PaymentStore::get(&store, payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Rejected);
        let registration = RegistrationStore::get(&store, payment.registration_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registration.payment_status, PaymentStatus::Rejected);
        let admin = AdminStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(admin.last_verified_payment_id, Some(payment_id));
    }

    #[tokio::test]
    async fn test_rocksdb_create_commit_is_one_batch() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let now = Utc::now();
        let registration = RegistrationStore::insert(
            &store,
            pickup_form("runner@example.com").validate().unwrap(),
            now,
        )
        .await
        .unwrap();
        let create = StatusTransition {
            target: TransitionTarget::Create(NewPayment {
                registration_id: registration.id,
                amount: Amount::new(dec!(500)).unwrap(),
                payment_method: PaymentMethod::BankTransfer,
                created_at: now,
            }),
            next: PaymentStatus::PendingReview,
            payment_date: Some(now),
            verification_note: None,
            receipt_image: Some("1/receipt.png".to_string()),
            payment_method: None,
            audit: Some(AdminAudit { admin_id: 9, at: now }),
            at: now,
        };

        // Unknown admin: the staged insert must not land.
        assert!(matches!(
            store.commit(create.clone()).await,
            Err(RaceError::PersistenceFailure(_))
        ));
        assert!(store.get_by_registration(registration.id).await.unwrap().is_none());

        let mut create = create;
        create.audit = None;
        let (payment, mirrored) = store.commit(create).await.unwrap();
        assert_eq!(payment.id, 1);
        assert_eq!(payment.version, 1);
        assert_eq!(mirrored.payment_status, PaymentStatus::PendingReview);
        assert_eq!(
            store.get_by_registration(registration.id).await.unwrap(),
            Some(payment)
        );
    }
}
