use super::engine::RaceDesk;
use super::views::ReceiptSummary;
use crate::domain::RegistrationId;
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentMethod, TransitionTarget};
use crate::error::{RaceError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Image formats accepted as proof of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptFormat {
    Jpeg,
    Png,
}

impl ReceiptFormat {
    /// `image/jpg` is not a registered type but browsers send it.
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(ReceiptFormat::Jpeg),
            "image/png" => Ok(ReceiptFormat::Png),
            other => Err(RaceError::UnsupportedMediaType(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReceiptFormat::Jpeg => "jpg",
            ReceiptFormat::Png => "png",
        }
    }
}

/// An uploaded proof-of-payment image and what the registrant declared.
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub registration_id: RegistrationId,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub payment_method: Option<PaymentMethod>,
    pub declared_amount: Option<Decimal>,
}

fn check_declared(
    declared: Option<Decimal>,
    due: &Amount,
    registration_id: RegistrationId,
) -> Result<()> {
    match declared {
        Some(declared) if declared != due.value() => Err(RaceError::ValidationError(format!(
            "declared amount {} does not match the {} due for registration {}",
            declared, due, registration_id
        ))),
        _ => Ok(()),
    }
}

/// The ledger target for a receipt on an existing payment.
fn receipt_target(
    payment: &Payment,
    declared_amount: Option<Decimal>,
) -> Result<TransitionTarget> {
    if !payment.status.accepts_receipt() {
        return Err(RaceError::AlreadyCompleted(payment.id));
    }
    check_declared(declared_amount, &payment.amount, payment.registration_id)?;
    Ok(TransitionTarget::observed(payment))
}

fn receipt_name(registration_id: RegistrationId, format: ReceiptFormat) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{id}/receipt_{id}_{millis}_{suffix}.{ext}",
        id = registration_id,
        millis = Utc::now().timestamp_millis(),
        suffix = &suffix[..8],
        ext = format.extension()
    )
}

impl RaceDesk {
    /// Stores a receipt image and moves the registration's payment to
    /// `PENDING_REVIEW`.
    ///
    /// All checks run before anything is written. A registration without a
    /// payment gets one in the same commit that records the receipt, so a
    /// failed upload never leaves a bare payment behind. The image is stored
    /// before that commit; if the commit fails, the image is deleted again
    /// before the error is returned. A receipt it replaces is deleted once the
    /// new one is committed.
    pub async fn ingest_receipt(&self, upload: ReceiptUpload) -> Result<ReceiptSummary> {
        let size = upload.bytes.len();
        if size > self.max_receipt_bytes {
            return Err(RaceError::PayloadTooLarge {
                size,
                limit: self.max_receipt_bytes,
            });
        }
        if size == 0 {
            return Err(RaceError::ValidationError(
                "receipt image is empty".to_string(),
            ));
        }
        let format = ReceiptFormat::from_content_type(&upload.content_type)?;

        let registration = self.registration(upload.registration_id).await?;
        let existing = self.payments.get_by_registration(registration.id).await?;
        let target = match &existing {
            Some(payment) => receipt_target(payment, upload.declared_amount)?,
            None => {
                let priced = self.price_payment(registration.id).await?;
                check_declared(upload.declared_amount, &priced.amount, registration.id)?;
                TransitionTarget::Create(priced)
            }
        };

        let name = receipt_name(registration.id, format);
        let path = self
            .receipts
            .put(&name, &upload.bytes)
            .await
            .map_err(|e| match e {
                RaceError::StorageFailure(_) => e,
                other => RaceError::StorageFailure(std::io::Error::other(other.to_string())),
            })?;

        let committed = match self.commit_receipt(target, &path, upload.payment_method).await {
            Ok(updated) => Ok((updated, existing.and_then(|payment| payment.receipt_image))),
            // A concurrent first upload created the payment; attach to it instead.
            Err(RaceError::PaymentAlreadyExists(_)) => {
                self.attach_to_current(registration.id, &path, &upload).await
            }
            Err(e) => Err(e),
        };

        let (updated, replaced) = match committed {
            Ok(committed) => committed,
            Err(e) => {
                if let Err(cleanup) = self.receipts.delete(&path).await {
                    warn!(
                        %path,
                        error = %cleanup,
                        "failed to delete receipt after payment update failed"
                    );
                }
                return Err(match e {
                    RaceError::PersistenceFailure(_)
                    | RaceError::AlreadyCompleted(_)
                    | RaceError::StaleStatus { .. }
                    | RaceError::ValidationError(_)
                    | RaceError::RegistrationNotFound(_) => e,
                    other => RaceError::PersistenceFailure(other.to_string()),
                });
            }
        };

        if let Some(previous) = replaced.as_deref()
            && previous != path
            && let Err(e) = self.receipts.delete(previous).await
        {
            warn!(path = %previous, error = %e, "failed to prune replaced receipt");
        }

        info!(
            payment_id = updated.id,
            registration_id = registration.id,
            bytes = size,
            "receipt ingested"
        );
        Ok(ReceiptSummary {
            payment_id: updated.id,
            registration_id: updated.registration_id,
            receipt_image: path,
            status: updated.status,
        })
    }

    /// Commits against whatever payment the registration holds now. Returns
    /// the updated payment and the receipt path it replaced.
    async fn attach_to_current(
        &self,
        registration_id: RegistrationId,
        path: &str,
        upload: &ReceiptUpload,
    ) -> Result<(Payment, Option<String>)> {
        let payment = self.payment_for_registration(registration_id).await?;
        let target = receipt_target(&payment, upload.declared_amount)?;
        let updated = self
            .commit_receipt(target, path, upload.payment_method)
            .await?;
        Ok((updated, payment.receipt_image))
    }

    /// Deletes stored receipts that no payment references.
    pub async fn prune_receipts(&self) -> Result<Vec<String>> {
        let referenced: HashSet<String> = self
            .payments
            .get_all()
            .await?
            .into_iter()
            .filter_map(|p| p.receipt_image)
            .collect();

        let mut removed = Vec::new();
        for path in self.receipts.list().await? {
            if referenced.contains(&path) {
                continue;
            }
            match self.receipts.delete(&path).await {
                Ok(()) => removed.push(path),
                Err(e) => warn!(%path, error = %e, "failed to prune receipt"),
            }
        }
        info!(count = removed.len(), "pruned unreferenced receipts");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(
            ReceiptFormat::from_content_type("image/jpeg").unwrap(),
            ReceiptFormat::Jpeg
        );
        assert_eq!(
            ReceiptFormat::from_content_type("image/jpg").unwrap(),
            ReceiptFormat::Jpeg
        );
        assert_eq!(
            ReceiptFormat::from_content_type("IMAGE/PNG").unwrap(),
            ReceiptFormat::Png
        );
        assert!(matches!(
            ReceiptFormat::from_content_type("application/pdf"),
            Err(RaceError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_receipt_name_is_namespaced() {
        let a = receipt_name(12, ReceiptFormat::Png);
        let b = receipt_name(12, ReceiptFormat::Png);
        assert!(a.starts_with("12/receipt_12_"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }
}
