use super::engine::RaceDesk;
use super::views::ReviewItem;
use crate::domain::payment::{
    NewPayment, Payment, PaymentMethod, StatusTransition, TransitionTarget,
};
use crate::domain::status::PaymentStatus;
use crate::domain::{PaymentId, RegistrationId};
use crate::error::{RaceError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

impl RaceDesk {
    /// Creates the payment for a registration, priced from the event type.
    pub async fn create_payment(&self, registration_id: RegistrationId) -> Result<Payment> {
        let priced = self.price_payment(registration_id).await?;
        let payment = self.payments.insert(priced).await?;
        info!(
            payment_id = payment.id,
            registration_id,
            amount = %payment.amount,
            "payment created"
        );
        Ok(payment)
    }

    pub async fn payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(id)
            .await?
            .ok_or(RaceError::PaymentNotFound(id))
    }

    pub async fn payment_for_registration(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Payment> {
        self.payments
            .get_by_registration(registration_id)
            .await?
            .ok_or(RaceError::PaymentNotFoundForRegistration(registration_id))
    }

    /// Prices a payment for a registration without storing it.
    pub(crate) async fn price_payment(
        &self,
        registration_id: RegistrationId,
    ) -> Result<NewPayment> {
        let registration = self.registration(registration_id).await?;
        Ok(NewPayment {
            registration_id,
            amount: self.prices.price_for(registration.details.event_type)?,
            payment_method: PaymentMethod::BankTransfer,
            created_at: Utc::now(),
        })
    }

    /// Records a receipt on a payment and moves it to `PENDING_REVIEW`.
    ///
    /// The payment date is set optimistically to now. A declared amount must
    /// match the amount fixed at creation.
    pub async fn attach_receipt(
        &self,
        payment_id: PaymentId,
        image_path: &str,
        method: Option<PaymentMethod>,
        declared_amount: Option<Decimal>,
    ) -> Result<Payment> {
        let payment = self.payment(payment_id).await?;
        if !payment.status.accepts_receipt() {
            return Err(RaceError::AlreadyCompleted(payment_id));
        }
        if let Some(declared) = declared_amount
            && declared != payment.amount.value()
        {
            return Err(RaceError::ValidationError(format!(
                "declared amount {} does not match the {} due for payment {}",
                declared, payment.amount, payment_id
            )));
        }
        self.commit_receipt(TransitionTarget::observed(&payment), image_path, method)
            .await
    }

    /// Commits a receipt against `target`, creating the payment when asked to.
    pub(crate) async fn commit_receipt(
        &self,
        target: TransitionTarget,
        image_path: &str,
        method: Option<PaymentMethod>,
    ) -> Result<Payment> {
        let now = Utc::now();
        let transition = StatusTransition {
            target,
            next: PaymentStatus::PendingReview,
            payment_date: Some(now),
            verification_note: None,
            receipt_image: Some(image_path.to_string()),
            payment_method: method,
            audit: None,
            at: now,
        };
        match self.ledger.commit(transition).await {
            Ok((payment, _)) => Ok(payment),
            Err(RaceError::StaleStatus {
                payment_id,
                actual: PaymentStatus::Completed,
                ..
            }) => Err(RaceError::AlreadyCompleted(payment_id)),
            Err(e) => Err(e),
        }
    }

    /// Payments awaiting an admin decision, newest first.
    pub async fn review_queue(&self) -> Result<Vec<ReviewItem>> {
        let mut pending: Vec<Payment> = self
            .payments
            .get_all()
            .await?
            .into_iter()
            .filter(|p| p.status == PaymentStatus::PendingReview)
            .collect();
        pending.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut items = Vec::with_capacity(pending.len());
        for payment in pending {
            let registration = self.registration(payment.registration_id).await?;
            items.push(ReviewItem {
                payment,
                first_name: registration.details.first_name,
                last_name: registration.details.last_name,
                email: registration.details.email,
                event_type: registration.details.event_type,
            });
        }
        Ok(items)
    }
}
