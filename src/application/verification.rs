use super::engine::RaceDesk;
use crate::domain::PaymentId;
use crate::domain::admin::AdminSession;
use crate::domain::payment::{AdminAudit, Payment, StatusTransition, TransitionTarget};
use crate::domain::status::PaymentStatus;
use crate::error::{RaceError, Result};
use chrono::Utc;
use tracing::{info, warn};

pub const COMPLETED_NOTE: &str = "Payment confirmed";
pub const REJECTED_NOTE: &str = "Payment rejected: the transfer could not be matched to the receipt";

fn default_note(decision: PaymentStatus) -> &'static str {
    match decision {
        PaymentStatus::Completed => COMPLETED_NOTE,
        _ => REJECTED_NOTE,
    }
}

fn non_blank(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

impl RaceDesk {
    /// Moves a payment to `COMPLETED` or `REJECTED` on behalf of an admin.
    ///
    /// The payment, the registration mirror and the admin's audit fields are
    /// written as one unit. A payment that already carries a decision is
    /// refused with `AlreadyVerified`; use [`RaceDesk::reconsider`] to reopen
    /// it. If the payment changed between the read and the commit, including a
    /// replaced receipt with no status change, the call fails with
    /// `StaleStatus` and nothing is written.
    pub async fn verify(
        &self,
        session: &AdminSession,
        payment_id: PaymentId,
        decision: PaymentStatus,
        note: Option<String>,
    ) -> Result<Payment> {
        let admin_id = session.require_admin()?;
        if !decision.is_decision() {
            return Err(RaceError::InvalidDecision(decision.to_string()));
        }
        let payment = self.payment(payment_id).await?;
        if !payment.status.awaits_decision() {
            return Err(RaceError::AlreadyVerified(payment_id, payment.status));
        }

        let now = Utc::now();
        let transition = StatusTransition {
            target: TransitionTarget::observed(&payment),
            next: decision,
            payment_date: (decision == PaymentStatus::Completed).then_some(now),
            verification_note: Some(
                non_blank(note).unwrap_or_else(|| default_note(decision).to_string()),
            ),
            receipt_image: None,
            payment_method: None,
            audit: Some(AdminAudit { admin_id, at: now }),
            at: now,
        };

        match self.ledger.commit(transition).await {
            Ok((payment, _)) => {
                info!(payment_id, admin_id, decision = %decision, "payment verified");
                Ok(payment)
            }
            Err(RaceError::StaleStatus { actual, .. }) if actual.is_terminal() => {
                Err(RaceError::AlreadyVerified(payment_id, actual))
            }
            // A receipt landed after the admin read the payment.
            Err(e @ RaceError::StaleStatus { .. }) => Err(e),
            Err(e) => {
                warn!(payment_id, admin_id, error = %e, "verification rolled back");
                Err(RaceError::VerificationFailed {
                    payment_id,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Reopens a decided payment for review. The registration mirror and the
    /// admin audit stamp move with it.
    pub async fn reconsider(
        &self,
        session: &AdminSession,
        payment_id: PaymentId,
        note: Option<String>,
    ) -> Result<Payment> {
        let admin_id = session.require_admin()?;
        let payment = self.payment(payment_id).await?;
        if !payment.status.is_terminal() {
            return Err(RaceError::ValidationError(format!(
                "payment {} is {} and has no decision to reconsider",
                payment_id, payment.status
            )));
        }

        let now = Utc::now();
        let transition = StatusTransition {
            target: TransitionTarget::observed(&payment),
            next: PaymentStatus::PendingReview,
            payment_date: None,
            verification_note: non_blank(note),
            receipt_image: None,
            payment_method: None,
            audit: Some(AdminAudit { admin_id, at: now }),
            at: now,
        };
        let (payment, _) = self.ledger.commit(transition).await.map_err(|e| {
            RaceError::VerificationFailed {
                payment_id,
                source: Box::new(e),
            }
        })?;
        info!(payment_id, admin_id, "payment reopened for review");
        Ok(payment)
    }
}
