use super::engine::RaceDesk;
use super::views::{
    PaymentQuote, PaymentSnapshot, RegistrationSummary, RegistrationWithPayment, StatusReport,
};
use crate::domain::RegistrationId;
use crate::domain::payment::Payment;
use crate::domain::registration::{Registration, RegistrationForm, normalize_email};
use crate::domain::status::{PaymentStatus, StatusFilter};
use crate::error::{RaceError, Result};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

fn newest_first(registrations: &mut [Registration]) {
    registrations.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

fn required_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    if email.is_empty() {
        Err(RaceError::ValidationError("email is required".to_string()))
    } else {
        Ok(email)
    }
}

impl RaceDesk {
    /// Validates the form and stores a new registration in `PENDING`.
    pub async fn register(&self, form: RegistrationForm) -> Result<Registration> {
        let details = form.validate()?;
        let registration = self.registrations.insert(details, Utc::now()).await?;
        info!(
            registration_id = registration.id,
            event_type = %registration.details.event_type,
            "registration created"
        );
        Ok(registration)
    }

    pub async fn registration(&self, id: RegistrationId) -> Result<Registration> {
        self.registrations
            .get(id)
            .await?
            .ok_or(RaceError::RegistrationNotFound(id))
    }

    /// Replaces every editable field of a registration. Status is left alone.
    pub async fn update_registration(
        &self,
        id: RegistrationId,
        form: RegistrationForm,
    ) -> Result<Registration> {
        let details = form.validate()?;
        let registration = self.registrations.update(id, details, Utc::now()).await?;
        info!(registration_id = id, "registration updated");
        Ok(registration)
    }

    /// Every registration joined with its payment, newest first.
    pub async fn list_with_payment(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<RegistrationWithPayment>> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .get_all()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r.payment_status))
            .collect();
        newest_first(&mut registrations);

        let mut payments: HashMap<RegistrationId, Payment> = self
            .payments
            .get_all()
            .await?
            .into_iter()
            .map(|p| (p.registration_id, p))
            .collect();

        debug!(count = registrations.len(), ?filter, "listing registrations");
        Ok(registrations
            .into_iter()
            .map(|registration| {
                let payment = payments.remove(&registration.id);
                RegistrationWithPayment {
                    registration,
                    payment,
                }
            })
            .collect())
    }

    /// Registrations for an email, newest first. The lookup does not assume
    /// the email is unique.
    pub async fn find_by_email(&self, email: &str) -> Result<Vec<Registration>> {
        let email = required_email(email)?;
        let mut found = self.registrations.find_by_email(&email).await?;
        newest_first(&mut found);
        Ok(found)
    }

    /// The public "check status" lookup.
    pub async fn check_status(&self, email: &str) -> Result<Vec<StatusReport>> {
        let mut reports = Vec::new();
        for registration in self.find_by_email(email).await? {
            let payment = self.payments.get_by_registration(registration.id).await?;
            reports.push(StatusReport {
                registration_id: registration.id,
                first_name: registration.details.first_name,
                last_name: registration.details.last_name,
                email: registration.details.email,
                event_type: registration.details.event_type,
                created_at: registration.created_at,
                payment: payment.as_ref().map(PaymentSnapshot::from),
            });
        }
        Ok(reports)
    }

    /// The newest still-unpaid registration for an email, with the amount due.
    pub async fn pending_quote(&self, email: &str) -> Result<PaymentQuote> {
        let registration = self
            .find_by_email(email)
            .await?
            .into_iter()
            .find(|r| r.payment_status == PaymentStatus::Pending)
            .ok_or_else(|| {
                RaceError::ValidationError(format!(
                    "no registration awaiting payment for {}",
                    email.trim()
                ))
            })?;
        let amount = self.prices.price_for(registration.details.event_type)?;
        Ok(PaymentQuote {
            registration_id: registration.id,
            first_name: registration.details.first_name,
            last_name: registration.details.last_name,
            email: registration.details.email,
            event_type: registration.details.event_type,
            amount,
        })
    }

    /// Status counts overall and per event type.
    pub async fn summary(&self) -> Result<RegistrationSummary> {
        let mut summary = RegistrationSummary::default();
        for registration in self.registrations.get_all().await? {
            summary.total += 1;
            summary.overall.record(registration.payment_status);
            summary
                .by_event
                .entry(registration.details.event_type)
                .or_default()
                .record(registration.payment_status);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::EventType;
    use crate::domain::registration::tests::pickup_form;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_register_starts_pending() {
        let desk = RaceDesk::in_memory();
        let registration = desk
            .register(pickup_form("runner@example.com"))
            .await
            .unwrap();
        assert_eq!(registration.payment_status, PaymentStatus::Pending);
        assert_eq!(desk.registration(registration.id).await.unwrap(), registration);
    }

    #[tokio::test]
    async fn test_unknown_registration() {
        let desk = RaceDesk::in_memory();
        assert!(matches!(
            desk.registration(99).await,
            Err(RaceError::RegistrationNotFound(99))
        ));
        assert!(matches!(
            desk.update_registration(99, pickup_form("a@example.com")).await,
            Err(RaceError::RegistrationNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_creation_time() {
        let desk = RaceDesk::in_memory();
        let registration = desk
            .register(pickup_form("runner@example.com"))
            .await
            .unwrap();

        let mut form = pickup_form("runner@example.com");
        form.event_type = Some(EventType::Vip);
        form.shirt_size = "XL".to_string();
        let updated = desk.update_registration(registration.id, form).await.unwrap();

        assert_eq!(updated.details.event_type, EventType::Vip);
        assert_eq!(updated.details.shirt_size, "XL");
        assert_eq!(updated.created_at, registration.created_at);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let desk = RaceDesk::in_memory();
        let first = desk.register(pickup_form("a@example.com")).await.unwrap();
        let second = desk.register(pickup_form("b@example.com")).await.unwrap();
        desk.create_payment(second.id).await.unwrap();

        let all = desk.list_with_payment(StatusFilter::All).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.registration.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(all[0].payment.is_some());
        assert!(all[1].payment.is_none());

        let completed = desk.list_with_payment(StatusFilter::Completed).await.unwrap();
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn test_check_status_requires_email() {
        let desk = RaceDesk::in_memory();
        assert!(matches!(
            desk.check_status("  ").await,
            Err(RaceError::ValidationError(_))
        ));
        assert!(desk.check_status("nobody@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_status_includes_payment() {
        let desk = RaceDesk::in_memory();
        let registration = desk
            .register(pickup_form("runner@example.com"))
            .await
            .unwrap();
        desk.create_payment(registration.id).await.unwrap();

        let reports = desk.check_status(" runner@example.com ").await.unwrap();
        assert_eq!(reports.len(), 1);
        let payment = reports[0].payment.as_ref().unwrap();
        assert_eq!(payment.amount.value(), dec!(500));
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_pending_quote_uses_price_table() {
        let desk = RaceDesk::in_memory();
        let mut form = pickup_form("vip@example.com");
        form.event_type = Some(EventType::Vip);
        let registration = desk.register(form).await.unwrap();

        let quote = desk.pending_quote("vip@example.com").await.unwrap();
        assert_eq!(quote.registration_id, registration.id);
        assert_eq!(quote.amount.value(), dec!(1000));

        assert!(desk.pending_quote("other@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_summary_counts_by_event() {
        let desk = RaceDesk::in_memory();
        desk.register(pickup_form("a@example.com")).await.unwrap();
        let mut vip = pickup_form("b@example.com");
        vip.event_type = Some(EventType::Vip);
        desk.register(vip).await.unwrap();

        let summary = desk.summary().await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.overall.pending, 2);
        assert_eq!(summary.by_event[&EventType::Vip].pending, 1);
        assert_eq!(summary.by_event[&EventType::MiniMarathon].pending, 1);
        assert!(!summary.by_event.contains_key(&EventType::FunRun));
    }
}
