use super::engine::RaceDesk;
use super::views::ShippingEntry;
use crate::domain::RegistrationId;
use crate::domain::admin::AdminSession;
use crate::domain::registration::{DeliveryMethod, Registration, ShippingStatus};
use crate::domain::status::PaymentStatus;
use crate::error::{RaceError, Result};
use chrono::Utc;
use tracing::info;

impl RaceDesk {
    /// Paid registrations whose shirt goes out by post, newest first.
    pub async fn shipping_list(&self) -> Result<Vec<ShippingEntry>> {
        let mut entries: Vec<ShippingEntry> = self
            .registrations
            .get_all()
            .await?
            .into_iter()
            .filter(|r| {
                r.details.delivery_method == DeliveryMethod::Shipping
                    && r.payment_status == PaymentStatus::Completed
            })
            .filter_map(|r| {
                let address = r.details.shipping_address?;
                Some(ShippingEntry {
                    registration_id: r.id,
                    first_name: r.details.first_name,
                    last_name: r.details.last_name,
                    phone: r.details.phone,
                    event_type: r.details.event_type,
                    shirt_size: r.details.shirt_size,
                    address,
                    shipping_status: r.shipping_status.unwrap_or_default(),
                    created_at: r.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (b.created_at, b.registration_id).cmp(&(a.created_at, a.registration_id))
        });
        Ok(entries)
    }

    pub async fn mark_shipping(
        &self,
        session: &AdminSession,
        registration_id: RegistrationId,
        status: ShippingStatus,
    ) -> Result<Registration> {
        let admin_id = session.require_admin()?;
        let registration = self.registration(registration_id).await?;
        if registration.details.delivery_method != DeliveryMethod::Shipping {
            return Err(RaceError::ValidationError(format!(
                "registration {} picks up at the event and has nothing to ship",
                registration_id
            )));
        }
        let updated = self
            .registrations
            .set_shipping_status(registration_id, status, Utc::now())
            .await?;
        info!(registration_id, admin_id, ?status, "shipping status updated");
        Ok(updated)
    }
}
