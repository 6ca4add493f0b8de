use super::RegistrationId;
use super::status::PaymentStatus;
use crate::error::RaceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shirt sizes offered on the registration form. `other` is accepted on input
/// and replaced by the free-text size.
pub const SHIRT_SIZES: [&str; 10] = ["3S", "2S", "S", "M", "L", "XL", "2XL", "3XL", "4XL", "5XL"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[serde(rename = "funrun")]
    FunRun,
    #[serde(rename = "minimarathon")]
    MiniMarathon,
    Vip,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FunRun => "funrun",
            EventType::MiniMarathon => "minimarathon",
            EventType::Vip => "vip",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventType::FunRun => "Fun Run 5 km",
            EventType::MiniMarathon => "Mini Marathon 10 km",
            EventType::Vip => "VIP",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "funrun" => Ok(EventType::FunRun),
            "minimarathon" => Ok(EventType::MiniMarathon),
            "vip" => Ok(EventType::Vip),
            other => Err(RaceError::UnknownEventType(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Pickup,
    Shipping,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl FromStr for ShippingStatus {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ShippingStatus::Pending),
            "shipped" => Ok(ShippingStatus::Shipped),
            "delivered" => Ok(ShippingStatus::Delivered),
            other => Err(RaceError::ValidationError(format!(
                "Unknown shipping status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(default)]
pub struct ShippingAddress {
    pub address: String,
    pub sub_district: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
}

impl ShippingAddress {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("sub_district", &self.sub_district),
            ("district", &self.district),
            ("province", &self.province),
            ("postal_code", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    fn trimmed(self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            sub_district: self.sub_district.trim().to_string(),
            district: self.district.trim().to_string(),
            province: self.province.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
        }
    }
}

/// Raw registration input as submitted by the form or an admin edit.
///
/// Every field defaults to empty so that absent input surfaces as a
/// validation error naming the field rather than a decoding error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: u32,
    pub event_type: Option<EventType>,
    pub shirt_size: String,
    pub other_shirt_size: Option<String>,
    pub delivery_method: Option<DeliveryMethod>,
    pub shipping_address: Option<ShippingAddress>,
    pub emergency_phone: String,
}

/// The editable part of a registration, after validation and normalization.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RegistrationDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: u32,
    pub event_type: EventType,
    pub shirt_size: String,
    pub delivery_method: DeliveryMethod,
    pub shipping_address: Option<ShippingAddress>,
    pub emergency_phone: String,
}

fn required(field: &'static str, value: &str) -> Result<String, RaceError> {
    let value = value.trim();
    if value.is_empty() {
        Err(RaceError::ValidationError(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

/// Trims an email the same way for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

impl RegistrationForm {
    pub fn validate(self) -> Result<RegistrationDetails, RaceError> {
        let first_name = required("first_name", &self.first_name)?;
        let last_name = required("last_name", &self.last_name)?;
        let email = required("email", &self.email)?;
        let phone = required("phone", &self.phone)?;
        let emergency_phone = required("emergency_phone", &self.emergency_phone)?;

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(RaceError::ValidationError(format!(
                    "email {} is malformed",
                    email
                )));
            }
        }

        if self.age == 0 {
            return Err(RaceError::ValidationError("age is required".to_string()));
        }

        let event_type = self
            .event_type
            .ok_or_else(|| RaceError::ValidationError("event_type is required".to_string()))?;

        let shirt_size = match required("shirt_size", &self.shirt_size)?.as_str() {
            "other" => required(
                "other_shirt_size",
                self.other_shirt_size.as_deref().unwrap_or_default(),
            )?,
            size if SHIRT_SIZES.contains(&size) => size.to_string(),
            size => {
                return Err(RaceError::ValidationError(format!(
                    "Unknown shirt size: {}",
                    size
                )));
            }
        };

        let delivery_method = self.delivery_method.ok_or_else(|| {
            RaceError::ValidationError("delivery_method is required".to_string())
        })?;

        let shipping_address = match delivery_method {
            DeliveryMethod::Pickup => None,
            DeliveryMethod::Shipping => {
                let address = self.shipping_address.ok_or_else(|| {
                    RaceError::ValidationError(
                        "shipping_address is required for shipping".to_string(),
                    )
                })?;
                let missing = address.missing_fields();
                if !missing.is_empty() {
                    return Err(RaceError::ValidationError(format!(
                        "shipping_address is incomplete: missing {}",
                        missing.join(", ")
                    )));
                }
                Some(address.trimmed())
            }
        };

        Ok(RegistrationDetails {
            first_name,
            last_name,
            email: normalize_email(&email),
            phone,
            age: self.age,
            event_type,
            shirt_size,
            delivery_method,
            shipping_address,
            emergency_phone,
        })
    }
}

/// A participant's entry in the event.
///
/// `payment_status` mirrors the owning payment's status and is only written
/// together with it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Registration {
    pub id: RegistrationId,
    #[serde(flatten)]
    pub details: RegistrationDetails,
    pub payment_status: PaymentStatus,
    pub shipping_status: Option<ShippingStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(id: RegistrationId, details: RegistrationDetails, now: DateTime<Utc>) -> Self {
        let shipping_status = match details.delivery_method {
            DeliveryMethod::Shipping => Some(ShippingStatus::Pending),
            DeliveryMethod::Pickup => None,
        };
        Self {
            id,
            details,
            payment_status: PaymentStatus::Pending,
            shipping_status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the editable fields, leaving status and timestamps of
    /// creation untouched.
    pub fn apply_details(&mut self, details: RegistrationDetails, now: DateTime<Utc>) {
        self.shipping_status = match details.delivery_method {
            DeliveryMethod::Shipping => Some(self.shipping_status.unwrap_or_default()),
            DeliveryMethod::Pickup => None,
        };
        self.details = details;
        self.updated_at = now;
    }

    pub fn email(&self) -> &str {
        &self.details.email
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pickup_form(email: &str) -> RegistrationForm {
        RegistrationForm {
            first_name: "Somchai".to_string(),
            last_name: "Jaidee".to_string(),
            email: email.to_string(),
            phone: "0812345678".to_string(),
            age: 31,
            event_type: Some(EventType::MiniMarathon),
            shirt_size: "M".to_string(),
            other_shirt_size: None,
            delivery_method: Some(DeliveryMethod::Pickup),
            shipping_address: None,
            emergency_phone: "0898765432".to_string(),
        }
    }

    #[test]
    fn test_valid_pickup_form() {
        let details = pickup_form("  runner@example.com ").validate().unwrap();
        assert_eq!(details.email, "runner@example.com");
        assert_eq!(details.shipping_address, None);
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut form = pickup_form("runner@example.com");
        form.phone = "   ".to_string();
        let err = form.validate().unwrap_err();
        assert!(matches!(err, RaceError::ValidationError(msg) if msg.contains("phone")));
    }

    #[test]
    fn test_shipping_requires_complete_address() {
        let mut form = pickup_form("runner@example.com");
        form.delivery_method = Some(DeliveryMethod::Shipping);
        assert!(matches!(
            form.clone().validate(),
            Err(RaceError::ValidationError(_))
        ));

        form.shipping_address = Some(ShippingAddress {
            address: "99 Moo 1".to_string(),
            sub_district: "Nai Mueang".to_string(),
            district: "".to_string(),
            province: "Khon Kaen".to_string(),
            postal_code: "40000".to_string(),
        });
        let err = form.validate().unwrap_err();
        assert!(matches!(err, RaceError::ValidationError(msg) if msg.contains("district")));
    }

    #[test]
    fn test_other_shirt_size_replaces_token() {
        let mut form = pickup_form("runner@example.com");
        form.shirt_size = "other".to_string();
        assert!(form.clone().validate().is_err());

        form.other_shirt_size = Some("6XL".to_string());
        assert_eq!(form.validate().unwrap().shirt_size, "6XL");
    }

    #[test]
    fn test_event_type_tokens() {
        let parsed: EventType = serde_json::from_str("\"minimarathon\"").unwrap();
        assert_eq!(parsed, EventType::MiniMarathon);
        assert!(matches!(
            "marathon".parse::<EventType>(),
            Err(RaceError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_switching_to_pickup_clears_shipping_status() {
        let now = Utc::now();
        let mut form = pickup_form("runner@example.com");
        form.delivery_method = Some(DeliveryMethod::Shipping);
        form.shipping_address = Some(ShippingAddress {
            address: "99 Moo 1".to_string(),
            sub_district: "Nai Mueang".to_string(),
            district: "Mueang".to_string(),
            province: "Khon Kaen".to_string(),
            postal_code: "40000".to_string(),
        });
        let mut registration = Registration::new(1, form.validate().unwrap(), now);
        assert_eq!(registration.shipping_status, Some(ShippingStatus::Pending));

        let pickup = pickup_form("runner@example.com").validate().unwrap();
        registration.apply_details(pickup, now);
        assert_eq!(registration.shipping_status, None);
        assert_eq!(registration.payment_status, PaymentStatus::Pending);
    }
}
