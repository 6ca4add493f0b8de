#![allow(dead_code)]

use racedesk::application::engine::RaceDesk;
use racedesk::domain::admin::AdminSession;
use racedesk::domain::registration::{
    DeliveryMethod, EventType, RegistrationForm, ShippingAddress,
};

pub fn form(email: &str, event_type: EventType) -> RegistrationForm {
    RegistrationForm {
        first_name: "Niran".to_string(),
        last_name: "Thongdee".to_string(),
        email: email.to_string(),
        phone: "0891234567".to_string(),
        age: 28,
        event_type: Some(event_type),
        shirt_size: "L".to_string(),
        other_shirt_size: None,
        delivery_method: Some(DeliveryMethod::Pickup),
        shipping_address: None,
        emergency_phone: "0817654321".to_string(),
    }
}

pub fn shipping_form(email: &str, event_type: EventType) -> RegistrationForm {
    RegistrationForm {
        delivery_method: Some(DeliveryMethod::Shipping),
        shipping_address: Some(ShippingAddress {
            address: "45 Ratchadamnoen Rd".to_string(),
            sub_district: "Phra Sing".to_string(),
            district: "Mueang Chiang Mai".to_string(),
            province: "Chiang Mai".to_string(),
            postal_code: "50200".to_string(),
        }),
        ..form(email, event_type)
    }
}

/// A desk with one admin, and a session for it.
pub async fn desk_with_admin() -> (RaceDesk, AdminSession) {
    let desk = RaceDesk::in_memory();
    let admin = desk.create_admin("staff").await.unwrap();
    (desk, AdminSession::authenticated(admin.id.to_string()))
}

/// A tiny PNG-looking payload of the requested size.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let magic = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    let n = magic.len().min(len);
    bytes[..n].copy_from_slice(&magic[..n]);
    bytes
}
