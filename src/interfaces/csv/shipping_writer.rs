use crate::application::views::ShippingEntry;
use crate::domain::registration::ShippingStatus;
use crate::error::Result;
use crate::interfaces::thai_date;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ShippingRow<'a> {
    registration_id: u32,
    name: String,
    phone: &'a str,
    event: &'static str,
    shirt_size: &'a str,
    address: &'a str,
    sub_district: &'a str,
    district: &'a str,
    province: &'a str,
    postal_code: &'a str,
    shipping_status: ShippingStatus,
    registered_at: String,
}

/// Writes the shipping list as CSV, one parcel per row.
pub struct ShippingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ShippingWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_entries(&mut self, entries: &[ShippingEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(ShippingRow {
                registration_id: entry.registration_id,
                name: format!("{} {}", entry.first_name, entry.last_name),
                phone: &entry.phone,
                event: entry.event_type.label(),
                shirt_size: &entry.shirt_size,
                address: &entry.address.address,
                sub_district: &entry.address.sub_district,
                district: &entry.address.district,
                province: &entry.address.province,
                postal_code: &entry.address.postal_code,
                shipping_status: entry.shipping_status,
                registered_at: thai_date::format_long(entry.created_at),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
