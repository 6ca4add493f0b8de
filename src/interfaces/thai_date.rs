//! Timestamp rendering in the event's local convention: Asia/Bangkok (UTC+7,
//! no daylight saving) with Thai month names.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

const BANGKOK: FixedOffset = match FixedOffset::east_opt(7 * 3600) {
    Some(offset) => offset,
    None => panic!("UTC+7 is a valid offset"),
};

const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// `dd MMMM yyyy HH:mm น.`, e.g. `05 มีนาคม 2025 14:30 น.`
pub fn format_long(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&BANGKOK);
    format!(
        "{:02} {} {} {:02}:{:02} น.",
        local.day(),
        THAI_MONTHS[local.month0() as usize],
        local.year(),
        local.hour(),
        local.minute()
    )
}
