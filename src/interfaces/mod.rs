//! Adapters between the outside world and `RaceDesk`.

pub mod csv;
pub mod jsonl;
pub mod thai_date;
