use super::registration::EventType;
use crate::error::RaceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A positive amount of money in Thai baht.
///
/// Wraps `rust_decimal::Decimal` so entry fees can never be zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, RaceError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(RaceError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = RaceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Entry fee per event type, consulted once when a payment is created.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    prices: HashMap<EventType, Amount>,
}

impl PriceTable {
    pub fn standard() -> Self {
        let prices = HashMap::from([
            (EventType::FunRun, Amount(dec!(400))),
            (EventType::MiniMarathon, Amount(dec!(500))),
            (EventType::Vip, Amount(dec!(1000))),
        ]);
        Self { prices }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (EventType, Amount)>) -> Self {
        Self {
            prices: entries.into_iter().collect(),
        }
    }

    pub fn price_for(&self, event_type: EventType) -> Result<Amount, RaceError> {
        self.prices
            .get(&event_type)
            .copied()
            .ok_or_else(|| RaceError::UnknownEventType(event_type.to_string()))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::standard()
    }
}
