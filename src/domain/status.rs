use crate::error::RaceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state shared by a payment and the mirror field on its
/// registration.
///
/// `Pending -> PendingReview -> {Completed | Rejected}`. A rejected payment
/// may receive a new receipt and go back to `PendingReview`; a completed one
/// never accepts another receipt.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    PendingReview,
    Completed,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::PendingReview => "PENDING_REVIEW",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }

    /// Receipt ingestion is refused once the payment is confirmed.
    pub fn accepts_receipt(&self) -> bool {
        !matches!(self, PaymentStatus::Completed)
    }

    /// States an admin may still decide on.
    pub fn awaits_decision(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::PendingReview)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Rejected)
    }

    /// The two values a verification may set.
    pub fn is_decision(&self) -> bool {
        self.is_terminal()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PENDING_REVIEW" => Ok(PaymentStatus::PendingReview),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            other => Err(RaceError::InvalidDecision(other.to_string())),
        }
    }
}

/// Read-side grouping used by listings and the dashboard. Never used for
/// authorization.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    PendingLike,
    Rejected,
}

impl StatusFilter {
    pub fn matches(&self, status: PaymentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => status == PaymentStatus::Completed,
            StatusFilter::PendingLike => status.awaits_decision(),
            StatusFilter::Rejected => status == PaymentStatus::Rejected,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" | "pending-like" => Ok(StatusFilter::PendingLike),
            "rejected" => Ok(StatusFilter::Rejected),
            other => Err(RaceError::ValidationError(format!(
                "Unknown status filter: {}",
                other
            ))),
        }
    }
}
