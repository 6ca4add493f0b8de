use crate::domain::payment::PaymentMethod;
use crate::domain::registration::{RegistrationForm, ShippingStatus};
use crate::domain::{PaymentId, RegistrationId};
use crate::error::{RaceError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

/// One lifecycle operation, as written in a replay file.
///
/// Admin operations carry the session inline: `admin_id` absent means the
/// call is anonymous.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Register {
        form: RegistrationForm,
    },
    UpdateRegistration {
        registration_id: RegistrationId,
        form: RegistrationForm,
    },
    /// Confirms a registration by creating its payment.
    Confirm {
        registration_id: RegistrationId,
    },
    UploadReceipt {
        registration_id: RegistrationId,
        file: PathBuf,
        #[serde(default)]
        content_type: Option<String>,
        #[serde(default)]
        payment_method: Option<PaymentMethod>,
        #[serde(default)]
        amount: Option<Decimal>,
    },
    CreateAdmin {
        username: String,
    },
    Verify {
        #[serde(default)]
        admin_id: Option<String>,
        payment_id: PaymentId,
        decision: String,
        #[serde(default)]
        note: Option<String>,
    },
    Reconsider {
        #[serde(default)]
        admin_id: Option<String>,
        payment_id: PaymentId,
        #[serde(default)]
        note: Option<String>,
    },
    CheckStatus {
        email: String,
    },
    PendingQuote {
        email: String,
    },
    MarkShipping {
        #[serde(default)]
        admin_id: Option<String>,
        registration_id: RegistrationId,
        status: ShippingStatus,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::UpdateRegistration { .. } => "update_registration",
            Command::Confirm { .. } => "confirm",
            Command::UploadReceipt { .. } => "upload_receipt",
            Command::CreateAdmin { .. } => "create_admin",
            Command::Verify { .. } => "verify",
            Command::Reconsider { .. } => "reconsider",
            Command::CheckStatus { .. } => "check_status",
            Command::PendingQuote { .. } => "pending_quote",
            Command::MarkShipping { .. } => "mark_shipping",
        }
    }
}

/// Reads commands from a JSON-lines source.
///
/// Blank lines and lines starting with `#` are skipped. Each remaining line
/// yields its own `Result`, so one malformed line does not stop the stream.
pub struct CommandReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Lazily parses commands, one per line.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader.lines().filter_map(|line| match line {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    Some(serde_json::from_str(line).map_err(RaceError::from))
                }
            }
            Err(e) => Some(Err(RaceError::from(e))),
        })
    }
}
