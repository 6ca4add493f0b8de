use super::command_reader::Command;
use crate::application::engine::RaceDesk;
use crate::application::receipts::ReceiptUpload;
use crate::domain::admin::AdminSession;
use crate::domain::status::PaymentStatus;
use crate::error::Result;
use serde_json::{Value, json, to_value};
use std::path::{Path, PathBuf};

fn session(admin_id: Option<String>) -> AdminSession {
    match admin_id {
        Some(id) => AdminSession::authenticated(id),
        None => AdminSession::anonymous(),
    }
}

/// Guesses the media type from the file extension, the way a browser would
/// label the upload.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Runs replayed commands against a `RaceDesk`.
///
/// Receipt files named with a relative path are resolved against `base_dir`,
/// normally the directory holding the replay file.
pub struct Dispatcher<'a> {
    desk: &'a RaceDesk,
    base_dir: PathBuf,
}

impl<'a> Dispatcher<'a> {
    pub fn new(desk: &'a RaceDesk, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            desk,
            base_dir: base_dir.into(),
        }
    }

    /// Executes one command and returns its outcome as
    /// `{"op": <name>, "result": <value>}`.
    pub async fn execute(&self, command: Command) -> Result<Value> {
        let op = command.name();
        let result = match command {
            Command::Register { form } => to_value(self.desk.register(form).await?),
            Command::UpdateRegistration {
                registration_id,
                form,
            } => to_value(self.desk.update_registration(registration_id, form).await?),
            Command::Confirm { registration_id } => {
                to_value(self.desk.create_payment(registration_id).await?)
            }
            Command::UploadReceipt {
                registration_id,
                file,
                content_type,
                payment_method,
                amount,
            } => {
                let path = self.base_dir.join(file);
                let bytes = tokio::fs::read(&path).await?;
                let content_type =
                    content_type.unwrap_or_else(|| content_type_for(&path).to_string());
                to_value(
                    self.desk
                        .ingest_receipt(ReceiptUpload {
                            registration_id,
                            bytes,
                            content_type,
                            payment_method,
                            declared_amount: amount,
                        })
                        .await?,
                )
            }
            Command::CreateAdmin { username } => to_value(self.desk.create_admin(&username).await?),
            Command::Verify {
                admin_id,
                payment_id,
                decision,
                note,
            } => {
                let decision: PaymentStatus = decision.parse()?;
                to_value(
                    self.desk
                        .verify(&session(admin_id), payment_id, decision, note)
                        .await?,
                )
            }
            Command::Reconsider {
                admin_id,
                payment_id,
                note,
            } => to_value(
                self.desk
                    .reconsider(&session(admin_id), payment_id, note)
                    .await?,
            ),
            Command::CheckStatus { email } => to_value(self.desk.check_status(&email).await?),
            Command::PendingQuote { email } => to_value(self.desk.pending_quote(&email).await?),
            Command::MarkShipping {
                admin_id,
                registration_id,
                status,
            } => to_value(
                self.desk
                    .mark_shipping(&session(admin_id), registration_id, status)
                    .await?,
            ),
        }?;
        Ok(json!({ "op": op, "result": result }))
    }
}
