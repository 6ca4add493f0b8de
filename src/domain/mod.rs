//! Domain layer: records, the payment status model and the ports the
//! application layer drives.

pub mod admin;
pub mod money;
pub mod payment;
pub mod ports;
pub mod registration;
pub mod status;

pub type RegistrationId = u32;
pub type PaymentId = u32;
pub type AdminId = u32;
