//! Application layer orchestrating the registration and payment lifecycle.
//!
//! `RaceDesk` is the single entry point. Its operations are split by concern
//! across the submodules, all as `impl RaceDesk` blocks over the same ports.

pub mod engine;
pub mod payments;
pub mod receipts;
pub mod registrations;
pub mod shipping;
pub mod verification;
pub mod views;
