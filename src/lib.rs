//! wallet_settle Library
//!
//! Asynchronous user verification and wallet-to-wallet settlement: intake
//! writes pending records and enqueues jobs, a bounded worker pool settles
//! them against in-memory stores.

pub mod aggregate;
pub mod api;
pub mod app;
pub mod audit;
pub mod config;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod store;

pub use app::App;
pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError};
pub use error::{AppError, AppResult, ErrorResponse};
