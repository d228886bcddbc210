//! Job and intake handlers
//!
//! Intake writes initial records and enqueues jobs; the job handlers re-read
//! those records when a worker picks the job up and apply the transition.

mod commands;
mod dispatch;
mod intake;
mod transfer_handler;
mod user_handler;


pub use commands::*;
pub use dispatch::JobDispatcher;
pub use intake::{IntakeService, UserView};
pub use transfer_handler::SettlementHandler;
pub use user_handler::VerifyUserHandler;
