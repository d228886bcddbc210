//! Command definitions
//!
//! Commands represent intake requests to change the system state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Amount;

// =========================================================================
// CreateUserCommand
// =========================================================================

/// Command to register a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub name: String,
    /// The user never goes through verification (and gets no starting credit)
    pub skip_verification: bool,
}

impl CreateUserCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip_verification: false,
        }
    }

    pub fn skipping_verification(mut self) -> Self {
        self.skip_verification = true;
        self
    }
}

// =========================================================================
// CreateTransactionCommand
// =========================================================================

/// Command to move funds between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionCommand {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: Amount,
}

impl CreateTransactionCommand {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, amount: Amount) -> Self {
        Self {
            sender_id,
            receiver_id,
            amount,
        }
    }
}
