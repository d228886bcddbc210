//! User Aggregate
//!
//! User records and the one-way verification state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Aggregate;

/// Result of applying a verification job to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The user moved from unverified to verified
    Verified,
    /// The user was already verified; nothing changed
    AlreadyVerified,
    /// The user opted out of verification and stays unverified
    Exempt,
}

/// User Aggregate
///
/// A user is created unverified. The verification job flips `is_verified`
/// exactly once, unless `skip_verification` is set, in which case the user
/// stays unverified forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    id: Uuid,

    /// Display name
    name: String,

    /// Whether verification has completed
    is_verified: bool,

    /// User never needs verification
    skip_verification: bool,

    /// When the user was created
    created_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified user
    pub fn create(id: Uuid, name: String, skip_verification: bool) -> Self {
        Self {
            id,
            name,
            is_verified: false,
            skip_verification,
            created_at: Utc::now(),
        }
    }

    /// Apply verification
    ///
    /// Idempotent: verifying a verified user reports `AlreadyVerified` and
    /// changes nothing.
    pub fn verify(&mut self) -> VerificationOutcome {
        if self.skip_verification {
            return VerificationOutcome::Exempt;
        }
        if self.is_verified {
            return VerificationOutcome::AlreadyVerified;
        }
        self.is_verified = true;
        VerificationOutcome::Verified
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn skip_verification(&self) -> bool {
        self.skip_verification
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Aggregate for User {
    fn aggregate_type() -> &'static str {
        "User"
    }

    fn key(&self) -> Uuid {
        self.id
    }
}
