use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User credential record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String, // trimmed, lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub email_verification_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<OffsetDateTime>,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Account {
    /// End of the lock still in force at `now`.
    pub fn lock_in_force_at(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.locked_until.filter(|until| *until > now)
    }

    /// Reset fingerprint still redeemable at `now` (expiry is inclusive).
    pub fn reset_pending_at(&self, now: OffsetDateTime) -> Option<&str> {
        match (&self.password_reset_hash, self.password_reset_expires) {
            (Some(hash), Some(expires)) if now <= expires => Some(hash.as_str()),
            _ => None,
        }
    }
}

/// Fields needed to insert a fresh account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verification_hash: String,
}

/// Counter state after a wrong-password attempt was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct LoginFailure {
    pub failed_login_attempts: i32,
    pub locked_until: Option<OffsetDateTime>,
}
