use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    delivery::{TokenDelivery, TokenPurpose},
    dto::PublicAccount,
    error::{AuthError, AuthResult},
    password::{hash_password, verify_dummy, verify_password},
    repo::AccountRepository,
    repo_types::NewAccount,
    tokens::{fingerprint, generate_token, matches_fingerprint},
};
use crate::config::AuthPolicy;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn minutes_after(now: OffsetDateTime, minutes: i64) -> AuthResult<OffsetDateTime> {
    minutes
        .checked_mul(60)
        .map(Duration::seconds)
        .and_then(|window| now.checked_add(window))
        .ok_or_else(|| {
            AuthError::Internal(anyhow::anyhow!("window of {minutes} minutes out of range"))
        })
}

/// Result of a successful registration. The token leaves the service once.
#[derive(Debug)]
pub struct Registration {
    pub account: PublicAccount,
    pub verification_token: String,
}

/// Registration, login with lockout, email verification and password reset,
/// all operating on one account row through an [`AccountRepository`].
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    delivery: Arc<dyn TokenDelivery>,
    policy: AuthPolicy,
}

impl AccountService {
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        delivery: Arc<dyn TokenDelivery>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            repo,
            delivery,
            policy,
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> AuthResult<Registration> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("email and password required".into()));
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::InvalidInput("invalid email".into()));
        }

        if self.repo.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(password)?;
        let token = generate_token();
        let created = self
            .repo
            .create(NewAccount {
                email: email.clone(),
                password_hash,
                first_name,
                last_name,
                email_verification_hash: fingerprint(&token),
            })
            .await?
            // lost a race against a concurrent registration
            .ok_or(AuthError::Conflict)?;

        self.hand_off(&created.email, &token, TokenPurpose::EmailVerification)
            .await;

        info!(user_id = %created.id, email = %created.email, "user registered");
        Ok(Registration {
            account: PublicAccount::from(&created),
            verification_token: token,
        })
    }

    pub async fn verify_email(&self, email: &str, token: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        if email.is_empty() || token.is_empty() {
            return Err(AuthError::InvalidInput("token and email required".into()));
        }

        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let Some(stored) = account.email_verification_hash.as_deref() else {
            warn!(user_id = %account.id, "no verification pending");
            return Err(AuthError::InvalidToken);
        };
        if !matches_fingerprint(token, stored) {
            warn!(user_id = %account.id, "verification token mismatch");
            return Err(AuthError::InvalidToken);
        }
        if !self.repo.consume_email_verification(account.id, stored).await? {
            return Err(AuthError::InvalidToken);
        }

        info!(user_id = %account.id, "email verified");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<PublicAccount> {
        self.login_at(email, password, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn login_at(
        &self,
        email: &str,
        password: &str,
        now: OffsetDateTime,
    ) -> AuthResult<PublicAccount> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("email and password required".into()));
        }

        let Some(account) = self.repo.find_by_email(&email).await? else {
            verify_dummy(password);
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if let Some(until) = account.lock_in_force_at(now) {
            warn!(user_id = %account.id, "login while locked");
            return Err(AuthError::AccountLocked { until });
        }

        if !verify_password(password, &account.password_hash)? {
            let lock_until = minutes_after(now, self.policy.lockout_minutes)?;
            let failure = self
                .repo
                .record_login_failure(account.id, self.policy.max_failed_logins, lock_until)
                .await?;
            warn!(
                user_id = %account.id,
                attempts = failure.failed_login_attempts,
                "login invalid password"
            );
            return match failure.locked_until {
                Some(until) if until > now => Err(AuthError::AccountLocked { until }),
                _ => Err(AuthError::InvalidCredentials),
            };
        }

        if !account.is_active {
            warn!(user_id = %account.id, "login to disabled account");
            return Err(AuthError::AccountDisabled);
        }

        self.repo.record_login_success(account.id, now).await?;

        info!(user_id = %account.id, email = %account.email, "user logged in");
        let mut public = PublicAccount::from(&account);
        public.last_login_at = Some(now);
        Ok(public)
    }

    /// Issues a reset token when the account exists. Callers must answer
    /// identically either way.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<Option<String>> {
        self.request_password_reset_at(email, OffsetDateTime::now_utc())
            .await
    }

    pub(crate) async fn request_password_reset_at(
        &self,
        email: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Option<String>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email required".into()));
        }

        let token = generate_token();
        let digest = fingerprint(&token);

        let Some(account) = self.repo.find_by_email(&email).await? else {
            debug!(email = %email, "password reset for unknown email");
            return Ok(None);
        };

        let expires_at = minutes_after(now, self.policy.reset_ttl_minutes)?;
        self.repo
            .store_password_reset(account.id, &digest, expires_at)
            .await?;
        self.hand_off(&account.email, &token, TokenPurpose::PasswordReset)
            .await;

        info!(user_id = %account.id, "password reset issued");
        Ok(Some(token))
    }

    pub async fn complete_password_reset(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        self.complete_password_reset_at(email, token, new_password, OffsetDateTime::now_utc())
            .await
    }

    pub(crate) async fn complete_password_reset_at(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
        now: OffsetDateTime,
    ) -> AuthResult<()> {
        let email = normalize_email(email);
        if email.is_empty() || token.is_empty() || new_password.is_empty() {
            return Err(AuthError::InvalidInput(
                "token, password, and email required".into(),
            ));
        }

        let account = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let stored = match account.reset_pending_at(now) {
            Some(stored) if matches_fingerprint(token, stored) => stored.to_string(),
            _ => {
                warn!(user_id = %account.id, "invalid or expired reset token");
                return Err(AuthError::InvalidOrExpiredToken);
            }
        };

        let password_hash = hash_password(new_password)?;
        if !self
            .repo
            .complete_password_reset(account.id, &stored, now, &password_hash)
            .await?
        {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        info!(user_id = %account.id, "password reset completed");
        Ok(())
    }

    pub async fn find_public(&self, id: Uuid) -> AuthResult<PublicAccount> {
        let account = self.repo.find_by_id(id).await?.ok_or(AuthError::NotFound)?;
        Ok(PublicAccount::from(&account))
    }

    async fn hand_off(&self, recipient: &str, token: &str, purpose: TokenPurpose) {
        // The row is already committed; a failed hand-off must not undo it.
        if let Err(e) = self.delivery.deliver(recipient, token, purpose).await {
            warn!(error = %e, recipient = %recipient, purpose = purpose.as_str(), "token delivery failed");
        }
    }
}
