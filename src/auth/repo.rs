use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Account, LoginFailure, NewAccount};

/// Persistence seam of the account lifecycle.
///
/// Every mutating method is a single statement, so each one is atomic per
/// account without the caller holding a transaction open.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>>;

    /// Inserts the account, or returns `None` when the email is already taken.
    async fn create(&self, account: NewAccount) -> anyhow::Result<Option<Account>>;

    /// Increments the failure counter and sets `locked_until` once the new
    /// count reaches `threshold`.
    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_until: OffsetDateTime,
    ) -> anyhow::Result<LoginFailure>;

    async fn record_login_success(&self, id: Uuid, now: OffsetDateTime) -> anyhow::Result<()>;

    /// Marks the email verified if `fingerprint` is still the pending one.
    async fn consume_email_verification(&self, id: Uuid, fingerprint: &str)
        -> anyhow::Result<bool>;

    async fn store_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Swaps the password hash if `fingerprint` is pending and unexpired at `now`.
    async fn complete_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> anyhow::Result<bool>;
}

const ACCOUNT_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, role, email_verified,
    email_verification_hash, password_reset_hash, password_reset_expires,
    is_active, failed_login_attempts, locked_until, last_login_at, created_at
"#;

#[derive(Clone)]
pub struct PgAccountRepository {
    db: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find account by email")?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find account by id")?;
        Ok(account)
    }

    async fn create(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, email_verification_hash)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.email_verification_hash)
            .fetch_optional(&self.db)
            .await
            .context("insert account")?;
        Ok(created)
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_until: OffsetDateTime,
    ) -> anyhow::Result<LoginFailure> {
        let failure = sqlx::query_as::<_, LoginFailure>(
            r#"
            UPDATE users
               SET failed_login_attempts = failed_login_attempts + 1,
                   locked_until = CASE
                       WHEN failed_login_attempts + 1 >= $2 THEN $3
                       ELSE locked_until
                   END,
                   updated_at = now()
             WHERE id = $1
            RETURNING failed_login_attempts, locked_until
            "#,
        )
        .bind(id)
        .bind(threshold)
        .bind(lock_until)
        .fetch_one(&self.db)
        .await
        .context("record login failure")?;
        Ok(failure)
    }

    async fn record_login_success(&self, id: Uuid, now: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET failed_login_attempts = 0,
                   last_login_at = $2,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.db)
        .await
        .context("record login success")?;
        Ok(())
    }

    async fn consume_email_verification(
        &self,
        id: Uuid,
        fingerprint: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET email_verified = TRUE,
                   email_verification_hash = NULL,
                   updated_at = now()
             WHERE id = $1 AND email_verification_hash = $2
            "#,
        )
        .bind(id)
        .bind(fingerprint)
        .execute(&self.db)
        .await
        .context("consume email verification")?;
        Ok(res.rows_affected() == 1)
    }

    async fn store_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_reset_hash = $2,
                   password_reset_expires = $3,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("store password reset")?;
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $4,
                   password_reset_hash = NULL,
                   password_reset_expires = NULL,
                   updated_at = now()
             WHERE id = $1
               AND password_reset_hash = $2
               AND password_reset_expires >= $3
            "#,
        )
        .bind(id)
        .bind(fingerprint)
        .bind(now)
        .bind(new_password_hash)
        .execute(&self.db)
        .await
        .context("complete password reset")?;
        Ok(res.rows_affected() == 1)
    }
}
