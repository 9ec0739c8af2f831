//! In-memory `AccountRepository` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::AccountRepository;
use crate::auth::repo_types::{Account, LoginFailure, NewAccount};

#[derive(Default)]
pub struct MemoryAccounts {
    rows: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccounts {
    pub fn get(&self, email: &str) -> Option<Account> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned()
    }

    pub fn update(&self, email: &str, f: impl FnOnce(&mut Account)) {
        let mut rows = self.rows.lock().unwrap();
        let account = rows
            .values_mut()
            .find(|a| a.email == email)
            .expect("account exists");
        f(account);
    }

    fn with_id<T>(&self, id: Uuid, f: impl FnOnce(&mut Account) -> T) -> anyhow::Result<T> {
        let mut rows = self.rows.lock().unwrap();
        let account = rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no account {id}"))?;
        Ok(f(account))
    }
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.get(email))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|a| a.email == account.email) {
            return Ok(None);
        }
        let row = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            role: "user".into(),
            email_verified: false,
            email_verification_hash: Some(account.email_verification_hash),
            password_reset_hash: None,
            password_reset_expires: None,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_until: OffsetDateTime,
    ) -> anyhow::Result<LoginFailure> {
        self.with_id(id, |a| {
            a.failed_login_attempts += 1;
            if a.failed_login_attempts >= threshold {
                a.locked_until = Some(lock_until);
            }
            LoginFailure {
                failed_login_attempts: a.failed_login_attempts,
                locked_until: a.locked_until,
            }
        })
    }

    async fn record_login_success(&self, id: Uuid, now: OffsetDateTime) -> anyhow::Result<()> {
        self.with_id(id, |a| {
            a.failed_login_attempts = 0;
            a.last_login_at = Some(now);
        })
    }

    async fn consume_email_verification(
        &self,
        id: Uuid,
        fingerprint: &str,
    ) -> anyhow::Result<bool> {
        self.with_id(id, |a| {
            if a.email_verification_hash.as_deref() == Some(fingerprint) {
                a.email_verified = true;
                a.email_verification_hash = None;
                true
            } else {
                false
            }
        })
    }

    async fn store_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.with_id(id, |a| {
            a.password_reset_hash = Some(fingerprint.to_string());
            a.password_reset_expires = Some(expires_at);
        })
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        fingerprint: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> anyhow::Result<bool> {
        self.with_id(id, |a| {
            let pending = a.password_reset_hash.as_deref() == Some(fingerprint)
                && a.password_reset_expires.is_some_and(|exp| now <= exp);
            if pending {
                a.password_hash = new_password_hash.to_string();
                a.password_reset_hash = None;
                a.password_reset_expires = None;
            }
            pending
        })
    }
}
