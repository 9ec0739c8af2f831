use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Out-of-band channel that gets a plaintext token to the account owner.
#[async_trait]
pub trait TokenDelivery: Send + Sync {
    async fn deliver(&self, recipient: &str, token: &str, purpose: TokenPurpose)
        -> anyhow::Result<()>;
}

/// Records the issuance without the token itself.
#[derive(Debug, Clone, Default)]
pub struct LogDelivery;

#[async_trait]
impl TokenDelivery for LogDelivery {
    async fn deliver(
        &self,
        recipient: &str,
        _token: &str,
        purpose: TokenPurpose,
    ) -> anyhow::Result<()> {
        info!(recipient = %recipient, purpose = purpose.as_str(), "token issued for delivery");
        Ok(())
    }
}
