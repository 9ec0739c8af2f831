use anyhow::bail;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Thresholds of the credential lifecycle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AuthPolicy {
    pub max_failed_logins: i32,
    pub lockout_minutes: i64,
    pub reset_ttl_minutes: i64,
}

impl AuthPolicy {
    /// Longest lockout or reset window accepted from the environment (one week).
    pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;
    pub const MAX_FAILED_LOGINS_LIMIT: i32 = 1000;

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=Self::MAX_FAILED_LOGINS_LIMIT).contains(&self.max_failed_logins) {
            bail!(
                "AUTH_MAX_FAILED_LOGINS must be between 1 and {}, got {}",
                Self::MAX_FAILED_LOGINS_LIMIT,
                self.max_failed_logins
            );
        }
        if !(1..=Self::MAX_WINDOW_MINUTES).contains(&self.lockout_minutes) {
            bail!(
                "AUTH_LOCKOUT_MINUTES must be between 1 and {}, got {}",
                Self::MAX_WINDOW_MINUTES,
                self.lockout_minutes
            );
        }
        if !(1..=Self::MAX_WINDOW_MINUTES).contains(&self.reset_ttl_minutes) {
            bail!(
                "AUTH_RESET_TTL_MINUTES must be between 1 and {}, got {}",
                Self::MAX_WINDOW_MINUTES,
                self.reset_ttl_minutes
            );
        }
        Ok(())
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            max_failed_logins: 5,
            lockout_minutes: 15,
            reset_ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    pub access_token: Option<String>,
    pub api_base: String,
    pub back_url_base: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: String,
    pub jwt: JwtConfig,
    pub auth: AuthPolicy,
    pub payments: PaymentsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "bakeshop".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "bakeshop-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let defaults = AuthPolicy::default();
        let auth = AuthPolicy {
            max_failed_logins: env_parse("AUTH_MAX_FAILED_LOGINS", defaults.max_failed_logins),
            lockout_minutes: env_parse("AUTH_LOCKOUT_MINUTES", defaults.lockout_minutes),
            reset_ttl_minutes: env_parse("AUTH_RESET_TTL_MINUTES", defaults.reset_ttl_minutes),
        };
        auth.validate()?;
        let payments = PaymentsConfig {
            access_token: std::env::var("MERCADOPAGO_ACCESS_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            api_base: std::env::var("MERCADOPAGO_API_BASE")
                .unwrap_or_else(|_| "https://api.mercadopago.com".into()),
            back_url_base: std::env::var("MERCADOPAGO_BACK_URL_BASE")
                .unwrap_or_else(|_| "http://localhost:4200".into()),
            currency: std::env::var("MERCADOPAGO_CURRENCY").unwrap_or_else(|_| "MXN".into()),
        };
        Ok(Self {
            database_url,
            environment,
            jwt,
            auth,
            payments,
        })
    }

    /// Issued tokens are only echoed back to the caller outside production.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
