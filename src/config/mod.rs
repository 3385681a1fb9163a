use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub payouts: PayoutConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub admin_api_key: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    #[default]
    Live,
    Test,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,
    pub live_key_secret: Option<String>,
    pub test_key_secret: Option<String>,
}

impl GatewayConfig {
    /// Secret used to verify confirmations issued in the given mode.
    pub fn key_secret(&self, mode: GatewayMode) -> Option<&str> {
        let secret = match mode {
            GatewayMode::Live => self.live_key_secret.as_deref(),
            GatewayMode::Test => self.test_key_secret.as_deref(),
        };
        secret.filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub compensation_attempts: u32,
    pub compensation_backoff_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            compensation_attempts: 3,
            compensation_backoff_ms: 50,
        }
    }
}

/// Which order timestamp starts the payout eligibility window.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityAnchor {
    #[default]
    DeliveredAt,
    UpdatedAt,
}

impl EligibilityAnchor {
    pub fn column(&self) -> &'static str {
        match self {
            EligibilityAnchor::DeliveredAt => "delivered_at",
            EligibilityAnchor::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PayoutConfig {
    pub enabled: bool,
    pub platform_fee_bps: i64,
    pub eligibility_days: i64,
    #[serde(default)]
    pub eligibility_anchor: EligibilityAnchor,
    pub interval_secs: u64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            platform_fee_bps: 390,
            eligibility_days: 7,
            eligibility_anchor: EligibilityAnchor::DeliveredAt,
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub from_address: String,
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            timeout_secs: 10,
            from_address: "Storefront <no-reply@localhost>".to_string(),
            smtp: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://settlement.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("gateway.mode", "live")?
            .set_default("ledger.compensation_attempts", 3)?
            .set_default("ledger.compensation_backoff_ms", 50)?
            .set_default("payouts.enabled", true)?
            .set_default("payouts.platform_fee_bps", 390)?
            .set_default("payouts.eligibility_days", 7)?
            .set_default("payouts.interval_secs", 3600)?
            .set_default("notifications.queue_capacity", 256)?
            .set_default("notifications.timeout_secs", 10)?
            .set_default("notifications.from_address", "Storefront <no-reply@localhost>")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with SETTLEMENT__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("SETTLEMENT").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://settlement.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                admin_api_key: "change-me-in-production".to_string(),
            },
            gateway: GatewayConfig::default(),
            ledger: LedgerConfig::default(),
            payouts: PayoutConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_secret_follows_mode() {
        let gateway = GatewayConfig {
            mode: GatewayMode::Test,
            live_key_secret: Some("live".to_string()),
            test_key_secret: Some(String::new()),
        };
        assert_eq!(gateway.key_secret(GatewayMode::Live), Some("live"));
        assert_eq!(gateway.key_secret(GatewayMode::Test), None);
    }
}
