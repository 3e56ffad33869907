use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "sme-invoice-tool";
const KEYCHAIN_SERVICE: &str = "sme.invoice.credentials";

/// Keychain entry holding the Africa's Talking api key.
pub const API_KEY_SECRET: &str = "africastalking_api_key";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Provider account username; "sandbox" selects sandbox behavior.
    #[serde(default = "default_username")]
    pub username: String,
    /// "sandbox" | "live".
    #[serde(default = "default_environment")]
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Approved sender id for live traffic. Unused in sandbox.
    #[serde(default)]
    pub sender_id: String,
    /// Inbound shortcode whose messages enter the menu engine.
    #[serde(default = "default_shortcode")]
    pub shortcode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_product_name")]
    pub product_name: String,
    /// Mobile-money operator channel: Mpesa, AirtelMoney, TigoPesa, …
    #[serde(default = "default_provider_channel")]
    pub provider_channel: String,
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "mock" | "africastalking"
    #[serde(default = "default_provider_kind")]
    pub kind: String,
}

fn default_username() -> String {
    "sandbox".to_string()
}

fn default_environment() -> String {
    "sandbox".to_string()
}

fn default_shortcode() -> String {
    "18338".to_string()
}

fn default_product_name() -> String {
    "Sandbox".to_string()
}

fn default_provider_channel() -> String {
    "Mpesa".to_string()
}

fn default_currency_code() -> String {
    "TZS".to_string()
}

fn default_provider_kind() -> String {
    "mock".to_string()
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            environment: default_environment(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            sender_id: String::new(),
            shortcode: default_shortcode(),
        }
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            provider_channel: default_provider_channel(),
            currency_code: default_currency_code(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
        }
    }
}

impl AppConfig {
    pub fn is_sandbox(&self) -> bool {
        self.account.username.eq_ignore_ascii_case("sandbox")
            || self.account.environment.eq_ignore_ascii_case("sandbox")
    }

    /// Sandbox requires an empty `from` address; live traffic uses the
    /// approved sender id.
    pub fn resolve_from_address(&self) -> String {
        if self.is_sandbox() {
            String::new()
        } else {
            self.messaging.sender_id.clone()
        }
    }
}

pub fn load() -> Result<AppConfig> {
    let cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    Ok(cfg)
}

pub fn store(cfg: &AppConfig) -> Result<()> {
    confy::store(APP_NAME, None, cfg).context("Failed to store app config")?;
    Ok(())
}

/// Applies `AT_*` environment variables on top of the file config, so a
/// deployment can be driven entirely from the environment.
pub fn overlay_env(cfg: &mut AppConfig) {
    let overrides: [(&str, &mut String); 8] = [
        ("AT_USERNAME", &mut cfg.account.username),
        ("AT_ENV", &mut cfg.account.environment),
        ("AT_SENDER_ID", &mut cfg.messaging.sender_id),
        ("AT_SHORTCODE", &mut cfg.messaging.shortcode),
        ("AT_PRODUCT_NAME", &mut cfg.payments.product_name),
        ("AT_MMO_CHANNEL", &mut cfg.payments.provider_channel),
        ("AT_CURRENCY", &mut cfg.payments.currency_code),
        ("AT_PROVIDER", &mut cfg.provider.kind),
    ];
    for (var, slot) in overrides {
        if let Ok(value) = std::env::var(var) {
            *slot = value;
        }
    }
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Delete a secret from the OS keychain
pub fn delete_secret(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.delete_password()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_account_sends_from_empty_address() {
        let cfg = AppConfig::default();
        assert!(cfg.is_sandbox());
        assert_eq!(cfg.resolve_from_address(), "");
    }

    #[test]
    fn live_account_uses_sender_id() {
        let mut cfg = AppConfig::default();
        cfg.account.username = "my-sme".into();
        cfg.account.environment = "live".into();
        cfg.messaging.sender_id = "18338".into();
        assert!(!cfg.is_sandbox());
        assert_eq!(cfg.resolve_from_address(), "18338");
    }

    #[test]
    fn defaults_match_the_tanzanian_deployment() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.messaging.shortcode, "18338");
        assert_eq!(cfg.payments.currency_code, "TZS");
        assert_eq!(cfg.payments.provider_channel, "Mpesa");
        assert_eq!(cfg.provider.kind, "mock");
    }
}
