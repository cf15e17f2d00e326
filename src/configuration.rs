use std::fmt;
use std::time::Duration;

use config::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub jwt: JwtSettings,
}

/// JWT signing settings, one secret and lifetime per token class
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds (86400 = 1 day)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds (604800 = 7 days)
}

fn default_access_token_expiry() -> i64 {
    24 * 60 * 60
}

fn default_refresh_token_expiry() -> i64 {
    7 * 24 * 60 * 60
}

impl JwtSettings {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
        }
    }

    pub fn access_horizon(&self) -> Duration {
        Duration::from_secs(self.access_token_expiry.max(0) as u64)
    }

    pub fn refresh_horizon(&self) -> Duration {
        Duration::from_secs(self.refresh_token_expiry.max(0) as u64)
    }

    /// Reject settings that would mint unusable or cross-verifiable tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::Message("jwt.access_secret must not be empty".into()));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::Message("jwt.refresh_secret must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::Message(
                "jwt.access_secret and jwt.refresh_secret must differ".into(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::Message("jwt token expiry must be positive".into()));
        }
        Ok(())
    }
}

// Secrets never reach logs
impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// Load settings from an optional `configuration` file overlaid with
/// `APP__`-prefixed environment variables (e.g. `APP__JWT__ACCESS_SECRET`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.jwt.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_one_day_and_one_week() {
        let settings = JwtSettings::new("access", "refresh");
        assert_eq!(settings.access_horizon(), Duration::from_secs(86_400));
        assert_eq!(settings.refresh_horizon(), Duration::from_secs(604_800));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_shared_secret_is_rejected() {
        let settings = JwtSettings::new("same", "same");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let settings = JwtSettings::new("", "refresh");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_expiry_is_rejected() {
        let mut settings = JwtSettings::new("access", "refresh");
        settings.refresh_token_expiry = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = JwtSettings::new("very-secret-a", "very-secret-r");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_deserialize_applies_default_expiry() {
        let settings: JwtSettings = config::Config::builder()
            .set_override("access_secret", "a")
            .unwrap()
            .set_override("refresh_secret", "r")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.access_token_expiry, 86_400);
        assert_eq!(settings.refresh_token_expiry, 604_800);
    }
}
