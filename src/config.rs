//! Runtime configuration loaded from environment variables.
//!
//! Each service gets its own config struct with a `from_env` constructor and
//! explicit constructors for tests. Values are read once at startup and the
//! resulting structs are passed into the components that need them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::LlmError;

/// Default model for the generation service.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default OpenAI-compatible API root.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
/// Sampling temperature sent with every completion request.
pub const TEMPERATURE: f32 = 0.1;
/// Consecutive failed logins that lock an account.
pub const DEFAULT_MAX_FAIL_COUNT: u32 = 5;
/// Default recommend endpoint for the gateway.
pub const DEFAULT_RECOMMEND_URL: &str = "http://localhost:8000/recommend";
/// Signing secret used only when explicitly allowed for local development.
pub const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET_KEY is not set (pass --dev-secret to use an insecure development secret)")]
    MissingSecret,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Filesystem layout for both generators.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Directory holding `ssot_index.yaml`; index paths resolve against it.
    pub base_dir: PathBuf,
    /// Root for generated code artifacts (SSOT_OUTPUT_DIR).
    pub output_dir: PathBuf,
    /// Directory holding `<feature>_feature_spec.yaml` files (SSOT_SPECS_DIR).
    pub specs_dir: PathBuf,
    /// Root for generated SSOT documents (SSOT_AUTO_FEATURES_DIR).
    pub auto_features_dir: PathBuf,
}

impl GeneratorConfig {
    /// Load from environment variables, defaulting everything under SSOT_BASE_DIR.
    pub fn from_env() -> Self {
        let base_dir = PathBuf::from(env_or("SSOT_BASE_DIR", "."));
        let mut config = Self::with_base_dir(base_dir);
        if let Ok(dir) = std::env::var("SSOT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SSOT_SPECS_DIR") {
            config.specs_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("SSOT_AUTO_FEATURES_DIR") {
            config.auto_features_dir = PathBuf::from(dir);
        }
        config
    }

    /// Standard layout rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            output_dir: base_dir.join("generated"),
            specs_dir: base_dir.join("feature_specs"),
            auto_features_dir: base_dir.join("auto_features"),
            base_dir,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(crate::ssot::INDEX_FILE_NAME)
    }
}

/// Settings for the live generation client.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    /// Load from environment variables.
    ///
    /// A missing `OPENAI_API_KEY` is fatal for the generator commands.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        Ok(Self {
            api_key,
            base_url: env_or("OPENAI_BASE_URL", DEFAULT_LLM_BASE_URL),
            model: env_or("SSOT_LLM_MODEL", DEFAULT_MODEL),
        })
    }

    /// Explicit configuration with default model settings.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Token signing settings shared by the recommend service and the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// `JWT_SECRET_KEY` is required unless `allow_dev_secret` is set.
    pub fn from_env(allow_dev_secret: bool) -> Result<Self, ConfigError> {
        let ttl = env_parse("JWT_EXPIRE_SECONDS").unwrap_or(3600);
        Self::resolve(
            std::env::var("JWT_SECRET_KEY").ok(),
            Duration::from_secs(ttl),
            allow_dev_secret,
        )
    }

    pub fn resolve(
        secret: Option<String>,
        token_ttl: Duration,
        allow_dev_secret: bool,
    ) -> Result<Self, ConfigError> {
        match secret.filter(|s| !s.trim().is_empty()) {
            Some(secret) => Ok(Self::new(secret, token_ttl)),
            None if allow_dev_secret => {
                tracing::warn!("JWT_SECRET_KEY not set, using development secret");
                Ok(Self::new(DEV_SECRET, token_ttl))
            }
            None => Err(ConfigError::MissingSecret),
        }
    }

    pub fn new(secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            token_ttl,
        }
    }
}

// Keep the secret out of debug output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Login service settings.
#[derive(Clone, Debug)]
pub struct LoginConfig {
    /// SQLite file (APP_DB_PATH). `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
    pub max_fail_count: u32,
    pub bcrypt_cost: u32,
}

impl LoginConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("APP_DB_PATH").ok().map(PathBuf::from),
            max_fail_count: env_parse("LOGIN_MAX_FAIL_COUNT").unwrap_or(DEFAULT_MAX_FAIL_COUNT),
            bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(bcrypt::DEFAULT_COST),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_fail_count: DEFAULT_MAX_FAIL_COUNT,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Gateway settings for the `/ask` proxy.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub recommend_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let timeout = env_parse("RECOMMEND_TIMEOUT_SECS").unwrap_or(5);
        Self::new(
            env_or("RECOMMEND_URL", DEFAULT_RECOMMEND_URL),
            Duration::from_secs(timeout),
        )
    }

    pub fn new(recommend_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            recommend_url: recommend_url.into(),
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_layout_is_rooted_at_base_dir() {
        let config = GeneratorConfig::with_base_dir("/srv/ssot");
        assert_eq!(config.output_dir, PathBuf::from("/srv/ssot/generated"));
        assert_eq!(config.specs_dir, PathBuf::from("/srv/ssot/feature_specs"));
        assert_eq!(
            config.auto_features_dir,
            PathBuf::from("/srv/ssot/auto_features")
        );
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/ssot/ssot_index.yaml")
        );
    }

    #[test]
    fn auth_config_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret", Duration::from_secs(60));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn llm_config_new_uses_default_model() {
        let config = LlmConfig::new("key", "http://localhost:9999/v1");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn llm_config_debug_redacts_api_key() {
        let config = LlmConfig::new("sk-live-123", "http://localhost:9999/v1");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-live-123"));
        assert!(rendered.contains("gpt-4.1-mini"));
    }

    #[test]
    fn missing_secret_is_an_error_without_dev_flag() {
        let ttl = Duration::from_secs(60);
        assert_eq!(
            AuthConfig::resolve(None, ttl, false).unwrap_err(),
            ConfigError::MissingSecret
        );
        assert_eq!(
            AuthConfig::resolve(Some("  ".to_string()), ttl, false).unwrap_err(),
            ConfigError::MissingSecret
        );
    }

    #[test]
    fn dev_secret_is_used_only_when_allowed() {
        let ttl = Duration::from_secs(60);
        let config = AuthConfig::resolve(None, ttl, true).unwrap();
        assert_eq!(config.secret, DEV_SECRET);

        let config = AuthConfig::resolve(Some("real".to_string()), ttl, true).unwrap();
        assert_eq!(config.secret, "real");
    }
}
