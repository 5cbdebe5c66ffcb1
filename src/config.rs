use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError};

use crate::auth::PlatformDetection;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
pub const CONFIG_DIR: &str = "config";
const DEFAULT_PLATFORM_ROLE_PREFIX: &str = "platform_";

/// Settings of the authorization engine host process
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AuthzSettings {
    /// Application environment
    #[serde(default = "default_environment")]
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Recognize platform users by username and role-name prefix in addition
    /// to the `userType` field. Deprecated; kept for older session payloads.
    #[serde(default)]
    pub legacy_username_detection: bool,

    /// Usernames treated as platform super admins by the legacy heuristic
    #[serde(default = "default_platform_usernames")]
    #[validate(custom = "validate_platform_usernames")]
    pub legacy_platform_usernames: Vec<String>,

    /// Role-name prefix marking platform users for the legacy heuristic
    #[serde(default = "default_platform_role_prefix")]
    pub legacy_platform_role_prefix: String,
}

impl Default for AuthzSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            legacy_username_detection: false,
            legacy_platform_usernames: default_platform_usernames(),
            legacy_platform_role_prefix: default_platform_role_prefix(),
        }
    }
}

impl AuthzSettings {
    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Platform detection strategy for the resolver
    pub fn platform_detection(&self) -> PlatformDetection {
        if self.legacy_username_detection {
            PlatformDetection::LegacyUsername {
                usernames: self.legacy_platform_usernames.clone(),
                role_prefix: self.legacy_platform_role_prefix.clone(),
            }
        } else {
            PlatformDetection::Explicit
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_platform_usernames() -> Vec<String> {
    vec!["platform_admin".to_string(), "super_admin".to_string()]
}

fn default_platform_role_prefix() -> String {
    DEFAULT_PLATFORM_ROLE_PREFIX.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_platform_usernames(usernames: &[String]) -> Result<(), ValidationError> {
    if usernames.iter().any(|name| name.trim().is_empty()) {
        let mut err = ValidationError::new("legacy_platform_usernames");
        err.message = Some("Platform usernames must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("trace_authz={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads settings from the `config` directory of the working directory
pub fn load_config() -> Result<AuthzSettings, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads settings
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`)
pub fn load_config_from(config_dir: &Path) -> Result<AuthzSettings, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: AuthzSettings = config.try_deserialize()?;

    settings.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if settings.is_production() && settings.legacy_username_detection {
        warn!(
            environment = %settings.environment,
            "Legacy username detection is enabled in production"
        );
    }

    info!("Configuration loaded successfully");
    Ok(settings)
}
