//! Configuration module for the Jarvis gateway.
//!
//! Configuration comes from environment variables (a `.env` file is loaded by
//! `main` before this module runs). The only hard requirement is
//! `GOOGLE_API_KEY`: without it neither generation path can work, so loading
//! fails fast at process start. LiveKit settings are optional; the `/token`
//! endpoint reports them as unavailable when absent.
//!
//! # Example
//! ```rust,no_run
//! use jarvis_gateway::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;

use thiserror::Error;

/// Default bind host.
const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
const DEFAULT_PORT: u16 = 8000;

/// Stable text-generation model used by the fallback path.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
/// Low-latency realtime model used by the primary path.
pub const DEFAULT_REALTIME_MODEL: &str = "gemini-2.0-flash-exp";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable holds an unparsable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration.
///
/// Contains everything needed to run the gateway:
/// - Bind address (host, port)
/// - Google generative-language API key (required)
/// - Model names for the realtime and text generation paths
/// - LiveKit settings for token minting and room provisioning (optional)
/// - CORS policy
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// Google generative-language API key. Required; loading fails without it.
    pub google_api_key: String,

    /// Realtime (Gemini Live) model name.
    pub realtime_model: String,
    /// Stable text-generation model name.
    pub text_model: String,

    // LiveKit settings (token endpoint + room provisioning)
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,

    /// CORS allowed origins (comma-separated list or "*" for all).
    /// Default: None (same-origin only).
    pub cors_allowed_origins: Option<String>,
}

/// Zeroize secret fields when the config is dropped so credentials do not
/// linger in freed memory.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.google_api_key.zeroize();
        if let Some(ref mut key) = self.livekit_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.livekit_api_secret {
            secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails fast when `GOOGLE_API_KEY` is absent: the resolver cannot answer a
    /// single message without it and a late failure would surface as an
    /// opaque per-request error instead.
    pub fn from_env() -> Result<Self, ConfigError> {
        let google_api_key = required_var("GOOGLE_API_KEY")?;

        let host = optional_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match optional_var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            google_api_key,
            realtime_model: optional_var("REALTIME_MODEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            text_model: optional_var("TEXT_MODEL")
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            livekit_url: optional_var("LIVEKIT_URL"),
            livekit_api_key: optional_var("LIVEKIT_API_KEY"),
            livekit_api_secret: optional_var("LIVEKIT_API_SECRET"),
            cors_allowed_origins: optional_var("CORS_ALLOWED_ORIGINS"),
        })
    }

    /// The socket address string to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether LiveKit token minting and room provisioning are configured.
    pub fn has_livekit(&self) -> bool {
        self.livekit_url.is_some()
            && self.livekit_api_key.is_some()
            && self.livekit_api_secret.is_some()
    }
}

/// Read a required environment variable; empty counts as missing.
fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Read an optional environment variable; empty counts as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            google_api_key: "test_key".to_string(),
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            livekit_url: None,
            livekit_api_key: None,
            livekit_api_secret: None,
            cors_allowed_origins: None,
        }
    }

    #[test]
    fn test_address_formatting() {
        let config = test_config();
        assert_eq!(config.address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_has_livekit_requires_all_three() {
        let mut config = test_config();
        assert!(!config.has_livekit());

        config.livekit_url = Some("ws://localhost:7880".to_string());
        config.livekit_api_key = Some("key".to_string());
        assert!(!config.has_livekit());

        config.livekit_api_secret = Some("secret".to_string());
        assert!(config.has_livekit());
    }

    #[test]
    fn test_default_models() {
        let config = test_config();
        assert_eq!(config.realtime_model, "gemini-2.0-flash-exp");
        assert_eq!(config.text_model, "gemini-1.5-flash");
    }

    #[test]
    fn test_missing_var_error_names_variable() {
        let err = ConfigError::MissingVar("GOOGLE_API_KEY");
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_from_env_fails_fast_without_google_api_key() {
        // SAFETY: this is the only test in the crate that mutates the
        // process environment, so no concurrent reader observes the change.
        unsafe { env::remove_var("GOOGLE_API_KEY") };
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GOOGLE_API_KEY")));

        // Blank counts as missing.
        unsafe { env::set_var("GOOGLE_API_KEY", "   ") };
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GOOGLE_API_KEY")));

        unsafe { env::remove_var("GOOGLE_API_KEY") };
    }
}
