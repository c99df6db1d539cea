//! Dispatcher configuration.
//!
//! Configuration is consumed once when a [`crate::Dispatcher`] is built. It can
//! be constructed in code or loaded from layered sources:
//!
//! 1. an optional configuration file (format inferred from the extension)
//! 2. environment variables prefixed `AQD__` with `__` as the nesting
//!    separator, e.g. `AQD__ACCOUNT` or `AQD__RETRY_POLICY__RETRY_COUNT`
//!
//! Later sources override earlier ones.

use crate::error::ConfigurationError;
use crate::retry::{RetryOptions, DEFAULT_MAX_TRIES, DEFAULT_RETRY_DELAY};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "AQD";

/// Trace source name used when the configuration does not set one
pub const DEFAULT_SOURCE_NAME: &str = "dispatcher";

/// The only retry policy type the pipeline supports
pub const LINEAR_RETRY_POLICY: &str = "linear";

/// Storage account access key
///
/// The key is wiped from memory on drop and never printed: both `Debug` and
/// `Serialize` emit a redacted placeholder.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Decode the base64 key into the raw HMAC key bytes
    pub fn decode(&self) -> Result<Vec<u8>, ConfigurationError> {
        BASE64
            .decode(self.0.trim())
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("access key is not valid base64: {}", e),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(<redacted>)")
    }
}

impl Serialize for AccessKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

/// Retry policy descriptor
///
/// Only the `linear` type is supported; it maps onto a fixed-interval
/// pipeline policy. Zero values fall back to the pipeline defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherRetryPolicy {
    #[serde(rename = "type")]
    pub policy_type: String,

    /// Maximum number of tries per request
    #[serde(default)]
    pub retry_count: u32,

    /// Interval between tries in milliseconds
    #[serde(default)]
    pub retry_interval_ms: u64,
}

impl DispatcherRetryPolicy {
    pub fn linear(retry_count: u32, retry_interval: Duration) -> Self {
        Self {
            policy_type: LINEAR_RETRY_POLICY.to_string(),
            retry_count,
            retry_interval_ms: retry_interval.as_millis() as u64,
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.policy_type != LINEAR_RETRY_POLICY {
            return Err(ConfigurationError::InvalidRetryPolicy {
                policy_type: self.policy_type.clone(),
            });
        }
        Ok(())
    }
}

/// Configuration for a [`crate::Dispatcher`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Storage account name
    pub account: String,

    /// Storage account access key (base64)
    pub access_key: AccessKey,

    /// Friendly name reported as the trace source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Client-side timeout for a single request in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    /// Queue service endpoint override (Azurite, sovereign clouds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<DispatcherRetryPolicy>,
}

impl DispatcherConfig {
    pub fn new(account: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            access_key: AccessKey::new(access_key),
            name: None,
            request_timeout_ms: None,
            endpoint: None,
            retry_policy: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_retry_policy(mut self, policy: DispatcherRetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Load configuration from an optional file and `AQD__*` environment variables
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, a required field is
    /// missing, or the resulting configuration fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::Missing {
                    key: path.display().to_string(),
                });
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.account.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "account".to_string(),
            });
        }

        if self.access_key.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "access_key".to_string(),
            });
        }
        self.access_key.decode()?;

        if self.request_timeout_ms == Some(0) {
            return Err(ConfigurationError::Invalid {
                message: "request_timeout_ms must be greater than zero".to_string(),
            });
        }

        if let Some(policy) = &self.retry_policy {
            policy.validate()?;
        }

        self.service_url()?;
        Ok(())
    }

    /// Trace source name
    pub fn source_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SOURCE_NAME)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Queue service URL: the endpoint override or the account's public endpoint
    pub fn service_url(&self) -> Result<Url, ConfigurationError> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.queue.core.windows.net", self.account),
        };

        Url::parse(&raw).map_err(|e| ConfigurationError::Invalid {
            message: format!("invalid queue service endpoint '{}': {}", raw, e),
        })
    }

    /// Map the configured retry policy onto pipeline retry options
    ///
    /// Without a policy the pipeline defaults apply. Zero counts or intervals
    /// fall back to the defaults as well. The per-try timeout is the request
    /// timeout when one is configured, otherwise it is derived from the retry
    /// interval.
    pub fn retry_options(&self) -> Result<RetryOptions, ConfigurationError> {
        let mut options = match &self.retry_policy {
            None => RetryOptions::default(),
            Some(policy) => {
                policy.validate()?;
                let max_tries = match policy.retry_count {
                    0 => DEFAULT_MAX_TRIES,
                    count => count,
                };
                let retry_delay = match policy.retry_interval_ms {
                    0 => DEFAULT_RETRY_DELAY,
                    ms => Duration::from_millis(ms),
                };
                RetryOptions::fixed(max_tries, retry_delay)
            }
        };

        if let Some(timeout) = self.request_timeout() {
            options = options.with_try_timeout(timeout);
        }

        Ok(options)
    }
}
