//! Desk configuration with layered loading.
//!
//! Values merge in this order, later layers overriding earlier ones:
//!
//! 1. Compiled defaults ([`DeskConfig::default`])
//! 2. An optional TOML file
//! 3. `SWITCHBOARD_*` environment variables, e.g.
//!    `SWITCHBOARD_SESSION_TTL_HOURS=12`
//!
//! ```
//! use switchboard::config::DeskConfig;
//!
//! let config = DeskConfig::load_from_str("max_message_chars = 500").expect("valid config");
//! assert_eq!(config.max_message_chars, 500);
//! assert_eq!(config.session_ttl_hours, 24);
//! ```

use crate::broadcast::HubConfig;
use crate::conversation::services::RegistryConfig;
use crate::routing::RoutingPolicy;
use crate::session::domain::{SessionDomainError, SessionTtl};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is outside its allowed range.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<SessionDomainError> for ConfigError {
    fn from(err: SessionDomainError) -> Self {
        Self::Invalid {
            field: "session_ttl_hours",
            reason: err.to_string(),
        }
    }
}

/// Every tunable constant of the support desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Guest session lifetime, extended on every guest message.
    pub session_ttl_hours: i64,
    /// Maximum message length in characters.
    pub max_message_chars: usize,
    /// Bot replies scoring below this need a human.
    pub human_review_threshold: f64,
    /// History size when the guest does not ask for one.
    pub history_default_limit: usize,
    /// Largest history a guest may ask for.
    pub history_max_limit: usize,
    /// Event queue capacity per listener.
    pub subscriber_buffer: usize,
    /// Dropped events after which a listener is disconnected.
    pub max_subscriber_drops: u64,
    /// Text of the message appended when a conversation closes.
    pub closing_message: String,
    /// Notice returned to the guest when a message is escalated.
    pub escalation_notice: String,
    /// Prefix of conversation reference identifiers.
    pub reference_prefix: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        let routing = RoutingPolicy::default();
        let hub = HubConfig::default();
        Self {
            session_ttl_hours: 24,
            max_message_chars: registry.max_message_chars,
            human_review_threshold: routing.human_review_threshold,
            history_default_limit: 50,
            history_max_limit: 100,
            subscriber_buffer: hub.subscriber_buffer,
            max_subscriber_drops: hub.max_subscriber_drops,
            closing_message: registry.closing_message,
            escalation_notice: routing.escalation_notice,
            reference_prefix: registry.reference_prefix,
        }
    }
}

impl DeskConfig {
    /// Creates a configuration with shorter sessions, tighter limits and a
    /// higher bar for unattended bot replies.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            session_ttl_hours: 4,
            max_message_chars: 500,
            human_review_threshold: 0.9,
            history_default_limit: 20,
            history_max_limit: 50,
            subscriber_buffer: 16,
            max_subscriber_drops: 20,
            ..Self::default()
        }
    }

    /// Loads defaults overlaid with `SWITCHBOARD_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable cannot be parsed or a value is
    /// out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::finish(Self::defaults().merge(env_provider()))
    }

    /// Loads defaults overlaid with a TOML document. The environment is not
    /// consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or a value is
    /// out of range.
    pub fn load_from_str(toml: &str) -> Result<Self, ConfigError> {
        Self::finish(Self::defaults().merge(Toml::string(toml)))
    }

    /// Loads defaults, then the TOML file at `path` if it exists, then the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a layer is malformed or a value is out of
    /// range.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::finish(
            Self::defaults()
                .merge(Toml::file(path))
                .merge(env_provider()),
        )
    }

    fn defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session_ttl()?;
        let invalid = |field, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_owned(),
        };
        if self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(invalid("session_ttl_hours", "must be at most one year"));
        }
        if self.max_message_chars == 0 {
            return Err(invalid("max_message_chars", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.human_review_threshold) {
            return Err(invalid("human_review_threshold", "must lie in [0, 1]"));
        }
        if self.history_max_limit == 0 {
            return Err(invalid("history_max_limit", "must be positive"));
        }
        if self.history_default_limit == 0 || self.history_default_limit > self.history_max_limit {
            return Err(invalid(
                "history_default_limit",
                "must be positive and at most history_max_limit",
            ));
        }
        if self.subscriber_buffer == 0 {
            return Err(invalid("subscriber_buffer", "must be positive"));
        }
        if self.max_subscriber_drops == 0 {
            return Err(invalid("max_subscriber_drops", "must be positive"));
        }
        if self.reference_prefix.trim().is_empty() {
            return Err(invalid("reference_prefix", "must not be empty"));
        }
        Ok(())
    }

    /// Returns the session lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for non-positive hours.
    pub fn session_ttl(&self) -> Result<SessionTtl, ConfigError> {
        Ok(SessionTtl::from_hours(self.session_ttl_hours)?)
    }

    /// Returns the registry settings.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            reference_prefix: self.reference_prefix.clone(),
            max_message_chars: self.max_message_chars,
            closing_message: self.closing_message.clone(),
        }
    }

    /// Returns the routing settings.
    #[must_use]
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy {
            human_review_threshold: self.human_review_threshold,
            escalation_notice: self.escalation_notice.clone(),
        }
    }

    /// Returns the broadcast hub settings.
    #[must_use]
    pub const fn hub_config(&self) -> HubConfig {
        HubConfig {
            subscriber_buffer: self.subscriber_buffer,
            max_subscriber_drops: self.max_subscriber_drops,
        }
    }

    /// Clamps a requested history size to the configured bounds.
    #[must_use]
    pub fn history_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.history_default_limit)
            .min(self.history_max_limit)
            .max(1)
    }
}

fn env_provider() -> Env {
    Env::prefixed("SWITCHBOARD_")
}
