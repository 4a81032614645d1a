//! Collider configuration types.
//!
//! Per Iron Lotus Framework: Configuration is validated at load time (Poka-Yoke),
//! with sensible defaults and clear error messages.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::ActionSet;
use crate::error::{ColliderError, Result};
use crate::sink::FailureObserver;

/// Environment variable overriding the completion timeout.
pub const ENV_AWAIT_TIMEOUT: &str = "COLLIDER_AWAIT_TIMEOUT";

/// Environment variable overriding the shutdown grace period.
pub const ENV_SHUTDOWN_GRACE: &str = "COLLIDER_SHUTDOWN_GRACE";

/// Timing settings of a collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How long `run()` waits for every worker after release.
    #[serde(default = "default_await_timeout")]
    #[serde(with = "humantime_serde")]
    pub await_termination_timeout: Duration,

    /// How long `close()` waits for pool threads before abandoning them.
    /// Defaults to the completion timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "humantime_serde::option")]
    pub shutdown_grace: Option<Duration>,
}

fn default_await_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            await_termination_timeout: default_await_timeout(),
            shutdown_grace: None,
        }
    }
}

impl Settings {
    /// Returns the effective shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace.unwrap_or(self.await_termination_timeout)
    }

    /// Validates the settings.
    ///
    /// # Errors
    /// Returns an error if the completion timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.await_termination_timeout.is_zero() {
            return Err(ColliderError::setting(
                "await_termination_timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| ColliderError::setting(format!("failed to parse settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ColliderError::setting(format!("failed to read settings: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Reads settings from `COLLIDER_AWAIT_TIMEOUT` and
    /// `COLLIDER_SHUTDOWN_GRACE`, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparseable duration.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Settings::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparseable duration.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(value) = lookup(ENV_AWAIT_TIMEOUT) {
            settings.await_termination_timeout = parse_duration(ENV_AWAIT_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_SHUTDOWN_GRACE) {
            settings.shutdown_grace = Some(parse_duration(ENV_SHUTDOWN_GRACE, &value)?);
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ColliderError::setting(format!("{key}={value:?}: {e}")))
}

/// Everything a collider needs to run.
///
/// The worker count is derived from the actions, never set on its own.
pub struct ColliderConfig {
    /// Actions to collide.
    pub actions: ActionSet,
    /// Timing settings.
    pub settings: Settings,
    /// Observer receiving every failure. `None` discards them.
    pub on_exception: Option<FailureObserver>,
}

impl ColliderConfig {
    /// Creates a configuration with default settings and no observer.
    #[must_use]
    pub fn new(actions: ActionSet) -> Self {
        Self {
            actions,
            settings: Settings::default(),
            on_exception: None,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the action set or the settings are invalid.
    pub fn validate(&self) -> Result<()> {
        self.actions.validate()?;
        self.settings.validate()
    }
}

impl fmt::Debug for ColliderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColliderConfig")
            .field("actions", &self.actions)
            .field("settings", &self.settings)
            .field("on_exception", &self.on_exception.is_some())
            .finish()
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        /// Serializes an optional duration.
        ///
        /// # Errors
        /// Returns an error if serialization fails.
        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional human-readable duration.
        ///
        /// # Errors
        /// Returns an error if the string cannot be parsed.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
