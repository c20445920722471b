use derive_more::From;
use thiserror::Error;

use crate::journal::Pattern;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub type PatternResult<T> = std::result::Result<T, PatternError>;

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    Io(std::io::Error),

    #[from(ignore)]
    Deserialization(toml::de::Error),

    #[from(ignore)]
    Serialization(toml::ser::Error),

    /// A value that would leave a component unusable, e.g. a zero capacity
    /// or a ring with a single seat.
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Deserialization(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization(value)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Deserialization(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read configuration: {err}"),
            Self::Deserialization(err) => write!(f, "failed to parse configuration: {err}"),
            Self::Serialization(err) => write!(f, "failed to render configuration: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("{role} {worker} panicked while running {pattern}")]
    WorkerPanicked {
        pattern: Pattern,
        role: &'static str,
        worker: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_names_the_field() {
        let err = ConfigError::invalid("ring.ring_size", "needs at least 2 seats, got 1");
        assert_eq!(
            err.to_string(),
            "invalid `ring.ring_size`: needs at least 2 seats, got 1"
        );
    }

    #[test]
    fn config_error_lifts_into_pattern_error() {
        let err: PatternError = ConfigError::invalid("channel.capacity", "must be > 0").into();
        assert!(matches!(err, PatternError::Config(ConfigError::Invalid { .. })));
        assert!(err.to_string().starts_with("configuration rejected"));
    }

    #[test]
    fn worker_panic_message() {
        let err = PatternError::WorkerPanicked {
            pattern: Pattern::DiningPhilosophers,
            role: "philosopher",
            worker: 4,
        };
        assert_eq!(
            err.to_string(),
            "philosopher 4 panicked while running dining-philosophers"
        );
    }
}
