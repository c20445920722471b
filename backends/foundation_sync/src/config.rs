//! Run configuration for the three patterns.
//!
//! Everything has a default that reproduces the classic demo: a five slot
//! buffer fed by two producers and drained by two consumers, three readers and
//! two writers sharing a counter, and five philosophers eating three rounds.
//! A TOML file only needs the keys it wants to change.
//!
//! ```toml
//! [channel]
//! capacity = 2
//!
//! [ring]
//! ring_size = 8
//!
//! [pacing]
//! think_ms = 0
//! ```

use core::time::Duration;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};

/// Largest channel capacity a configuration may ask for.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Largest number of threads any single role may spawn, and the largest ring.
pub const MAX_WORKERS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    /// Items each producer puts.
    pub iterations: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            producers: 2,
            consumers: 2,
            iterations: 5,
        }
    }
}

impl ChannelConfig {
    /// Items put across all producers. Saturates instead of overflowing;
    /// [`CoordinationConfig::validate`] rejects sizes where that matters.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.producers.saturating_mul(self.iterations)
    }

    /// Takes owed by consumer `consumer` (zero-based). The total is split
    /// evenly and any remainder goes to the lowest-numbered consumers, so the
    /// quotas always add up to [`total_items`](Self::total_items).
    #[must_use]
    pub const fn consumer_quota(&self, consumer: usize) -> usize {
        if self.consumers == 0 {
            return 0;
        }
        let base = self.total_items() / self.consumers;
        let remainder = self.total_items() % self.consumers;
        if consumer < remainder {
            base + 1
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub readers: usize,
    pub reader_iterations: usize,
    pub writers: usize,
    pub writer_iterations: usize,
    pub initial_value: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            readers: 3,
            reader_iterations: 3,
            writers: 2,
            writer_iterations: 2,
            initial_value: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub ring_size: usize,
    pub rounds: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            ring_size: 5,
            rounds: 3,
        }
    }
}

/// Sleeps inserted between steps so the interleaving is visible on a
/// console. None of them carry correctness weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub produce_ms: u64,
    pub consume_ms: u64,
    pub read_ms: u64,
    pub after_read_ms: u64,
    pub write_ms: u64,
    pub after_write_ms: u64,
    pub think_ms: u64,
    pub eat_ms: u64,
    pub after_eat_ms: u64,
    pub between_patterns_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            produce_ms: 100,
            consume_ms: 150,
            read_ms: 100,
            after_read_ms: 50,
            write_ms: 200,
            after_write_ms: 100,
            think_ms: 100,
            eat_ms: 150,
            after_eat_ms: 50,
            between_patterns_ms: 500,
        }
    }
}

impl Pacing {
    /// No sleeps at all; workers run flat out.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            produce_ms: 0,
            consume_ms: 0,
            read_ms: 0,
            after_read_ms: 0,
            write_ms: 0,
            after_write_ms: 0,
            think_ms: 0,
            eat_ms: 0,
            after_eat_ms: 0,
            between_patterns_ms: 0,
        }
    }

    /// Sleeps for `millis`, skipping the syscall for zero.
    pub fn pause(millis: u64) {
        if millis > 0 {
            std::thread::sleep(Duration::from_millis(millis));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    pub channel: ChannelConfig,
    pub gate: GateConfig,
    pub ring: RingConfig,
    pub pacing: Pacing,
}

impl CoordinationConfig {
    /// Default sizes with every sleep removed.
    #[must_use]
    pub fn unpaced() -> Self {
        Self {
            pacing: Pacing::none(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a TOML file. Missing keys keep their
    /// defaults. The result is not validated yet.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML for this shape.
    pub fn from_path<V: Into<PathBuf>>(target: V) -> ConfigResult<Self> {
        from_path(target)
    }

    /// # Errors
    ///
    /// Fails when `content` is not valid TOML for this shape.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects any value that would make a pattern meaningless or leave a
    /// worker blocked forever.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as [`ConfigError::Invalid`].
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("channel.capacity", self.channel.capacity),
            ("channel.producers", self.channel.producers),
            ("channel.consumers", self.channel.consumers),
            ("channel.iterations", self.channel.iterations),
            ("gate.readers", self.gate.readers),
            ("gate.reader_iterations", self.gate.reader_iterations),
            ("gate.writers", self.gate.writers),
            ("gate.writer_iterations", self.gate.writer_iterations),
            ("ring.rounds", self.ring.rounds),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::invalid(*field, "must be greater than zero"));
        }

        if self.ring.ring_size < 2 {
            return Err(ConfigError::invalid(
                "ring.ring_size",
                format!("needs at least 2 seats, got {}", self.ring.ring_size),
            ));
        }

        if self.channel.capacity > MAX_CAPACITY {
            return Err(ConfigError::invalid(
                "channel.capacity",
                format!("at most {MAX_CAPACITY} slots, got {}", self.channel.capacity),
            ));
        }

        let workers = [
            ("channel.producers", self.channel.producers),
            ("channel.consumers", self.channel.consumers),
            ("gate.readers", self.gate.readers),
            ("gate.writers", self.gate.writers),
            ("ring.ring_size", self.ring.ring_size),
        ];
        if let Some((field, count)) = workers.iter().find(|(_, count)| *count > MAX_WORKERS) {
            return Err(ConfigError::invalid(
                *field,
                format!("at most {MAX_WORKERS} threads, got {count}"),
            ));
        }

        if self.channel.producers.checked_mul(self.channel.iterations).is_none() {
            return Err(ConfigError::invalid(
                "channel.iterations",
                "producers times iterations overflows the item count",
            ));
        }

        Ok(())
    }
}

/// Reads `target` and deserializes it as TOML.
///
/// # Errors
///
/// Fails when the file cannot be read or does not deserialize into `T`.
pub fn from_path<T, V>(target: V) -> ConfigResult<T>
where
    T: DeserializeOwned,
    V: Into<PathBuf>,
{
    let target_path = target.into();
    let content = std::fs::read_to_string(&target_path).map_err(ConfigError::from)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_classic_demo() {
        let config = CoordinationConfig::default();
        assert_eq!(config.channel.capacity, 5);
        assert_eq!(config.channel.producers + config.channel.consumers, 4);
        assert_eq!(config.channel.iterations, 5);
        assert_eq!((config.gate.readers, config.gate.reader_iterations), (3, 3));
        assert_eq!((config.gate.writers, config.gate.writer_iterations), (2, 2));
        assert_eq!((config.ring.ring_size, config.ring.rounds), (5, 3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn consumer_quotas_cover_every_item() {
        let channel = ChannelConfig {
            capacity: 2,
            producers: 3,
            consumers: 4,
            iterations: 3,
        };
        let quotas: Vec<_> = (0..4).map(|c| channel.consumer_quota(c)).collect();
        assert_eq!(quotas, vec![3, 2, 2, 2]);
        assert_eq!(quotas.iter().sum::<usize>(), channel.total_items());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CoordinationConfig::from_toml_str(
            r"
            [channel]
            capacity = 2

            [ring]
            ring_size = 8

            [pacing]
            think_ms = 0
            ",
        )
        .unwrap();

        assert_eq!(config.channel.capacity, 2);
        assert_eq!(config.channel.producers, 2);
        assert_eq!(config.ring.ring_size, 8);
        assert_eq!(config.ring.rounds, 3);
        assert_eq!(config.pacing.think_ms, 0);
        assert_eq!(config.pacing.eat_ms, 150);
    }

    #[test]
    fn rendered_toml_reloads_identically() {
        let config = CoordinationConfig::unpaced();
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(CoordinationConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn zero_values_are_rejected_with_their_field() {
        let mut config = CoordinationConfig::default();
        config.gate.writers = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "gate.writers",
                ..
            }
        ));

        let mut config = CoordinationConfig::default();
        config.ring.ring_size = 1;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "ring.ring_size",
                ..
            }
        ));
    }

    #[test]
    fn sizes_that_cannot_run_are_rejected_up_front() {
        let config = CoordinationConfig::from_toml_str(
            "[channel]\nproducers = 4\niterations = 9223372036854775807\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "channel.iterations",
                ..
            }
        ));
        assert_eq!(config.channel.total_items(), usize::MAX);

        let mut config = CoordinationConfig::default();
        config.channel.capacity = usize::MAX;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "channel.capacity",
                ..
            }
        ));

        let mut config = CoordinationConfig::default();
        config.ring.ring_size = MAX_WORKERS + 1;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "ring.ring_size",
                ..
            }
        ));

        let mut config = CoordinationConfig::default();
        config.channel.capacity = MAX_CAPACITY;
        config.gate.readers = MAX_WORKERS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_value_types_fail_to_parse() {
        let err =
            CoordinationConfig::from_toml_str("[channel]\ncapacity = \"five\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialization(_)));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gate]\nreaders = 2\nwriters = 1").unwrap();

        let config = CoordinationConfig::from_path(file.path()).unwrap();
        assert_eq!((config.gate.readers, config.gate.writers), (2, 1));

        let missing = CoordinationConfig::from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
