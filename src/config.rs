use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::infra::{Character, Player, Stage};
use crate::runner::{MatchSetup, RunnerConfig};

/// Settings read from `HAL_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub ego: Player,
    pub max_steps: u64,
    pub step_timeout: Duration,
    pub latency_warning: Duration,
    pub character: Character,
    /// `None` leaves the opponent side to a human.
    pub opponent_character: Option<Character>,
    pub opponent_cpu_level: u32,
    /// `None` leaves stage selection to a human.
    pub stage: Option<Stage>,
    pub debug_log_dir: Option<PathBuf>,
    pub bridge_program: String,
    pub bridge_args: Vec<String>,
    /// Discovered at startup when unset.
    pub udp_port: Option<u32>,
    pub replay_dir: PathBuf,
    pub seq_len: usize,
    pub input_config: String,
    pub decoder: String,
    pub worker_join_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let opponent_cpu_level: u32 = parse(&lookup, "HAL_OPPONENT_CPU_LEVEL", 9)?;
        if !(1..=9).contains(&opponent_cpu_level) {
            return Err(invalid(
                "HAL_OPPONENT_CPU_LEVEL",
                opponent_cpu_level.to_string(),
                "expected a level from 1 to 9",
            ));
        }

        let seq_len: usize = parse(&lookup, "HAL_SEQ_LEN", 256)?;
        if seq_len == 0 {
            return Err(invalid("HAL_SEQ_LEN", "0".to_string(), "must be positive"));
        }

        let udp_port = match lookup("HAL_UDP_PORT") {
            Some(value) => {
                let port: u32 = parse_value("HAL_UDP_PORT", &value)?;
                if !(1..=65_535).contains(&port) {
                    return Err(invalid("HAL_UDP_PORT", value, "not a valid port"));
                }
                Some(port)
            }
            None => None,
        };

        Ok(Self {
            ego: parse(&lookup, "HAL_PLAYER", Player::P1)?,
            max_steps: parse(&lookup, "HAL_MAX_STEPS", 99_999)?,
            step_timeout: millis(&lookup, "HAL_STEP_TIMEOUT_MS", 2000)?,
            latency_warning: millis(&lookup, "HAL_LATENCY_WARNING_MS", 14)?,
            character: parse(&lookup, "HAL_CHARACTER", Character::Fox)?,
            opponent_character: optional(&lookup, "HAL_OPPONENT_CHARACTER", Character::Fox)?,
            opponent_cpu_level,
            stage: optional(&lookup, "HAL_STAGE", Stage::Battlefield)?,
            debug_log_dir: lookup("HAL_DEBUG_LOG_DIR").map(PathBuf::from),
            bridge_program: lookup("HAL_BRIDGE_CMD")
                .ok_or(ConfigError::Missing("HAL_BRIDGE_CMD"))?,
            bridge_args: lookup("HAL_BRIDGE_ARGS")
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            udp_port,
            replay_dir: lookup("HAL_REPLAY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("replays")),
            seq_len,
            input_config: lookup("HAL_INPUT_CONFIG").unwrap_or_else(|| "inputs_v0".to_string()),
            decoder: lookup("HAL_DECODER").unwrap_or_else(|| "preds_v0".to_string()),
            worker_join_timeout: millis(&lookup, "HAL_WORKER_JOIN_TIMEOUT_MS", 1000)?,
        })
    }

    pub fn match_setup(&self) -> MatchSetup {
        MatchSetup {
            ego: self.ego,
            character: self.character,
            opponent_character: self.opponent_character,
            opponent_cpu_level: self.opponent_cpu_level,
            stage: self.stage,
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_steps: self.max_steps,
            step_timeout: self.step_timeout,
            latency_warning: self.latency_warning,
            setup: self.match_setup(),
        }
    }
}

fn invalid(key: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value,
        reason: reason.into(),
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| invalid(key, value.to_string(), err.to_string()))
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

/// Like `parse`, but the value `none` turns the setting off.
fn optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) if value.trim().eq_ignore_ascii_case("none") => Ok(None),
        Some(value) => parse_value(key, &value).map(Some),
        None => Ok(Some(default)),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let value: u64 = parse(lookup, key, default)?;
    if value == 0 {
        return Err(invalid(key, "0".to_string(), "must be positive"));
    }
    Ok(Duration::from_millis(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("HAL_BRIDGE_CMD", "bridge")]).unwrap();
        assert_eq!(config.ego, Player::P1);
        assert_eq!(config.max_steps, 99_999);
        assert_eq!(config.step_timeout, Duration::from_secs(2));
        assert_eq!(config.latency_warning, Duration::from_millis(14));
        assert_eq!(config.opponent_character, Some(Character::Fox));
        assert_eq!(config.stage, Some(Stage::Battlefield));
        assert_eq!(config.udp_port, None);
        assert_eq!(config.seq_len, 256);
        assert_eq!(config.input_config, "inputs_v0");
        assert_eq!(config.decoder, "preds_v0");
        assert_eq!(config.runner_config().setup, MatchSetup::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HAL_BRIDGE_CMD", "bridge"),
            ("HAL_BRIDGE_ARGS", "--headless  --iso melee.iso"),
            ("HAL_PLAYER", "p2"),
            ("HAL_CHARACTER", "marth"),
            ("HAL_OPPONENT_CHARACTER", "none"),
            ("HAL_STAGE", "None"),
            ("HAL_UDP_PORT", "51441"),
            ("HAL_STEP_TIMEOUT_MS", "500"),
        ])
        .unwrap();

        assert_eq!(config.bridge_args, vec!["--headless", "--iso", "melee.iso"]);
        assert_eq!(config.ego, Player::P2);
        assert_eq!(config.character, Character::Marth);
        assert_eq!(config.opponent_character, None);
        assert_eq!(config.stage, None);
        assert_eq!(config.udp_port, Some(51441));
        assert_eq!(config.runner_config().step_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let bad = [
            ("HAL_PLAYER", "p3"),
            ("HAL_MAX_STEPS", "-1"),
            ("HAL_OPPONENT_CPU_LEVEL", "10"),
            ("HAL_STEP_TIMEOUT_MS", "0"),
            ("HAL_UDP_PORT", "70000"),
            ("HAL_CHARACTER", "WALUIGI"),
        ];
        for (key, value) in bad {
            match load(&[("HAL_BRIDGE_CMD", "bridge"), (key, value)]) {
                Err(ConfigError::InvalidValue { key: reported, .. }) => assert_eq!(reported, key),
                other => panic!("{key}={value} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_bridge_command_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing("HAL_BRIDGE_CMD"))
        ));
    }
}
