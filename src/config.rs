//! Environment configuration
//!
//! Read once at start-up, after an optional `.env` file in the working
//! directory has been merged into the process environment. Unset variables
//! take their defaults; set but malformed ones are an error naming the
//! variable.

use crate::llm::LlmConfig;
use crate::runtime::FanOutConfig;
use crate::weather::WeatherConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_MCP_BINARY: &str = "weather-mcp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Control-loop limits
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub fanout: FanOutConfig,
}

/// Everything the agent binary needs
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentSettings,
    /// Program spawned as the function server
    pub mcp_command: PathBuf,
    pub log_format: LogFormat,
    /// Crate log level; `RUST_LOG` overrides it when set
    pub log_level: Level,
}

/// Merge `.env` into the environment; variables already set win. Returns
/// the file loaded, if there was one.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let llm_defaults = LlmConfig::default();
        let fanout_defaults = FanOutConfig::default();

        let llm = LlmConfig {
            model: env.string("MODEL_NAME").unwrap_or(llm_defaults.model),
            base_url: env.string("MODEL_BASE_URL").unwrap_or(llm_defaults.base_url),
            api_key: env.string("MODEL_API_KEY"),
            temperature: env.parse("MODEL_TEMPERATURE")?.unwrap_or(llm_defaults.temperature),
            max_tokens: env.parse("MODEL_MAX_TOKENS")?.unwrap_or(llm_defaults.max_tokens),
            timeout: llm_defaults.timeout,
        };

        let agent = AgentSettings {
            max_iterations: env
                .parse("AGENT_MAX_ITERATIONS")?
                .unwrap_or(crate::state_machine::AgentContext::default().max_iterations),
            fanout: FanOutConfig {
                call_timeout: env
                    .secs("AGENT_TOOL_TIMEOUT_SECS")?
                    .unwrap_or(fanout_defaults.call_timeout),
                call_retries: env
                    .parse("AGENT_TOOL_RETRIES")?
                    .unwrap_or(fanout_defaults.call_retries),
                ..fanout_defaults
            },
        };
        if agent.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                name: "AGENT_MAX_ITERATIONS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let mcp_command = match env.string("WEATHER_MCP_COMMAND") {
            Some(command) => PathBuf::from(command),
            None => default_mcp_command(),
        };

        let log_format = match env.string("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected \"text\" or \"json\"".into(),
                })
            }
        };

        Ok(Self {
            llm,
            agent,
            mcp_command,
            log_format,
            log_level: log_level_from_lookup(&lookup)?,
        })
    }

    /// Filter directive for the subscriber
    pub fn log_filter(&self) -> String {
        log_filter(self.log_level)
    }
}

pub fn log_level_from_env() -> Result<Level, ConfigError> {
    log_level_from_lookup(|name| std::env::var(name).ok())
}

/// `LOG_LEVEL`, accepting the usual names in any case; defaults to info
pub fn log_level_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Level, ConfigError> {
    let Some(value) = Env(&lookup).string("LOG_LEVEL") else {
        return Ok(Level::INFO);
    };
    match value.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => Err(ConfigError::Invalid {
            name: "LOG_LEVEL",
            value,
            reason: "expected trace, debug, info, warning or error".into(),
        }),
    }
}

pub fn log_filter(level: Level) -> String {
    format!("weather_agent={}", level.to_string().to_ascii_lowercase())
}

/// Weather provider settings, used by the function server
pub fn weather_config_from_env() -> Result<WeatherConfig, ConfigError> {
    weather_config_from_lookup(|name| std::env::var(name).ok())
}

pub fn weather_config_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<WeatherConfig, ConfigError> {
    let env = Env(&lookup);
    let defaults = WeatherConfig::default();
    Ok(WeatherConfig {
        api_key: env.string("WEATHER_API_KEY"),
        base_url: env.string("WEATHER_BASE_URL").unwrap_or(defaults.base_url),
        timeout: env.secs("WEATHER_TIMEOUT_SECS")?.unwrap_or(defaults.timeout),
    })
}

/// The server binary installed next to this executable, else from `PATH`
fn default_mcp_command() -> PathBuf {
    std::env::current_exe()
        .map(|exe| exe.with_file_name(DEFAULT_MCP_BINARY))
        .ok()
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MCP_BINARY))
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Set and non-blank
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(name)
            .map(|value| {
                value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn secs(&self, name: &'static str) -> Result<Option<Duration>, ConfigError> {
        match self.parse::<u64>(name)? {
            Some(0) => Err(ConfigError::Invalid {
                name,
                value: "0".into(),
                reason: "must be at least 1 second".into(),
            }),
            other => Ok(other.map(Duration::from_secs)),
        }
    }
}
