//! Configuration management for the graphflow server
//!
//! Handles server binding and engine defaults applied to every run.

use crate::runtime::executor::RunOptions;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Engine defaults
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Defaults for runs that do not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Node executions allowed per run
    pub max_steps: usize,
    /// Whether failed synchronous runs are reported as errors to the caller
    pub stop_on_exception: bool,
    /// Quality threshold of the sample code-review graph
    pub default_threshold: i64,
}

impl EngineConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_steps: self.max_steps,
            stop_on_exception: self.stop_on_exception,
        }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("GRAPHFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("GRAPHFLOW_PORT", 8000),
            },
            engine: EngineConfig {
                max_steps: env_or("GRAPHFLOW_MAX_STEPS", 1000),
                stop_on_exception: env_or("GRAPHFLOW_STOP_ON_EXCEPTION", true),
                default_threshold: env_or("GRAPHFLOW_SAMPLE_THRESHOLD", 70),
            },
        }
    }
}

/// Parse an environment variable, falling back when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
