// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup for cache-monitoring processes.
//!
//! - Configuration loaded from:
//!   1. Environment variables (highest priority).
//!   2. Optional TOML file pointed to by the `CACHEMON_LOGGING_CONFIG_PATH` environment variable.
//!   3. `/opt/cachemon/etc/logging.toml`.
//!
//! Output is compact and human readable by default. Set `CACHEMON_LOGGING_JSONL=1` for one
//! JSON object per line. Timestamps are UTC unless `CACHEMON_LOG_USE_LOCAL_TZ=1`.
//!
//! Filters come from the `CACHEMON_LOG` environment variable or the `log_filters` table of
//! the TOML file, for example:
//! ```toml
//! log_level = "warn"
//!
//! [log_filters]
//! "cachemon_monitor::scheduler" = "debug"
//! ```

use std::collections::HashMap;
use std::sync::Once;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::Directive, fmt};

/// ENV used to set the log level
const FILTER_ENV: &str = "CACHEMON_LOG";

const DEFAULT_FILTER_LEVEL: &str = "info";

/// ENV used to set the path to the logging configuration file
const CONFIG_PATH_ENV: &str = "CACHEMON_LOGGING_CONFIG_PATH";

const SYSTEM_CONFIG_PATH: &str = "/opt/cachemon/etc/logging.toml";

const JSONL_ENV: &str = "CACHEMON_LOGGING_JSONL";

const LOCAL_TZ_ENV: &str = "CACHEMON_LOG_USE_LOCAL_TZ";

const DISABLE_ANSI_ENV: &str = "CACHEMON_SDK_DISABLE_ANSI_LOGGING";

static INIT: Once = Once::new();

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct LoggingConfig {
    log_level: String,
    log_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: DEFAULT_FILTER_LEVEL.to_string(),
            log_filters: HashMap::from([
                ("figment".to_string(), "warn".to_string()),
                ("rayon_core".to_string(), "warn".to_string()),
            ]),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops, as is the first
/// call if another subscriber is already installed.
pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let filter_layer = filters(load_config());
    // Each builder method returns a specialized type, so the branches repeat.
    let result = if env_is_truthy(JSONL_ENV) {
        let l = fmt::layer()
            .json()
            .with_timer(TimeFormatter::new())
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).try_init()
    } else {
        let l = fmt::layer()
            .with_ansi(!env_is_truthy(DISABLE_ANSI_ENV))
            .event_format(fmt::format().compact().with_timer(TimeFormatter::new()))
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).try_init()
    };
    if let Err(e) = result {
        eprintln!("cachemon logging not installed: {e}");
    }
}

fn filters(config: LoggingConfig) -> EnvFilter {
    let default_level = config.log_level.parse::<LevelFilter>().unwrap_or_else(|e| {
        eprintln!(
            "Invalid log_level '{}': {e}; using {DEFAULT_FILTER_LEVEL}",
            config.log_level
        );
        LevelFilter::INFO
    });
    let mut filter_layer = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy();

    for (module, level) in config.log_filters {
        match format!("{module}={level}").parse::<Directive>() {
            Ok(d) => {
                filter_layer = filter_layer.add_directive(d);
            }
            Err(e) => {
                eprintln!("Failed parsing filter '{level}' for module '{module}': {e}");
            }
        }
    }
    filter_layer
}

fn load_config() -> LoggingConfig {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(LoggingConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        figment = figment.merge(Toml::file(path));
    }

    figment.extract().unwrap_or_else(|e| {
        eprintln!("Invalid logging configuration: {e}; using defaults");
        LoggingConfig::default()
    })
}

/// `1`, `true`, `on` and `yes` (any case) count as set.
fn env_is_truthy(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"))
        .unwrap_or(false)
}

struct TimeFormatter {
    use_local_tz: bool,
}

impl TimeFormatter {
    fn new() -> Self {
        Self {
            use_local_tz: env_is_truthy(LOCAL_TZ_ENV),
        }
    }

    fn format_now(&self) -> String {
        if self.use_local_tz {
            chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
                .to_string()
        } else {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        }
    }
}

impl FormatTime for TimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", self.format_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_is_truthy() {
        temp_env::with_vars(
            [
                ("CACHEMON_TEST_TRUTHY_A", Some("TRUE")),
                ("CACHEMON_TEST_TRUTHY_B", Some("0")),
            ],
            || {
                assert!(env_is_truthy("CACHEMON_TEST_TRUTHY_A"));
                assert!(!env_is_truthy("CACHEMON_TEST_TRUTHY_B"));
                assert!(!env_is_truthy("CACHEMON_TEST_TRUTHY_UNSET"));
            },
        );
    }

    #[test]
    fn test_load_config_defaults() {
        temp_env::with_var_unset(CONFIG_PATH_ENV, || {
            let config = load_config();
            assert_eq!(config.log_level, DEFAULT_FILTER_LEVEL);
            assert_eq!(config.log_filters.get("figment").map(String::as_str), Some("warn"));
        });
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n\n[log_filters]\n\"cachemon_model\" = \"trace\""
        )
        .unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(file.path()), || {
            let config = load_config();
            assert_eq!(config.log_level, "debug");
            assert_eq!(
                config.log_filters.get("cachemon_model").map(String::as_str),
                Some("trace")
            );
            // defaults are merged, not replaced
            assert!(config.log_filters.contains_key("figment"));
        });
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [1, 2").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(file.path()), || {
            assert_eq!(load_config(), LoggingConfig::default());
        });
    }

    #[test]
    fn test_filters_tolerate_bad_level() {
        let config = LoggingConfig {
            log_level: "loud".to_string(),
            log_filters: HashMap::from([("cachemon_monitor".to_string(), "nope!".to_string())]),
        };
        temp_env::with_var_unset(FILTER_ENV, || {
            let filter = filters(config);
            assert!(filter.to_string().contains("info"));
        });
    }

    #[test]
    fn test_time_formatter_utc() {
        let formatter = TimeFormatter { use_local_tz: false };
        let now = formatter.format_now();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
