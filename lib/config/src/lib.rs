// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cachemon Configuration Library
//!
//! Centralized configuration for histogram capture, the monitor scheduler,
//! the compute pool used by the cache models, and the host's cache geometry.

mod hardware;
mod monitor;
mod output;
mod rayon;
mod rth;
mod tokio;

pub use hardware::{HardwareProfile, LatencyProfile};
pub use monitor::MonitorConfig;
pub use output::OutputConfig;
pub use rayon::RayonConfig;
pub use rth::{CalculatorKind, MAX_RTH_TIME, ReservoirEviction, RthConfig};
pub use tokio::{RuntimeFlavor, TokioConfig};

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Json, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extraction(#[from] Box<figment::Error>),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Configuration error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Top-level cachemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CachemonConfig {
    #[validate(nested)]
    #[serde(default)]
    pub rth: RthConfig,

    #[validate(nested)]
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[validate(nested)]
    #[serde(default)]
    pub rayon: RayonConfig,

    #[validate(nested)]
    #[serde(default)]
    pub tokio: TokioConfig,

    #[validate(nested)]
    #[serde(default)]
    pub hardware: HardwareProfile,

    #[validate(nested)]
    #[serde(default)]
    pub output: OutputConfig,
}

impl CachemonConfig {
    /// Create a Figment configuration with all sources merged.
    ///
    /// Configuration sources in priority order (lowest to highest):
    /// 1. Code defaults
    /// 2. System config file at /opt/cachemon/etc/cachemon.toml
    /// 3. TOML file from CACHEMON_CONFIG_PATH environment variable
    /// 4. Environment variables (CACHEMON_* prefixed)
    pub fn figment() -> Figment {
        let config_path = std::env::var("CACHEMON_CONFIG_PATH").unwrap_or_default();

        Figment::new()
            .merge(Serialized::defaults(CachemonConfig::default()))
            .merge(Toml::file("/opt/cachemon/etc/cachemon.toml"))
            .merge(Toml::file(&config_path))
            // CACHEMON_RTH_CALCULATOR, CACHEMON_RTH_RESERVOIR_SIZE, CACHEMON_RTH_SEED, ...
            .merge(
                Env::prefixed("CACHEMON_RTH_")
                    .map(|k| format!("rth.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_MONITOR_MAX_SLOTS, CACHEMON_MONITOR_SAMPLE_INTERVAL_MS, ...
            .merge(
                Env::prefixed("CACHEMON_MONITOR_")
                    .map(|k| format!("monitor.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_RAYON_NUM_THREADS
            .merge(
                Env::prefixed("CACHEMON_RAYON_")
                    .map(|k| format!("rayon.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_TOKIO_FLAVOR, CACHEMON_TOKIO_CALLBACK_THREADS
            .merge(
                Env::prefixed("CACHEMON_TOKIO_")
                    .map(|k| format!("tokio.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_HARDWARE_LLC_WAYS, CACHEMON_HARDWARE_CACHE_LINE_BYTES, ...
            .merge(
                Env::prefixed("CACHEMON_HARDWARE_")
                    .map(|k| format!("hardware.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_LATENCY_L1_NS, CACHEMON_LATENCY_MEMORY_NS, ...
            .merge(
                Env::prefixed("CACHEMON_LATENCY_")
                    .map(|k| format!("hardware.latency.{}", k.as_str().to_lowercase()).into()),
            )
            // CACHEMON_OUTPUT_DIRECTORY, CACHEMON_OUTPUT_MRC_PRECISION
            .merge(
                Env::prefixed("CACHEMON_OUTPUT_")
                    .map(|k| format!("output.{}", k.as_str().to_lowercase()).into()),
            )
    }

    /// Load configuration from default figment (env and files).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment())
    }

    /// Extract configuration from any provider.
    ///
    /// # Example
    /// ```rust,ignore
    /// let config = CachemonConfig::extract_from(
    ///     CachemonConfig::figment()
    ///         .merge(("rth.calculator", "exact"))
    ///         .merge(("monitor.max_slots", 4usize))
    /// )?;
    /// ```
    pub fn extract_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider)
            .extract()
            .map_err(|e| ConfigError::Extraction(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a figment from defaults, then merge a custom provider with highest priority.
    pub fn figment_with<T: Provider>(extra: T) -> Figment {
        Self::figment().merge(extra)
    }

    /// Load configuration merging JSON overrides over env vars, TOML files, and defaults.
    pub fn from_figment_with_json(json: &str) -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment().merge(Json::string(json)))
    }
}

/// Lets a [`CachemonConfig`] act as a configuration source, so dependent
/// crates can extract their own sections from the same Figment.
impl Provider for CachemonConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("CachemonConfig")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
