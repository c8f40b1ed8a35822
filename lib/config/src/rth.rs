// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reuse-time histogram capture configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which calculator each monitored thread gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatorKind {
    /// Tracks every distinct address. Exact, unbounded memory.
    Exact,
    /// Bounded reservoir of sampled addresses.
    #[default]
    Reservoir,
    /// Consumes addresses without recording them. Used to measure feed throughput.
    Discard,
}

/// How a full reservoir picks the entry to drop when it admits a new address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservoirEviction {
    /// Drop whichever entry the address map yields first. Not uniform; kept so
    /// histograms stay comparable with previously captured data.
    #[default]
    Arbitrary,
    /// Drop a uniformly random entry using an auxiliary index.
    Uniform,
}

/// Upper bound on `max_rth_time`. A histogram has `max_rth_time + 2` buckets.
pub const MAX_RTH_TIME: usize = 1 << 24;

/// Reuse-time histogram configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RthConfig {
    #[serde(default)]
    pub calculator: CalculatorKind,

    /// Maximum number of addresses a reservoir calculator tracks.
    #[validate(range(min = 1))]
    pub reservoir_size: usize,

    /// Largest reuse time with its own bucket; larger gaps fall into the overflow bucket.
    #[validate(range(min = 1, max = MAX_RTH_TIME))]
    pub max_rth_time: usize,

    #[serde(default)]
    pub eviction: ReservoirEviction,

    /// Seed for reservoir admission. None draws a fresh seed per calculator.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RthConfig {
    fn default() -> Self {
        Self {
            calculator: CalculatorKind::default(),
            reservoir_size: 100_000,
            max_rth_time: 100_000,
            eviction: ReservoirEviction::default(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RthConfig::default();
        assert_eq!(config.calculator, CalculatorKind::Reservoir);
        assert_eq!(config.eviction, ReservoirEviction::Arbitrary);
        assert_eq!(config.reservoir_size, 100_000);
        assert_eq!(config.max_rth_time, 100_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_rth_time_bounded() {
        let mut config = RthConfig {
            max_rth_time: MAX_RTH_TIME,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        config.max_rth_time = MAX_RTH_TIME + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_reservoir_rejected() {
        let config = RthConfig {
            reservoir_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: CalculatorKind = serde_json::from_str("\"exact\"").unwrap();
        assert_eq!(kind, CalculatorKind::Exact);
        let eviction: ReservoirEviction = serde_json::from_str("\"uniform\"").unwrap();
        assert_eq!(eviction, ReservoirEviction::Uniform);
    }
}
