// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Hardware profile: cache geometry and access latencies of the monitored host.
//!
//! Models and the trace decoder take a profile at construction time instead of
//! reading process-wide constants, so several profiles can coexist (e.g. in tests).

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Access latencies in nanoseconds, consumed by downstream predictors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LatencyProfile {
    #[validate(range(min = 0.0))]
    pub l1_ns: f64,
    #[validate(range(min = 0.0))]
    pub l2_ns: f64,
    #[validate(range(min = 0.0))]
    pub l3_ns: f64,
    #[validate(range(min = 0.0))]
    pub memory_ns: f64,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        // Skylake-SP ballpark
        Self {
            l1_ns: 1.2,
            l2_ns: 4.0,
            l3_ns: 19.0,
            memory_ns: 90.0,
        }
    }
}

/// Cache geometry of the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HardwareProfile {
    /// Name used in logs, e.g. "skylake".
    pub name: String,

    /// Cache line size in bytes. Must be a power of two.
    #[validate(custom(function = "validate_power_of_two"))]
    pub cache_line_bytes: u64,

    /// Number of significant bits in a traced address.
    #[validate(range(min = 12, max = 64))]
    pub address_bits: u32,

    /// Associativity of the last-level cache.
    #[validate(range(min = 1))]
    pub llc_ways: u32,

    /// Total last-level cache capacity in bytes.
    #[validate(range(min = 1))]
    pub llc_size_bytes: u64,

    #[validate(nested)]
    #[serde(default)]
    pub latency: LatencyProfile,
}

impl HardwareProfile {
    /// log2 of the cache line size.
    pub fn line_shift(&self) -> u32 {
        self.cache_line_bytes.trailing_zeros()
    }

    /// Mask selecting the address bits of a traced word.
    pub fn address_mask(&self) -> u64 {
        if self.address_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.address_bits) - 1
        }
    }

    /// Mask that clears the offset-within-line bits of an address.
    pub fn line_mask(&self) -> u64 {
        self.address_mask() & !(self.cache_line_bytes - 1)
    }

    /// Total cache lines in the last-level cache.
    pub fn llc_lines(&self) -> u64 {
        self.llc_size_bytes / self.cache_line_bytes
    }

    /// Cache lines covered by a single way of the last-level cache.
    pub fn lines_per_way(&self) -> u64 {
        self.llc_lines() / u64::from(self.llc_ways)
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self {
            name: "skylake".to_string(),
            cache_line_bytes: 64,
            address_bits: 48,
            llc_ways: 11,
            // 1.5 MiB per way
            llc_size_bytes: 11 * 1536 * 1024,
            latency: LatencyProfile::default(),
        }
    }
}

fn validate_power_of_two(value: u64) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("cache_line_bytes must be a power of two"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let profile = HardwareProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.line_shift(), 6);
        assert_eq!(profile.line_mask(), 0xFFFF_FFFF_FFC0);
        assert_eq!(
            profile.lines_per_way() * u64::from(profile.llc_ways),
            profile.llc_lines()
        );
    }

    #[test]
    fn test_non_power_of_two_line_rejected() {
        let profile = HardwareProfile {
            cache_line_bytes: 48,
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_full_width_addresses() {
        let profile = HardwareProfile {
            address_bits: 64,
            cache_line_bytes: 128,
            ..Default::default()
        };
        assert_eq!(profile.address_mask(), u64::MAX);
        assert_eq!(profile.line_mask(), !127u64);
    }
}
