// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Rayon thread pool configuration.
//!
//! The reuse-distance model fans out one unit of work per candidate distance,
//! which can be tens of thousands of units. All of that work is bounded by the
//! pool built here.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound on the default pool size.
const DEFAULT_MAX_THREADS: usize = 8;

/// Rayon thread pool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RayonConfig {
    /// Number of threads in the Rayon thread pool.
    /// If None, uses one less than the number of logical CPUs, capped at 8.
    #[validate(range(min = 1))]
    pub num_threads: Option<usize>,
}

impl RayonConfig {
    /// Number of threads the pool will be built with.
    pub fn resolved_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1).clamp(1, DEFAULT_MAX_THREADS))
                .unwrap_or(1)
        })
    }
}

#[cfg(feature = "rayon")]
impl RayonConfig {
    /// Build a Rayon thread pool from this configuration.
    pub fn build_pool(&self) -> Result<::rayon::ThreadPool, ::rayon::ThreadPoolBuildError> {
        ::rayon::ThreadPoolBuilder::new()
            .num_threads(self.resolved_threads())
            .thread_name(|idx| format!("cachemon-compute-{idx}"))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RayonConfig::default();
        assert!(config.num_threads.is_none());
        let threads = config.resolved_threads();
        assert!((1..=DEFAULT_MAX_THREADS).contains(&threads));
    }

    #[test]
    fn test_explicit_threads_win() {
        let config = RayonConfig {
            num_threads: Some(12),
        };
        assert_eq!(config.resolved_threads(), 12);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_build_pool() {
        let config = RayonConfig {
            num_threads: Some(2),
        };
        let pool = config.build_pool().expect("Failed to build pool");
        assert_eq!(pool.current_num_threads(), 2);
    }
}
