// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reuse-time histograms and the calculators that produce them.
//!
//! A calculator consumes a per-thread stream of cache-line addresses. Every
//! address advances the calculator's logical clock by one tick, and the reuse
//! time of an address is the number of ticks between its first access and its
//! first re-access. [`RthCalculator::rth`] freezes the current state into a
//! [`ReuseTimeHistogram`] that the models in this crate consume.
//!
//! Three interchangeable calculators are provided:
//! - [`ExactCalculator`]: tracks every distinct address (unbounded memory).
//! - [`ReservoirCalculator`]: tracks a bounded random sample of addresses.
//! - [`DiscardCalculator`]: counts addresses and records nothing.
//!
//! [`CalculatorFactory`] picks one per thread from an [`RthConfig`].

mod discard;
mod exact;
mod persist;
mod reservoir;

pub use discard::DiscardCalculator;
pub use exact::ExactCalculator;
pub use reservoir::ReservoirCalculator;

use std::sync::atomic::{AtomicU64, Ordering};

use cachemon_config::{CalculatorKind, MAX_RTH_TIME, RthConfig};

use crate::error::{ModelError, Result};

/// Histogram of reuse gaps.
///
/// Bucket 0 counts addresses that were never reused (cold misses); the last
/// bucket counts gaps larger than [`max_time`](Self::max_time). Everything in
/// between is indexed by the gap itself. A histogram always has at least two
/// buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReuseTimeHistogram {
    buckets: Vec<u64>,
}

impl ReuseTimeHistogram {
    /// All-zero histogram with `max_time + 2` buckets. `max_time` is clamped
    /// to [`MAX_RTH_TIME`].
    pub fn zeroed(max_time: usize) -> Self {
        Self {
            buckets: vec![0; max_time.min(MAX_RTH_TIME) + 2],
        }
    }

    pub fn from_buckets(buckets: Vec<u64>) -> Result<Self> {
        if buckets.len() < 2 {
            return Err(ModelError::malformed(format!(
                "expected at least 2 buckets, got {}",
                buckets.len()
            )));
        }
        Ok(Self { buckets })
    }

    /// Count one reuse gap, routing it to the overflow bucket when it exceeds `max_time`.
    pub fn record(&mut self, gap: u64) {
        let overflow = self.buckets.len() - 1;
        let index = usize::try_from(gap)
            .ok()
            .filter(|gap| *gap < overflow)
            .unwrap_or(overflow);
        self.buckets[index] = self.buckets[index].saturating_add(1);
    }

    /// Largest gap with its own bucket.
    pub fn max_time(&self) -> usize {
        self.buckets.len() - 2
    }

    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<u64> {
        self.buckets
    }

    pub fn cold_misses(&self) -> u64 {
        self.buckets[0]
    }

    pub fn beyond_max(&self) -> u64 {
        self.buckets[self.buckets.len() - 1]
    }

    /// Buckets `1..=max_time`.
    pub fn interior(&self) -> &[u64] {
        &self.buckets[1..self.buckets.len() - 1]
    }

    /// Number of recorded events, sentinels included. Fails if the counts do
    /// not fit in a `u64`.
    pub fn total(&self) -> Result<u64> {
        self.buckets
            .iter()
            .try_fold(0u64, |acc, &count| acc.checked_add(count))
            .ok_or_else(|| ModelError::malformed("bucket counts overflow u64"))
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&count| count == 0)
    }
}

/// Consumes an address stream and summarizes it as a reuse-time histogram.
///
/// Calculators are owned by a single producer; `update` takes `&mut self` and
/// the `Send` bound only allows handing one to another thread.
pub trait RthCalculator: Send {
    /// Feed addresses in access order. Each address advances the logical clock by one.
    fn update(&mut self, addresses: &[u64]);

    /// Freeze the current state into a histogram with `max_time + 2` buckets.
    fn rth(&self, max_time: usize) -> ReuseTimeHistogram;

    /// Addresses consumed so far.
    fn accesses(&self) -> u64;
}

/// Builds one calculator per monitored thread.
#[derive(Debug)]
pub struct CalculatorFactory {
    config: RthConfig,
    created: AtomicU64,
}

impl CalculatorFactory {
    pub fn new(config: RthConfig) -> Self {
        Self {
            config,
            created: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RthConfig {
        &self.config
    }

    pub fn max_rth_time(&self) -> usize {
        self.config.max_rth_time
    }

    /// Calculator for thread `tid`.
    ///
    /// With a configured seed, each reservoir is seeded from `seed` and `tid`, so
    /// a replayed trace samples the same addresses for the same thread.
    pub fn create(&self, tid: u64) -> Box<dyn RthCalculator> {
        self.created.fetch_add(1, Ordering::Relaxed);
        match self.config.calculator {
            CalculatorKind::Exact => Box::new(ExactCalculator::new()),
            CalculatorKind::Discard => Box::new(DiscardCalculator::new()),
            CalculatorKind::Reservoir => {
                let calculator = match self.config.seed {
                    Some(seed) => ReservoirCalculator::with_seed(
                        self.config.reservoir_size,
                        self.config.eviction,
                        seed ^ tid.rotate_left(32),
                    ),
                    None => ReservoirCalculator::new(
                        self.config.reservoir_size,
                        self.config.eviction,
                    ),
                };
                Box::new(calculator)
            }
        }
    }

    /// Number of calculators handed out so far.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}
