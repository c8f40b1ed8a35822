// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Average Eviction Time model.
//!
//! The model treats a cache of `c` lines as evicting a line once it has gone
//! unused for `AET(c)` accesses, where `AET(c)` is the smallest `t` with
//! `sum_{i <= t} P(reuse time > i) >= c`. The miss rate at size `c` is then
//! `P(reuse time > AET(c))`. All queries are answered from a prefix sum of the
//! histogram's interior buckets.

use std::io::Write;

use cachemon_config::{HardwareProfile, OutputConfig};

use crate::error::{ModelError, Result};
use crate::rth::ReuseTimeHistogram;

#[derive(Debug, Clone)]
pub struct AetModel {
    /// `prefix[t]` = number of reuses with gap in `1..=t`; `prefix[0] == 0`.
    prefix: Vec<u64>,
    cold_misses: u64,
    beyond_max: u64,
    total: u64,
}

impl AetModel {
    pub fn new(rth: &ReuseTimeHistogram) -> Result<Self> {
        let buckets = rth.buckets();
        let mut prefix = Vec::with_capacity(buckets.len() - 1);
        prefix.push(0);
        let overflow = || ModelError::malformed("bucket counts overflow u64");
        let mut running = 0u64;
        for &count in rth.interior() {
            running = running.checked_add(count).ok_or_else(overflow)?;
            prefix.push(running);
        }

        let cold_misses = rth.cold_misses();
        let beyond_max = rth.beyond_max();
        let total = cold_misses
            .checked_add(beyond_max)
            .and_then(|sentinels| sentinels.checked_add(running))
            .ok_or_else(overflow)?;
        if total == 0 {
            return Err(ModelError::malformed("histogram has no recorded events"));
        }

        tracing::debug!(
            max_time = rth.max_time(),
            cold_misses,
            beyond_max,
            total,
            "built AET model"
        );

        Ok(Self {
            prefix,
            cold_misses,
            beyond_max,
            total,
        })
    }

    /// Largest reuse time the histogram resolves.
    pub fn max_time(&self) -> usize {
        self.prefix.len() - 1
    }

    /// `P(reuse time > t)`, counting cold misses and overflow as never reused.
    ///
    /// Exactly 1.0 at `t == 0`. Beyond the largest recorded reuse time only the
    /// cold-miss and overflow mass remains.
    pub fn probability_reuse_time_greater_than(&self, t: usize) -> f64 {
        let never = self.cold_misses + self.beyond_max;
        let remaining = match self.prefix.get(t) {
            Some(&reused) => never + self.interior_sum() - reused,
            None => never,
        };
        remaining as f64 / self.total as f64
    }

    /// Average eviction time, in accesses, for a cache of `cache_size` lines.
    ///
    /// Clamped to [`max_time`](Self::max_time) once `cache_size` exceeds what the
    /// histogram can account for. `aet(0) == 0`.
    pub fn aet(&self, cache_size: usize) -> usize {
        let target = cache_size as f64;
        let mut accumulated = 0.0;
        let mut t = 0;
        while t < self.prefix.len() && accumulated < target {
            accumulated += self.probability_reuse_time_greater_than(t);
            t += 1;
        }
        t.saturating_sub(1)
    }

    /// Miss rate for a cache of `cache_size` lines.
    pub fn mr(&self, cache_size: usize) -> f64 {
        self.probability_reuse_time_greater_than(self.aet(cache_size))
    }

    /// Miss rate for every cache size in `0..=max_cache_size`, in one pass.
    ///
    /// Sizes past the largest one the histogram reaches repeat the last computed rate.
    pub fn mrc(&self, max_cache_size: usize) -> MissRateCurve {
        let mut rates = vec![0.0; max_cache_size + 1];
        rates[0] = self.probability_reuse_time_greater_than(0);

        let mut accumulated = 0.0f64;
        let mut reached = 0usize;
        for t in 0..self.prefix.len() {
            let p = self.probability_reuse_time_greater_than(t);
            let next = accumulated + p;
            let size = next as usize;
            if size > accumulated as usize {
                if size > max_cache_size {
                    break;
                }
                rates[size] = p;
                reached = size;
            }
            accumulated = next;
        }

        let plateau = rates[reached];
        for rate in &mut rates[reached + 1..] {
            *rate = plateau;
        }

        MissRateCurve {
            rates,
            last_computed: reached,
        }
    }

    /// Miss rate when the workload is given `ways` last-level-cache ways.
    pub fn miss_rate_for_ways(&self, profile: &HardwareProfile, ways: u32) -> f64 {
        let lines = profile.lines_per_way().saturating_mul(u64::from(ways));
        self.mr(usize::try_from(lines).unwrap_or(usize::MAX))
    }

    fn interior_sum(&self) -> u64 {
        self.prefix.last().copied().unwrap_or(0)
    }
}

/// Miss rate indexed by cache size in lines.
#[derive(Debug, Clone, PartialEq)]
pub struct MissRateCurve {
    rates: Vec<f64>,
    last_computed: usize,
}

impl MissRateCurve {
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn get(&self, cache_size: usize) -> Option<f64> {
        self.rates.get(cache_size).copied()
    }

    /// Largest cache size whose rate was computed rather than carried forward.
    pub fn last_computed(&self) -> usize {
        self.last_computed
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Headerless `cacheSize,missRate` rows with `precision` decimal places.
    pub fn write_csv<W: Write>(&self, writer: W, precision: usize) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (cache_size, rate) in self.rates.iter().enumerate() {
            wtr.write_record([cache_size.to_string(), format!("{rate:.precision$}")])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// [`write_csv`](Self::write_csv) at the configured precision.
    pub fn write_csv_with<W: Write>(&self, writer: W, output: &OutputConfig) -> Result<()> {
        self.write_csv(writer, output.mrc_precision)
    }
}
