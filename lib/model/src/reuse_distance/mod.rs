// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reuse-distance probability model.
//!
//! Converts a reuse-time distribution into a reuse-distance distribution
//! (the number of distinct addresses touched between two accesses to the same
//! line). For a reuse time `delta`, each of the other `N - 1` addresses is
//! assumed to appear inside the window independently with probability
//! `p3[delta]`, so the distance is binomial:
//!
//! ```text
//! P(distance = d) = sum over delta of C(N-1, d) * p3[delta]^d * (1 - p3[delta])^(N-1-d) * pt[delta]
//! ```
//!
//! Binomial coefficients come from a single Pascal row computed in the log
//! domain, and the per-distance sums fan out over a caller-supplied rayon pool.

mod binomial;
mod log_float;

pub use binomial::BinomialRow;
pub use log_float::LogFloat;

use std::time::Instant;

use cachemon_config::HardwareProfile;
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::error::{ModelError, Result};
use crate::rth::{ExactCalculator, ReuseTimeHistogram, RthCalculator};

#[derive(Debug, Clone)]
pub struct ReuseDistanceModel {
    /// Probability mass of each reuse-time bucket.
    pt: Vec<f64>,
    /// Probability that an unrelated address falls inside a window of `delta` accesses.
    p3: Vec<f64>,
    /// Number of distinct addresses.
    n: usize,
}

impl ReuseDistanceModel {
    /// Build from a histogram whose total is the number of distinct addresses,
    /// as produced by [`ExactCalculator`].
    pub fn from_rth(rth: &ReuseTimeHistogram) -> Result<Self> {
        let buckets = rth.buckets();
        if rth.interior().is_empty() {
            return Err(ModelError::malformed(
                "reuse-distance model needs at least one interior bucket",
            ));
        }
        let total = rth.total()?;
        if total < 2 {
            return Err(ModelError::malformed(format!(
                "reuse-distance model needs at least 2 distinct addresses, got {total}"
            )));
        }
        let n = usize::try_from(total)
            .map_err(|_| ModelError::malformed("distinct address count exceeds usize"))?;

        let len = buckets.len();
        let pt: Vec<f64> = buckets
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect();

        let mut suffix = vec![0.0; len];
        suffix[len - 1] = pt[len - 1];
        for i in (1..len - 1).rev() {
            suffix[i] = pt[i] + suffix[i + 1];
        }

        let others = (n - 1) as f64;
        let mut p3 = vec![0.0; len];
        p3[1] = suffix[2] / others;
        for t in 2..len - 1 {
            p3[t] = p3[t - 1] + suffix[t + 1] / others;
        }

        Ok(Self { pt, p3, n })
    }

    /// Build from a raw trace of byte addresses, bucketed by cache line.
    pub fn from_trace(addresses: &[u64], profile: &HardwareProfile) -> Result<Self> {
        let mask = profile.line_mask();
        let lines: Vec<u64> = addresses.iter().map(|address| address & mask).collect();

        let mut calculator = ExactCalculator::new();
        calculator.update(&lines);
        // no gap can reach the trace length; beyond MAX_RTH_TIME gaps overflow
        Self::from_rth(&calculator.rth(lines.len().max(1)))
    }

    pub fn distinct_addresses(&self) -> usize {
        self.n
    }

    /// `P(distance = d)` for `d` in `0..=N`; index 0 is always zero.
    pub fn reuse_distance_histogram(&self, pool: &ThreadPool) -> Vec<f64> {
        let started = Instant::now();
        let others = self.n - 1;
        let row = BinomialRow::pascal(others, pool);

        let terms: Vec<Term> = (1..self.pt.len() - 1)
            .filter(|&delta| self.pt[delta] != 0.0)
            .map(|delta| {
                let p = self.p3[delta].clamp(0.0, 1.0);
                Term {
                    hit: LogFloat::from_f64(p),
                    miss: LogFloat::from_f64(1.0 - p),
                    weight: self.pt[delta],
                }
            })
            .collect();

        let distances: Vec<f64> = pool.install(|| {
            (1..=self.n)
                .into_par_iter()
                .map(|d| probability_of_distance(d, others, &row, &terms))
                .collect()
        });
        let mut histogram = Vec::with_capacity(self.n + 1);
        histogram.push(0.0);
        histogram.extend(distances);

        tracing::debug!(
            distinct = self.n,
            terms = terms.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computed reuse-distance histogram"
        );
        histogram
    }
}

struct Term {
    hit: LogFloat,
    miss: LogFloat,
    weight: f64,
}

fn probability_of_distance(d: usize, others: usize, row: &BinomialRow, terms: &[Term]) -> f64 {
    if d > others {
        return 0.0;
    }
    let coefficient = row.get(d);
    terms
        .iter()
        .map(|term| {
            let binomial =
                coefficient * term.hit.powu(d as u64) * term.miss.powu((others - d) as u64);
            binomial.to_f64() * term.weight
        })
        .sum()
}
