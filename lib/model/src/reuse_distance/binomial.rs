// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use rayon::ThreadPool;
use rayon::prelude::*;

use super::LogFloat;

/// Rows at least this wide are split into chunks of this many entries and
/// built in parallel.
const PARALLEL_CHUNK: usize = 256;

/// Binomial coefficients `C(n, k)` for a single `n`, built with Pascal's rule.
///
/// Only the lower half of the row is stored; the rest follows by symmetry.
#[derive(Debug, Clone)]
pub struct BinomialRow {
    n: usize,
    half: Vec<LogFloat>,
}

impl BinomialRow {
    /// Build row `n` by repeated addition, starting from row 0.
    pub fn pascal(n: usize, pool: &ThreadPool) -> Self {
        let started = Instant::now();
        let mut prev = Vec::with_capacity(n / 2 + 1);
        let mut next = Vec::with_capacity(n / 2 + 1);
        prev.push(LogFloat::ONE);

        pool.install(|| {
            for row in 1..=n {
                next.clear();
                next.resize(row / 2 + 1, LogFloat::ZERO);
                next[0] = LogFloat::ONE;

                let width = next.len() - 1;
                let fill = |offset: usize, slots: &mut [LogFloat]| {
                    for (i, slot) in slots.iter_mut().enumerate() {
                        let k = offset + i;
                        *slot = mirrored(&prev, row - 1, k) + mirrored(&prev, row - 1, k - 1);
                    }
                };

                if width >= PARALLEL_CHUNK {
                    next[1..]
                        .par_chunks_mut(PARALLEL_CHUNK)
                        .enumerate()
                        .for_each(|(chunk, slots)| fill(1 + chunk * PARALLEL_CHUNK, slots));
                } else {
                    fill(1, &mut next[1..]);
                }

                std::mem::swap(&mut prev, &mut next);
            }
        });

        tracing::debug!(
            n,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built binomial row"
        );

        Self { n, half: prev }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// `C(n, k)`, zero when `k > n`.
    pub fn get(&self, k: usize) -> LogFloat {
        if k > self.n {
            LogFloat::ZERO
        } else {
            mirrored(&self.half, self.n, k)
        }
    }
}

/// Entry `k` of row `n` given the lower half of that row.
fn mirrored(half: &[LogFloat], n: usize, k: usize) -> LogFloat {
    half[k.min(n - k)]
}
