// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for model integration tests.

#![allow(dead_code)]

use std::sync::Once;

use cachemon_model::ReuseTimeHistogram;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Reference histogram: 5 cold misses, reuse times 1..=40 with counts 50 down
/// to 11, and 10 reuses beyond the largest tracked time.
pub fn reference_rth() -> ReuseTimeHistogram {
    let mut buckets = vec![5u64];
    buckets.extend((11..=50).rev());
    buckets.push(10);
    ReuseTimeHistogram::from_buckets(buckets).unwrap()
}

/// CSV text of [`reference_rth`], rows shuffled.
pub fn reference_csv() -> String {
    let rth = reference_rth();
    let mut rows: Vec<String> = rth
        .buckets()
        .iter()
        .enumerate()
        .map(|(t, c)| format!("{t},{c}"))
        .collect();
    rows.reverse();
    rows.swap(3, 17);
    rows.join("\n") + "\n"
}

/// Cache-line aligned addresses with a hot set reused often and a cold tail.
pub fn skewed_trace(seed: u64, len: usize, hot: u64, universe: u64) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let line = if rng.random_bool(0.8) {
                rng.random_range(0..hot)
            } else {
                rng.random_range(0..universe)
            };
            line << 6
        })
        .collect()
}
