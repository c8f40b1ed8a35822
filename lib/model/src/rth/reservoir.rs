// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reservoir-sampled reuse-time calculator.
//!
//! Keeps at most `capacity` addresses. Once the reservoir is full, a newly seen
//! address is admitted with probability `capacity / distinct_seen` and replaces
//! an existing sample. The set of distinct addresses is still tracked in full to
//! compute that probability.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use cachemon_config::ReservoirEviction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{ReuseTimeHistogram, RthCalculator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleState {
    Untagged,
    Tagged,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    state: SampleState,
    first_seen: u64,
    last_seen: u64,
    /// Position in the eviction index. Unused with arbitrary eviction.
    slot: usize,
}

#[derive(Debug)]
pub struct ReservoirCalculator {
    capacity: usize,
    eviction: ReservoirEviction,
    clock: u64,
    samples: HashMap<u64, Sample>,
    distinct: HashSet<u64>,
    /// Sampled addresses in slot order, maintained for uniform eviction only.
    index: Vec<u64>,
    rng: ChaCha8Rng,
}

impl ReservoirCalculator {
    /// Reservoir seeded from the thread-local generator.
    pub fn new(capacity: usize, eviction: ReservoirEviction) -> Self {
        Self::with_rng(capacity, eviction, ChaCha8Rng::from_rng(&mut rand::rng()))
    }

    /// Reservoir with reproducible admission decisions.
    pub fn with_seed(capacity: usize, eviction: ReservoirEviction, seed: u64) -> Self {
        Self::with_rng(capacity, eviction, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, eviction: ReservoirEviction, rng: ChaCha8Rng) -> Self {
        let capacity = capacity.max(1);
        let index = match eviction {
            ReservoirEviction::Uniform => Vec::with_capacity(capacity),
            ReservoirEviction::Arbitrary => Vec::new(),
        };
        Self {
            capacity,
            eviction,
            clock: 0,
            samples: HashMap::with_capacity(capacity),
            distinct: HashSet::new(),
            index,
            rng,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Addresses currently held in the reservoir.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct addresses seen so far, sampled or not.
    pub fn distinct_addresses(&self) -> usize {
        self.distinct.len()
    }

    fn admit(&mut self) -> bool {
        let probability = self.capacity as f64 / self.distinct.len() as f64;
        self.rng.random::<f64>() <= probability
    }

    fn evict_one(&mut self) {
        match self.eviction {
            ReservoirEviction::Arbitrary => {
                if let Some(victim) = self.samples.keys().next().copied() {
                    self.samples.remove(&victim);
                }
            }
            ReservoirEviction::Uniform => {
                if self.index.is_empty() {
                    return;
                }
                let slot = self.rng.random_range(0..self.index.len());
                let victim = self.index.swap_remove(slot);
                self.samples.remove(&victim);
                // the former last entry now lives at `slot`
                if let Some(sample) = self
                    .index
                    .get(slot)
                    .and_then(|moved| self.samples.get_mut(moved))
                {
                    sample.slot = slot;
                }
            }
        }
    }

    fn insert(&mut self, address: u64) {
        let slot = self.index.len();
        if self.eviction == ReservoirEviction::Uniform {
            self.index.push(address);
        }
        self.samples.insert(
            address,
            Sample {
                state: SampleState::Untagged,
                first_seen: self.clock,
                last_seen: self.clock,
                slot,
            },
        );
    }

    fn observe(&mut self, address: u64) {
        match self.samples.entry(address) {
            Entry::Occupied(mut entry) => {
                let sample = entry.get_mut();
                if sample.state == SampleState::Untagged {
                    sample.state = SampleState::Tagged;
                    sample.last_seen = self.clock;
                }
            }
            Entry::Vacant(_) => {
                self.distinct.insert(address);
                if self.samples.len() >= self.capacity {
                    if !self.admit() {
                        return;
                    }
                    self.evict_one();
                }
                self.insert(address);
            }
        }
    }
}

impl RthCalculator for ReservoirCalculator {
    fn update(&mut self, addresses: &[u64]) {
        for &address in addresses {
            self.observe(address);
            self.clock += 1;
        }
        debug_assert!(self.samples.len() <= self.capacity);
    }

    /// Never-reused samples land in bucket 0 alongside true cold misses.
    fn rth(&self, max_time: usize) -> ReuseTimeHistogram {
        let mut rth = ReuseTimeHistogram::zeroed(max_time);
        for sample in self.samples.values() {
            rth.record(sample.last_seen - sample.first_seen);
        }
        rth
    }

    fn accesses(&self) -> u64 {
        self.clock
    }
}
