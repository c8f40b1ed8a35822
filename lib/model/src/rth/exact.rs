// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::{ReuseTimeHistogram, RthCalculator};

/// First-access and first-reuse ticks of one address.
#[derive(Debug, Clone, Copy)]
struct Span {
    first: u64,
    last: u64,
}

/// Tracks every distinct address. Memory grows with the working set.
#[derive(Debug, Default)]
pub struct ExactCalculator {
    spans: HashMap<u64, Span>,
    clock: u64,
}

impl ExactCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct addresses seen so far.
    pub fn distinct_addresses(&self) -> usize {
        self.spans.len()
    }
}

impl RthCalculator for ExactCalculator {
    fn update(&mut self, addresses: &[u64]) {
        for &address in addresses {
            match self.spans.entry(address) {
                Entry::Occupied(mut entry) => {
                    // only the first reuse gap is recorded
                    let span = entry.get_mut();
                    if span.last == span.first {
                        span.last = self.clock;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Span {
                        first: self.clock,
                        last: self.clock,
                    });
                }
            }
            self.clock += 1;
        }
    }

    fn rth(&self, max_time: usize) -> ReuseTimeHistogram {
        let mut rth = ReuseTimeHistogram::zeroed(max_time);
        for span in self.spans.values() {
            rth.record(span.last - span.first);
        }
        rth
    }

    fn accesses(&self) -> u64 {
        self.clock
    }
}
