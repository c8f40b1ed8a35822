// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{ReuseTimeHistogram, RthCalculator};

/// Counts addresses without recording them. Used to measure how fast the feed
/// path can deliver addresses with calculator cost taken out.
#[derive(Debug, Default)]
pub struct DiscardCalculator {
    accesses: u64,
}

impl DiscardCalculator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RthCalculator for DiscardCalculator {
    fn update(&mut self, addresses: &[u64]) {
        self.accesses += addresses.len() as u64;
    }

    fn rth(&self, max_time: usize) -> ReuseTimeHistogram {
        ReuseTimeHistogram::zeroed(max_time)
    }

    fn accesses(&self) -> u64 {
        self.accesses
    }
}
