// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Monitor scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Monitor scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MonitorConfig {
    /// Optional cap on concurrently monitored groups. The effective slot count
    /// is the smaller of this and what the native backend reports.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub max_slots: Option<usize>,

    /// Interval at which the native backend is polled for new address samples,
    /// and which is handed to the backend on creation.
    #[validate(range(min = 1))]
    pub sample_interval_ms: u64,

    /// Buffered addresses per thread before they are handed to its calculator.
    #[validate(range(min = 1))]
    pub write_threshold: usize,

    /// Capacity of the command channel into the scheduler loop. A capacity of
    /// one makes `add`/`remove` a rendezvous with the loop.
    #[validate(range(min = 1))]
    pub command_capacity: usize,
}

impl MonitorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Slot count given what the backend supports.
    pub fn effective_slots(&self, backend_slots: usize) -> usize {
        match self.max_slots {
            Some(cap) => cap.min(backend_slots),
            None => backend_slots,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_slots: None,
            sample_interval_ms: 1000,
            write_threshold: 20_000,
            command_capacity: 1,
        }
    }
}
