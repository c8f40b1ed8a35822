// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Runtime that hosts the monitor scheduler.
//!
//! The scheduler itself is one task. Finish and error callbacks, along with
//! freezing each thread's histogram at the end of a monitoring window, run on
//! the blocking pool, so `callback_threads` bounds how many of those can be in
//! flight at once.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFlavor {
    /// Scheduler and callers share the thread that drives the runtime.
    CurrentThread,
    #[default]
    MultiThread,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokioConfig {
    #[serde(default)]
    pub flavor: RuntimeFlavor,

    /// Async worker threads for the multi-thread flavor. Ignored otherwise.
    #[validate(range(min = 1, max = 64))]
    pub worker_threads: usize,

    /// Upper bound on blocking threads running callbacks. None keeps Tokio's default.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub callback_threads: Option<usize>,

    /// How long an idle callback thread is kept before it exits.
    #[validate(range(min = 1))]
    pub callback_keep_alive_ms: u64,
}

impl Default for TokioConfig {
    fn default() -> Self {
        Self {
            flavor: RuntimeFlavor::default(),
            worker_threads: 2,
            callback_threads: None,
            callback_keep_alive_ms: 10_000,
        }
    }
}

#[cfg(feature = "tokio")]
impl TokioConfig {
    pub fn build_runtime(&self) -> std::io::Result<::tokio::runtime::Runtime> {
        let mut builder = match self.flavor {
            RuntimeFlavor::CurrentThread => ::tokio::runtime::Builder::new_current_thread(),
            RuntimeFlavor::MultiThread => {
                let mut builder = ::tokio::runtime::Builder::new_multi_thread();
                builder.worker_threads(self.worker_threads);
                builder
            }
        };

        if let Some(threads) = self.callback_threads {
            builder.max_blocking_threads(threads);
        }

        builder
            .thread_name("cachemon-rt")
            .thread_keep_alive(std::time::Duration::from_millis(self.callback_keep_alive_ms))
            .enable_all()
            .build()
    }
}
