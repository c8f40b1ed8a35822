// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Time-multiplexes a small pool of hardware cache-monitoring slots across
//! process groups, and hands each group's sampled addresses to the reuse-time
//! calculators of `cachemon-model`.

pub mod error;
pub mod logging;
pub mod native;
pub mod request;
pub mod scheduler;

pub use error::{MonitorError, NativeError};
pub use native::{NativeMonitor, SimulatedConfig, SimulatedMonitor};
pub use request::{Admission, GroupId, MonitorReport, MonitorRequest, ProcessHistograms};
pub use scheduler::{MonitorScheduler, SchedulerSnapshot};
