// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Contract between the scheduler and the layer that programs monitoring hardware.
//!
//! A backend owns a small, fixed number of counter-attribution slots (RMIDs on
//! Intel RDT). The scheduler calls it only from its own task, one call at a
//! time, so implementations need not be internally synchronized.

mod simulated;

pub use simulated::{
    REJECTED_PID_CODE, SampleInjector, SimulatedConfig, SimulatedContext, SimulatedMonitor,
    SimulatedStats,
};

use std::time::Duration;

use crate::error::NativeError;
use crate::request::GroupId;

pub trait NativeMonitor: Send + Sized + 'static {
    /// Backend-specific construction parameters.
    type Options: Send;

    /// Handle for one monitored group, held while the group occupies a slot.
    type Context: Send + 'static;

    /// Initialize the backend. `interval` is the sampling interval the
    /// scheduler will poll at.
    fn create(options: Self::Options, interval: Duration) -> Result<Self, NativeError>;

    /// Number of groups that can be monitored at once.
    fn max_concurrent_slots(&self) -> usize;

    /// Attach a slot to `pids`.
    fn add_group(&mut self, group_id: &GroupId, pids: &[u32]) -> Result<Self::Context, NativeError>;

    /// Release the slot held by `context`.
    fn remove_group(&mut self, context: Self::Context) -> Result<(), NativeError>;

    /// Address words gathered for `context` since the previous poll, in the
    /// trace-feed encoding, keyed by the pid they were sampled from.
    fn poll_samples(&mut self, _context: &mut Self::Context) -> Vec<(u32, Vec<u64>)> {
        Vec::new()
    }

    /// Tear the backend down. Called once, after every slot has been released.
    fn destroy(self);
}
