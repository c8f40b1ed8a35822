// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-process backend for hosts without monitoring hardware, and for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use super::NativeMonitor;
use crate::error::NativeError;
use crate::request::GroupId;

/// Error code returned for pids on the rejection list.
pub const REJECTED_PID_CODE: i32 = -22;

/// Call counters shared between a [`SimulatedMonitor`] and its creator.
#[derive(Debug, Default)]
pub struct SimulatedStats {
    add_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    destroyed: AtomicBool,
}

impl SimulatedStats {
    /// Successful and failed allocations.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most slots ever held at once.
    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

/// Pushes address words for a pid into a running [`SimulatedMonitor`].
#[derive(Debug, Clone)]
pub struct SampleInjector {
    tx: mpsc::UnboundedSender<(u32, Vec<u64>)>,
}

impl SampleInjector {
    /// Returns false once the backend is gone.
    pub fn inject(&self, pid: u32, words: Vec<u64>) -> bool {
        self.tx.send((pid, words)).is_ok()
    }
}

pub struct SimulatedConfig {
    pub slots: usize,
    /// Pids whose allocation fails with [`REJECTED_PID_CODE`].
    pub rejected_pids: HashSet<u32>,
    pub stats: Arc<SimulatedStats>,
    samples: mpsc::UnboundedReceiver<(u32, Vec<u64>)>,
}

impl SimulatedConfig {
    /// Config plus the injector feeding the backend it creates.
    pub fn new(slots: usize) -> (Self, SampleInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Self {
            slots,
            rejected_pids: HashSet::new(),
            stats: Arc::new(SimulatedStats::default()),
            samples: rx,
        };
        (config, SampleInjector { tx })
    }

    pub fn reject_pid(mut self, pid: u32) -> Self {
        self.rejected_pids.insert(pid);
        self
    }
}

#[derive(Debug)]
pub struct SimulatedContext {
    group_id: GroupId,
    pids: Vec<u32>,
    slot: usize,
}

impl SimulatedContext {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

pub struct SimulatedMonitor {
    slots: usize,
    rejected_pids: HashSet<u32>,
    stats: Arc<SimulatedStats>,
    samples: mpsc::UnboundedReceiver<(u32, Vec<u64>)>,
    /// Words received for pids that have not been polled yet.
    buffered: HashMap<u32, Vec<u64>>,
    free_slots: Vec<usize>,
}

impl SimulatedMonitor {
    fn drain_injected(&mut self) {
        while let Ok((pid, words)) = self.samples.try_recv() {
            self.buffered.entry(pid).or_default().extend(words);
        }
    }
}

impl NativeMonitor for SimulatedMonitor {
    type Options = SimulatedConfig;
    type Context = SimulatedContext;

    fn create(options: SimulatedConfig, interval: Duration) -> Result<Self, NativeError> {
        if interval.is_zero() {
            return Err(NativeError::new("create", -1));
        }
        tracing::debug!(slots = options.slots, ?interval, "created simulated monitor");
        Ok(Self {
            slots: options.slots,
            rejected_pids: options.rejected_pids,
            stats: options.stats,
            samples: options.samples,
            buffered: HashMap::new(),
            free_slots: (0..options.slots).rev().collect(),
        })
    }

    fn max_concurrent_slots(&self) -> usize {
        self.slots
    }

    fn add_group(&mut self, group_id: &GroupId, pids: &[u32]) -> Result<SimulatedContext, NativeError> {
        self.stats.add_calls.fetch_add(1, Ordering::SeqCst);
        if pids.iter().any(|pid| self.rejected_pids.contains(pid)) {
            return Err(NativeError::new("add_group", REJECTED_PID_CODE));
        }
        let slot = self
            .free_slots
            .pop()
            .ok_or_else(|| NativeError::new("add_group", -16))?;

        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_active.fetch_max(active, Ordering::SeqCst);
        Ok(SimulatedContext {
            group_id: group_id.clone(),
            pids: pids.to_vec(),
            slot,
        })
    }

    fn remove_group(&mut self, context: SimulatedContext) -> Result<(), NativeError> {
        self.stats.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        self.free_slots.push(context.slot);
        for pid in &context.pids {
            self.buffered.remove(pid);
        }
        tracing::trace!(group_id = %context.group_id, slot = context.slot, "released simulated slot");
        Ok(())
    }

    fn poll_samples(&mut self, context: &mut SimulatedContext) -> Vec<(u32, Vec<u64>)> {
        self.drain_injected();
        context
            .pids
            .iter()
            .filter_map(|&pid| self.buffered.remove(&pid).map(|words| (pid, words)))
            .collect()
    }

    fn destroy(self) {
        self.stats.destroyed.store(true, Ordering::SeqCst);
        tracing::debug!(slots = self.slots, "destroyed simulated monitor");
    }
}
