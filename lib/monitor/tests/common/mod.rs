// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use cachemon_config::{CachemonConfig, CalculatorKind, HardwareProfile, MonitorConfig, RthConfig};
use cachemon_model::TraceCollector;
use cachemon_model::rth::CalculatorFactory;
use cachemon_monitor::{
    GroupId, MonitorError, MonitorReport, MonitorRequest, MonitorScheduler, SimulatedConfig,
    SimulatedMonitor,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
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

/// What a request's callbacks observed.
#[derive(Debug)]
pub enum Event {
    Finished(MonitorReport),
    Failed(GroupId, MonitorError),
}

impl Event {
    pub fn group_id(&self) -> &GroupId {
        match self {
            Event::Finished(report) => &report.group_id,
            Event::Failed(group_id, _) => group_id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn events() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Request whose callbacks report into `events`.
pub fn request(id: &str, pid: u32, duration: Duration, events: &EventSender) -> MonitorRequest {
    let finished = events.clone();
    let failed = events.clone();
    MonitorRequest::new(id, vec![pid], duration)
        .on_finish(move |report| {
            let _ = finished.send(Event::Finished(report));
        })
        .on_error(move |group_id, error| {
            let _ = failed.send(Event::Failed(group_id, error));
        })
}

/// Receive exactly `n` events, failing the test if they do not arrive.
pub async fn next_events(rx: &mut EventReceiver, n: usize) -> Vec<Event> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let event = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for scheduler callback")
            .expect("event channel closed");
        out.push(event);
    }
    out
}

pub fn monitor_config(max_slots: Option<usize>) -> MonitorConfig {
    MonitorConfig {
        max_slots,
        sample_interval_ms: 100,
        ..Default::default()
    }
}

/// Scheduler config with 16-wide histograms and no output directory.
pub fn scheduler_config(max_slots: Option<usize>) -> CachemonConfig {
    let mut config = CachemonConfig::default();
    config.monitor = monitor_config(max_slots);
    config.rth.max_rth_time = 16;
    config
}

pub fn spawn(
    backend: SimulatedConfig,
    max_slots: Option<usize>,
    cancel: &CancellationToken,
) -> MonitorScheduler {
    MonitorScheduler::spawn::<SimulatedMonitor>(backend, &scheduler_config(max_slots), cancel)
        .expect("scheduler should start")
}

/// Collector backed by exact calculators.
pub fn exact_collector() -> TraceCollector {
    let factory = CalculatorFactory::new(RthConfig {
        calculator: CalculatorKind::Exact,
        ..Default::default()
    });
    TraceCollector::new(Arc::new(factory), HardwareProfile::default(), 1)
}

/// Access word for `address` with the default 48 address bits.
pub fn access(address: u64, length: u64) -> u64 {
    (length << 48) | address
}
