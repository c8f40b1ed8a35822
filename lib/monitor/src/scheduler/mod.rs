// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Actor that multiplexes monitoring requests onto the backend's slots.
//!
//! All state lives on a single tokio task. Callers talk to it through a
//! bounded command channel and get replies over oneshot channels, so the
//! backend is only ever touched from one place. The task sleeps until the
//! earliest active deadline, a command, a sampling tick, or cancellation.

mod state;

pub use state::SchedulerSnapshot;

use std::pin::Pin;

use cachemon_config::CachemonConfig;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::native::NativeMonitor;
use crate::request::{Admission, GroupId, MonitorRequest};
use state::SchedulerState;

enum Command {
    Add {
        request: MonitorRequest,
        reply: oneshot::Sender<Result<Admission, MonitorError>>,
    },
    Remove {
        group_id: GroupId,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
}

/// Handle to a running monitor scheduler.
///
/// Dropping the handle cancels the scheduler task, which releases every slot
/// and destroys the backend without running any pending callbacks.
pub struct MonitorScheduler {
    tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    slots: usize,
}

impl MonitorScheduler {
    /// Create backend `B` and start the scheduler task on the current runtime.
    ///
    /// The scheduler stops when `cancel` (or the returned handle) is cancelled.
    /// Traced groups get histograms of `config.rth.max_rth_time`, saved under
    /// `config.output.directory` when one is set.
    pub fn spawn<B: NativeMonitor>(
        options: B::Options,
        config: &CachemonConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, MonitorError> {
        let output_directory = config.output.directory.clone();
        let max_rth_time = config.rth.max_rth_time;
        let config = &config.monitor;
        let interval = config.sample_interval();
        let backend = B::create(options, interval)?;
        let slots = config.effective_slots(backend.max_concurrent_slots());
        if slots == 0 {
            backend.destroy();
            return Err(MonitorError::NoSlots);
        }

        let (tx, rx) = mpsc::channel(config.command_capacity);
        let cancel = cancel.child_token();
        let state = SchedulerState::new(backend, slots, max_rth_time, output_directory);

        tracing::info!(slots, ?interval, "starting monitor scheduler");
        let handle = tokio::spawn(run(state, rx, cancel.clone(), interval));

        Ok(Self {
            tx,
            cancel,
            handle: Some(handle),
            slots,
        })
    }

    /// Submit a request. Errors with [`MonitorError::DuplicateRequest`] if a
    /// group with the same id is already active or waiting.
    pub async fn add(&self, request: MonitorRequest) -> Result<Admission, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Add { request, reply }).await?;
        rx.await.map_err(|_| MonitorError::SchedulerClosed)?
    }

    /// Stop monitoring a group, or drop it from the waiting queue. Its error
    /// callback receives [`MonitorError::RemovedBeforeCompletion`].
    pub async fn remove(&self, group_id: impl Into<GroupId>) -> Result<(), MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Remove {
            group_id: group_id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| MonitorError::SchedulerClosed)?
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| MonitorError::SchedulerClosed)
    }

    /// Effective number of concurrently monitored groups.
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the scheduler and wait for it to release its slots.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "monitor scheduler task failed");
            }
        }
    }

    async fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| MonitorError::SchedulerClosed)
    }
}

impl Drop for MonitorScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<B: NativeMonitor>(
    mut state: SchedulerState<B>,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    interval: std::time::Duration,
) {
    let mut samples = tokio::time::interval(interval);
    samples.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Re-armed only when the earliest deadline changes.
    let mut timer: Pin<Box<Sleep>> = Box::pin(tokio::time::sleep_until(Instant::now()));
    let mut armed: Option<u64> = None;

    loop {
        match state.next_deadline() {
            Some((seq, end)) => {
                if armed != Some(seq) {
                    timer.as_mut().reset(end);
                    armed = Some(seq);
                }
            }
            None => armed = None,
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("monitor scheduler cancelled");
                break;
            }

            () = &mut timer, if armed.is_some() => {
                armed = None;
                state.expire(Instant::now());
            }

            command = rx.recv() => {
                let Some(command) = command else {
                    tracing::debug!("all scheduler handles dropped");
                    break;
                };
                handle_command(&mut state, command);
            }

            _ = samples.tick(), if state.has_active() => {
                state.poll_samples();
            }
        }
    }

    state.shutdown();
}

fn handle_command<B: NativeMonitor>(state: &mut SchedulerState<B>, command: Command) {
    let now = Instant::now();
    match command {
        Command::Add { request, reply } => {
            let _ = reply.send(state.add(request, now));
        }
        Command::Remove { group_id, reply } => {
            let _ = reply.send(state.remove(group_id, now));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
    }
}
