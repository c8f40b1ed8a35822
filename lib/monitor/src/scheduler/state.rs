// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! State owned by the scheduler task: active groups ordered by deadline and
//! the FIFO of requests waiting for a slot.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, VecDeque};
use std::path::PathBuf;

use cachemon_model::TraceCollector;
use tokio::time::Instant;

use crate::error::MonitorError;
use crate::native::NativeMonitor;
use crate::request::{
    Admission, ErrorCallback, FinishCallback, GroupId, MonitorReport, MonitorRequest,
    ProcessHistograms,
};

/// Heap key for an active group. Ordered so the earliest deadline is the
/// maximum of a [`BinaryHeap`]; ties go to the earlier admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Deadline {
    pub end: Instant,
    pub seq: u64,
    pub group_id: GroupId,
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .end
            .cmp(&self.end)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct ActiveGroup<C> {
    pids: Vec<u32>,
    admitted_at: Instant,
    context: C,
    on_finish: FinishCallback,
    on_error: ErrorCallback,
    /// One collector per pid. Empty when the request is not traced.
    collectors: BTreeMap<u32, TraceCollector>,
}

/// Observation of the scheduler's queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Active groups, earliest deadline first.
    pub active: Vec<GroupId>,
    /// Waiting groups in admission order.
    pub waiting: Vec<GroupId>,
    pub slots: usize,
}

pub(crate) struct SchedulerState<B: NativeMonitor> {
    backend: B,
    slots: usize,
    max_rth_time: usize,
    output_directory: Option<PathBuf>,
    deadlines: BinaryHeap<Deadline>,
    active: HashMap<GroupId, ActiveGroup<B::Context>>,
    waiting: VecDeque<MonitorRequest>,
    next_seq: u64,
}

impl<B: NativeMonitor> SchedulerState<B> {
    pub fn new(
        backend: B,
        slots: usize,
        max_rth_time: usize,
        output_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            backend,
            slots,
            max_rth_time,
            output_directory,
            deadlines: BinaryHeap::with_capacity(slots),
            active: HashMap::with_capacity(slots),
            waiting: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Sequence number and deadline of the group that expires next.
    pub fn next_deadline(&self) -> Option<(u64, Instant)> {
        self.deadlines.peek().map(|d| (d.seq, d.end))
    }

    pub fn add(
        &mut self,
        request: MonitorRequest,
        now: Instant,
    ) -> Result<Admission, MonitorError> {
        let group_id = request.group_id.clone();
        if self.active.contains_key(&group_id)
            || self.waiting.iter().any(|w| w.group_id == group_id)
        {
            return Err(MonitorError::DuplicateRequest(group_id));
        }

        if self.active.len() < self.slots {
            if self.activate(request, now) {
                Ok(Admission::Active)
            } else {
                Ok(Admission::Rejected)
            }
        } else {
            tracing::debug!(
                %group_id,
                waiting = self.waiting.len() + 1,
                "all monitoring slots busy; request queued"
            );
            self.waiting.push_back(request);
            Ok(Admission::Queued)
        }
    }

    /// Release every group whose deadline has passed, then refill freed slots.
    pub fn expire(&mut self, now: Instant) {
        while let Some(deadline) = self.deadlines.peek() {
            if deadline.end > now {
                break;
            }
            let Some(deadline) = self.deadlines.pop() else {
                break;
            };
            let Some(mut group) = self.active.remove(&deadline.group_id) else {
                continue;
            };
            // pick up whatever arrived since the last sampling tick
            collect_samples(&mut self.backend, &deadline.group_id, &mut group);
            self.release(&deadline.group_id, group.context);
            tracing::info!(group_id = %deadline.group_id, "monitoring window elapsed");
            self.dispatch_finish(
                deadline.group_id,
                group.pids,
                group.admitted_at,
                now,
                group.on_finish,
                group.collectors,
            );
            self.promote(now);
        }
        self.check_invariants();
    }

    pub fn remove(&mut self, group_id: GroupId, now: Instant) -> Result<(), MonitorError> {
        if let Some(group) = self.active.remove(&group_id) {
            self.deadlines.retain(|d| d.group_id != group_id);
            self.release(&group_id, group.context);
            tracing::info!(%group_id, "active group removed before completion");
            dispatch_error(
                group.on_error,
                group_id.clone(),
                MonitorError::RemovedBeforeCompletion(group_id),
            );
            self.promote(now);
            self.check_invariants();
            return Ok(());
        }

        let Some(position) = self.waiting.iter().position(|w| w.group_id == group_id) else {
            return Err(MonitorError::NotFound(group_id));
        };
        if let Some(request) = self.waiting.remove(position) {
            tracing::info!(%group_id, "waiting group removed");
            dispatch_error(
                request.on_error,
                group_id.clone(),
                MonitorError::RemovedBeforeCompletion(group_id),
            );
        }
        Ok(())
    }

    /// Hand newly available address words to each group's collector.
    pub fn poll_samples(&mut self) {
        for (group_id, group) in self.active.iter_mut() {
            collect_samples(&mut self.backend, group_id, group);
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let mut deadlines: Vec<&Deadline> = self.deadlines.iter().collect();
        // heap order is reversed, so the largest Deadline expires first
        deadlines.sort_by(|a, b| b.cmp(a));
        SchedulerSnapshot {
            active: deadlines.into_iter().map(|d| d.group_id.clone()).collect(),
            waiting: self.waiting.iter().map(|w| w.group_id.clone()).collect(),
            slots: self.slots,
        }
    }

    /// Release every slot and destroy the backend. Pending callbacks are dropped.
    pub fn shutdown(mut self) {
        let active = self.active.len();
        let waiting = self.waiting.len();
        self.deadlines.clear();
        for (group_id, group) in std::mem::take(&mut self.active) {
            self.release(&group_id, group.context);
        }
        self.waiting.clear();
        self.backend.destroy();
        tracing::info!(active, waiting, "monitor scheduler shut down");
    }

    /// Try to start monitoring. On allocation failure the request's error
    /// callback is dispatched and false is returned.
    fn activate(&mut self, request: MonitorRequest, now: Instant) -> bool {
        let MonitorRequest {
            group_id,
            pids,
            duration,
            on_finish,
            on_error,
            collector,
        } = request;

        match self.backend.add_group(&group_id, &pids) {
            Ok(context) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let end = now + duration;
                tracing::info!(%group_id, ?pids, ?duration, active = self.active.len() + 1, "monitoring started");
                let collectors: BTreeMap<u32, TraceCollector> = collector
                    .map(|template| pids.iter().map(|&pid| (pid, template.fresh())).collect())
                    .unwrap_or_default();
                self.deadlines.push(Deadline {
                    end,
                    seq,
                    group_id: group_id.clone(),
                });
                self.active.insert(
                    group_id,
                    ActiveGroup {
                        pids,
                        admitted_at: now,
                        context,
                        on_finish,
                        on_error,
                        collectors,
                    },
                );
                true
            }
            Err(e) => {
                tracing::warn!(%group_id, ?pids, error = %e, "failed to allocate monitoring slot");
                dispatch_error(
                    on_error,
                    group_id.clone(),
                    MonitorError::AllocationFailed {
                        group_id,
                        code: e.code,
                    },
                );
                false
            }
        }
    }

    /// Admit waiting requests in FIFO order while slots are free. A request
    /// whose allocation fails is dropped and the next one is tried.
    fn promote(&mut self, now: Instant) {
        while self.active.len() < self.slots {
            let Some(request) = self.waiting.pop_front() else {
                break;
            };
            tracing::debug!(group_id = %request.group_id, "promoting waiting request");
            self.activate(request, now);
        }
    }

    fn release(&mut self, group_id: &GroupId, context: B::Context) {
        if let Err(e) = self.backend.remove_group(context) {
            tracing::warn!(%group_id, error = %e, "failed to release monitoring slot");
        }
    }

    fn dispatch_finish(
        &self,
        group_id: GroupId,
        pids: Vec<u32>,
        admitted_at: Instant,
        finished_at: Instant,
        on_finish: FinishCallback,
        collectors: BTreeMap<u32, TraceCollector>,
    ) {
        let max_rth_time = self.max_rth_time;
        let output_directory = self.output_directory.clone();
        tokio::task::spawn_blocking(move || {
            let processes = collectors
                .into_iter()
                .map(|(pid, collector)| ProcessHistograms {
                    pid,
                    threads: collector.finish(max_rth_time),
                })
                .collect();
            let report = MonitorReport {
                group_id,
                pids,
                admitted_at,
                finished_at,
                processes,
            };
            let directory = output_directory.filter(|_| !report.processes.is_empty());
            if let Some(directory) = directory {
                match report.save_histograms(&directory) {
                    Ok(written) => tracing::debug!(
                        group_id = %report.group_id,
                        files = written.len(),
                        directory = %directory.display(),
                        "saved reuse-time histograms"
                    ),
                    Err(e) => tracing::warn!(
                        group_id = %report.group_id,
                        directory = %directory.display(),
                        error = %e,
                        "failed to save reuse-time histograms"
                    ),
                }
            }
            on_finish(report);
        });
    }

    fn check_invariants(&self) {
        debug_assert!(self.active.len() <= self.slots);
        debug_assert_eq!(self.active.len(), self.deadlines.len());
    }
}

fn collect_samples<B: NativeMonitor>(
    backend: &mut B,
    group_id: &GroupId,
    group: &mut ActiveGroup<B::Context>,
) {
    for (pid, words) in backend.poll_samples(&mut group.context) {
        match group.collectors.get_mut(&pid) {
            Some(collector) => collector.feed(&words),
            None => tracing::trace!(%group_id, pid, words = words.len(), "dropping untraced samples"),
        }
    }
}

fn dispatch_error(on_error: ErrorCallback, group_id: GroupId, error: MonitorError) {
    tokio::task::spawn_blocking(move || on_error(group_id, error));
}
