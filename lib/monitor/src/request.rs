// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Monitoring requests and what the scheduler reports back for them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cachemon_model::{ThreadHistogram, TraceCollector};
use tokio::time::Instant;

use crate::error::MonitorError;

/// Identifier of a monitored process group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GroupId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

pub type FinishCallback = Box<dyn FnOnce(MonitorReport) + Send + 'static>;
pub type ErrorCallback = Box<dyn FnOnce(GroupId, MonitorError) + Send + 'static>;

/// Outcome of submitting a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was allocated and the monitoring window has started.
    Active,
    /// All slots are busy; the request waits in FIFO order.
    Queued,
    /// A slot was free but the backend failed to allocate it. The request's
    /// error callback has been dispatched.
    Rejected,
}

/// A request to monitor a process group for a fixed duration.
///
/// Exactly one of the callbacks runs, on a blocking task, unless the scheduler
/// shuts down first. Callbacks default to no-ops.
pub struct MonitorRequest {
    pub(crate) group_id: GroupId,
    pub(crate) pids: Vec<u32>,
    pub(crate) duration: Duration,
    pub(crate) on_finish: FinishCallback,
    pub(crate) on_error: ErrorCallback,
    pub(crate) collector: Option<TraceCollector>,
}

impl MonitorRequest {
    pub fn new(group_id: impl Into<GroupId>, pids: Vec<u32>, duration: Duration) -> Self {
        Self {
            group_id: group_id.into(),
            pids,
            duration,
            on_finish: Box::new(|_| {}),
            on_error: Box::new(|_, _| {}),
            collector: None,
        }
    }

    pub fn on_finish(mut self, callback: impl FnOnce(MonitorReport) + Send + 'static) -> Self {
        self.on_finish = Box::new(callback);
        self
    }

    pub fn on_error(
        mut self,
        callback: impl FnOnce(GroupId, MonitorError) + Send + 'static,
    ) -> Self {
        self.on_error = Box::new(callback);
        self
    }

    /// Trace the group's address samples. Each pid gets its own empty
    /// collector configured like `collector`.
    pub fn with_collector(mut self, collector: TraceCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn pids(&self) -> &[u32] {
        &self.pids
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Debug for MonitorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorRequest")
            .field("group_id", &self.group_id)
            .field("pids", &self.pids)
            .field("duration", &self.duration)
            .field("collector", &self.collector.is_some())
            .finish()
    }
}

/// Histograms traced for one pid of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessHistograms {
    pub pid: u32,
    /// One histogram per traced thread, ordered by tid.
    pub threads: Vec<ThreadHistogram>,
}

/// Delivered to the finish callback once a monitoring window elapses.
#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub group_id: GroupId,
    pub pids: Vec<u32>,
    pub admitted_at: Instant,
    pub finished_at: Instant,
    /// Traced pids in ascending order. Empty without a collector.
    pub processes: Vec<ProcessHistograms>,
}

impl MonitorReport {
    pub fn monitored_for(&self) -> Duration {
        self.finished_at.saturating_duration_since(self.admitted_at)
    }

    /// Path of the CSV that [`save_histograms`](Self::save_histograms) writes
    /// for thread `tid` of `pid`.
    pub fn histogram_path(&self, directory: &Path, pid: u32, tid: u64) -> PathBuf {
        let group: String = self
            .group_id
            .as_str()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        directory.join(format!("{group}-{pid}-{tid}.csv"))
    }

    /// Write every thread histogram under `directory`, creating it if needed.
    /// Returns the files written.
    pub fn save_histograms(&self, directory: &Path) -> cachemon_model::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(directory)?;
        let mut written = Vec::new();
        for process in &self.processes {
            for thread in &process.threads {
                let path = self.histogram_path(directory, process.pid, thread.tid);
                thread.rth.save(&path)?;
                written.push(path);
            }
        }
        Ok(written)
    }
}
