// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::request::GroupId;

/// Failure reported by a native monitoring backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with code {code}")]
pub struct NativeError {
    pub operation: &'static str,
    pub code: i32,
}

impl NativeError {
    pub fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The backend refused to allocate a slot for the group.
    #[error("failed to allocate a monitoring slot for group {group_id}: code {code}")]
    AllocationFailed { group_id: GroupId, code: i32 },

    #[error("group {0} is already active or waiting")]
    DuplicateRequest(GroupId),

    /// The group was removed before its monitoring window elapsed.
    #[error("group {0} was removed before monitoring completed")]
    RemovedBeforeCompletion(GroupId),

    #[error("group {0} is neither active nor waiting")]
    NotFound(GroupId),

    #[error("monitor scheduler has shut down")]
    SchedulerClosed,

    #[error("native backend reports no monitoring slots")]
    NoSlots,

    #[error("native backend error: {0}")]
    Native(#[from] NativeError),
}
