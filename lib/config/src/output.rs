// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Where and how histograms and curves are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    /// Directory for per-thread histogram CSVs. None disables persistence.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Decimal places written for miss-rate values.
    #[validate(range(max = 17))]
    pub mrc_precision: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            mrc_precision: 2,
        }
    }
}
