// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cache-behavior models for last-level caches.
//!
//! Address traces are summarized per thread into reuse-time histograms
//! ([`rth`]), which feed the AET miss-rate model ([`aet`]) and the
//! reuse-distance model ([`reuse_distance`]). [`trace`] decodes the raw
//! address feed produced by the monitor into per-thread calculators.

pub mod aet;
pub mod error;
pub mod reuse_distance;
pub mod rth;
pub mod trace;

pub use aet::{AetModel, MissRateCurve};
pub use error::{ModelError, Result};
pub use reuse_distance::ReuseDistanceModel;
pub use rth::{
    CalculatorFactory, DiscardCalculator, ExactCalculator, ReservoirCalculator,
    ReuseTimeHistogram, RthCalculator,
};
pub use trace::{ThreadHistogram, TraceCollector};
