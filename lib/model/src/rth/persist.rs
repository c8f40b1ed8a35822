// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Headerless `reuseTime,count` CSV encoding of a histogram.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use cachemon_config::MAX_RTH_TIME;

use super::ReuseTimeHistogram;
use crate::error::{ModelError, Result};

/// Index of the overflow bucket of the widest histogram accepted.
const MAX_BUCKET: usize = MAX_RTH_TIME + 1;

impl ReuseTimeHistogram {
    /// Write one `reuseTime,count` row per bucket, sentinels included.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (reuse_time, count) in self.buckets.iter().enumerate() {
            wtr.write_record([reuse_time.to_string(), count.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Parse `reuseTime,count` rows.
    ///
    /// Rows may come in any order and missing reuse times count as zero. The
    /// largest reuse time present is taken as the overflow bucket, and may not
    /// exceed `MAX_RTH_TIME + 1`.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = BTreeMap::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() != 2 {
                return Err(ModelError::malformed(format!(
                    "line {}: expected 2 fields, got {}",
                    line + 1,
                    record.len()
                )));
            }
            let reuse_time = record[0]
                .parse::<usize>()
                .ok()
                .filter(|reuse_time| *reuse_time <= MAX_BUCKET)
                .ok_or_else(|| {
                    ModelError::malformed(format!(
                        "line {}: bad reuse time {:?}",
                        line + 1,
                        &record[0]
                    ))
                })?;
            let count: u64 = record[1].parse().map_err(|_| {
                ModelError::malformed(format!("line {}: bad count {:?}", line + 1, &record[1]))
            })?;
            rows.insert(reuse_time, count);
        }

        let Some((&last, _)) = rows.last_key_value() else {
            return Err(ModelError::malformed("empty histogram"));
        };
        let len = last
            .checked_add(1)
            .ok_or_else(|| ModelError::malformed("reuse time out of range"))?;
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(len).map_err(|e| {
            ModelError::malformed(format!("cannot allocate {len} buckets: {e}"))
        })?;
        buckets.resize(len, 0);
        for (reuse_time, count) in rows {
            buckets[reuse_time] = count;
        }
        Self::from_buckets(buckets)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_csv(File::create(path)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_csv(File::open(path)?)
    }
}
