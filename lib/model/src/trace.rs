// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Address-trace feed decoding.
//!
//! The feed is a stream of little-endian 64-bit words grouped into batches:
//!
//! ```text
//! 0 | tid | access | access | ... | 0 | tid | access | ...
//! ```
//!
//! A zero word closes the current batch. The first non-zero word after it names
//! the thread; each following word is an access whose low `address_bits` hold the
//! byte address and whose high bits hold the access length in bytes (0 means 1).
//! An access is expanded into every cache line it touches.
//!
//! Addresses are buffered per thread and handed to that thread's calculator once
//! a closed batch leaves more than `write_threshold` of them pending.

use std::collections::HashMap;
use std::io::{BufReader, ErrorKind, Read};
use std::sync::Arc;

use cachemon_config::HardwareProfile;

use crate::error::Result;
use crate::rth::{CalculatorFactory, ReuseTimeHistogram, RthCalculator};

/// Frozen histogram of one traced thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadHistogram {
    pub tid: u64,
    /// Cache-line accesses fed to the thread's calculator.
    pub accesses: u64,
    pub rth: ReuseTimeHistogram,
}

struct ThreadTrace {
    calculator: Box<dyn RthCalculator>,
    pending: Vec<u64>,
}

pub struct TraceCollector {
    factory: Arc<CalculatorFactory>,
    profile: HardwareProfile,
    write_threshold: usize,
    threads: HashMap<u64, ThreadTrace>,
    current: Option<u64>,
    words: u64,
}

impl TraceCollector {
    pub fn new(
        factory: Arc<CalculatorFactory>,
        profile: HardwareProfile,
        write_threshold: usize,
    ) -> Self {
        Self {
            factory,
            profile,
            write_threshold,
            threads: HashMap::new(),
            current: None,
            words: 0,
        }
    }

    /// Empty collector configured like this one.
    pub fn fresh(&self) -> Self {
        Self::new(
            Arc::clone(&self.factory),
            self.profile.clone(),
            self.write_threshold,
        )
    }

    /// Decode a slice of feed words. Batches may span calls.
    pub fn feed(&mut self, words: &[u64]) {
        for &word in words {
            self.words += 1;
            if word == 0 {
                self.close_batch();
                continue;
            }
            match self.current {
                None => self.open_batch(word),
                Some(tid) => self.push_access(tid, word),
            }
        }
    }

    /// Decode a recorded binary feed until end of input.
    ///
    /// Returns the number of words read. A trailing partial word is dropped.
    pub fn consume_reader<R: Read>(&mut self, reader: R) -> Result<u64> {
        let mut reader = BufReader::new(reader);
        let mut chunk = vec![0u8; 8 * 4096];
        let mut words = Vec::with_capacity(4096);
        let mut carry = 0usize;
        let mut read = 0u64;

        loop {
            let n = match reader.read(&mut chunk[carry..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let filled = carry + n;
            let whole = filled - filled % 8;

            words.clear();
            words.extend(chunk[..whole].chunks_exact(8).map(|bytes| {
                let mut word = [0u8; 8];
                word.copy_from_slice(bytes);
                u64::from_le_bytes(word)
            }));
            self.feed(&words);
            read += words.len() as u64;

            chunk.copy_within(whole..filled, 0);
            carry = filled - whole;
        }

        if carry != 0 {
            tracing::warn!(bytes = carry, "dropping trailing partial word from trace feed");
        }
        Ok(read)
    }

    /// Threads seen so far.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Feed words decoded so far, delimiters and thread ids included.
    pub fn words(&self) -> u64 {
        self.words
    }

    /// Flush every pending buffer and freeze one histogram per thread, ordered by tid.
    pub fn finish(mut self, max_time: usize) -> Vec<ThreadHistogram> {
        let mut histograms: Vec<ThreadHistogram> = self
            .threads
            .drain()
            .map(|(tid, mut thread)| {
                if !thread.pending.is_empty() {
                    thread.calculator.update(&thread.pending);
                }
                ThreadHistogram {
                    tid,
                    accesses: thread.calculator.accesses(),
                    rth: thread.calculator.rth(max_time),
                }
            })
            .collect();
        histograms.sort_by_key(|h| h.tid);

        tracing::debug!(
            threads = histograms.len(),
            words = self.words,
            "trace collection finished"
        );
        histograms
    }

    fn open_batch(&mut self, tid: u64) {
        self.current = Some(tid);
        let factory = &self.factory;
        self.threads.entry(tid).or_insert_with(|| ThreadTrace {
            calculator: factory.create(tid),
            pending: Vec::new(),
        });
    }

    fn close_batch(&mut self) {
        let Some(tid) = self.current.take() else {
            return;
        };
        let Some(thread) = self.threads.get_mut(&tid) else {
            return;
        };
        if thread.pending.len() > self.write_threshold {
            thread.calculator.update(&thread.pending);
            thread.pending.clear();
        }
    }

    fn push_access(&mut self, tid: u64, word: u64) {
        let address = word & self.profile.address_mask();
        let length = word
            .checked_shr(self.profile.address_bits)
            .unwrap_or(0)
            .max(1);
        let mask = self.profile.line_mask();
        let first = address & mask;
        let last = address.saturating_add(length - 1) & mask;

        let Some(thread) = self.threads.get_mut(&tid) else {
            return;
        };
        let mut line = first;
        loop {
            thread.pending.push(line);
            if line >= last {
                break;
            }
            line += self.profile.cache_line_bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachemon_config::{CalculatorKind, RthConfig};

    fn collector(write_threshold: usize) -> TraceCollector {
        let factory = CalculatorFactory::new(RthConfig {
            calculator: CalculatorKind::Exact,
            ..Default::default()
        });
        TraceCollector::new(
            Arc::new(factory),
            HardwareProfile::default(),
            write_threshold,
        )
    }

    fn access(address: u64, length: u64) -> u64 {
        (length << 48) | address
    }

    #[test]
    fn test_fresh_collector_is_independent() {
        let mut first = collector(1);
        first.feed(&[0, 3, access(0x40, 1), 0]);
        let mut second = first.fresh();
        assert_eq!(second.thread_count(), 0);
        assert_eq!(second.words(), 0);

        second.feed(&[0, 4, access(0x40, 1), access(0x40, 1), 0]);
        let first = first.finish(8);
        let second = second.finish(8);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].tid, 3);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].tid, 4);
        assert_eq!(second[0].accesses, 2);
    }

    #[test]
    fn test_batches_route_by_tid() {
        let mut c = collector(0);
        c.feed(&[0, 7, access(0x1000, 8), access(0x1040, 8), 0]);
        c.feed(&[9, access(0x1000, 8), 0, 7, access(0x1000, 4), 0]);

        let histograms = c.finish(16);
        assert_eq!(histograms.len(), 2);
        assert_eq!(histograms[0].tid, 7);
        assert_eq!(histograms[0].accesses, 3);
        // 0x1000 reused after two accesses, 0x1040 never
        assert_eq!(histograms[0].rth.buckets()[0], 1);
        assert_eq!(histograms[0].rth.buckets()[2], 1);
        assert_eq!(histograms[1].tid, 9);
        assert_eq!(histograms[1].accesses, 1);
    }

    #[test]
    fn test_length_expands_over_lines() {
        let mut c = collector(0);
        // 0x103C..0x10C3 touches lines 0x1000, 0x1040, 0x1080, 0x10C0
        c.feed(&[1, access(0x103C, 0x88), 0]);
        // zero length counts as one byte
        c.feed(&[1, access(0x2001, 0), 0]);
        let histograms = c.finish(8);
        assert_eq!(histograms[0].accesses, 5);
        assert_eq!(histograms[0].rth.cold_misses(), 5);
    }

    #[test]
    fn test_pending_below_threshold_flushed_on_finish() {
        let mut c = collector(1_000);
        c.feed(&[0, 3, access(0x40, 1), access(0x80, 1), access(0x40, 1), 0]);
        let histograms = c.finish(4);
        assert_eq!(histograms[0].accesses, 3);
        assert_eq!(histograms[0].rth.buckets(), &[1, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_consume_reader_handles_split_words() {
        let words = [0u64, 5, access(0x40, 1), access(0x80, 1), 0];
        let mut bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.extend_from_slice(&[1, 2, 3]);

        // a reader that hands out 3 bytes at a time
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = buf.len().min(3).min(self.0.len());
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let mut c = collector(0);
        let read = c.consume_reader(Trickle(&bytes)).unwrap();
        assert_eq!(read, 5);
        assert_eq!(c.words(), 5);
        assert_eq!(c.thread_count(), 1);
        assert_eq!(c.finish(4)[0].accesses, 2);
    }
}
