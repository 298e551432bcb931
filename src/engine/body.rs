//! Size-capped body buffering with disk spill.
//!
//! Writes accumulate in memory up to the in-memory limit; the overflow goes
//! to an unnamed temporary file that the OS reclaims when the buffer drops,
//! on every exit path. Bytes past the total limit are discarded and flagged.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// A write-once-then-read body buffer.
#[derive(Debug)]
pub struct BodyBuffer {
    memory: Vec<u8>,
    spill: Option<File>,
    spilled_len: u64,
    memory_limit: u64,
    total_limit: u64,
    truncated: bool,
}

impl BodyBuffer {
    /// Create a buffer holding at most `memory_limit` bytes in memory and
    /// `total_limit` bytes overall.
    pub fn new(memory_limit: u64, total_limit: u64) -> Self {
        Self {
            memory: Vec::new(),
            spill: None,
            spilled_len: 0,
            memory_limit,
            total_limit,
            truncated: false,
        }
    }

    /// Append a chunk. Returns the number of bytes retained; the remainder
    /// was discarded because the total limit was reached.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let remaining = self.total_limit.saturating_sub(self.len());
        let take = (data.len() as u64).min(remaining) as usize;
        if take < data.len() {
            self.truncated = true;
        }
        if take == 0 {
            return Ok(0);
        }
        let data = &data[..take];

        let memory_room = self.memory_limit.saturating_sub(self.memory.len() as u64) as usize;
        let (head, tail) = data.split_at(memory_room.min(data.len()));
        self.memory.extend_from_slice(head);

        if !tail.is_empty() {
            if self.spill.is_none() {
                let file = tempfile::tempfile().map_err(|e| Error::BodyIo { source: e })?;
                self.spill = Some(file);
            }
            if let Some(file) = self.spill.as_mut() {
                file.write_all(tail).map_err(|e| Error::BodyIo { source: e })?;
                self.spilled_len += tail.len() as u64;
            }
        }

        Ok(take)
    }

    /// Total bytes retained.
    pub fn len(&self) -> u64 {
        self.memory.len() as u64 + self.spilled_len
    }

    /// Whether nothing was retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held in memory.
    pub fn in_memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Whether writes were discarded at the total limit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Read the full retained body back.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len() as usize);
        out.extend_from_slice(&self.memory);
        if let Some(file) = self.spill.as_mut() {
            file.seek(SeekFrom::Start(0))
                .map_err(|e| Error::BodyIo { source: e })?;
            file.read_to_end(&mut out)
                .map_err(|e| Error::BodyIo { source: e })?;
        }
        Ok(out)
    }

    /// Return to the empty state, releasing any spill file.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.spill = None;
        self.spilled_len = 0;
        self.truncated = false;
    }

    /// Replace the limits (used when reconfiguring a pooled transaction).
    pub fn set_limits(&mut self, memory_limit: u64, total_limit: u64) {
        self.memory_limit = memory_limit;
        self.total_limit = total_limit;
    }
}
