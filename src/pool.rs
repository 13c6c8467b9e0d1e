//! Parser-local buffer recycling and the advisory memory watchdog.

use sysinfo::System;

use crate::schema::{Cell, Record};

/// How many records/strings a pool retains before extra returns are dropped.
const MAX_RETAINED: usize = 4096;

/// Recycles record and string allocations between chunks of one parse.
/// Everything retained here is released when the owning parser drops.
#[derive(Default)]
pub struct RecordPool {
    records: Vec<Record>,
    strings: Vec<String>,
}

impl RecordPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_record(&mut self, width: usize) -> Record {
        match self.records.pop() {
            Some(mut rec) => {
                rec.clear();
                rec.reserve(width);
                rec
            }
            None => Vec::with_capacity(width),
        }
    }

    pub fn take_string(&mut self) -> String {
        self.strings.pop().unwrap_or_default()
    }

    /// Return a record, salvaging its string allocations.
    pub fn put_record(&mut self, mut record: Record) {
        for cell in record.drain(..) {
            if let Cell::Text(mut s) = cell {
                if self.strings.len() < MAX_RETAINED {
                    s.clear();
                    self.strings.push(s);
                }
            }
        }
        if self.records.len() < MAX_RETAINED {
            self.records.push(record);
        }
    }

    /// Drop all retained buffers (watchdog warning path).
    pub fn trim(&mut self) {
        self.records = Vec::new();
        self.strings = Vec::new();
    }

    #[cfg(test)]
    fn retained(&self) -> (usize, usize) {
        (self.records.len(), self.strings.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStatus {
    Ok,
    Warning,
    Exceeded,
}

/// Injected memory policy. The parser calls `observe` with the running row
/// count; the policy decides when to sample and what to report.
pub trait MemoryPolicy: Send {
    fn observe(&mut self, rows_processed: u64) -> MemoryStatus;
}

/// Samples this process's resident memory every [`SAMPLE_INTERVAL`] rows.
/// Warns at 80% of the configured limit.
pub struct RssWatchdog {
    sys: System,
    pid: sysinfo::Pid,
    limit_bytes: u64,
    warn_bytes: u64,
    next_sample: u64,
}

/// Rows between two resident-memory samples.
pub const SAMPLE_INTERVAL: u64 = 1000;

impl RssWatchdog {
    pub fn new(limit_bytes: u64) -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        Some(Self {
            sys: System::new(),
            pid,
            limit_bytes,
            warn_bytes: limit_bytes / 5 * 4,
            next_sample: SAMPLE_INTERVAL,
        })
    }

    fn resident_bytes(&mut self) -> u64 {
        self.sys.refresh_process(self.pid);
        self.sys.process(self.pid).map(|p| p.memory()).unwrap_or(0)
    }
}

impl MemoryPolicy for RssWatchdog {
    fn observe(&mut self, rows_processed: u64) -> MemoryStatus {
        if rows_processed < self.next_sample {
            return MemoryStatus::Ok;
        }
        self.next_sample = rows_processed + SAMPLE_INTERVAL;

        let resident = self.resident_bytes();
        if resident >= self.limit_bytes {
            MemoryStatus::Exceeded
        } else if resident >= self.warn_bytes {
            MemoryStatus::Warning
        } else {
            MemoryStatus::Ok
        }
    }
}
