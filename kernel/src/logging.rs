//! Structured diagnostics. Real hardware has no serial console in scope, so
//! instead of printing over a UART like a desktop kernel would, records are
//! kept in a small fixed-capacity ring buffer that a host build (or test)
//! can drain. `log::info!`/`debug!`/`warn!` call sites elsewhere in the
//! crate are the only logging API the rest of the kernel should ever touch.

use core::fmt::Write as _;

use log::{Level, Log, Metadata, Record};

use crate::sync::Spinlock;

const RING_CAPACITY: usize = 64;
const LINE_CAPACITY: usize = 96;

#[derive(Clone, Copy)]
pub struct Line {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl Line {
    const fn empty() -> Self {
        Line { buf: [0; LINE_CAPACITY], len: 0 }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("<non-utf8 log line>")
    }
}

impl core::fmt::Write for Line {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let remaining = LINE_CAPACITY - self.len;
        let take = remaining.min(s.len());
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

struct Ring {
    lines: [Line; RING_CAPACITY],
    next: usize,
    total: usize,
}

pub struct RingLogger {
    inner: Spinlock<Ring>,
}

impl RingLogger {
    pub const fn new() -> Self {
        const EMPTY: Line = Line::empty();
        RingLogger { inner: Spinlock::new(Ring { lines: [EMPTY; RING_CAPACITY], next: 0, total: 0 }) }
    }

    /// Number of lines recorded since boot, including ones already
    /// overwritten by wraparound.
    pub fn total_recorded(&self) -> usize {
        self.inner.lock().total
    }

    /// Copies out the most recently recorded lines, oldest first.
    pub fn snapshot(&self, out: &mut [Line]) -> usize {
        let ring = self.inner.lock();
        let count = ring.total.min(RING_CAPACITY).min(out.len());
        for i in 0..count {
            let idx = (ring.next + RING_CAPACITY - count + i) % RING_CAPACITY;
            out[i] = ring.lines[idx];
        }
        count
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut ring = self.inner.lock();
        let idx = ring.next % RING_CAPACITY;
        ring.lines[idx] = Line::empty();
        let _ = write!(ring.lines[idx], "[{}] {}", record.level(), record.args());
        ring.next = ring.next.wrapping_add(1);
        ring.total += 1;
    }

    fn flush(&self) {}
}

pub static LOGGER: RingLogger = RingLogger::new();

/// Installs [`LOGGER`] as the global `log` backend. Safe to call more than
/// once (from repeated test setups); a second call's error is swallowed.
pub fn init(level: log::LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
