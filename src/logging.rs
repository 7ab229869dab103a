//! RT-safe logging for the dispatch loop.
//!
//! # Architecture
//!
//! ```text
//! Dispatch loop          LogStream            UART sink
//! ─────────────          ─────────            ─────────
//!
//! rt_log!() ──────────▶ [L0][L1][L2] ──────▶ UART TX
//! stack format            ring buffer         one entry per
//! non-blocking            MPSC                loop iteration
//! ```
//!
//! # Rules
//!
//! - The control path never blocks on logging; it uses `rt_log!()`.
//! - Messages are dropped (and counted) if the ring is full.
//! - Timestamps are jiffies, not wall time.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::jiffies::Jiffies;

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 64;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Tick at which the entry was produced.
    pub timestamp: Jiffies,
    /// Log level.
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: Self = Self {
        timestamp: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text, or a placeholder if truncation split a code point.
    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One ring slot.
///
/// `seq` equal to the slot's position means free for that lap; `pos + 1`
/// means the entry for `pos` is written and may be drained.
struct Slot {
    seq: AtomicU32,
    entry: UnsafeCell<LogEntry>,
}

impl Slot {
    const fn new(seq: u32) -> Self {
        Self {
            seq: AtomicU32::new(seq),
            entry: UnsafeCell::new(LogEntry::EMPTY),
        }
    }
}

/// Lock-free log stream.
///
/// Bounded ring with a sequence number per slot. Producers claim a slot
/// by advancing `write_idx` with a compare-exchange, and only when the
/// slot is free, so a dropped message never moves the index. Drains claim
/// through `read_idx` the same way and stop at a slot that is claimed but
/// not yet written.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: A slot's entry is accessed only by the context that won the
// compare-exchange on write_idx (to write) or read_idx (to read) for that
// position, and the slot's `seq` hands it over with Release/Acquire.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");
        assert!(N >= 2, "Log buffer needs at least 2 entries");
        assert!(N <= i32::MAX as usize, "Log buffer size must fit the sequence space");

        const FREE: Slot = Slot::new(0);
        let mut slots = [FREE; N];
        let mut i = 0;
        while i < N {
            slots[i] = Slot::new(i as u32);
            i += 1;
        }

        Self {
            slots,
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push a log entry (RT-safe, never blocks).
    ///
    /// Safe from any number of contexts. Returns `true` if the message was
    /// queued, `false` if it was dropped (ring full).
    #[inline]
    pub fn push(&self, timestamp: Jiffies, level: LogLevel, msg: &[u8]) -> bool {
        let mut pos = self.write_idx.load(Ordering::Relaxed);
        let slot = loop {
            let slot = &self.slots[(pos as usize) & Self::MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos) as i32;

            if lag < 0 {
                // Not yet drained from the previous lap.
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if lag > 0 {
                pos = self.write_idx.load(Ordering::Relaxed);
                continue;
            }

            match self.write_idx.compare_exchange_weak(
                pos,
                pos.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break slot,
                Err(current) => pos = current,
            }
        };

        // SAFETY: Winning the compare-exchange for `pos` gives exclusive
        // access to the slot until `seq` is published below.
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp = timestamp;
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
        true
    }

    /// Drain next log entry (for the sink).
    ///
    /// Returns `None` if no entries available, or if the oldest claimed
    /// slot is still being written.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let mut pos = self.read_idx.load(Ordering::Relaxed);
        let slot = loop {
            let slot = &self.slots[(pos as usize) & Self::MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos.wrapping_add(1)) as i32;

            if lag < 0 {
                return None;
            }
            if lag > 0 {
                pos = self.read_idx.load(Ordering::Relaxed);
                continue;
            }

            match self.read_idx.compare_exchange_weak(
                pos,
                pos.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break slot,
                Err(current) => pos = current,
            }
        };

        // SAFETY: Winning the compare-exchange for `pos` gives exclusive
        // access to the published slot until it is freed below.
        let entry = unsafe { *slot.entry.get() };

        slot.seq.store(pos.wrapping_add(N as u32), Ordering::Release);
        Some(entry)
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Take the dropped count for reporting, resetting it to zero.
    ///
    /// Drops counted while the report is being written land in the next one.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Get number of entries claimed but not yet drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Relaxed);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating if it doesn't fit.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl<'a> Write for BufWriter<'a> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// RT-safe log macro.
///
/// # Example
///
/// ```ignore
/// rt_log!(LogLevel::Info, LOG_STREAM, now, "ch{} {}", idx, state);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($timestamp, $level, &buf[..len]);
    }};
}

/// RT-safe info log.
#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

/// RT-safe warning log.
#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

/// RT-safe error log.
#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}
