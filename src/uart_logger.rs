//! UART log output.
//!
//! Drains the [`LogStream`] to UART1 TX from the dispatch loop, at most
//! one entry per iteration so the control path stays bounded.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 GPIO17 (TX) ──────▶ USB-UART RX
//!                               └─▶ PC Serial Monitor
//! ```

use crate::jiffies::Jiffies;
use crate::logging::{LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Scratch buffer size for one formatted line.
pub const LINE_BUF_LEN: usize = 96;

/// UART configuration for logging.
///
/// The TX pin is passed to [`UartLogSink::new`] as a peripheral.
pub struct UartLoggerConfig {
    pub baud_rate: u32,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self { baud_rate: 115200 }
    }
}

/// Small `core::fmt::Write` adapter over a byte slice.
struct BufWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> core::fmt::Write for BufWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// Format log entry to string.
///
/// Format: `[jiffies] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(
        writer,
        "[{:10}] {}: {}\n",
        entry.timestamp,
        entry.level.as_str(),
        entry.message()
    );
    writer.pos
}

/// Format the dropped-entries notice.
pub fn format_dropped(now: Jiffies, dropped: u32, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(writer, "[{:10}] WARN: {} log entries dropped\n", now, dropped);
    writer.pos
}

/// Next line to emit, if any: dropped notice first, then one entry.
///
/// Returns the formatted length, or 0 when the stream is idle.
pub fn next_line<const N: usize>(stream: &LogStream<N>, buf: &mut [u8]) -> usize {
    let dropped = stream.take_dropped();
    let entry = stream.drain();

    if dropped == 0 {
        return entry.map_or(0, |entry| format_log_entry(&entry, buf));
    }

    match entry {
        Some(entry) => {
            let len = format_dropped(entry.timestamp, dropped, buf);
            len + format_log_entry(&entry, &mut buf[len..])
        }
        None => format_dropped(0, dropped, buf),
    }
}

/// UART sink for the log stream.
#[cfg(target_os = "espidf")]
pub struct UartLogSink<'d> {
    uart: UartTxDriver<'d>,
    line: [u8; LINE_BUF_LEN * 2],
}

#[cfg(target_os = "espidf")]
impl<'d> UartLogSink<'d> {
    /// Initialize UART1 TX-only for logging output.
    pub fn new(
        uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
        config: &UartLoggerConfig,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let uart_config = uart::config::Config::default()
            .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

        let uart = UartTxDriver::new(
            uart,
            tx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )?;

        Ok(Self {
            uart,
            line: [0; LINE_BUF_LEN * 2],
        })
    }

    /// Write at most one pending line. Write errors are dropped.
    pub fn poll<const N: usize>(&mut self, stream: &LogStream<N>) {
        let len = next_line(stream, &mut self.line);
        if len > 0 {
            let _ = self.uart.write(&self.line[..len]);
        }
    }
}
