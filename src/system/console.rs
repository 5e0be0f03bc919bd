//! Console Output
//!
//! The interpreter owns the terminal. Other tasks that want to say something
//! put text on [`PRINT_QUEUE`]; the interpreter drains it one byte at a time
//! between keystrokes, so background text never lands in the middle of a
//! prompt being written.
//!
//! Output produced during one interpreter pass is collected in a
//! [`TxBuffer`] and sent to the UART in one write.

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use heapless::Vec;

use crate::system::config::buffers;

/// Text queued by background tasks for the terminal
pub static PRINT_QUEUE: PrintQueue<{ buffers::PRINT_QUEUE_DEPTH }> = PrintQueue::new();

/// One formatted line for [`PRINT_QUEUE`]
pub type Message = heapless::String<{ buffers::MESSAGE_BUFFER_SIZE }>;

/// Formats a line and queues it for the terminal without waiting
///
/// Returns the number of bytes queued; `0` when the queue had no room or the
/// line did not fit a [`Message`].
#[macro_export]
macro_rules! queue_print {
    ($($arg:tt)*) => {{
        let mut line = $crate::system::console::Message::new();
        match core::fmt::write(&mut line, format_args!($($arg)*)) {
            Ok(()) => $crate::system::console::PRINT_QUEUE.print(&line),
            // A cut line would leave the terminal mid-line
            Err(_) => 0,
        }
    }};
}

/// Bounded byte queue from background tasks to the terminal
pub struct PrintQueue<const N: usize> {
    pipe: Pipe<CriticalSectionRawMutex, N>,
}

impl<const N: usize> PrintQueue<N> {
    /// Creates an empty queue
    pub const fn new() -> Self {
        Self { pipe: Pipe::new() }
    }

    /// Queues `text` if all of it fits, without waiting
    ///
    /// Text that does not fit is dropped whole. Returns the bytes queued.
    pub fn print(&self, text: &str) -> usize {
        let mut bytes = text.as_bytes();
        if bytes.len() > self.pipe.free_capacity() {
            debug!("print queue full, dropped {} bytes", bytes.len());
            return 0;
        }

        let mut queued = 0;
        while !bytes.is_empty() {
            match self.pipe.try_write(bytes) {
                Ok(n) => {
                    queued += n;
                    bytes = &bytes[n..];
                }
                Err(_) => break,
            }
        }
        queued
    }

    /// Queues `text`, waiting for room as needed
    pub async fn print_async(&self, text: &str) {
        self.pipe.write_all(text.as_bytes()).await
    }

    /// Takes the next queued byte, if any
    pub fn next_byte(&self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.pipe.try_read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    /// Moves queued bytes into `out` one at a time until either runs out
    ///
    /// Returns the number of bytes moved.
    pub fn drain_into<const M: usize>(&self, out: &mut TxBuffer<M>) -> usize {
        let mut moved = 0;
        while out.remaining() > 0 {
            match self.next_byte() {
                Some(byte) => {
                    out.push_byte(byte);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    /// Number of bytes waiting
    pub fn len(&self) -> usize {
        self.pipe.len()
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.pipe.is_empty()
    }
}

impl<const N: usize> Default for PrintQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity output buffer for one interpreter pass
///
/// Writes past the capacity are truncated and reported as `fmt::Error`.
pub struct TxBuffer<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> TxBuffer<N> {
    /// Creates an empty buffer
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Buffered bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Free space left
    pub fn remaining(&self) -> usize {
        N - self.bytes.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends a raw byte; returns false when full
    pub fn push_byte(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    /// Discards buffered bytes
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl<const N: usize> Default for TxBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for TxBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let fits = bytes.len().min(self.remaining());
        // Capacity was checked above
        let _ = self.bytes.extend_from_slice(&bytes[..fits]);
        if fits < bytes.len() {
            return Err(fmt::Error);
        }
        Ok(())
    }
}
