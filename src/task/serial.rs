//! Serial receive task
//!
//! Reads terminal bytes from UART0 as they arrive and parks them in
//! [`KEYSTROKES`] until the interpreter asks for the next one.

use defmt::warn;
use dual_motor_console::system::config::buffers::KEYSTROKE_DEPTH;
use dual_motor_console::system::tasks::{self, NO_STATE};
use embassy_rp::uart::{Async, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;

/// Received bytes not yet taken by the interpreter
static KEYSTROKES: Pipe<CriticalSectionRawMutex, KEYSTROKE_DEPTH> = Pipe::new();

/// Takes the next received byte without waiting
pub fn keystroke() -> Option<u8> {
    let mut byte = [0u8; 1];
    match KEYSTROKES.try_read(&mut byte) {
        Ok(1) => Some(byte[0]),
        _ => None,
    }
}

#[embassy_executor::task]
pub async fn serial_rx(mut rx: UartRx<'static, Async>) {
    let mut byte = [0u8; 1];
    loop {
        match rx.read(&mut byte).await {
            // Waits while the interpreter is busy applying a power entry
            Ok(()) => KEYSTROKES.write_all(&byte).await,
            Err(e) => warn!("uart receive error: {:?}", e),
        }
        tasks::SERIAL_RX.record_run(NO_STATE);
    }
}
