//! User interface task
//!
//! Runs the command interpreter once per millisecond. Each pass takes at most
//! one keystroke, lets the interpreter answer, then tops the same output
//! buffer up with background text when no keystroke was handled. Whatever
//! was collected goes out over the UART in a single write.

use core::fmt::{self, Write};

use crate::task::resources::ResetResources;
use crate::task::serial;
use defmt::{info, warn};
use dual_motor_console::system::config::{buffers::TX_BUFFER_SIZE, timing};
use dual_motor_console::system::console::{TxBuffer, PRINT_QUEUE};
use dual_motor_console::system::control::CONTROL;
use dual_motor_console::system::interpreter::{Flow, Interpreter, Platform};
use dual_motor_console::system::tasks;
use embassy_rp::uart::{Async, UartTx};
use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Instant, Ticker};

/// Board services the interpreter reports on
struct Rp2350;

impl Platform for Rp2350 {
    fn uptime_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    fn write_stack_report(&self, out: &mut dyn Write) -> fmt::Result {
        extern "C" {
            // Initial main stack pointer, provided by cortex-m-rt's linker script
            static _stack_start: u32;
        }
        // SAFETY: only the address of the linker symbol is taken, never its value
        let top = unsafe { core::ptr::addr_of!(_stack_start) } as usize;
        let sp = cortex_m::register::msp::read() as usize;
        write!(
            out,
            "Main stack: {} bytes in use (sp {:#010x}, top {:#010x})\r\n",
            top.saturating_sub(sp),
            sp,
            top
        )
    }
}

#[embassy_executor::task]
pub async fn user_interface(mut tx: UartTx<'static, Async>, r: ResetResources) {
    let mut watchdog = Watchdog::new(r.watchdog);
    let platform = Rp2350;
    let mut interpreter = Interpreter::new(CONTROL.take_writer().unwrap(), &platform);
    let mut out: TxBuffer<TX_BUFFER_SIZE> = TxBuffer::new();
    let mut ticker = Ticker::every(Duration::from_millis(timing::INTERPRETER_PERIOD_MS));

    interpreter.greet(&mut out);
    info!("interpreter ready");

    loop {
        let input = if interpreter.wants_input() {
            serial::keystroke()
        } else {
            None
        };
        let flow = interpreter.step(input, &mut out);

        if input.is_none() {
            PRINT_QUEUE.drain_into(&mut out);
        }
        if !out.is_empty() {
            if tx.write(out.as_bytes()).await.is_err() {
                warn!("uart transmit failed, {} bytes lost", out.as_bytes().len());
            }
            out.clear();
        }
        tasks::USER_INTERFACE.record_run(interpreter.state().id());

        if flow == Flow::Reset {
            warn!("reset requested from terminal");
            restart(&mut watchdog);
        }
        ticker.next().await;
    }
}

/// Lets the watchdog expire and restart the board
fn restart(watchdog: &mut Watchdog) -> ! {
    watchdog.start(Duration::from_millis(timing::RESET_DELAY_MS));
    loop {
        cortex_m::asm::nop();
    }
}
