//! Dual motor console
//!
//! Hardware-independent core of the motor console firmware: the shared
//! per-channel control slots, the serial command interpreter that writes
//! them, and the background print queue that lets other tasks talk to the
//! same terminal.
//!
//! The firmware binary (`src/main.rs`, `firmware` feature) wires these to
//! the RP2350 UART, ADC and TB6612FNG driver.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod system;

pub use system::control::{ControlMode, ControlSlots, ControlWriter, MotorChannel, Power};
pub use system::error::ControlError;
pub use system::interpreter::{Flow, Interpreter, Platform, State};
