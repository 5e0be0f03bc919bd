//! Motor console firmware entry point
//!
//! Splits the RP2350 peripherals between the tasks and spawns them.

#![no_std]
#![no_main]

use crate::task::{
    motor_execute::motor_execute,
    resources::{self, AssignedResources, MotorDriverResources, PotentiometerResources, ResetResources, SerialResources},
    serial::serial_rx,
    user_interface::user_interface,
};
use defmt::info;
use dual_motor_console::system::config::serial::BAUD_RATE;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_rp::uart::{self, Uart};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    let mut uart_config = uart::Config::default();
    uart_config.baudrate = BAUD_RATE;
    let uart = Uart::new(
        r.serial.uart,
        r.serial.tx_pin,
        r.serial.rx_pin,
        resources::Irqs,
        r.serial.tx_dma,
        r.serial.rx_dma,
        uart_config,
    );
    let (tx, rx) = uart.split();
    info!("UART up at {} baud", BAUD_RATE);

    // Receive first so no keystroke is lost once the prompt appears
    spawner.spawn(serial_rx(rx)).unwrap();
    spawner.spawn(motor_execute(r.motor_driver, r.potentiometers)).unwrap();
    spawner.spawn(user_interface(tx, r.reset)).unwrap();
}
