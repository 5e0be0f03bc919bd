//! Hardware Resource Management
//!
//! Assigns the RP2350 pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Serial: UART0 terminal link with its DMA channels
//! - Motor Driver: TB6612FNG direction, standby and PWM pins
//! - Potentiometers: ADC and one analog input per motor channel
//! - Reset: watchdog used to restart the board on request
//!
//! # Pin Map
//! ```text
//! UART0 TX  GPIO 0     UART0 RX  GPIO 1
//! Motor a   PWM GPIO 14 (slice 7A), IN1 GPIO 12, IN2 GPIO 13
//! Motor b   PWM GPIO 10 (slice 5A), IN1 GPIO 8,  IN2 GPIO 9
//! Standby   GPIO 11
//! Pot a     GPIO 26 (ADC0)     Pot b  GPIO 27 (ADC1)
//! ```

use assign_resources::assign_resources;
use embassy_rp::adc::InterruptHandler as AdcInterruptHandler;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, UART0};
use embassy_rp::uart::InterruptHandler as UartInterruptHandler;

assign_resources! {
    /// Terminal UART and its DMA channels
    serial: SerialResources {
        uart: UART0,
        tx_pin: PIN_0,
        rx_pin: PIN_1,
        tx_dma: DMA_CH0,
        rx_dma: DMA_CH1,
    },
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_11,
        // Motor a drive PWM
        first_slice: PWM_SLICE7,
        first_pwm_pin: PIN_14,
        first_forward_pin: PIN_12,
        first_backward_pin: PIN_13,
        // Motor b drive PWM
        second_slice: PWM_SLICE5,
        second_pwm_pin: PIN_10,
        second_forward_pin: PIN_8,
        second_backward_pin: PIN_9,
    },
    /// Potentiometer inputs, one per motor channel
    potentiometers: PotentiometerResources {
        adc: ADC,
        first_pin: PIN_26,
        second_pin: PIN_27,
    },
    /// Watchdog for operator-requested restarts
    reset: ResetResources {
        watchdog: WATCHDOG,
    },
}

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
    UART0_IRQ => UartInterruptHandler<UART0>;
});
