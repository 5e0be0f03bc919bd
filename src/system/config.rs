//! Compile-time configuration
//!
//! Constants grouped by the part of the system that uses them. Nothing here
//! is persisted; every restart comes up with these values.

/// Loop periods and delays
pub mod timing {
    /// Interpreter loop period (ms); the pause after every pass lets lower
    /// priority tasks run
    pub const INTERPRETER_PERIOD_MS: u64 = 1;

    /// Motor execution update period (ms)
    pub const MOTOR_UPDATE_PERIOD_MS: u64 = 10;

    /// Watchdog period used to restart the board after Ctrl-C (ms)
    pub const RESET_DELAY_MS: u64 = 120;
}

/// Buffer and queue sizes
pub mod buffers {
    /// Bytes other tasks may queue for the terminal before text is dropped
    pub const PRINT_QUEUE_DEPTH: usize = 256;

    /// Received bytes buffered between the UART task and the interpreter
    pub const KEYSTROKE_DEPTH: usize = 32;

    /// Output collected during one interpreter pass before it is sent
    pub const TX_BUFFER_SIZE: usize = 1024;

    /// Longest single line a task may format into the print queue
    pub const MESSAGE_BUFFER_SIZE: usize = 64;
}

/// Serial terminal settings
pub mod serial {
    /// UART baud rate
    pub const BAUD_RATE: u32 = 115_200;
}

/// ADC constants for the potentiometer inputs
pub mod adc {
    /// Maximum ADC value for 12-bit resolution (2^12 - 1)
    pub const MAX_VALUE: u16 = 4095;

    /// Potentiometer readings averaged by the median filter
    pub const MEDIAN_WINDOW_SIZE: usize = 5;
}
