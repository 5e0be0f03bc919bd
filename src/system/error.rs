//! Error types for the control slot API

use core::fmt;

/// Errors returned by the control slot API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// A power value outside [-127, 127]
    PowerOutOfRange(i32),
    /// The single control writer was already handed out
    WriterTaken,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::PowerOutOfRange(value) => {
                write!(f, "power {} outside [-127, 127]", value)
            }
            ControlError::WriterTaken => f.write_str("control writer already taken"),
        }
    }
}
