//! Serial Command Interpreter
//!
//! A character-at-a-time state machine behind the operator's terminal. From
//! the top-level command menu the operator enters motor control, picks a
//! channel, picks its control mode, and types or nudges its power. Every
//! effect on the motors goes through the [`ControlWriter`] the interpreter
//! owns.
//!
//! # States
//! ```text
//! Command ──m──> MotorHome ──t──> MotorSelect ──a/b──> MotorHome
//!    ^              │  │
//!    └──────r───────┘  ├──s──> MotorControl ──u/r──> MotorHome
//!                      └──p──> NumberEntry ──CR/Esc──> PowerApply ──> NumberEntry
//!                                   └──r──> MotorHome
//! ```
//!
//! `PowerApply` consumes no input: it validates the number just entered,
//! commits it if it is in range, and always returns to `NumberEntry`.
//!
//! Operator mistakes are answered with a short message and never leave the
//! state machine. The only way out is Ctrl-C, which asks the caller to
//! restart the board.

use core::fmt::{self, Write};

use crate::system::control::{ControlMode, ControlWriter, MotorChannel, Power};
use crate::system::tasks;

/// Program name and version shown by `s` and `h`
pub const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

/// Ctrl-C
const CTRL_C: u8 = 3;
/// Line feed
const LF: u8 = 10;
/// Carriage return
const CR: u8 = 13;
/// Escape
const ESC: u8 = 27;

const HELP: &str = concat!(
    " help\r\n",
    "  m:     Enter motor control\r\n",
    "  t:     Show the time right now\r\n",
    "  s:     Version and setup information\r\n",
    "  d:     Stack usage\r\n",
    "  Ctl-C: Reset the board\r\n",
    "  h, ?:  Show this help\r\n",
);

const MOTOR_HOME_HELP: &str = concat!(
    "\r\n",
    "  s: control mode entry\r\n",
    "  t: toggle motor select\r\n",
    "  p: power entry\r\n",
    "  r: return to initial command mode\r\n",
    "  h: help\r\n",
);

const MOTOR_CONTROL_HELP: &str = concat!(
    "\r\n",
    "  p: potentiometer mode\r\n",
    "  u: user set mode\r\n",
    "  b: brake\r\n",
    "  r: return\r\n",
    "  h: help\r\n",
);

/// Runtime services the interpreter reports on but does not own
pub trait Platform {
    /// Milliseconds since boot
    fn uptime_ms(&self) -> u64;

    /// Prints stack usage for the `d` command
    fn write_stack_report(&self, out: &mut dyn Write) -> fmt::Result;
}

/// Interpreter states
///
/// The ids are what the task registry publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    /// Top-level command menu
    Command = 0,
    /// Building a signed number digit by digit
    NumberEntry = 1,
    /// Per-channel motor menu
    MotorHome = 2,
    /// Choosing the selected channel's control mode
    MotorControl = 3,
    /// Validating and committing the number just entered
    PowerApply = 4,
    /// Choosing the channel
    MotorSelect = 5,
}

impl State {
    /// Id published in the task registry
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Name used in the status printout
    pub const fn name(self) -> &'static str {
        match self {
            State::Command => "Command",
            State::NumberEntry => "NumberEntry",
            State::MotorHome => "MotorHome",
            State::MotorControl => "MotorControl",
            State::PowerApply => "PowerApply",
            State::MotorSelect => "MotorSelect",
        }
    }
}

impl TryFrom<u8> for State {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(State::Command),
            1 => Ok(State::NumberEntry),
            2 => Ok(State::MotorHome),
            3 => Ok(State::MotorControl),
            4 => Ok(State::PowerApply),
            5 => Ok(State::MotorSelect),
            other => Err(other),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the caller should do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Flow {
    /// Keep polling
    Continue,
    /// Restart the board; the interpreter processes nothing more
    Reset,
}

/// Result of one state handler
enum Next {
    State(State),
    Reset,
}

/// Prints a received byte, escaping anything that is not printable ASCII
struct Shown(u8);

impl fmt::Display for Shown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0x20..=0x7E => f.write_char(self.0 as char),
            other => write!(f, "\\x{:02x}", other),
        }
    }
}

/// The command interpreter and its session state
pub struct Interpreter<'a, P: Platform> {
    control: ControlWriter<'a>,
    platform: &'a P,
    state: State,
    /// Number under construction in `NumberEntry`
    number_entered: i32,
    /// A `-` was typed during the current entry
    num_sign: bool,
    motor: MotorChannel,
    halted: bool,
}

impl<'a, P: Platform> Interpreter<'a, P> {
    /// Creates a session in the command menu with the first channel selected
    pub fn new(control: ControlWriter<'a>, platform: &'a P) -> Self {
        Self {
            control,
            platform,
            state: State::Command,
            number_entered: 0,
            num_sign: false,
            motor: MotorChannel::First,
            halted: false,
        }
    }

    /// Prints the start-up hint
    pub fn greet(&self, out: &mut dyn Write) {
        let _ = write!(out, "Press 'h' or '?' for help\r\n");
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Number under construction, before its sign is applied
    pub fn accumulator(&self) -> i32 {
        self.number_entered
    }

    /// True if a `-` was typed during the current entry
    pub fn negative_pending(&self) -> bool {
        self.num_sign
    }

    /// Channel the motor menus act on
    pub fn selected(&self) -> MotorChannel {
        self.motor
    }

    /// False while a submitted number waits to be applied
    ///
    /// The caller should not read a keystroke then; pass `None` instead.
    pub fn wants_input(&self) -> bool {
        !self.halted && self.state != State::PowerApply
    }

    /// Runs one pass of the state machine
    ///
    /// `input` is the byte received since the last pass, if any. A byte
    /// passed while [`wants_input`](Self::wants_input) is false is dropped.
    /// After [`Flow::Reset`] every further call returns `Flow::Reset` without
    /// looking at its input.
    pub fn step(&mut self, input: Option<u8>, out: &mut dyn Write) -> Flow {
        if self.halted {
            return Flow::Reset;
        }

        let next = match (self.state, input) {
            (State::PowerApply, _) => self.power_apply(out),
            (_, None) => return Flow::Continue,
            (State::Command, Some(byte)) => self.command(byte, out),
            (State::MotorHome, Some(byte)) => self.motor_home(byte, out),
            (State::MotorControl, Some(byte)) => self.motor_control(byte, out),
            (State::NumberEntry, Some(byte)) => self.number_entry(byte, out),
            (State::MotorSelect, Some(byte)) => self.motor_select(byte, out),
        };

        match next {
            Next::State(state) => {
                self.transition_to(state);
                Flow::Continue
            }
            Next::Reset => {
                warn!("reset requested from the terminal");
                self.halted = true;
                Flow::Reset
            }
        }
    }

    fn transition_to(&mut self, next: State) {
        if next != self.state {
            debug!("interpreter {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Top-level command menu
    fn command(&mut self, byte: u8, out: &mut dyn Write) -> Next {
        match byte {
            b't' => {
                let _ = write_time(self.platform.uptime_ms(), out);
                let _ = write!(out, "\r\n");
            }
            b's' => {
                let _ = self.write_status(out);
            }
            b'd' => {
                let _ = self.platform.write_stack_report(out);
            }
            b'm' => {
                let _ = write!(
                    out,
                    "\r\nYou are in motor control\r\n{} motor selected, press 'h' for help\r\n",
                    self.motor
                );
                return Next::State(State::MotorHome);
            }
            b'h' | b'?' => {
                let _ = write!(out, "{}{}", VERSION, HELP);
            }
            CTRL_C => {
                let _ = write!(out, "Resetting board\r\n");
                return Next::Reset;
            }
            other => {
                let _ = write!(out, "\"{}\": WTF?\r\n", Shown(other));
            }
        }
        Next::State(State::Command)
    }

    /// Per-channel motor menu
    fn motor_home(&mut self, byte: u8, out: &mut dyn Write) -> Next {
        match byte {
            b'h' => {
                let _ = out.write_str(MOTOR_HOME_HELP);
            }
            b't' => {
                let _ = write!(out, "enter motor number (a or b):  \r\n");
                return Next::State(State::MotorSelect);
            }
            b's' => {
                let _ = write!(
                    out,
                    "enter value for motor control: \r\npress h for help\r\n"
                );
                return Next::State(State::MotorControl);
            }
            b'p' => {
                self.number_entered = 0;
                self.num_sign = false;
                let _ = write!(
                    out,
                    "enter value for motor power ({} to {}, '<' '>' to nudge): \r\n",
                    Power::MIN,
                    Power::MAX
                );
                return Next::State(State::NumberEntry);
            }
            b'r' => {
                let _ = write!(out, "Moved to initial command mode\r\n");
                return Next::State(State::Command);
            }
            CR | LF => {}
            other => {
                let _ = write!(out, "\"{}\": not a motor command, 'h' for help\r\n", Shown(other));
            }
        }
        Next::State(State::MotorHome)
    }

    /// Control mode selection for the selected channel
    fn motor_control(&mut self, byte: u8, out: &mut dyn Write) -> Next {
        match byte {
            b'h' => {
                let _ = out.write_str(MOTOR_CONTROL_HELP);
            }
            b'p' => {
                self.control.set_mode(self.motor, ControlMode::Potentiometer);
                let _ = write!(out, "Potentiometer mode\r\n");
            }
            b'u' => {
                self.control.set_mode(self.motor, ControlMode::UserSet);
                let _ = write!(out, "User input mode\r\nMoved to motor control home\r\n");
                return Next::State(State::MotorHome);
            }
            b'b' => {
                self.control.set_mode(self.motor, ControlMode::Brake);
                let _ = write!(out, "Brake on\r\n");
            }
            b'r' => {
                let _ = write!(out, "Moved to motor control home\r\n");
                return Next::State(State::MotorHome);
            }
            CR | LF => {}
            other => {
                let _ = write!(out, "\"{}\": not a control mode, 'h' for help\r\n", Shown(other));
            }
        }
        Next::State(State::MotorControl)
    }

    /// Digit-by-digit entry of a signed power value
    fn number_entry(&mut self, byte: u8, out: &mut dyn Write) -> Next {
        match byte {
            b'r' => {
                let _ = write!(out, "Moved to motor control home\r\n");
                return Next::State(State::MotorHome);
            }
            b'<' => {
                let power = self.control.nudge_power(self.motor, -1);
                let _ = write!(out, "Decrement power by 1, now {}\r\n", power);
            }
            b'>' => {
                let power = self.control.nudge_power(self.motor, 1);
                let _ = write!(out, "Increment power by 1, now {}\r\n", power);
            }
            b'-' => {
                self.num_sign = true;
                let _ = out.write_char('-');
            }
            b'0'..=b'9' => {
                // Saturates on long digit runs; the range check happens on submit
                self.number_entered = self
                    .number_entered
                    .saturating_mul(10)
                    .saturating_add((byte - b'0') as i32);
                let _ = out.write_char(byte as char);
            }
            LF => {
                let _ = out.write_char('\r');
            }
            CR | ESC => {
                if self.num_sign {
                    self.number_entered = -self.number_entered;
                }
                let _ = write!(out, "\r\nNumber entered: {}\r\n", self.number_entered);
                return Next::State(State::PowerApply);
            }
            other => {
                let _ = write!(out, "<invalid char \"{}\">", Shown(other));
            }
        }
        Next::State(State::NumberEntry)
    }

    /// Commits the submitted number if it is a valid power
    fn power_apply(&mut self, out: &mut dyn Write) -> Next {
        match Power::try_from(self.number_entered) {
            Ok(power) => {
                self.control.set_power(self.motor, power);
                let _ = write!(out, "{} motor power set to {}\r\n", self.motor, power);
            }
            Err(_err) => {
                warn!("rejected power entry: {}", _err);
                let _ = write!(out, "invalid entry, enter again:  \r\n");
            }
        }
        self.number_entered = 0;
        self.num_sign = false;
        Next::State(State::NumberEntry)
    }

    /// Channel selection
    fn motor_select(&mut self, byte: u8, out: &mut dyn Write) -> Next {
        let channel = match byte {
            b'a' => MotorChannel::First,
            b'b' => MotorChannel::Second,
            _ => {
                let _ = write!(out, "not a valid motor\r\n");
                return Next::State(State::MotorSelect);
            }
        };
        self.motor = channel;
        let _ = write!(out, "{} motor selected\r\n", channel);
        Next::State(State::MotorHome)
    }

    /// Version, time, task table and the shared control values
    fn write_status(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "\r\n{}\r\nSystem time: ", VERSION)?;
        write_time(self.platform.uptime_ms(), out)?;
        write!(out, "\r\n\r\n")?;
        tasks::write_task_list(
            &tasks::TASKS,
            |id| State::try_from(id).ok().map(State::name),
            out,
        )?;
        write!(out, "\r\n")?;
        for channel in MotorChannel::ALL {
            let control = self.control.slots().get(channel);
            write!(
                out,
                "Motor {}: mode {}, power {}\r\n",
                channel.letter(),
                control.mode,
                control.power
            )?;
        }
        Ok(())
    }
}

/// Prints milliseconds as seconds with three decimals
fn write_time(ms: u64, out: &mut dyn Write) -> fmt::Result {
    write!(out, "{}.{:03} s", ms / 1000, ms % 1000)
}
