//! Task status registry
//!
//! Every firmware task reports its current state id and bumps a run counter
//! once per loop pass. The status command prints the table; nothing in the
//! control path reads it.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// State id for tasks without a state machine
pub const NO_STATE: u8 = u8::MAX;

/// Serial command interpreter
pub static USER_INTERFACE: TaskStatus = TaskStatus::new("user");
/// Motor execution
pub static MOTORS: TaskStatus = TaskStatus::new("motors");
/// UART receive
pub static SERIAL_RX: TaskStatus = TaskStatus::new("serial");

/// All registered tasks, in the order they are printed
pub static TASKS: [&TaskStatus; 3] = [&USER_INTERFACE, &MOTORS, &SERIAL_RX];

/// Published status of one task
pub struct TaskStatus {
    name: &'static str,
    state: AtomicU8,
    runs: AtomicU32,
}

impl TaskStatus {
    /// Creates an entry with no runs recorded
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(NO_STATE),
            runs: AtomicU32::new(0),
        }
    }

    /// Records one loop pass ending in `state`
    pub fn record_run(&self, state: u8) {
        self.state.store(state, Ordering::Relaxed);
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Task name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last reported state id
    pub fn state(&self) -> u8 {
        self.state.load(Ordering::Relaxed)
    }

    /// Loop passes recorded so far
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::Relaxed)
    }
}

/// Prints one line per task: name, state and run count
///
/// `state_name` turns a state id into text; ids it does not know print as `?`.
pub fn write_task_list(
    tasks: &[&TaskStatus],
    state_name: impl Fn(u8) -> Option<&'static str>,
    out: &mut dyn Write,
) -> fmt::Result {
    write!(out, "Task      State          Runs\r\n")?;
    for task in tasks {
        let state = match task.state() {
            NO_STATE => "-",
            id => state_name(id).unwrap_or("?"),
        };
        write!(out, "{:<9} {:<14} {}\r\n", task.name(), state, task.runs())?;
    }
    Ok(())
}
