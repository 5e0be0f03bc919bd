//! Core system components shared between the firmware tasks
pub mod config;
pub mod console;
pub mod control;
pub mod error;
pub mod interpreter;
pub mod tasks;
