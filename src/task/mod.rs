pub mod motor_execute;
pub mod resources;
pub mod serial;
pub mod user_interface;
