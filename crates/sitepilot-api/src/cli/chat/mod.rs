//! Interactive chat with the co-pilot.

pub mod commands;
pub mod input;
pub mod loop_runner;
