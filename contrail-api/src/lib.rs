pub mod commands;
pub mod error;
pub mod runner;

pub use commands::{execute, Command, Outcome};
pub use runner::{replay, Report, Script, ScriptStep};
