/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{ChatArgs, Cli, Commands};
pub use commands::{format_session, init, list_sessions, list_subjects, login, show_version};
