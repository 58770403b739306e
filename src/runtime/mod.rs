/// Runtime orchestrator module - Gateway

mod chat_loop;
mod orchestrator;

pub use chat_loop::{parse_input, run_chat, LoopCommand};
pub use orchestrator::Orchestrator;
