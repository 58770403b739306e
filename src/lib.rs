pub mod app;
pub mod cli;
pub mod constants;
pub mod gateway;
pub mod runtime;
pub mod session;
pub mod utils;

pub use app::{load_config, ChatClient, Config};
pub use gateway::{HttpGateway, SessionGateway};
pub use session::{ConversationController, SessionSetup, SessionStore};
pub use utils::ChatError;
