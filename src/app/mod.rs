// Gateway module for app - follows the Train Station Pattern
// All external access must go through this gateway

mod client;
mod config;

pub use client::ChatClient;
pub use config::{
    get_config_dir, init_config, load_config, load_config_from, save_config, ApiConfig,
    ChatSettings, Config, EndpointPaths,
};
