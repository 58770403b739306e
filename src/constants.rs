/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const SESSION_ID_PLACEHOLDER: &str = "{id}";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120; // answers are generated before the response returns

// Configuration sources
pub const CONFIG_ENV_PREFIX: &str = "EDUBOT_";
pub const LOCAL_CONFIG_PATH: &str = ".edubot/config.toml";
pub const TOKEN_ENV_VAR: &str = "EDUBOT_TOKEN";
