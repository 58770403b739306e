use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    app::{load_config, load_config_from, ChatClient, Config},
    cli::{self, ChatArgs, Cli, Commands},
    constants::TOKEN_ENV_VAR,
    gateway::HttpGateway,
    session::AuthSession,
};

use super::chat_loop::run_chat;

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => load_config_from(path)?,
            None => match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config: {:#}. Using defaults.", e);
                    Config::default()
                }
            },
        };

        if let Some(base_url) = &cli.base_url {
            config.api.base_url = base_url.clone();
            config.validate()?;
        }

        Ok(Self { cli, config })
    }

    /// Run the orchestrator
    pub async fn run(mut self) -> Result<()> {
        let command = self
            .cli
            .command
            .take()
            .unwrap_or_else(|| Commands::Chat(ChatArgs::default()));

        match command {
            Commands::Init => cli::init(),
            Commands::Version => {
                cli::show_version();
                Ok(())
            }
            Commands::Login { email, password } => {
                let gateway = self.gateway()?;
                cli::login(&gateway, &email, &password).await
            }
            Commands::Subjects => {
                let auth = self.auth()?;
                let gateway = self.gateway()?;
                cli::list_subjects(&gateway, &auth).await
            }
            Commands::Sessions => {
                let client = self.client()?;
                let result = cli::list_sessions(&client).await;
                client.logout();
                result
            }
            Commands::Chat(args) => {
                let client = self.client()?;
                run_chat(client, args).await
            }
        }
    }

    fn gateway(&self) -> Result<HttpGateway> {
        let gateway = HttpGateway::new(&self.config.api)?;
        info!(base_url = gateway.base_url(), "using backend");
        Ok(gateway)
    }

    /// The signed-in context; absence is the signed-out state
    fn auth(&self) -> Result<AuthSession> {
        self.cli
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(|token| {
                AuthSession::from_token(token).with_plan(self.config.chat.plan.clone())
            })
            .with_context(|| {
                format!(
                    "Not signed in. Run `edubot login` and export {}.",
                    TOKEN_ENV_VAR
                )
            })
    }

    fn client(&self) -> Result<ChatClient> {
        let auth = self.auth()?;
        let gateway = Arc::new(self.gateway()?);
        Ok(ChatClient::new(
            auth,
            gateway,
            self.config.chat.default_language,
        ))
    }
}
