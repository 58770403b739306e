use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::session::Language;

#[derive(Parser, Debug)]
#[command(name = "edubot")]
#[command(version)]
#[command(about = "Study chat client for the educational chatbot backend", long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces the global and local files)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Bearer token from `edubot login`
    #[arg(long, env = "EDUBOT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Override api.base_url
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,
    /// Sign in and print a token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EDUBOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List subjects and chapters available to you
    Subjects,
    /// List your chat sessions
    Sessions,
    /// Start or resume a chat (default)
    Chat(ChatArgs),
    /// Show version information
    Version,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ChatArgs {
    /// Resume an existing session
    #[arg(long, conflicts_with_all = ["subject", "chapter"])]
    pub session: Option<i64>,

    /// Subject for a new session
    #[arg(long)]
    pub subject: Option<String>,

    /// Chapter for a new session
    #[arg(long, requires = "subject")]
    pub chapter: Option<String>,

    /// Answer language (english or hindi)
    #[arg(long, value_parser = parse_language)]
    pub language: Option<Language>,
}

fn parse_language(value: &str) -> Result<Language, String> {
    Language::from_name(value).ok_or_else(|| format!("unsupported language '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_arguments() {
        let cli = Cli::try_parse_from([
            "edubot", "chat", "--subject", "Science", "--chapter", "Light", "--language", "hindi",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Chat(args)) => {
                assert_eq!(args.subject.as_deref(), Some("Science"));
                assert_eq!(args.chapter.as_deref(), Some("Light"));
                assert_eq!(args.language, Some(Language::Hindi));
            }
            other => panic!("Expected chat command, got {:?}", other),
        }
    }

    #[test]
    fn test_session_conflicts_with_subject() {
        assert!(Cli::try_parse_from(["edubot", "chat", "--session", "3", "--subject", "Maths"]).is_err());
        assert!(Cli::try_parse_from(["edubot", "chat", "--language", "french"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["edubot", "sessions", "--token", "abc", "-v"]).unwrap();
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Sessions)));
    }
}
