use anyhow::Result;
use colored::Colorize;

use crate::{
    app::{init_config, ChatClient},
    constants::TOKEN_ENV_VAR,
    gateway::{HttpGateway, SessionGateway},
    session::{AuthSession, Session},
};

/// Write the default configuration file
pub fn init() -> Result<()> {
    println!("Initializing edubot configuration...");
    match init_config()? {
        Some(path) => println!("Created default configuration at: {}", path.display()),
        None => println!("Configuration already exists, leaving it untouched."),
    }
    Ok(())
}

/// Show version information
pub fn show_version() {
    println!("edubot v{}", env!("CARGO_PKG_VERSION"));
    println!("   Study chat client for the educational chatbot backend");
}

/// Sign in and print the token for later commands
pub async fn login(gateway: &HttpGateway, email: &str, password: &str) -> Result<()> {
    let auth = gateway.login(email, password).await?;
    println!("{} Signed in as {:?}", "[OK]".green(), auth.role);
    println!();
    println!("  export {}={}", TOKEN_ENV_VAR, auth.credential.token());
    Ok(())
}

/// Print the subject catalog
pub async fn list_subjects(gateway: &dyn SessionGateway, auth: &AuthSession) -> Result<()> {
    let subjects = gateway.list_subjects(&auth.credential).await?;
    if subjects.is_empty() {
        println!("No subjects available for your account.");
        return Ok(());
    }

    println!("Available subjects:");
    for subject in subjects {
        println!("  • {}", subject.name.green());
        for chapter in subject.chapters {
            println!("      - {}", chapter);
        }
    }
    Ok(())
}

/// Print the session list, most recent first
pub async fn list_sessions(client: &ChatClient) -> Result<()> {
    client.sessions().load().await?;
    let sessions = client.sessions().sessions();
    if sessions.is_empty() {
        println!("No chat sessions yet. Start one with `edubot chat`.");
        return Ok(());
    }

    println!("Recent sessions:");
    for session in &sessions {
        println!("  {}", format_session(session));
    }
    Ok(())
}

pub fn format_session(session: &Session) -> String {
    format!(
        "{} {} ({})",
        format!("#{}", session.id).cyan(),
        session.title,
        session.language
    )
}
