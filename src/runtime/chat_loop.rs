use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    app::ChatClient,
    cli::{format_session, ChatArgs},
    session::{
        ConversationState, Language, Message, MessageRole, SendOutcome, SendRejection,
        SessionId,
    },
    utils::{log_status, ChatError},
};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    Say(String),
    New,
    Open(SessionId),
    Sessions,
    Subject(String),
    Chapter(String),
    Language(Language),
    Start,
    Retry,
    Reload,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_input(line: &str) -> LoopCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return LoopCommand::Say(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match (name.to_lowercase().as_str(), rest) {
        ("new", _) => LoopCommand::New,
        ("sessions" | "history", _) => LoopCommand::Sessions,
        ("start", _) => LoopCommand::Start,
        ("retry", _) => LoopCommand::Retry,
        ("reload", _) => LoopCommand::Reload,
        ("help" | "?", _) => LoopCommand::Help,
        ("quit" | "exit" | "q", _) => LoopCommand::Quit,
        ("open", "") => LoopCommand::Invalid("usage: /open <session id>".to_string()),
        ("open", id) => match id.parse() {
            Ok(id) => LoopCommand::Open(id),
            Err(_) => LoopCommand::Invalid(format!("'{}' is not a session id", id)),
        },
        ("subject", "") => LoopCommand::Invalid("usage: /subject <name>".to_string()),
        ("subject", name) => LoopCommand::Subject(name.to_string()),
        ("chapter", "") => LoopCommand::Invalid("usage: /chapter <name>".to_string()),
        ("chapter", name) => LoopCommand::Chapter(name.to_string()),
        ("language" | "lang", name) => match Language::from_name(name) {
            Some(language) => LoopCommand::Language(language),
            None => LoopCommand::Invalid("usage: /language <english|hindi>".to_string()),
        },
        (other, _) => LoopCommand::Invalid(format!("unknown command /{}", other)),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
    SignOut(ChatError),
}

/// A rejected credential ends the login; any other failure is shown and the
/// loop keeps going
fn after_error(err: ChatError) -> Flow {
    if err.is_auth() {
        Flow::SignOut(err)
    } else {
        print_error(&err);
        Flow::Continue
    }
}

fn outcome_flow(result: Result<Flow, ChatError>) -> Flow {
    result.unwrap_or_else(after_error)
}

/// Interactive chat until EOF, `/quit`, or an authentication failure
pub async fn run_chat(mut client: ChatClient, args: ChatArgs) -> Result<()> {
    if let Flow::SignOut(err) = outcome_flow(client.bootstrap().await.map(|_| Flow::Continue)) {
        return fail(client, err);
    }

    if let Some(plan) = &client.auth().plan {
        println!("Plan: {}", plan.cyan());
    }

    if let Some(language) = args.language {
        client.setup_mut().select_language(language);
    }

    let initial = if let Some(id) = args.session {
        Some(LoopCommand::Open(SessionId(id)))
    } else if let Some(subject) = args.subject {
        let selected = client.setup_mut().select_subject(&subject).and_then(|_| {
            match &args.chapter {
                Some(chapter) => client.setup_mut().select_chapter(chapter),
                None => Ok(()),
            }
        });
        match selected {
            Ok(()) => Some(LoopCommand::Start),
            Err(err) => {
                after_error(err);
                None
            }
        }
    } else {
        None
    };

    print_help();
    match initial {
        Some(command) => {
            if let Flow::SignOut(err) = outcome_flow(handle(&mut client, command).await) {
                return fail(client, err);
            }
        }
        None => print_setup(&client),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match outcome_flow(handle(&mut client, parse_input(&line)).await) {
            Flow::Continue => {}
            Flow::Quit => break,
            Flow::SignOut(err) => return fail(client, err),
        }
    }

    client.logout();
    Ok(())
}

async fn handle(client: &mut ChatClient, command: LoopCommand) -> Result<Flow, ChatError> {
    match command {
        LoopCommand::Say(text) => {
            match client.conversation().send(&text).await? {
                SendOutcome::Answered(reply) => print_message(&reply),
                SendOutcome::Rejected(SendRejection::Empty) | SendOutcome::Superseded => {}
                SendOutcome::Rejected(SendRejection::NoSession) => {
                    log_status("No session open. Use /start or /open <id> first.")
                }
                SendOutcome::Rejected(SendRejection::Busy) => {
                    log_status("Still waiting for the previous answer.")
                }
                SendOutcome::Rejected(SendRejection::NotReady) => {
                    log_status("This session is not loaded. Use /retry or /open <id>.")
                }
            }
        }
        LoopCommand::New => {
            client.conversation().new_chat();
            print_setup(client);
        }
        LoopCommand::Open(id) => {
            if client.conversation().open(id).await?.is_applied() {
                print_conversation(client);
            }
        }
        LoopCommand::Sessions => print_sessions(client),
        LoopCommand::Subject(name) => {
            client.setup_mut().select_subject(&name)?;
            print_setup(client);
        }
        LoopCommand::Chapter(name) => {
            client.setup_mut().select_chapter(&name)?;
            print_setup(client);
        }
        LoopCommand::Language(language) => {
            client.setup_mut().select_language(language);
            print_setup(client);
        }
        LoopCommand::Start => {
            if let Some(session) = client.start_selected().await?.applied() {
                println!("{} {}", "Started".green(), format_session(&session));
            }
        }
        LoopCommand::Retry => {
            if client.conversation().retry_open().await?.is_applied() {
                print_conversation(client);
            }
        }
        LoopCommand::Reload => {
            client.bootstrap().await?;
            print_setup(client);
        }
        LoopCommand::Help => print_help(),
        LoopCommand::Quit => return Ok(Flow::Quit),
        LoopCommand::Invalid(reason) => log_status(reason.yellow()),
    }
    Ok(Flow::Continue)
}

/// Sign-out path: tear down the client and report
fn fail(client: ChatClient, err: ChatError) -> Result<()> {
    client.logout();
    anyhow::bail!("{}. Sign in again with `edubot login`.", err)
}

fn print_help() {
    println!("{}", "Type a question and press Enter.".bold());
    println!("  /new  /sessions  /open <id>  /retry  /reload");
    println!("  /subject <name>  /chapter <name>  /language <english|hindi>  /start");
    println!("  /quit");
}

fn print_setup(client: &ChatClient) {
    let setup = client.setup();
    if setup.catalog().is_empty() {
        println!("No course material is available for your account.");
        return;
    }

    let subjects: Vec<&str> = setup.catalog().iter().map(|s| s.name.as_str()).collect();
    println!("Subjects: {}", subjects.join(", "));
    println!("Chapters: {}", setup.chapters().join(", "));
    println!(
        "Selected: {} / {} ({})",
        display_or_dash(setup.subject()).green(),
        display_or_dash(setup.chapter()).green(),
        setup.language()
    );
    if setup.can_start() {
        println!("Use /start to begin.");
    } else {
        println!("Pick a subject and chapter to begin.");
    }
}

fn print_sessions(client: &ChatClient) {
    let current = client.conversation().current_session();
    let sessions = client.sessions().sessions();
    if sessions.is_empty() {
        println!("No sessions yet.");
        return;
    }
    for session in &sessions {
        let marker = if Some(session.id) == current { "*" } else { " " };
        println!("{} {}", marker, format_session(session));
    }
}

fn print_conversation(client: &ChatClient) {
    let conversation = client.conversation();
    if conversation.state() != ConversationState::Ready {
        return;
    }
    let messages = conversation.messages();
    if messages.is_empty() {
        println!("(no messages yet)");
    }
    for message in &messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let label = match message.role {
        MessageRole::User => "You".blue().bold(),
        MessageRole::Assistant => "Tutor".magenta().bold(),
    };
    println!("{}: {}", label, message.content);
}

fn print_error(err: &ChatError) {
    eprintln!("{} {}", "[ERROR]".red(), err);
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent_verbatim() {
        assert_eq!(
            parse_input("  What is an atom?\n"),
            LoopCommand::Say("  What is an atom?".to_string())
        );
        assert_eq!(parse_input(""), LoopCommand::Say(String::new()));
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(parse_input("/new"), LoopCommand::New);
        assert_eq!(parse_input("/open 12"), LoopCommand::Open(SessionId(12)));
        assert_eq!(
            parse_input("/subject Social Science"),
            LoopCommand::Subject("Social Science".to_string())
        );
        assert_eq!(
            parse_input("/language Hindi"),
            LoopCommand::Language(Language::Hindi)
        );
        assert_eq!(parse_input("/QUIT"), LoopCommand::Quit);
        assert_eq!(parse_input("/reload"), LoopCommand::Reload);
    }

    #[test]
    fn test_only_rejected_credentials_end_the_loop() {
        let expired = ChatError::Auth("token expired".to_string());
        assert_eq!(
            outcome_flow(Err(expired.clone())),
            Flow::SignOut(expired)
        );

        for err in [
            ChatError::Remote("Internal Server Error (500)".to_string()),
            ChatError::Validation("unknown subject 'Physics'".to_string()),
            ChatError::NotFound("Session not found".to_string()),
        ] {
            assert_eq!(outcome_flow(Err(err)), Flow::Continue);
        }

        assert_eq!(outcome_flow(Ok(Flow::Quit)), Flow::Quit);
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(parse_input("/open"), LoopCommand::Invalid(_)));
        assert!(matches!(parse_input("/open abc"), LoopCommand::Invalid(_)));
        assert!(matches!(parse_input("/language klingon"), LoopCommand::Invalid(_)));
        assert!(matches!(parse_input("/dance"), LoopCommand::Invalid(_)));
    }
}
