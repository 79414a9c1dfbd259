use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use errand::api::ApiClient;
use errand::logging::{self, LogConfig};
use errand::page::{LoadOutcome, MutationState, PostPage};
use errand::server_config::ServerConfigManager;
use errand::storage::{CredentialProvider, FileCredentialStore, StaticCredentials};
use errand_types::{Post, QuestionId, ReplyId};

/// Errand - view an order post and manage its likes and Q&A
#[derive(Parser)]
#[command(name = "errand")]
#[command(about = "Post detail client with like and Q&A support")]
#[command(version)]
struct Cli {
    /// Server URL to connect to
    #[arg(long, short, env = "ERRAND_SERVER_URL")]
    server: Option<String>,

    /// Auth token to use instead of the stored one
    #[arg(long, env = "ERRAND_AUTH_TOKEN")]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a post with its Q&A thread
    Show { order_id: String },
    /// Like or unlike a post
    Like { order_id: String },
    /// Ask a question on a post
    Ask { order_id: String, text: String },
    /// Edit a question
    EditQuestion {
        order_id: String,
        question_id: String,
        text: String,
    },
    /// Delete a question
    DeleteQuestion { order_id: String, question_id: String },
    /// Reply to a question (one reply per question)
    Reply {
        order_id: String,
        question_id: String,
        text: String,
    },
    /// Edit a reply
    EditReply {
        order_id: String,
        question_id: String,
        reply_id: String,
        text: String,
    },
    /// Delete a reply
    DeleteReply {
        order_id: String,
        question_id: String,
        reply_id: String,
    },
    /// Store an auth token for later requests
    Login { token: String },
    /// Forget the stored auth token
    Logout,
    /// Save the default server URL
    SetServer { url: String },
}

impl Command {
    fn order_id(&self) -> Option<&str> {
        match self {
            Command::Show { order_id }
            | Command::Like { order_id }
            | Command::Ask { order_id, .. }
            | Command::EditQuestion { order_id, .. }
            | Command::DeleteQuestion { order_id, .. }
            | Command::Reply { order_id, .. }
            | Command::EditReply { order_id, .. }
            | Command::DeleteReply { order_id, .. } => Some(order_id.as_str()),
            Command::Login { .. } | Command::Logout | Command::SetServer { .. } => None,
        }
    }
}

fn print_post(post: &Post) {
    println!("{} | {}", post.display_user_name(), if post.is_liked { "♥" } else { "♡" });
    println!();
    println!("{}", if post.title.is_empty() { "(no title)" } else { &post.title });
    println!("{}", if post.description.is_empty() { "(no description)" } else { &post.description });
    println!("Fee: {} KRW", post.service_fee());
    println!();
    println!("Q&A");
    if post.qna.is_empty() {
        println!("  (no questions yet)");
    }
    for question in &post.qna {
        println!(
            "  [{}] {}: {}",
            question.id,
            question.author_id.as_deref().unwrap_or(errand_types::ANONYMOUS),
            question.content
        );
        for reply in &question.answers {
            println!(
                "      [{}] {}: {}",
                reply.id,
                reply.author_id.as_deref().unwrap_or(errand_types::ANONYMOUS),
                reply.content
            );
        }
    }
}

/// Print what happened to a mutation
fn report(state: Option<MutationState>) {
    match state {
        None => eprintln!("Nothing to do (empty input, unknown entry, or already replied)."),
        Some(MutationState::Errored { message, .. }) => eprintln!("{}", message),
        Some(MutationState::RolledBack { .. }) => {
            eprintln!("Could not save the like status; it was reverted.")
        }
        Some(_) => {}
    }
}

async fn run_page_command(page: &mut PostPage, command: Command) {
    let state = match command {
        Command::Show { .. } => return,
        Command::Like { .. } => Some(page.toggle_like().await),
        Command::Ask { text, .. } => page.add_question(&text).await,
        Command::EditQuestion {
            question_id, text, ..
        } => page.update_question(&QuestionId(question_id), &text).await,
        Command::DeleteQuestion { question_id, .. } => {
            page.delete_question(&QuestionId(question_id)).await
        }
        Command::Reply {
            question_id, text, ..
        } => page.add_reply(&QuestionId(question_id), &text).await,
        Command::EditReply {
            question_id,
            reply_id,
            text,
            ..
        } => {
            page.update_reply(&QuestionId(question_id), &ReplyId(reply_id), &text)
                .await
        }
        Command::DeleteReply {
            question_id,
            reply_id,
            ..
        } => {
            page.delete_reply(&QuestionId(question_id), &ReplyId(reply_id))
                .await
        }
        Command::Login { .. } | Command::Logout | Command::SetServer { .. } => return,
    };
    report(state);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load ERRAND_* settings from a .env file if present
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    logging::init_logging(&log_config)?;

    let server_config_manager = ServerConfigManager::new()?;

    match &cli.command {
        Command::Login { token } => {
            FileCredentialStore::new()?
                .store_token(token)
                .context("Failed to store auth token")?;
            println!("Token saved.");
            return Ok(());
        }
        Command::Logout => {
            FileCredentialStore::new()?.clear_token()?;
            println!("Logged out.");
            return Ok(());
        }
        Command::SetServer { url } => {
            server_config_manager.save_server_url(url.clone())?;
            println!("Server set to {}", url);
            return Ok(());
        }
        _ => {}
    }

    let server_url = server_config_manager.determine_server_url(cli.server)?;
    log::info!("Using server {}", server_url);

    let credentials: Arc<dyn CredentialProvider> = match cli.token {
        Some(token) => Arc::new(StaticCredentials::new(token)),
        None => Arc::new(FileCredentialStore::new()?),
    };
    let api = ApiClient::new(server_url, credentials);

    let order_id = cli
        .command
        .order_id()
        .context("command needs an order id")?
        .to_string();
    let mut page = PostPage::new(order_id, Arc::new(api));
    page.log_config = log_config;

    match page.load().await {
        LoadOutcome::Loaded => {}
        LoadOutcome::Fallback(message) => eprintln!("{}", message),
        LoadOutcome::LoginRequired => {
            page.unmount();
            bail!("Authentication required. Run `errand login <token>` and try again.");
        }
        LoadOutcome::Ignored => return Ok(()),
    }

    run_page_command(&mut page, cli.command).await;
    print_post(page.post());
    page.unmount();

    Ok(())
}
