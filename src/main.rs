use aeon::config::Config;
use aeon::storage::Storage;
use aeon::store::ConversationStore;
use aeon::ui;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aeon")]
#[command(version)]
#[command(about = "Multi-mode AI chat client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved conversations
    List,
    /// Delete a saved conversation by id
    Delete { id: String },
    /// Delete all saved conversations
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config)?;

    match cli.command {
        None => ui::run(config).await,
        Some(Commands::List) => list_conversations(&config),
        Some(Commands::Delete { id }) => {
            let mut store = open_store(&config)?;
            store.delete(&id)?;
            println!("Deleted {}", id);
            Ok(())
        }
        Some(Commands::Clear) => {
            let mut store = open_store(&config)?;
            store.clear()?;
            println!("Chat history cleared");
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> Result<ConversationStore> {
    Ok(ConversationStore::load(Storage::new(&config.data_dir)?))
}

fn list_conversations(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let conversations = store.list();

    if conversations.is_empty() {
        println!("No conversations yet. Run 'aeon' to start chatting!");
        return Ok(());
    }

    println!("Saved conversations:\n");
    for conversation in conversations {
        println!(
            "  {}  {}  ({} messages, {})",
            conversation.id,
            conversation.title,
            conversation.messages.len(),
            conversation.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Logs go to a file; stderr belongs to the TUI.
fn init_logging(config: &Config) -> Result<()> {
    let log_file = File::create(config.data_dir.join("aeon.log"))
        .context("Failed to create log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}
