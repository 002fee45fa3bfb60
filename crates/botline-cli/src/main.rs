mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use botline_core::provider::BotApiProvider;
use botline_core::{CoreConfig, CoreRuntime, MessagingProvider, Notification};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "botline-cli")]
#[command(about = "CLI interface for the botline sync core")]
struct Cli {
    /// Path to JSON config file (contains token, apiBase, dataDir)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync loop in the foreground, printing activity
    Watch,

    /// List known chats
    ListChats,

    /// Print a chat's message history
    History {
        /// Chat ID
        chat_id: String,
    },

    /// Send a text message
    Send {
        /// Chat ID
        chat_id: String,
        /// Message text
        text: String,
    },

    /// Send a file (jpg/jpeg/png upload as photos, everything else as
    /// documents)
    SendFile {
        /// Chat ID
        chat_id: String,
        /// Path to the local file
        path: PathBuf,
    },

    /// Delete one message from a chat
    DeleteMessage {
        /// Chat ID
        chat_id: String,
        /// Message ID
        message_id: i64,
    },

    /// Clear a chat's history (the chat itself is kept)
    ClearChat {
        /// Chat ID
        chat_id: String,
    },

    /// Log out: stop syncing and wipe all local data
    Logout,
}

fn main() -> Result<()> {
    botline_core::tracing_setup::init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(CliConfig::default_path);
    let cli_config = CliConfig::load(&config_path)?;
    if cli_config.token.is_empty() {
        bail!("config at {} has no token", config_path.display());
    }

    let provider: Arc<dyn MessagingProvider> = match &cli_config.api_base {
        Some(base) => Arc::new(BotApiProvider::with_base(base, &cli_config.token)),
        None => Arc::new(BotApiProvider::new(&cli_config.token)),
    };

    let core_config = CoreConfig::new(cli_config.data_dir());
    let mut runtime = CoreRuntime::new(core_config, provider)?;

    match cli.command {
        Commands::Watch => watch(&mut runtime),
        Commands::ListChats => {
            let mut chats: Vec<_> = runtime.store().list_chats().into_values().collect();
            chats.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
            for chat in chats {
                println!("{}\t{}", chat.id, chat.display_name());
            }
            Ok(())
        }
        Commands::History { chat_id } => {
            for msg in runtime.store().get_messages(&chat_id) {
                let arrow = if bool::from(msg.direction) { ">" } else { "<" };
                println!("{} [{}] {} {}", msg.id, msg.time, arrow, msg.text);
            }
            Ok(())
        }
        Commands::Send { chat_id, text } => {
            let msg = runtime.dispatcher().send_text(&chat_id, &text)?;
            println!("sent message {}", msg.id);
            Ok(())
        }
        Commands::SendFile { chat_id, path } => {
            let msg = runtime.dispatcher().send_attachment(&chat_id, &path)?;
            println!("sent {} ({:?})", msg.id, msg.kind);
            Ok(())
        }
        Commands::DeleteMessage {
            chat_id,
            message_id,
        } => {
            if runtime.store().delete_message(&chat_id, message_id) {
                println!("deleted");
            } else {
                bail!("no such message");
            }
            Ok(())
        }
        Commands::ClearChat { chat_id } => {
            if runtime.store().clear_chat(&chat_id) {
                println!("cleared");
            } else {
                bail!("no such chat");
            }
            Ok(())
        }
        Commands::Logout => {
            runtime.logout();
            println!("logged out, local data wiped");
            Ok(())
        }
    }
}

/// Foreground sync loop: runs until interrupted, echoing notifications as
/// they arrive.
fn watch(runtime: &mut CoreRuntime) -> Result<()> {
    let rx = runtime.subscribe();
    runtime.start_sync();
    eprintln!("syncing; ctrl-c to stop");

    for notification in rx {
        match notification {
            Notification::NewMessage { chat_id } => {
                let store = runtime.store();
                match store.get_messages(&chat_id).last() {
                    Some(msg) => println!("[{}] {}: {}", msg.time, chat_id, msg.text),
                    None => println!("new message in chat {}", chat_id),
                }
            }
            Notification::ConnectivityChanged { connected } => {
                eprintln!("{}", if connected { "online" } else { "offline" });
            }
        }
    }
    Ok(())
}
