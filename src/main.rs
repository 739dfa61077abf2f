//! # Context Chat CLI (`cchat`)
//!
//! ## Usage
//!
//! ```bash
//! cchat --config ./config/cchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cchat chat` | Interactive chat on stdin |
//! | `cchat ask "<question>"` | One turn, saved to history |
//! | `cchat doc <name> "<question>"` | Answer from a single uploaded document |
//! | `cchat upload <path>...` | Add documents to the upload directory |
//! | `cchat docs` | List uploaded documents |
//! | `cchat index` | Rebuild the semantic chunk index |
//! | `cchat history` | Print the saved conversation |
//! | `cchat clear` | Reset the saved conversation |

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use context_chat::{commands, config};

/// Context Chat: an LLM assistant grounded in Wikipedia, news, web search
/// and your own documents.
///
/// API keys are read from the environment (or a `.env` file). See
/// `config/cchat.example.toml` for every setting.
#[derive(Parser)]
#[command(name = "cchat", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if it is missing.
    #[arg(long, global = true, default_value = "./config/cchat.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively. Type /help inside for commands.
    Chat {
        /// Restrict document retrieval to documents whose name contains this.
        #[arg(long)]
        document: Option<String>,
    },

    /// Ask a single question and save the exchange to history.
    Ask {
        question: String,
    },

    /// Ask a question about one uploaded document.
    ///
    /// The document's text is the only context. Nothing is saved.
    Doc {
        /// File name of the uploaded document.
        name: String,
        question: String,
    },

    /// Copy .txt, .md or .pdf files into the upload directory.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List uploaded documents.
    Docs,

    /// Rebuild the chunk index used for semantic document retrieval.
    Index,

    /// Print the saved conversation.
    History,

    /// Reset the saved conversation to the system prompt.
    Clear,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Chat { document } => commands::run_chat(&cfg, document).await?,
        Commands::Ask { question } => commands::run_ask(&cfg, &question).await?,
        Commands::Doc { name, question } => commands::run_doc(&cfg, &name, &question).await?,
        Commands::Upload { paths } => commands::run_upload(&cfg, &paths).await?,
        Commands::Docs => commands::run_docs(&cfg)?,
        Commands::Index => commands::run_index(&cfg).await?,
        Commands::History => commands::run_history(&cfg)?,
        Commands::Clear => commands::run_clear(&cfg)?,
    }

    Ok(())
}
