//! CLI command implementations.
//!
//! Each `run_*` function backs one `cchat` subcommand. Replies and listings
//! go to stdout; logs go to stderr through `tracing`.

use anyhow::{bail, Result};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::history::HistoryStore;
use crate::library::DocumentLibrary;
use crate::models::{Conversation, Role};
use crate::session::ChatSession;

/// `cchat ask`: one persisted turn.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let session = ChatSession::from_config(config)?;
    let mut conversation = session.history().load()?;
    let outcome = session.turn(&mut conversation, question).await?;
    println!("{}", outcome.reply);
    Ok(())
}

/// `cchat doc`: question answered from one uploaded document only.
pub async fn run_doc(config: &Config, name: &str, question: &str) -> Result<()> {
    let library = DocumentLibrary::open(&config.documents)?;
    let document = match library.find(name)? {
        Some(doc) => doc,
        None => bail!("document not found: {}", name),
    };
    let session = ChatSession::from_config(config)?;
    println!("{}", session.ask_document(&document, question).await);
    Ok(())
}

/// `cchat upload`: copy files into the upload directory.
///
/// With semantic retrieval enabled the chunk index is rebuilt afterwards.
pub async fn run_upload(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let library = DocumentLibrary::open(&config.documents)?;
    for path in paths {
        let doc = library.upload(path)?;
        println!("Uploaded {} ({} chars)", doc.name, doc.text.chars().count());
    }

    if config.context.document_mode == "semantic" {
        rebuild_index(config, &library).await?;
    }
    Ok(())
}

/// `cchat docs`: list uploaded documents.
pub fn run_docs(config: &Config) -> Result<()> {
    let library = DocumentLibrary::open(&config.documents)?;
    print_documents(&library, &mut std::io::stdout())
}

/// `cchat index`: rebuild the semantic chunk index.
pub async fn run_index(config: &Config) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let library = DocumentLibrary::open(&config.documents)?;
    rebuild_index(config, &library).await
}

async fn rebuild_index(config: &Config, library: &DocumentLibrary) -> Result<()> {
    let provider = create_provider(&config.embedding)?;
    let index = library
        .build_index(provider.as_ref(), &config.embedding)
        .await?;
    println!(
        "Indexed {} chunks with {} ({} dims)",
        index.len(),
        index.model,
        index.dims
    );
    Ok(())
}

/// `cchat history`: print the visible conversation.
pub fn run_history(config: &Config) -> Result<()> {
    let history = HistoryStore::from_config(&config.history);
    let conversation = history.load()?;
    print_history(&conversation, &mut std::io::stdout())
}

/// `cchat clear`: reset the stored conversation.
pub fn run_clear(config: &Config) -> Result<()> {
    let history = HistoryStore::from_config(&config.history);
    let mut conversation = history.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "discarding unreadable history");
        Conversation::new(history.system_prompt())
    });
    history.clear(&mut conversation)?;
    println!("History cleared.");
    Ok(())
}

/// `cchat chat`: interactive loop over stdin.
pub async fn run_chat(config: &Config, document: Option<String>) -> Result<()> {
    let mut session = ChatSession::from_config(config)?;
    session.set_document_filter(document);
    let mut conversation = session.history().load()?;

    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    chat_loop(
        &mut session,
        &mut conversation,
        stdin,
        &mut std::io::stdout(),
        interactive,
    )
    .await
}

/// Drive a chat over any line source. `interactive` controls the prompt.
pub async fn chat_loop<R, W>(
    session: &mut ChatSession,
    conversation: &mut Conversation,
    input: R,
    out: &mut W,
    interactive: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if interactive {
        writeln!(out, "Type a question, /help for commands, /quit to exit.")?;
    }
    let mut lines = input.lines();

    loop {
        if interactive {
            write!(out, "> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ChatCommand::parse(line) {
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Help) => {
                writeln!(out, "/clear  /history  /docs  /use NAME  /use  /quit")?;
            }
            Some(ChatCommand::Clear) => {
                session.history().clear(conversation)?;
                writeln!(out, "History cleared.")?;
            }
            Some(ChatCommand::History) => print_history(conversation, out)?,
            Some(ChatCommand::Docs) => match session.library() {
                Some(library) => print_documents(library, out)?,
                None => writeln!(out, "Document retrieval is disabled.")?,
            },
            Some(ChatCommand::Use(filter)) => {
                session.set_document_filter(filter);
                match session.document_filter() {
                    Some(f) => writeln!(out, "Restricting documents to \"{}\".", f)?,
                    None => writeln!(out, "Searching all documents.")?,
                }
            }
            None => match session.turn(conversation, line).await {
                Ok(outcome) => writeln!(out, "{}\n", outcome.reply)?,
                Err(e) => {
                    tracing::error!(error = %e, "failed to save history");
                    writeln!(out, "error: {:#}", e)?;
                }
            },
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Quit,
    Help,
    Clear,
    History,
    Docs,
    Use(Option<String>),
}

impl ChatCommand {
    /// Slash commands; anything else is a question.
    fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "quit" | "exit" => Some(ChatCommand::Quit),
            "help" => Some(ChatCommand::Help),
            "clear" => Some(ChatCommand::Clear),
            "history" => Some(ChatCommand::History),
            "docs" => Some(ChatCommand::Docs),
            "use" if arg.is_empty() => Some(ChatCommand::Use(None)),
            "use" => Some(ChatCommand::Use(Some(arg.to_string()))),
            _ => None,
        }
    }
}

fn print_history<W: Write>(conversation: &Conversation, out: &mut W) -> Result<()> {
    if conversation.visible().is_empty() {
        writeln!(out, "No messages yet.")?;
        return Ok(());
    }
    for message in conversation.visible() {
        let who = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        writeln!(out, "{}: {}", who, message.content)?;
    }
    Ok(())
}

fn print_documents<W: Write>(library: &DocumentLibrary, out: &mut W) -> Result<()> {
    let docs = library.documents()?;
    if docs.is_empty() {
        writeln!(out, "No documents in {}", library.dir().display())?;
        return Ok(());
    }
    writeln!(out, "{:<40} CHARS", "DOCUMENT")?;
    for doc in docs {
        writeln!(out, "{:<40} {}", doc.name, doc.text.chars().count())?;
    }
    Ok(())
}
