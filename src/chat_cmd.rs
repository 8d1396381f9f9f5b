//! Terminal front end: the `docqa chat` session and one-shot `docqa ask`.
//!
//! Both commands drive the same [`orchestrator`](crate::orchestrator) a
//! graphical front end would. Bot messages go to stdout as they land; user
//! input is read line by line from stdin. A line ending in `\` continues on
//! the next line, so multi-line questions can be typed.
//!
//! # Session commands
//!
//! | Input | Effect |
//! |-------|--------|
//! | any text | Ask a question about the uploaded file |
//! | `/upload PATH` | Read `PATH` and upload it (`/u` for short) |
//! | `/status` | Show the current-file line and pending work |
//! | `/cancel [query\|upload]` | Abandon outstanding requests |
//! | `/help` | List commands |
//! | `/quit` | Leave, cancelling anything outstanding |

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::affordance::FileStatus;
use crate::backend::IndexBackend;
use crate::config::{Config, UploadConfig};
use crate::index::IndexPhase;
use crate::models::SelectedFile;
use crate::orchestrator::{self, CancelTarget, Dispatch, OrchestratorHandle, Rejection};
use crate::session::Snapshot;

const HELP: &str = "\
Commands:
  /upload PATH        upload a document (alias /u)
  /status             show the current file and pending work
  /cancel [query|upload]
                      cancel outstanding requests (all if omitted)
  /help               show this help
  /quit               leave the session
End a line with \\ to continue the message on the next line.";

/// One complete line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Message(String),
    Upload(Option<PathBuf>),
    Status,
    Cancel(CancelTarget),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(text: &str) -> Line {
    let trimmed = text.trim();
    let rest = match trimmed.strip_prefix('/') {
        Some(rest) => rest,
        None => return Line::Message(text.to_string()),
    };
    let (command, arg) = match rest.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (rest, ""),
    };

    match command {
        "upload" | "u" => Line::Upload((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "status" => Line::Status,
        "cancel" => match arg {
            "" | "all" => Line::Cancel(CancelTarget::All),
            "query" => Line::Cancel(CancelTarget::Query),
            "upload" | "uploads" => Line::Cancel(CancelTarget::Uploads),
            _ => Line::Unknown(trimmed.to_string()),
        },
        "help" | "?" => Line::Help,
        "quit" | "exit" | "q" => Line::Quit,
        _ => Line::Unknown(trimmed.to_string()),
    }
}

/// Joins physical lines that end in `\` into one logical line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn push(&mut self, raw: &str) -> Option<String> {
        if let Some(head) = raw.strip_suffix('\\') {
            self.pending.push_str(head);
            self.pending.push('\n');
            return None;
        }
        self.pending.push_str(raw);
        Some(std::mem::take(&mut self.pending))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Text still waiting for its last line when input ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut text = std::mem::take(&mut self.pending);
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }
}

/// Read a document from disk, applying the `[upload]` limits.
pub async fn read_selected_file(path: &Path, upload: &UploadConfig) -> Result<SelectedFile> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    if !upload.accepted_extensions.is_empty() {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !upload.accepted_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
            bail!(
                "Unsupported file type for {} (accepted: {})",
                name,
                upload.accepted_extensions.join(", ")
            );
        }
    }

    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    if !meta.is_file() {
        bail!("Not a regular file: {}", path.display());
    }
    if meta.len() > upload.max_file_bytes {
        bail!(
            "{} is {} bytes, over the {} byte upload limit",
            name,
            meta.len(),
            upload.max_file_bytes
        );
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(SelectedFile::new(name, bytes))
}

/// Human-readable summary for `/status`.
pub fn render_status(snapshot: &Snapshot) -> String {
    let file = match &snapshot.file_status {
        FileStatus::NoFile => "...".to_string(),
        FileStatus::Processing => "processing...".to_string(),
        FileStatus::Ready(name) => name.clone(),
        FileStatus::Error => "Error".to_string(),
    };
    let index = match (snapshot.index_phase, &snapshot.index_name) {
        (IndexPhase::Ready, Some(name)) => name.as_str(),
        (IndexPhase::Creating, _) => "creating...",
        _ => "none",
    };
    let query = if snapshot.loading {
        "waiting for answer"
    } else {
        "idle"
    };
    format!("Current file: {}\nIndex: {}\nQuery: {}", file, index, query)
}

/// Run an interactive session on stdin/stdout.
pub async fn run_chat(
    config: &Config,
    backend: Arc<dyn IndexBackend>,
    file: Option<PathBuf>,
) -> Result<()> {
    let (handle, session) = orchestrator::spawn(&config.chat, backend);
    let renderer = tokio::spawn(print_bot_messages(handle.subscribe()));

    if let Some(path) = file {
        upload(&handle, &config.upload, Some(path)).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = LineBuffer::default();
    let mut quit = false;

    while let Some(raw) = lines.next_line().await.context("Failed to read stdin")? {
        let text = match buffer.push(&raw) {
            Some(text) => text,
            None => continue,
        };

        match parse_line(&text) {
            Line::Message(text) => ask(&handle, text).await?,
            Line::Upload(path) => upload(&handle, &config.upload, path).await?,
            Line::Status => println!("{}", render_status(&handle.snapshot())),
            Line::Cancel(target) => handle.cancel(target).await?,
            Line::Help => println!("{}", HELP),
            Line::Quit => {
                quit = true;
                break;
            }
            Line::Unknown(command) => {
                eprintln!("Unknown command: {}. Type /help for a list.", command)
            }
        }
    }

    if !quit {
        // Input closed mid-continuation: send what was typed.
        if let Some(text) = buffer.finish() {
            ask(&handle, text).await?;
        }
        // Let outstanding requests land so their notices print.
        handle.wait_for(Snapshot::is_idle).await?;
    }
    handle.shutdown().await?;
    session.await.context("chat session task failed")?;
    renderer.await.context("output task failed")?;
    Ok(())
}

/// Upload `file`, ask `question` once, and print the answer.
///
/// Fails if the upload or the query fails, with the notice the session
/// would have shown.
pub async fn run_ask(
    config: &Config,
    backend: Arc<dyn IndexBackend>,
    file: &Path,
    question: &str,
) -> Result<()> {
    let selected = read_selected_file(file, &config.upload).await?;
    let (handle, session) = orchestrator::spawn(&config.chat, backend);

    handle.select_file(Some(selected)).await?;
    let uploaded = handle.wait_for(|s| !s.processing).await?;
    if !uploaded.validated {
        bail!("{}", last_bot_text(&uploaded));
    }

    match handle.ask(question).await? {
        Dispatch::Accepted => {}
        Dispatch::Rejected(Rejection::EmptyInput) => bail!("Question is empty"),
        Dispatch::Rejected(Rejection::Busy) => bail!("A query is already outstanding"),
    }
    let answered = handle.wait_for(|s| !s.loading).await?;
    let text = last_bot_text(&answered);
    if answered.failed_queries > uploaded.failed_queries {
        bail!("{}", text);
    }
    println!("{}", text);

    handle.shutdown().await?;
    session.await.context("chat session task failed")?;
    Ok(())
}

async fn ask(handle: &OrchestratorHandle, text: String) -> Result<()> {
    if handle.ask(text).await? == Dispatch::Rejected(Rejection::Busy) {
        eprintln!("Still waiting for the previous answer. Use /cancel to abandon it.");
    }
    Ok(())
}

async fn upload(
    handle: &OrchestratorHandle,
    limits: &UploadConfig,
    path: Option<PathBuf>,
) -> Result<()> {
    let file = match path {
        Some(path) => match read_selected_file(&path, limits).await {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("{:#}", e);
                return Ok(());
            }
        },
        None => None,
    };

    if let Dispatch::Rejected(_) = handle.select_file(file).await? {
        eprintln!("Uploads are disabled while a question is being answered.");
    }
    Ok(())
}

fn last_bot_text(snapshot: &Snapshot) -> String {
    snapshot
        .messages
        .iter()
        .rev()
        .find(|m| m.is_bot())
        .map(|m| m.text.clone())
        .unwrap_or_default()
}

async fn print_bot_messages(mut rx: watch::Receiver<Snapshot>) {
    let mut shown = 0;
    loop {
        {
            let snapshot = rx.borrow_and_update();
            for message in snapshot.messages.iter().skip(shown) {
                if message.is_bot() {
                    println!("bot> {}", message.text);
                }
            }
            shown = snapshot.messages.len();
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}
