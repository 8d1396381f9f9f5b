//! Chat orchestrator: the task that owns a session and sequences index
//! creation, file ingestion, and question answering.
//!
//! # Architecture
//!
//! ```text
//!  front end ──Command──▶ ┌──────────────┐ ──Landing◀── request tasks
//!                         │ Orchestrator │ ──spawn───▶ (create / update / query)
//!  front end ◀─Snapshot── └──────────────┘
//! ```
//!
//! Front ends talk to the session through an [`OrchestratorHandle`]. Each
//! call enqueues a [`Command`]; the orchestrator applies it to its
//! [`SessionState`], starts any backend request on a separate task, and
//! publishes a fresh [`Snapshot`] on a `watch` channel. Request results come
//! back as [`Landing`]s on an internal channel and are applied the same way,
//! so every mutation happens on the orchestrator task and conversation
//! messages are appended in the order requests complete.
//!
//! Commands that a disabled control would have prevented (sending while a
//! query is outstanding, sending blank input, uploading while a query is
//! outstanding) are answered with [`Dispatch::Rejected`] and change nothing.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::IndexBackend;
use crate::config::ChatConfig;
use crate::error::{BackendError, ChatError};
use crate::flight::{self, Landing};
use crate::index::{Ensure, IndexLifecycle};
use crate::models::{Message, SelectedFile};
use crate::session::{SessionState, Snapshot};
use crate::store::{INDEX_CREATION_FAILED, UPLOAD_FAILED, UPLOAD_SUCCEEDED};

const COMMAND_BUFFER: usize = 64;

/// A front-end event, addressed to the orchestrator.
#[derive(Debug)]
pub enum Command {
    /// The text input changed. Never rejected.
    InputChanged(String),
    /// The send control was activated (click or Enter).
    Send { reply: oneshot::Sender<Dispatch> },
    /// A file was picked, or the picker closed without one (`None`).
    SelectFile {
        file: Option<SelectedFile>,
        reply: oneshot::Sender<Dispatch>,
    },
    Cancel(CancelTarget),
    Shutdown,
}

/// Whether a command was acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Accepted,
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The input is blank after trimming.
    EmptyInput,
    /// A query is outstanding.
    Busy,
}

/// Which outstanding requests a [`Command::Cancel`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget {
    Query,
    /// Uploads, including an index creation they are waiting on.
    Uploads,
    All,
}

/// An upload between selection and the start of its ingestion request.
#[derive(Debug)]
struct PendingUpload {
    id: u64,
    file: SelectedFile,
    token: CancellationToken,
}

/// Cloneable front-end side of a running session.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl OrchestratorHandle {
    pub async fn input_changed(&self, text: impl Into<String>) -> Result<(), ChatError> {
        self.enqueue(Command::InputChanged(text.into())).await
    }

    pub async fn send(&self) -> Result<Dispatch, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Command::Send { reply }).await?;
        rx.await.map_err(|_| ChatError::Closed)
    }

    /// Replace the input with `text` and send it.
    pub async fn ask(&self, text: impl Into<String>) -> Result<Dispatch, ChatError> {
        self.input_changed(text).await?;
        self.send().await
    }

    pub async fn select_file(&self, file: Option<SelectedFile>) -> Result<Dispatch, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Command::SelectFile { file, reply }).await?;
        rx.await.map_err(|_| ChatError::Closed)
    }

    pub async fn cancel(&self, target: CancelTarget) -> Result<(), ChatError> {
        self.enqueue(Command::Cancel(target)).await
    }

    /// Stop the session. Outstanding requests are cancelled.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.enqueue(Command::Shutdown).await
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Snapshot) -> bool,
    ) -> Result<Snapshot, ChatError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ChatError::Closed)?;
        Ok(snapshot.clone())
    }

    async fn enqueue(&self, command: Command) -> Result<(), ChatError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChatError::Closed)
    }
}

/// Start a session on the current tokio runtime.
pub fn spawn(
    config: &ChatConfig,
    backend: Arc<dyn IndexBackend>,
) -> (OrchestratorHandle, JoinHandle<()>) {
    let (orchestrator, handle) = Orchestrator::new(config, backend);
    let task = tokio::spawn(orchestrator.run());
    (handle, task)
}

pub struct Orchestrator {
    backend: Arc<dyn IndexBackend>,
    state: SessionState,
    index: IndexLifecycle<PendingUpload>,
    commands: mpsc::Receiver<Command>,
    landings_tx: UnboundedSender<Landing>,
    landings: UnboundedReceiver<Landing>,
    snapshots: watch::Sender<Snapshot>,
    /// Parent of every request token; cancelled on shutdown.
    session_token: CancellationToken,
    query: Option<(u64, CancellationToken)>,
    uploads: HashMap<u64, CancellationToken>,
    creation: Option<CancellationToken>,
    next_query: u64,
}

impl Orchestrator {
    pub fn new(config: &ChatConfig, backend: Arc<dyn IndexBackend>) -> (Self, OrchestratorHandle) {
        let state = SessionState::new(&config.greeting, config.file_name_display_len);
        let index: IndexLifecycle<PendingUpload> = IndexLifecycle::new();
        let (snapshots, snapshot_rx) =
            watch::channel(state.snapshot(index.identifier(), index.phase()));
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (landings_tx, landings) = mpsc::unbounded_channel();

        let orchestrator = Self {
            backend,
            state,
            index,
            commands,
            landings_tx,
            landings,
            snapshots,
            session_token: CancellationToken::new(),
            query: None,
            uploads: HashMap::new(),
            creation: None,
            next_query: 0,
        };
        let handle = OrchestratorHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (orchestrator, handle)
    }

    pub async fn run(mut self) {
        tracing::debug!("chat session started");

        loop {
            tokio::select! {
                biased;

                // Never closes: `self.landings_tx` keeps the channel open.
                Some(landing) = self.landings.recv() => {
                    self.on_landing(landing);
                    self.publish();
                }
                command = self.commands.recv() => {
                    let command = match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => command,
                    };
                    let reply = self.on_command(command);
                    // Publish first so a caller woken by the reply already
                    // sees the state its command produced.
                    self.publish();
                    if let Some((reply, dispatch)) = reply {
                        let _ = reply.send(dispatch);
                    }
                }
            }
        }

        self.session_token.cancel();
        tracing::debug!("chat session stopped");
    }

    fn publish(&self) {
        let snapshot = self.state.snapshot(self.index.identifier(), self.index.phase());
        self.snapshots.send_replace(snapshot);
    }

    fn on_command(&mut self, command: Command) -> Option<(oneshot::Sender<Dispatch>, Dispatch)> {
        match command {
            Command::InputChanged(text) => {
                self.state.input = text;
                None
            }
            Command::Send { reply } => {
                let dispatch = self.send_input();
                Some((reply, dispatch))
            }
            Command::SelectFile { file, reply } => {
                let dispatch = self.select_file(file);
                Some((reply, dispatch))
            }
            Command::Cancel(target) => {
                self.cancel(target);
                None
            }
            Command::Shutdown => None,
        }
    }

    // ============ Query pipeline ============

    fn send_input(&mut self) -> Dispatch {
        if self.state.input.trim().is_empty() {
            return Dispatch::Rejected(Rejection::EmptyInput);
        }
        if self.state.loading {
            tracing::debug!("send rejected: a query is already outstanding");
            return Dispatch::Rejected(Rejection::Busy);
        }

        let question = std::mem::take(&mut self.state.input);
        self.state.store.append(Message::user(question.clone()));

        let index_name = match self.index.identifier() {
            Some(name) => name.to_string(),
            None => {
                tracing::info!(phase = ?self.index.phase(), "query answered locally: no index yet");
                self.state
                    .store
                    .append(Message::bot(ChatError::IndexUnavailable.to_string()));
                return Dispatch::Accepted;
            }
        };

        self.next_query += 1;
        let query = self.next_query;
        let token = self.session_token.child_token();
        self.query = Some((query, token.clone()));
        self.state.loading = true;
        tracing::info!(query, index = %index_name, "query sent");

        let backend = Arc::clone(&self.backend);
        flight::launch(
            self.landings_tx.clone(),
            token,
            async move { backend.query_index(&index_name, &question).await },
            move |result| Landing::Answered { query, result },
        );
        Dispatch::Accepted
    }

    fn on_answered(&mut self, query: u64, result: Result<String, BackendError>) {
        if matches!(self.query, Some((current, _)) if current == query) {
            self.query = None;
        }
        self.state.loading = false;

        match result {
            Ok(answer) => {
                tracing::info!(query, "query answered");
                self.state.store.append(Message::bot(answer));
            }
            Err(e) if e.is_cancelled() => tracing::info!(query, "query cancelled"),
            Err(e) => {
                let err = ChatError::QueryFailed(e);
                tracing::warn!(query, error = %err, "query failed");
                self.state.failed_queries += 1;
                self.state.store.append(Message::bot(err.to_string()));
            }
        }
    }

    // ============ Upload pipeline ============

    fn select_file(&mut self, file: Option<SelectedFile>) -> Dispatch {
        if self.state.loading {
            tracing::debug!("upload rejected: a query is outstanding");
            return Dispatch::Rejected(Rejection::Busy);
        }

        let file = match file {
            Some(file) => file,
            None => {
                tracing::info!("upload skipped: no file selected");
                self.state
                    .store
                    .append(Message::bot(ChatError::MissingInput.to_string()));
                return Dispatch::Accepted;
            }
        };

        self.state.current_upload += 1;
        let id = self.state.current_upload;
        self.state.selected_file_name = Some(file.name.clone());
        self.state.validated = false;
        self.state.uploads_in_flight += 1;

        let token = self.session_token.child_token();
        self.uploads.insert(id, token.clone());
        tracing::info!(upload = id, file = %file.name, bytes = file.bytes.len(), "upload started");

        match self.index.ensure(PendingUpload { id, file, token }) {
            Ensure::Ready(index_name, pending) => self.launch_ingest(index_name, pending),
            Ensure::Create => self.launch_creation(),
            Ensure::Joined => tracing::debug!(
                upload = id,
                waiting = self.index.waiting(),
                "upload waiting on index creation"
            ),
        }
        Dispatch::Accepted
    }

    fn launch_creation(&mut self) {
        let token = self.session_token.child_token();
        self.creation = Some(token.clone());
        tracing::info!(attempt = self.index.creation_requests(), "creating index");

        let backend = Arc::clone(&self.backend);
        flight::launch(
            self.landings_tx.clone(),
            token,
            async move { backend.create_index().await },
            Landing::IndexCreated,
        );
    }

    fn on_index_created(&mut self, result: Result<String, BackendError>) {
        self.creation = None;

        match result {
            Ok(index_name) => {
                tracing::info!(index = %index_name, "index created");
                for pending in self.index.resolve(Some(index_name.clone())) {
                    if pending.token.is_cancelled() {
                        let name = pending.file.name.clone();
                        self.on_ingested(pending.id, &name, Err(BackendError::Cancelled));
                    } else {
                        self.launch_ingest(index_name.clone(), pending);
                    }
                }
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("index creation cancelled");
                // Uploads selected after the cancel joined a creation that was
                // already being torn down; they start a fresh one.
                let mut restart = false;
                for pending in self.index.resolve(None) {
                    if pending.token.is_cancelled() {
                        tracing::debug!(upload = pending.id, "upload cancelled");
                        self.release_upload(pending.id);
                        continue;
                    }
                    match self.index.ensure(pending) {
                        Ensure::Create => restart = true,
                        Ensure::Joined => {}
                        Ensure::Ready(index_name, pending) => {
                            self.launch_ingest(index_name, pending)
                        }
                    }
                }
                if restart {
                    self.launch_creation();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "index creation failed");
                self.state.store.append(Message::bot(INDEX_CREATION_FAILED));
                // Waiting uploads end here; the creation notice covers them.
                for pending in self.index.resolve(None) {
                    tracing::debug!(
                        upload = pending.id,
                        error = %ChatError::IndexUnavailable,
                        "upload abandoned"
                    );
                    self.state.failed_uploads += 1;
                    self.release_upload(pending.id);
                }
            }
        }
    }

    fn launch_ingest(&mut self, index_name: String, pending: PendingUpload) {
        let PendingUpload { id, file, token } = pending;
        let file_name = file.name.clone();
        tracing::debug!(upload = id, index = %index_name, "sending file for ingestion");

        let backend = Arc::clone(&self.backend);
        flight::launch(
            self.landings_tx.clone(),
            token,
            async move { backend.update_index(&index_name, &file).await },
            move |result| Landing::Ingested {
                upload: id,
                file_name: file_name.clone(),
                result,
            },
        );
    }

    fn on_ingested(&mut self, upload: u64, file_name: &str, result: Result<(), BackendError>) {
        self.release_upload(upload);

        match result {
            Ok(()) => {
                tracing::info!(upload, file = %file_name, "file ingested");
                if upload == self.state.current_upload {
                    self.state.validated = true;
                }
                self.state.store.append(Message::bot(UPLOAD_SUCCEEDED));
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(upload, file = %file_name, "upload cancelled")
            }
            Err(e) => {
                let err = ChatError::IngestionFailed(e);
                tracing::warn!(upload, file = %file_name, error = %err, "upload failed");
                self.state.failed_uploads += 1;
                self.state.store.append(Message::bot(UPLOAD_FAILED));
            }
        }
    }

    fn release_upload(&mut self, upload: u64) {
        self.uploads.remove(&upload);
        self.state.uploads_in_flight = self.state.uploads_in_flight.saturating_sub(1);
    }

    // ============ Landings and cancellation ============

    fn on_landing(&mut self, landing: Landing) {
        match landing {
            Landing::IndexCreated(result) => self.on_index_created(result),
            Landing::Ingested {
                upload,
                file_name,
                result,
            } => self.on_ingested(upload, &file_name, result),
            Landing::Answered { query, result } => self.on_answered(query, result),
        }
    }

    fn cancel(&mut self, target: CancelTarget) {
        tracing::info!(?target, "cancelling outstanding requests");
        if matches!(target, CancelTarget::Query | CancelTarget::All) {
            if let Some((_, token)) = &self.query {
                token.cancel();
            }
        }
        if matches!(target, CancelTarget::Uploads | CancelTarget::All) {
            if let Some(token) = &self.creation {
                token.cancel();
            }
            for token in self.uploads.values() {
                token.cancel();
            }
        }
    }
}
