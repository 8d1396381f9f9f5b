//! Session state and the read-only snapshots published to the front end.

use serde::Serialize;

use crate::affordance::{self, Affordances, FileStatus};
use crate::index::IndexPhase;
use crate::models::Message;
use crate::store::ConversationStore;

/// Mutable state of one chat session, owned by the orchestrator task.
#[derive(Debug)]
pub struct SessionState {
    pub store: ConversationStore,
    pub input: String,
    pub selected_file_name: Option<String>,
    pub validated: bool,
    pub loading: bool,
    /// Uploads between selection and their final outcome.
    pub uploads_in_flight: usize,
    /// Sequence number of the most recent file selection.
    pub current_upload: u64,
    /// Uploads and queries that ended in an error notice.
    pub failed_uploads: u64,
    pub failed_queries: u64,
    pub file_name_display_len: usize,
}

impl SessionState {
    pub fn new(greeting: &str, file_name_display_len: usize) -> Self {
        Self {
            store: ConversationStore::with_greeting(greeting),
            input: String::new(),
            selected_file_name: None,
            validated: false,
            loading: false,
            uploads_in_flight: 0,
            current_upload: 0,
            failed_uploads: 0,
            failed_queries: 0,
            file_name_display_len,
        }
    }

    pub fn processing(&self) -> bool {
        self.uploads_in_flight > 0
    }

    pub fn affordances(&self) -> Affordances {
        affordance::derive(self.loading, self.processing(), &self.input)
    }

    pub fn snapshot(&self, index_name: Option<&str>, index_phase: IndexPhase) -> Snapshot {
        Snapshot {
            messages: self.store.messages().to_vec(),
            input: self.input.clone(),
            index_name: index_name.map(str::to_string),
            index_phase,
            selected_file_name: self.selected_file_name.clone(),
            validated: self.validated,
            loading: self.loading,
            processing: self.processing(),
            affordances: self.affordances(),
            failed_uploads: self.failed_uploads,
            failed_queries: self.failed_queries,
            file_status: affordance::file_status(
                self.selected_file_name.as_deref(),
                self.processing(),
                self.validated,
                self.file_name_display_len,
            ),
        }
    }
}

/// Immutable view of a session at one instant. Everything a front end needs
/// to render is here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub input: String,
    pub index_name: Option<String>,
    pub index_phase: IndexPhase,
    pub selected_file_name: Option<String>,
    pub validated: bool,
    pub loading: bool,
    pub processing: bool,
    pub affordances: Affordances,
    pub failed_uploads: u64,
    pub failed_queries: u64,
    pub file_status: FileStatus,
}

impl Snapshot {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True when no query or upload is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.loading && !self.processing
    }
}
