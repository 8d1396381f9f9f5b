//! # docqa
//!
//! Chat with your documents: upload a file to an indexing backend, then ask
//! questions answered from its contents.
//!
//! The crate is the client side of that interaction. It creates the
//! session's index on first upload, streams files into it, dispatches
//! questions, and keeps an append-only conversation log, while making sure
//! only one index is ever created and only one question is in flight.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  Command   ┌──────────────┐  HTTP   ┌──────────────┐
//! │ Front end  │──────────▶│ Orchestrator │────────▶│   Indexing   │
//! │ (terminal) │◀──────────│ index/upload │◀────────│   backend    │
//! └────────────┘  Snapshot  │   / query    │         └──────────────┘
//!                           └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa ask --file report.pdf "What is the revenue?"
//! docqa chat --file report.pdf          # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Messages, selected files, backend bodies |
//! | [`error`] | Backend and pipeline errors |
//! | [`backend`] | `IndexBackend` trait and HTTP client |
//! | [`index`] | Single-flight index lifecycle |
//! | [`store`] | Conversation log and fixed notices |
//! | [`affordance`] | Control enablement and the current-file line |
//! | [`session`] | Session state and published snapshots |
//! | [`flight`] | In-flight request tasks and their completions |
//! | [`orchestrator`] | The session task and its handle |
//! | [`chat_cmd`] | Terminal front end |

pub mod affordance;
pub mod backend;
pub mod chat_cmd;
pub mod config;
pub mod error;
pub mod flight;
pub mod index;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod store;
