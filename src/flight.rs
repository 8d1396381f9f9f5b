//! In-flight backend requests.
//!
//! Every request runs on its own tokio task and reports back to the
//! orchestrator with exactly one [`Landing`]. The report is made by a
//! [`Completion`] guard: if the task finishes normally it lands the real
//! result, and if it is dropped first (panic, runtime shutdown) the guard
//! lands [`BackendError::Aborted`] from its destructor. Either way the
//! orchestrator hears about it and releases the matching busy flag.

use std::future::Future;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Result of one finished request, addressed to the orchestrator.
#[derive(Debug)]
pub enum Landing {
    IndexCreated(Result<String, BackendError>),
    Ingested {
        upload: u64,
        file_name: String,
        result: Result<(), BackendError>,
    },
    Answered {
        query: u64,
        result: Result<String, BackendError>,
    },
}

/// Delivers a [`Landing`] exactly once.
pub struct Completion {
    tx: UnboundedSender<Landing>,
    fallback: Option<Landing>,
}

impl Completion {
    pub fn new(tx: UnboundedSender<Landing>, fallback: Landing) -> Self {
        Self {
            tx,
            fallback: Some(fallback),
        }
    }

    pub fn land(mut self, landing: Landing) {
        self.fallback = None;
        // A closed channel means the orchestrator is gone; nothing is waiting.
        let _ = self.tx.send(landing);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(landing) = self.fallback.take() {
            let _ = self.tx.send(landing);
        }
    }
}

/// Run `call` on a new task, racing it against `token`.
///
/// `wrap` builds the landing from the outcome. It is invoked twice at most:
/// once up front for the `Aborted` fallback and once for the real result.
pub fn launch<T, F, W>(
    tx: UnboundedSender<Landing>,
    token: CancellationToken,
    call: F,
    wrap: W,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, BackendError>> + Send + 'static,
    W: Fn(Result<T, BackendError>) -> Landing + Send + 'static,
{
    let completion = Completion::new(tx, wrap(Err(BackendError::Aborted)));
    tokio::spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => Err(BackendError::Cancelled),
            result = call => result,
        };
        completion.land(wrap(result));
    });
}
