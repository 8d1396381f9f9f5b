//! Index lifecycle: lazy, single-flight creation of the session's index.
//!
//! ```text
//! Idle --ensure--> Creating --resolve(Ok)--> Ready --ensure--> Ready
//!   ^                 |
//!   +--resolve(Err)---+
//! ```
//!
//! [`IndexLifecycle`] performs no I/O. The caller asks it what to do via
//! [`ensure`](IndexLifecycle::ensure) and reports the creation result via
//! [`resolve`](IndexLifecycle::resolve). Work that needs the index while a
//! creation is pending is parked as a waiter inside the `Creating` state and
//! handed back on resolution, so at most one creation request exists at any
//! time no matter how calls interleave.

use serde::Serialize;

/// Externally visible phase of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    Idle,
    Creating,
    Ready,
}

/// What the caller of [`IndexLifecycle::ensure`] must do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Ensure<W> {
    /// The index exists; proceed with the waiter immediately.
    Ready(String, W),
    /// The waiter was parked and a creation request must be issued now.
    Create,
    /// The waiter was parked behind a creation already in flight.
    Joined,
}

#[derive(Debug)]
enum Slot<W> {
    Idle,
    Creating { waiters: Vec<W> },
    Ready(String),
}

#[derive(Debug)]
pub struct IndexLifecycle<W> {
    slot: Slot<W>,
    creations: u32,
}

impl<W> Default for IndexLifecycle<W> {
    fn default() -> Self {
        Self {
            slot: Slot::Idle,
            creations: 0,
        }
    }
}

impl<W> IndexLifecycle<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> IndexPhase {
        match self.slot {
            Slot::Idle => IndexPhase::Idle,
            Slot::Creating { .. } => IndexPhase::Creating,
            Slot::Ready(_) => IndexPhase::Ready,
        }
    }

    /// The index identifier, once creation has succeeded.
    pub fn identifier(&self) -> Option<&str> {
        match &self.slot {
            Slot::Ready(name) => Some(name),
            _ => None,
        }
    }

    /// Number of creation requests this lifecycle has asked for.
    pub fn creation_requests(&self) -> u32 {
        self.creations
    }

    /// Number of waiters parked behind the pending creation.
    pub fn waiting(&self) -> usize {
        match &self.slot {
            Slot::Creating { waiters } => waiters.len(),
            _ => 0,
        }
    }

    pub fn ensure(&mut self, waiter: W) -> Ensure<W> {
        match &mut self.slot {
            Slot::Ready(name) => Ensure::Ready(name.clone(), waiter),
            Slot::Creating { waiters } => {
                waiters.push(waiter);
                Ensure::Joined
            }
            Slot::Idle => {
                self.slot = Slot::Creating {
                    waiters: vec![waiter],
                };
                self.creations += 1;
                Ensure::Create
            }
        }
    }

    /// Record the outcome of the pending creation and release its waiters.
    ///
    /// On success the identifier is fixed for the rest of the session. On
    /// failure the lifecycle returns to `Idle` so the next `ensure` retries.
    /// Resolving when nothing is pending releases nothing and leaves a ready
    /// identifier untouched.
    pub fn resolve(&mut self, created: Option<String>) -> Vec<W> {
        let waiters = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Creating { waiters } => waiters,
            other => {
                self.slot = other;
                return Vec::new();
            }
        };

        if let Some(name) = created {
            self.slot = Slot::Ready(name);
        }
        waiters
    }
}
