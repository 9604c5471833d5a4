//! The interactive accept/edit/regenerate session as an explicit state
//! machine.
//!
//! Keeping the transitions in a pure struct, with the terminal I/O behind
//! the [`Interact`] seam, lets the accept/edit/regenerate/cancel contract
//! be tested without a terminal.

pub mod interact;

use crate::message::CommitMessage;

pub use interact::{Interact, TerminalInteract};

/// Default bound on consecutive regenerations.
pub const DEFAULT_MAX_REGENERATIONS: u32 = 3;

/// Session states. `Accepted` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Draft,
    Presented,
    Accepted,
    Editing,
    Regenerating,
    Cancelled,
}

/// Operator decisions offered at the `Presented` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Edit,
    Regenerate,
    Cancel,
}

/// One interactive session over a single pipeline invocation.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    draft: Option<CommitMessage>,
    rejected: Vec<CommitMessage>,
    regenerations: u32,
    max_regenerations: u32,
    force: bool,
}

impl Session {
    /// Start a session that expects a machine-generated draft.
    pub fn new(max_regenerations: u32, force: bool) -> Self {
        Self {
            state: SessionState::Draft,
            draft: None,
            rejected: Vec::new(),
            regenerations: 0,
            max_regenerations,
            force,
        }
    }

    /// Start a session with an operator-supplied message, already in
    /// `Presented`. Used by manual mode and by the manual fallback after
    /// persistent parse failures.
    pub fn manual(message: Option<CommitMessage>) -> Self {
        Self {
            state: SessionState::Presented,
            draft: message,
            rejected: Vec::new(),
            regenerations: 0,
            max_regenerations: 0,
            force: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn draft(&self) -> Option<&CommitMessage> {
        self.draft.as_ref()
    }

    /// Drafts the operator has turned down so far, oldest first.
    pub fn rejected(&self) -> &[CommitMessage] {
        &self.rejected
    }

    pub fn regenerations(&self) -> u32 {
        self.regenerations
    }

    /// Install a machine-generated draft.
    ///
    /// In force mode the draft is accepted directly, never visiting
    /// `Presented`.
    pub fn receive_draft(&mut self, message: CommitMessage) {
        debug_assert!(matches!(
            self.state,
            SessionState::Draft | SessionState::Regenerating
        ));
        self.draft = Some(message);
        self.state = if self.force {
            SessionState::Accepted
        } else {
            SessionState::Draft
        };
    }

    /// Show the draft to the operator: `Draft` → `Presented`.
    pub fn present(&mut self) {
        debug_assert_eq!(self.state, SessionState::Draft);
        self.state = SessionState::Presented;
    }

    /// Apply an operator decision at `Presented`.
    ///
    /// A regenerate request past the configured bound forces terminal
    /// `Cancelled` instead.
    pub fn decide(&mut self, decision: Decision) {
        debug_assert_eq!(self.state, SessionState::Presented);
        self.state = match decision {
            Decision::Accept => SessionState::Accepted,
            Decision::Edit => SessionState::Editing,
            Decision::Regenerate => {
                if self.regenerations >= self.max_regenerations {
                    self.draft = None;
                    SessionState::Cancelled
                } else {
                    self.regenerations += 1;
                    if let Some(rejected) = self.draft.take() {
                        self.rejected.push(rejected);
                    }
                    SessionState::Regenerating
                }
            }
            Decision::Cancel => {
                self.draft = None;
                SessionState::Cancelled
            }
        };
    }

    /// Install the operator's replacement message: `Editing` → `Presented`.
    pub fn submit_edit(&mut self, message: CommitMessage) {
        debug_assert_eq!(self.state, SessionState::Editing);
        self.draft = Some(message);
        self.state = SessionState::Presented;
    }

    /// Abort from any interactive state, discarding the draft.
    pub fn cancel(&mut self) {
        self.draft = None;
        self.state = SessionState::Cancelled;
    }

    /// Take the accepted message out of a terminal `Accepted` session.
    pub fn into_accepted(self) -> Option<CommitMessage> {
        match self.state {
            SessionState::Accepted => self.draft,
            _ => None,
        }
    }
}
