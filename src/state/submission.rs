//! Move submission workflow.
//!
//! Turns a user gesture into either an immediate send or a pending action
//! that waits for the user to confirm it.
//!
//! # State Diagram
//!
//! ```text
//!                 gesture (no confirm mode, or premove)
//!        ┌─────────────────────────────────────────────▶ send
//!        │
//! ┌──────┴─┐  gesture (confirm mode)  ┌─────────────────┐
//! │  Idle  │─────────────────────────▶│ AwaitingConfirm │
//! └────────┘                          └───┬─────────┬───┘
//!      ▲                 submit(true)     │         │ submit(false) / cancel
//!      │                 ─▶ send          │         │ ─▶ revert board
//!      └──────────────────────────────────┴─────────┘
//! ```

use serde::Serialize;

use super::event::{ClientMessage, DropPayload, MovePayload};
use super::types::{Role, Square};

/// An action waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingAction {
    Move {
        orig: Square,
        dest: Square,
        promotion: Option<Role>,
    },
    Drop {
        role: Role,
        square: Square,
    },
}

impl PendingAction {
    pub fn to_message(&self) -> ClientMessage {
        match *self {
            Self::Move {
                orig,
                dest,
                promotion,
            } => ClientMessage::Move(MovePayload::new(orig, dest, promotion)),
            Self::Drop { role, square } => ClientMessage::Drop(DropPayload { role, pos: square }),
        }
    }
}

/// Workflow state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    AwaitingConfirm {
        action: PendingAction,
        /// Identifies this pending action to its delayed prompt.
        token: u64,
        /// Prompt has been shown.
        prompted: bool,
    },
}

/// What a gesture turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Send this right away.
    Send(ClientMessage),
    /// Wait for confirmation; show the prompt after the board animation.
    Defer { token: u64 },
}

/// Outcome of `submit` or `cancel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Committed(ClientMessage),
    Cancelled {
        /// A pending action was actually discarded.
        discarded: bool,
    },
}

/// The submit-then-confirm state machine.
#[derive(Debug, Clone, Default)]
pub struct MoveSubmission {
    state: SubmissionState,
    next_token: u64,
    /// A back-button handler is registered for the pending action.
    back_handler: bool,
}

impl MoveSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        match &self.state {
            SubmissionState::AwaitingConfirm { action, .. } => Some(action),
            SubmissionState::Idle => None,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending().is_some()
    }

    /// The confirmation prompt is on screen.
    pub fn is_prompted(&self) -> bool {
        matches!(
            self.state,
            SubmissionState::AwaitingConfirm { prompted: true, .. }
        )
    }

    pub fn has_back_handler(&self) -> bool {
        self.back_handler
    }

    /// Handle a legal gesture. Confirmation applies only when enabled and
    /// the gesture is not itself a premove or predrop.
    pub fn gesture(&mut self, action: PendingAction, confirm_mode: bool, premove: bool) -> Gesture {
        if !confirm_mode || premove {
            return Gesture::Send(action.to_message());
        }
        self.next_token += 1;
        let token = self.next_token;
        self.state = SubmissionState::AwaitingConfirm {
            action,
            token,
            prompted: false,
        };
        Gesture::Defer { token }
    }

    /// Mark the prompt for `token` as shown. Returns the action to display,
    /// or `None` if that action has since been resolved.
    pub fn prompt(&mut self, token: u64) -> Option<PendingAction> {
        match &mut self.state {
            SubmissionState::AwaitingConfirm {
                action,
                token: current,
                prompted,
            } if *current == token => {
                *prompted = true;
                Some(action.clone())
            }
            _ => None,
        }
    }

    /// Confirm (`true`) or reject (`false`) the pending action.
    pub fn submit(&mut self, confirm: bool) -> Resolution {
        match std::mem::take(&mut self.state) {
            SubmissionState::AwaitingConfirm { action, .. } if confirm => {
                Resolution::Committed(action.to_message())
            }
            SubmissionState::AwaitingConfirm { .. } => Resolution::Cancelled { discarded: true },
            SubmissionState::Idle => Resolution::Cancelled { discarded: false },
        }
    }

    /// Discard any pending action. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        matches!(self.submit(false), Resolution::Cancelled { discarded: true })
    }

    /// Register the back-button handler alongside a shown prompt. Returns
    /// false if one is already registered.
    pub fn register_back_handler(&mut self) -> bool {
        !std::mem::replace(&mut self.back_handler, true)
    }

    /// Release the back-button handler. Returns whether one was registered
    /// and must be popped.
    pub fn release_back_handler(&mut self) -> bool {
        std::mem::take(&mut self.back_handler)
    }
}
