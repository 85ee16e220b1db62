//! The visitor workflow as a plain state machine.
//!
//! Each state carries the session guard it requires. Handlers check the guard
//! on every request instead of trusting where the visitor came from, so a
//! replayed or bookmarked URL without a session always lands back on `/`.

use crate::session::Visit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Landing,
    Naming,
    Question,
    Accept,
    Message,
    Submission,
    Thanked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    None,
    HasName,
    HasUserId,
}

impl Guard {
    pub fn holds(self, visit: &Visit) -> bool {
        match self {
            Guard::None => true,
            Guard::HasName => visit.name.is_some(),
            Guard::HasUserId => visit.user_id.is_some(),
        }
    }
}

impl FlowState {
    pub const ALL: [FlowState; 7] = [
        FlowState::Landing,
        FlowState::Naming,
        FlowState::Question,
        FlowState::Accept,
        FlowState::Message,
        FlowState::Submission,
        FlowState::Thanked,
    ];

    pub fn guard(self) -> Guard {
        use FlowState::*;
        match self {
            Landing | Naming => Guard::None,
            Question | Message => Guard::HasName,
            Accept | Submission | Thanked => Guard::HasUserId,
        }
    }

    pub fn admits(self, visit: &Visit) -> bool {
        self.guard().holds(visit)
    }

    /// The state a successful step leads to. `Thanked` is terminal.
    pub fn next(self) -> Option<FlowState> {
        use FlowState::*;
        match self {
            Landing => Some(Naming),
            Naming => Some(Question),
            Question => Some(Accept),
            Accept => Some(Message),
            Message => Some(Submission),
            Submission => Some(Thanked),
            Thanked => None,
        }
    }

    /// Route serving this state. `Thanked` is rendered by `Submission` and has none.
    pub fn path(self) -> Option<&'static str> {
        use FlowState::*;
        match self {
            Landing => Some("/"),
            Naming => Some("/submit-name"),
            Question => Some("/question"),
            Accept => Some("/accept"),
            Message => Some("/message"),
            Submission => Some("/submit-message"),
            Thanked => None,
        }
    }

    /// Where a visitor ends up when the state rejects them.
    pub fn fallback(self) -> FlowState {
        FlowState::Landing
    }
}

/// Trims form input; `None` when nothing is left.
pub fn trim_input(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
