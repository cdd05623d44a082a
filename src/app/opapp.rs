//! Operator application lifecycle states and their legal transitions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpAppState {
    Foreground,
    Background,
    Transient,
    OverlaidForeground,
    OverlaidTransient,
}

impl OpAppState {
    pub const ALL: [OpAppState; 5] = [
        OpAppState::Foreground,
        OpAppState::Background,
        OpAppState::Transient,
        OpAppState::OverlaidForeground,
        OpAppState::OverlaidTransient,
    ];

    /// Name reported to lifecycle listeners.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpAppState::Foreground => "foreground",
            OpAppState::Background => "background",
            OpAppState::Transient => "transient",
            OpAppState::OverlaidForeground => "overlaid-foreground",
            OpAppState::OverlaidTransient => "overlaid-transient",
        }
    }

    pub fn is_overlaid(&self) -> bool {
        matches!(self, OpAppState::OverlaidForeground | OpAppState::OverlaidTransient)
    }

    /// Transient states run the countdown back to background.
    pub fn is_transient(&self) -> bool {
        matches!(self, OpAppState::Transient | OpAppState::OverlaidTransient)
    }
}

impl fmt::Display for OpAppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legality table for requested transitions. Staying put is always legal.
pub fn can_transition(from: OpAppState, to: OpAppState) -> bool {
    use OpAppState::*;
    if from == to {
        return true;
    }
    match from {
        Foreground => matches!(to, Background | Transient),
        Transient | OverlaidTransient | OverlaidForeground => matches!(to, Foreground | Background),
        Background => false,
    }
}

/// Result of asking the state machine to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRequest {
    /// Already in the requested state.
    Unchanged,
    Changed {
        previous: OpAppState,
        next: OpAppState,
    },
    Rejected,
}

impl StateRequest {
    pub fn accepted(&self) -> bool {
        !matches!(self, StateRequest::Rejected)
    }
}

/// Evaluate a state request. Overlaid targets are never requestable.
pub fn request(current: OpAppState, target: OpAppState) -> StateRequest {
    if target.is_overlaid() || !can_transition(current, target) {
        StateRequest::Rejected
    } else if current == target {
        StateRequest::Unchanged
    } else {
        StateRequest::Changed {
            previous: current,
            next: target,
        }
    }
}

/// The state presentation moves the application to when another surface
/// starts (`overlaid == true`) or stops covering it. `None` when the overlay
/// does not apply to `current`.
pub fn overlay_target(current: OpAppState, overlaid: bool) -> Option<OpAppState> {
    use OpAppState::*;
    match (current, overlaid) {
        (Foreground, true) => Some(OverlaidForeground),
        (Transient, true) => Some(OverlaidTransient),
        (OverlaidForeground, false) => Some(Foreground),
        (OverlaidTransient, false) => Some(Transient),
        _ => None,
    }
}
