//! Outcome types of a matching pass.

use serde::Serialize;

/// What happened to one pending request during a matching pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MatchOutcome {
    /// Donation claimed for the requester and request marked fulfilled
    Fulfilled { request_id: i32, donation_id: i32 },
    /// Request has no meal preferences
    NoPreferences { request_id: i32 },
    /// No unclaimed donation matches the preferences yet
    NoMatch { request_id: i32 },
    /// The selected donation was claimed by someone else first
    LostRace { request_id: i32, donation_id: i32 },
    /// The request left the pending state while this pass was working on it
    AlreadyResolved { request_id: i32 },
    /// A store error aborted this request's transaction
    Failed { request_id: i32, error: String },
}

impl MatchOutcome {
    pub fn request_id(&self) -> i32 {
        match self {
            MatchOutcome::Fulfilled { request_id, .. }
            | MatchOutcome::NoPreferences { request_id }
            | MatchOutcome::NoMatch { request_id }
            | MatchOutcome::LostRace { request_id, .. }
            | MatchOutcome::AlreadyResolved { request_id }
            | MatchOutcome::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, MatchOutcome::Fulfilled { .. })
    }
}

/// Per-request outcomes of one matching pass, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub outcomes: Vec<MatchOutcome>,
}

impl MatchReport {
    pub fn push(&mut self, outcome: MatchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn fulfilled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_fulfilled()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MatchOutcome::Failed { .. }))
            .count()
    }

    /// Requests whose chosen donation went to someone else first
    pub fn lost_race_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MatchOutcome::LostRace { .. }))
            .count()
    }

    /// Outcome recorded for a given request, if it was visited
    pub fn outcome_for(&self, request_id: i32) -> Option<&MatchOutcome> {
        self.outcomes.iter().find(|o| o.request_id() == request_id)
    }

    /// A pass that visited nothing or changed nothing
    pub fn is_noop(&self) -> bool {
        self.fulfilled_count() == 0
    }
}
