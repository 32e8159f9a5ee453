#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

use crate::domain::models::TurnOrigin;

/// What happened to a dispatch attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Begin {
    /// Nothing was in flight; the caller must now run the turn and report
    /// back through [`ChatDispatcher::finish`].
    Started,
    /// A turn is in flight and the text was user-originated: it took over
    /// the single pending slot.
    Queued,
    /// A turn is in flight and the text was proactive: discarded.
    Dropped,
}

/// Single-flight discipline over chat turns. At most one turn is in flight
/// at any instant, and at most one user message waits in the pending slot
/// (last writer wins). All calls come from the coordinator's own loop, so no
/// further locking is needed.
#[derive(Default)]
pub struct ChatDispatcher {
    processing: bool,
    started_at: Option<Instant>,
    pending: Option<String>,
}

impl ChatDispatcher {
    pub fn begin(&mut self, text: &str, origin: TurnOrigin) -> Begin {
        if self.processing {
            if origin == TurnOrigin::User {
                self.pending = Some(text.to_string());
                return Begin::Queued;
            }

            return Begin::Dropped;
        }

        self.processing = true;
        self.started_at = Some(Instant::now());

        return Begin::Started;
    }

    /// Completion of the in-flight turn, on success, failure or
    /// cancellation. Returns the queued user message, if any, which the
    /// caller must immediately re-dispatch.
    pub fn finish(&mut self) -> Option<String> {
        self.processing = false;
        self.started_at = None;

        return self.pending.take();
    }

    pub fn in_flight(&self) -> bool {
        return self.processing;
    }

    /// Safety valve for a completion callback that never ran: force-clears
    /// the in-flight flag once it has been set for longer than `threshold`.
    /// The pending slot is left alone.
    pub fn force_clear_if_stuck(&mut self, threshold: Duration) -> bool {
        if !self.processing {
            return false;
        }

        let stuck = match self.started_at {
            Some(started_at) => started_at.elapsed() > threshold,
            None => true,
        };

        if stuck {
            self.processing = false;
            self.started_at = None;
        }

        return stuck;
    }

    /// Session teardown: drops both the in-flight flag and the pending slot.
    pub fn reset(&mut self) {
        self.processing = false;
        self.started_at = None;
        self.pending = None;
    }
}
