use std::time::Duration;
use std::time::Instant;

use super::Begin;
use super::ChatDispatcher;
use crate::domain::models::TurnOrigin;

impl ChatDispatcher {
    fn backdate(&mut self, elapsed: Duration) {
        self.started_at = Some(Instant::now() - elapsed);
    }
}

#[test]
fn it_enforces_single_flight() {
    let mut dispatcher = ChatDispatcher::default();

    assert_eq!(dispatcher.begin("hello", TurnOrigin::User), Begin::Started);
    assert!(dispatcher.in_flight());

    assert_eq!(dispatcher.begin("again", TurnOrigin::User), Begin::Queued);
    assert!(dispatcher.in_flight());
}

#[test]
fn it_drops_proactive_turns_while_in_flight() {
    let mut dispatcher = ChatDispatcher::default();

    assert_eq!(dispatcher.begin("hello", TurnOrigin::User), Begin::Started);
    assert_eq!(
        dispatcher.begin("say something", TurnOrigin::Proactive),
        Begin::Dropped
    );

    // The dropped turn must not occupy the pending slot.
    assert_eq!(dispatcher.finish(), None);
}

#[test]
fn it_keeps_only_the_latest_queued_message() {
    let mut dispatcher = ChatDispatcher::default();

    assert_eq!(dispatcher.begin("first", TurnOrigin::User), Begin::Started);
    assert_eq!(dispatcher.begin("A", TurnOrigin::User), Begin::Queued);
    assert_eq!(dispatcher.begin("B", TurnOrigin::User), Begin::Queued);

    assert_eq!(dispatcher.finish(), Some("B".to_string()));
    assert!(!dispatcher.in_flight());
}

#[test]
fn it_clears_state_on_finish() {
    let mut dispatcher = ChatDispatcher::default();

    dispatcher.begin("hello", TurnOrigin::User);
    assert_eq!(dispatcher.finish(), None);
    assert!(!dispatcher.in_flight());

    // A fresh turn may start right away.
    assert_eq!(dispatcher.begin("next", TurnOrigin::Proactive), Begin::Started);
}

#[test]
fn it_force_clears_stuck_turns() {
    let mut dispatcher = ChatDispatcher::default();

    dispatcher.begin("hello", TurnOrigin::User);
    assert!(!dispatcher.force_clear_if_stuck(Duration::from_secs(60)));
    assert!(dispatcher.in_flight());

    dispatcher.backdate(Duration::from_secs(61));
    assert!(dispatcher.force_clear_if_stuck(Duration::from_secs(60)));
    assert!(!dispatcher.in_flight());
}

#[test]
fn it_does_not_flag_idle_dispatcher_as_stuck() {
    let mut dispatcher = ChatDispatcher::default();
    assert!(!dispatcher.force_clear_if_stuck(Duration::from_millis(0)));
}

#[test]
fn it_drops_pending_on_reset() {
    let mut dispatcher = ChatDispatcher::default();

    dispatcher.begin("hello", TurnOrigin::User);
    dispatcher.begin("queued", TurnOrigin::User);
    dispatcher.reset();

    assert!(!dispatcher.in_flight());
    assert_eq!(dispatcher.finish(), None);
}
