use super::RecognitionEffect;
use super::RecognitionManager;
use crate::domain::models::LinkEvent;
use crate::domain::models::Notification;

fn opened(manager: &mut RecognitionManager) {
    manager.start_mic(None);
    manager.handle_link(LinkEvent::Opened);
}

#[test]
fn it_starts_audio_and_opens_the_link() {
    let mut manager = RecognitionManager::default();

    let effects = manager.start_mic(None);
    assert!(effects.contains(&RecognitionEffect::StartAudio));
    assert!(effects.contains(&RecognitionEffect::OpenLink));
    assert!(manager.mic_requested());

    // Second request is a no-op.
    assert!(manager.start_mic(None).is_empty());
}

#[test]
fn it_surfaces_missing_credentials_without_opening_a_link() {
    let mut manager = RecognitionManager::default();

    let effects = manager.start_mic(Some("recognition credentials missing".to_string()));
    assert!(effects.contains(&RecognitionEffect::StartAudio));
    assert!(!effects.contains(&RecognitionEffect::OpenLink));
    assert!(effects.iter().any(|effect| {
        return matches!(effect, RecognitionEffect::Notify(Notification::StatusUpdate(_)));
    }));
}

#[test]
fn it_arms_exactly_one_reconnect_per_closure() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    let effects = manager.handle_link(LinkEvent::Closed { code: None });
    assert!(effects.contains(&RecognitionEffect::ArmReconnect));

    // A duplicate closure event while armed does not arm another.
    let effects = manager.handle_link(LinkEvent::Closed { code: None });
    assert!(!effects.contains(&RecognitionEffect::ArmReconnect));

    // Firing the timer reopens once.
    assert_eq!(manager.reconnect_due(), vec![RecognitionEffect::OpenLink]);
}

#[test]
fn it_leaves_no_reconnect_pending_after_an_early_stop() {
    let mut manager = RecognitionManager::default();

    // Stop before the link ever reached open.
    manager.start_mic(None);
    let effects = manager.stop_mic();
    assert!(effects.contains(&RecognitionEffect::CloseLink));
    assert!(!manager.mic_requested());

    // The close lands afterwards; nothing should be armed.
    let effects = manager.handle_link(LinkEvent::Closed { code: Some(1000) });
    assert!(!effects.contains(&RecognitionEffect::ArmReconnect));
    assert!(manager.reconnect_due().is_empty());
}

#[test]
fn it_does_not_reconnect_when_the_mic_stopped_while_armed() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    manager.handle_link(LinkEvent::Closed { code: None });
    manager.stop_mic();

    assert!(manager.reconnect_due().is_empty());
}

#[test]
fn it_routes_final_transcripts_to_chat() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    let effects = manager.handle_link(LinkEvent::Transcript {
        text: "turn left here".to_string(),
        is_final: true,
    });

    assert_eq!(
        effects,
        vec![
            RecognitionEffect::Notify(Notification::UserSpeech("turn left here".to_string())),
            RecognitionEffect::DispatchChat("turn left here".to_string()),
        ]
    );
}

#[test]
fn it_shows_partial_transcripts_without_dispatching() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    let effects = manager.handle_link(LinkEvent::Transcript {
        text: "turn le".to_string(),
        is_final: false,
    });

    assert_eq!(
        effects,
        vec![RecognitionEffect::Notify(Notification::AsrPartial(
            "turn le".to_string()
        ))]
    );
}

#[test]
fn it_keeps_the_link_open_on_remote_errors() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    let effects = manager.handle_link(LinkEvent::RemoteError("decode failed".to_string()));
    assert!(effects.iter().all(|effect| {
        return matches!(effect, RecognitionEffect::Notify(_));
    }));
    assert!(manager.link_open());
}

#[test]
fn it_treats_acknowledgments_as_noops() {
    let mut manager = RecognitionManager::default();
    opened(&mut manager);

    assert!(manager.handle_link(LinkEvent::Ack).is_empty());
    assert!(manager.link_open());
}
