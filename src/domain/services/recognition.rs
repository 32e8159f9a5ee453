#[cfg(test)]
#[path = "recognition_test.rs"]
mod tests;

use crate::domain::models::LinkEvent;
use crate::domain::models::LinkState;
use crate::domain::models::Notification;

/// Side effects the coordinator executes on behalf of the recognition
/// session manager: the manager itself never touches sockets or timers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionEffect {
    StartAudio,
    StopAudio,
    OpenLink,
    CloseLink,
    /// Schedule exactly one reconnect attempt after the configured delay.
    ArmReconnect,
    Notify(Notification),
    /// Final recognized speech, to be dispatched as a user chat turn.
    DispatchChat(String),
}

/// Lifecycle state machine for the speech recognition session: microphone
/// intent, link state and the single-shot reconnect arming. Driven by
/// discrete events; every event produces one state transition at most.
#[derive(Default)]
pub struct RecognitionManager {
    mic_requested: bool,
    link_state: LinkState,
    reconnect_armed: bool,
}

impl RecognitionManager {
    /// `config_error` carries the human-readable reason recognition cannot
    /// be configured, surfaced as a status rather than an abort: the
    /// microphone itself still starts, matching the capture-first behavior
    /// of the surrounding collaborators.
    pub fn start_mic(&mut self, config_error: Option<String>) -> Vec<RecognitionEffect> {
        if self.mic_requested {
            return vec![];
        }

        self.mic_requested = true;

        let mut effects = vec![RecognitionEffect::StartAudio];
        match config_error {
            Some(reason) => {
                effects.push(RecognitionEffect::Notify(Notification::StatusUpdate(reason)));
            }
            None => {
                self.link_state = LinkState::Connecting;
                effects.push(RecognitionEffect::OpenLink);
            }
        }
        effects.push(RecognitionEffect::Notify(Notification::StatusUpdate(
            "Recording...".to_string(),
        )));

        return effects;
    }

    pub fn stop_mic(&mut self) -> Vec<RecognitionEffect> {
        self.mic_requested = false;
        self.reconnect_armed = false;

        let mut effects = vec![RecognitionEffect::StopAudio];
        if self.link_state != LinkState::Disconnected {
            effects.push(RecognitionEffect::CloseLink);
        }
        effects.push(RecognitionEffect::Notify(Notification::StatusUpdate(
            "Recording stopped".to_string(),
        )));

        return effects;
    }

    pub fn handle_link(&mut self, event: LinkEvent) -> Vec<RecognitionEffect> {
        match event {
            LinkEvent::Opened => {
                self.link_state = LinkState::Open;
                if !self.mic_requested {
                    return vec![];
                }

                return vec![RecognitionEffect::Notify(Notification::StatusUpdate(
                    "Speech recognition ready".to_string(),
                ))];
            }
            LinkEvent::Closed { code } => {
                tracing::info!(code = ?code, "recognition link closed");
                self.link_state = LinkState::Disconnected;
                if !self.mic_requested || self.reconnect_armed {
                    return vec![];
                }

                self.reconnect_armed = true;

                return vec![
                    RecognitionEffect::Notify(Notification::StatusUpdate(
                        "Speech link dropped, reconnecting...".to_string(),
                    )),
                    RecognitionEffect::ArmReconnect,
                ];
            }
            LinkEvent::Failed(err) => {
                return vec![RecognitionEffect::Notify(Notification::StatusUpdate(
                    format!("Speech recognition connection failed: {err}"),
                ))];
            }
            LinkEvent::Ack => {
                tracing::debug!("recognition relay acknowledged");
                return vec![];
            }
            LinkEvent::RemoteError(err) => {
                // The relay reported a recognition error; the link stays up.
                return vec![RecognitionEffect::Notify(Notification::StatusUpdate(
                    format!("Recognition error: {err}"),
                ))];
            }
            LinkEvent::Transcript { text, is_final } => {
                if is_final {
                    return vec![
                        RecognitionEffect::Notify(Notification::UserSpeech(text.to_string())),
                        RecognitionEffect::DispatchChat(text),
                    ];
                }

                return vec![RecognitionEffect::Notify(Notification::AsrPartial(text))];
            }
        }
    }

    /// The armed reconnect delay elapsed. Only reopens when the microphone
    /// is still wanted and nothing reconnected in the meantime.
    pub fn reconnect_due(&mut self) -> Vec<RecognitionEffect> {
        self.reconnect_armed = false;
        if !self.mic_requested || self.link_state != LinkState::Disconnected {
            return vec![];
        }

        self.link_state = LinkState::Connecting;

        return vec![RecognitionEffect::OpenLink];
    }

    pub fn link_open(&self) -> bool {
        return self.link_state == LinkState::Open;
    }

    pub fn mic_requested(&self) -> bool {
        return self.mic_requested;
    }
}
