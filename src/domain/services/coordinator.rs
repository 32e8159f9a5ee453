#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use tokio::sync::mpsc;
use tokio::time;
use uuid::Uuid;

use super::Begin;
use super::ChatDispatcher;
use super::RecognitionEffect;
use super::RecognitionManager;
use super::ScreenshotCadence;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AudioBox;
use crate::domain::models::CaptureBox;
use crate::domain::models::ChatTurn;
use crate::domain::models::CompanionError;
use crate::domain::models::LinkCommand;
use crate::domain::models::LinkEvent;
use crate::domain::models::Notification;
use crate::domain::models::PersistedState;
use crate::domain::models::Request;
use crate::domain::models::Session;
use crate::domain::models::StateStoreBox;
use crate::domain::models::TurnOrigin;
use crate::infrastructure::chat::ChatClient;
use crate::infrastructure::recognition::LinkSettings;
use crate::infrastructure::recognition::RecognitionLink;

/// Sent once shortly after the session starts, giving the surface time to
/// attach before the first assistant message arrives.
pub const INIT_PROMPT: &str = "The session just started. Say hello and introduce yourself briefly.";

/// Sent every time the screenshot counter reaches the proactive threshold.
pub const PROACTIVE_PROMPT: &str = "Based on what you just saw on screen, chat with me about it.";

enum InternalEvent {
    InitialChatDue,
    ChatFinished,
    ScreenshotDone(bool),
    ReconnectDue,
}

/// The long-lived root of the session. Owns the session identity and every
/// piece of mutable state, and serializes all transitions through its own
/// select loop: worker tasks (chat turns, screenshot uploads, the
/// recognition link) only report back via channels.
pub struct SessionCoordinator {
    session: Session,
    dispatcher: ChatDispatcher,
    cadence: ScreenshotCadence,
    recognition: RecognitionManager,
    capture: CaptureBox,
    audio: AudioBox,
    store: StateStoreBox,
    notify_tx: mpsc::UnboundedSender<Notification>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: Option<mpsc::UnboundedReceiver<InternalEvent>>,
    link_event_tx: mpsc::UnboundedSender<LinkEvent>,
    link_event_rx: Option<mpsc::UnboundedReceiver<LinkEvent>>,
    link_tx: Option<mpsc::UnboundedSender<LinkCommand>>,
}

impl SessionCoordinator {
    pub fn new(
        capture: CaptureBox,
        audio: AudioBox,
        store: StateStoreBox,
        notify_tx: mpsc::UnboundedSender<Notification>,
    ) -> SessionCoordinator {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel::<InternalEvent>();
        let (link_event_tx, link_event_rx) = mpsc::unbounded_channel::<LinkEvent>();

        return SessionCoordinator {
            session: Session::default(),
            dispatcher: ChatDispatcher::default(),
            cadence: ScreenshotCadence::default(),
            recognition: RecognitionManager::default(),
            capture,
            audio,
            store,
            notify_tx,
            internal_tx,
            internal_rx: Some(internal_rx),
            link_event_tx,
            link_event_rx: Some(link_event_rx),
            link_tx: None,
        };
    }

    pub async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) -> Result<()> {
        let mut internal_rx = match self.internal_rx.take() {
            Some(rx) => rx,
            None => bail!("coordinator is already running"),
        };
        let mut link_event_rx = match self.link_event_rx.take() {
            Some(rx) => rx,
            None => bail!("coordinator is already running"),
        };

        self.restore().await;
        let mut cadence_timer = Self::cadence_interval();

        loop {
            tokio::select! {
                req = requests.recv() => match req {
                    Some(req) => {
                        let was_running = self.session.running;
                        self.handle_request(req).await;
                        if !was_running && self.session.running {
                            cadence_timer = Self::cadence_interval();
                        }
                    }
                    None => break,
                },
                event = internal_rx.recv() => {
                    if let Some(event) = event {
                        self.handle_internal(event).await;
                    }
                },
                event = link_event_rx.recv() => {
                    if let Some(event) = event {
                        let effects = self.recognition.handle_link(event);
                        self.apply_recognition_effects(effects).await;
                    }
                },
                _ = cadence_timer.tick() => self.handle_tick(),
            }
        }

        return Ok(());
    }

    /// Reloads the persisted identity so a restarted process resumes the
    /// same remote conversation, including restarting a session that was
    /// running when the process went away.
    async fn restore(&mut self) {
        match self.store.load().await {
            Ok(state) => {
                if !state.context_id.is_empty() {
                    self.session.context_id = state.context_id;
                }
                if state.is_running {
                    tracing::info!("resuming previous session");
                    if let Err(err) = self.start().await {
                        tracing::warn!(error = %err, "could not resume session");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not load persisted state");
            }
        }
    }

    async fn start(&mut self) -> Result<(), CompanionError> {
        if self.session.running {
            return Ok(());
        }

        if Config::get(ConfigKey::ServerHost).is_empty() {
            return Err(CompanionError::Config(
                "server host is not configured".to_string(),
            ));
        }

        if self.session.context_id.is_empty() {
            self.session.context_id = Uuid::new_v4().to_string();
        }
        self.session.running = true;
        self.cadence.reset();
        self.persist().await;

        tracing::info!(context_id = %self.session.context_id, "session started");
        self.notify(Notification::ShowPanel);

        // Give the surface a moment to attach before the opening turn.
        let delay = Duration::from_millis(Config::get_number(ConfigKey::InitialChatDelay));
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = internal_tx.send(InternalEvent::InitialChatDue);
        });

        return Ok(());
    }

    async fn stop(&mut self) {
        self.session.running = false;
        self.session.context_id.clear();
        self.persist().await;

        let effects = self.recognition.stop_mic();
        self.apply_recognition_effects(effects).await;

        self.dispatcher.reset();
        self.cadence.reset();

        self.notify(Notification::HidePanel);
        self.notify(Notification::StatusUpdate("Stopped".to_string()));
        tracing::info!("session stopped");
    }

    async fn persist(&mut self) {
        let state = PersistedState {
            context_id: self.session.context_id.to_string(),
            is_running: self.session.running,
        };

        if let Err(err) = self.store.save(&state).await {
            tracing::warn!(error = %err, "could not persist session state");
        }
    }

    async fn handle_request(&mut self, req: Request) {
        match req {
            Request::Start => {
                if let Err(err) = self.start().await {
                    tracing::warn!(error = %err, "session start refused");
                    self.notify(Notification::StatusUpdate(
                        "Server address is not configured, set it before starting".to_string(),
                    ));
                }
            }
            Request::Stop => self.stop().await,
            Request::ConfigUpdated(values) => self.apply_config(values),
            Request::MicStart => {
                let effects = self.recognition.start_mic(Self::recognition_config_error());
                self.apply_recognition_effects(effects).await;
            }
            Request::MicStop => {
                let effects = self.recognition.stop_mic();
                self.apply_recognition_effects(effects).await;
            }
            Request::SendText(text) => {
                let trimmed = text.trim().to_string();
                if !trimmed.is_empty() {
                    self.dispatch_chat(&trimmed, TurnOrigin::User);
                }
            }
            Request::AudioChunk(pcm) => self.forward_audio(pcm),
        }
    }

    async fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::InitialChatDue => {
                if self.session.running {
                    self.dispatch_chat(INIT_PROMPT, TurnOrigin::Proactive);
                }
            }
            InternalEvent::ChatFinished => {
                self.notify(Notification::StatusUpdate("".to_string()));
                if let Some(next) = self.dispatcher.finish() {
                    tracing::info!(text = %next, "dispatching queued user message");
                    self.dispatch_chat(&next, TurnOrigin::User);
                }
            }
            InternalEvent::ScreenshotDone(success) => self.handle_screenshot_done(success),
            InternalEvent::ReconnectDue => {
                let effects = self.recognition.reconnect_due();
                self.apply_recognition_effects(effects).await;
            }
        }
    }

    fn handle_screenshot_done(&mut self, success: bool) {
        if !self.session.running {
            self.cadence.finish_capture(false, 0);
            return;
        }

        // Safety valve for a chat completion that never reported back.
        let stuck_threshold = Duration::from_millis(Config::get_number(ConfigKey::ChatStuckTimeout));
        if self.dispatcher.force_clear_if_stuck(stuck_threshold) {
            tracing::warn!("in-flight chat state was stuck, force cleared");
        }

        let threshold = Config::get_number(ConfigKey::ProactiveThreshold) as u32;
        if self.cadence.finish_capture(success, threshold) && !self.dispatcher.in_flight() {
            tracing::info!("proactive chat threshold reached");
            self.dispatch_chat(PROACTIVE_PROMPT, TurnOrigin::Proactive);
        }
    }

    fn handle_tick(&mut self) {
        if !self.session.running {
            return;
        }
        if !self.cadence.begin_capture() {
            tracing::debug!("capture still in flight, skipping tick");
            return;
        }

        let capture = self.capture.clone();
        let context_id = self.session.context_id.to_string();
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let success = upload_screenshot(capture, &context_id).await;
            let _ = internal_tx.send(InternalEvent::ScreenshotDone(success));
        });
    }

    fn dispatch_chat(&mut self, text: &str, origin: TurnOrigin) {
        if !self.session.running || self.session.context_id.is_empty() {
            self.notify(Notification::StatusUpdate(
                "Session is not running, start it first".to_string(),
            ));
            return;
        }

        match self.dispatcher.begin(text, origin) {
            Begin::Queued => {
                tracing::info!(text = text, "user message queued behind in-flight turn");
                self.notify(Notification::StatusUpdate(
                    "Message queued, sending shortly...".to_string(),
                ));
            }
            Begin::Dropped => {
                tracing::debug!("proactive turn dropped, chat already in flight");
            }
            Begin::Started => {
                self.notify(Notification::StatusUpdate("Thinking...".to_string()));

                let turn = ChatTurn::text(text);
                let context_id = self.session.context_id.to_string();
                let notify_tx = self.notify_tx.clone();
                let internal_tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    run_chat_turn(turn, &context_id, &notify_tx).await;
                    let _ = internal_tx.send(InternalEvent::ChatFinished);
                });
            }
        }
    }

    async fn apply_recognition_effects(&mut self, effects: Vec<RecognitionEffect>) {
        for effect in effects {
            match effect {
                RecognitionEffect::StartAudio => {
                    if let Err(err) = self.audio.start().await {
                        tracing::warn!(error = %err, "audio source failed to start");
                    }
                }
                RecognitionEffect::StopAudio => {
                    if let Err(err) = self.audio.stop().await {
                        tracing::warn!(error = %err, "audio source failed to stop");
                    }
                }
                RecognitionEffect::OpenLink => self.open_link(),
                RecognitionEffect::CloseLink => {
                    if let Some(link_tx) = self.link_tx.take() {
                        let _ = link_tx.send(LinkCommand::Close);
                    }
                }
                RecognitionEffect::ArmReconnect => {
                    let delay =
                        Duration::from_millis(Config::get_number(ConfigKey::AsrReconnectDelay));
                    let internal_tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        time::sleep(delay).await;
                        let _ = internal_tx.send(InternalEvent::ReconnectDue);
                    });
                }
                RecognitionEffect::Notify(notification) => self.notify(notification),
                RecognitionEffect::DispatchChat(text) => {
                    self.dispatch_chat(&text, TurnOrigin::User)
                }
            }
        }
    }

    fn open_link(&mut self) {
        let (link_tx, link_rx) = mpsc::unbounded_channel::<LinkCommand>();
        self.link_tx = Some(link_tx);
        RecognitionLink::spawn(
            LinkSettings::from_config(),
            self.link_event_tx.clone(),
            link_rx,
        );
    }

    fn forward_audio(&mut self, pcm: Vec<u8>) {
        if !self.recognition.link_open() {
            // Never buffered: stale audio must not replay after a reconnect.
            tracing::warn!(
                bytes = pcm.len(),
                "recognition link not open, dropping audio chunk"
            );
            return;
        }

        if let Some(link_tx) = &self.link_tx {
            let _ = link_tx.send(LinkCommand::Audio(pcm));
        }
    }

    fn apply_config(&mut self, values: HashMap<String, String>) {
        for (name, value) in values {
            match Config::parse_key(&name) {
                Some(key) => Config::set(key, &value),
                None => tracing::warn!(key = name, "ignoring unknown config key"),
            }
        }
    }

    fn recognition_config_error() -> Option<String> {
        if Config::get(ConfigKey::AsrAppId).is_empty()
            || Config::get(ConfigKey::AsrAccessToken).is_empty()
        {
            return Some(
                "Speech recognition credentials are not configured, set the app id and access token"
                    .to_string(),
            );
        }
        if Config::get(ConfigKey::ServerHost).is_empty() {
            return Some(
                "Server address is not configured, set it before using the microphone".to_string(),
            );
        }

        return None;
    }

    fn cadence_interval() -> time::Interval {
        let secs = Config::get_number(ConfigKey::ScreenshotInterval).max(1);
        let period = Duration::from_secs(secs);

        return time::interval_at(time::Instant::now() + period, period);
    }

    fn notify(&self, notification: Notification) {
        if self.notify_tx.send(notification).is_err() {
            tracing::warn!("notification channel closed, dropping update");
        }
    }
}

async fn upload_screenshot(capture: CaptureBox, context_id: &str) -> bool {
    let image = match capture.capture().await {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!(error = %err, "screen capture failed");
            return false;
        }
    };

    let turn = ChatTurn::screenshot(b64.encode(image));
    match ChatClient::from_config().send_turn(&turn, context_id).await {
        Ok(_) => {
            tracing::debug!("screenshot uploaded");
            return true;
        }
        Err(err) => {
            tracing::error!(error = %err, "screenshot upload failed");
            return false;
        }
    }
}

async fn run_chat_turn(
    turn: ChatTurn,
    context_id: &str,
    notify_tx: &mpsc::UnboundedSender<Notification>,
) {
    let timeout_ms = Config::get_number(ConfigKey::ChatTimeout);
    let client = ChatClient::from_config();
    let res = time::timeout(
        Duration::from_millis(timeout_ms),
        client.send_turn(&turn, context_id),
    )
    .await;

    match res {
        Err(_) => {
            let err = CompanionError::Timeout(timeout_ms);
            tracing::error!(error = %err, "chat request timed out");
            let _ = notify_tx.send(Notification::StatusUpdate(
                "Request timed out, check the server status".to_string(),
            ));
        }
        Ok(Err(CompanionError::Transport { status })) => {
            tracing::error!(status, "chat request failed");
            let _ = notify_tx.send(Notification::AiResponse(format!(
                "[Request failed] HTTP {status}, check that the server is running"
            )));
            let _ = notify_tx.send(Notification::StatusUpdate(format!(
                "Request failed: HTTP {status}"
            )));
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "chat request errored");
            let _ = notify_tx.send(Notification::AiResponse(format!(
                "[Connection failed] {err}, check the server address and port"
            )));
            let _ = notify_tx.send(Notification::StatusUpdate(format!("Network error: {err}")));
        }
        Ok(Ok(reply)) => {
            if !reply.transcript.is_empty() {
                let _ = notify_tx.send(Notification::AiResponse(reply.transcript.to_string()));
            }
            if !reply.audio_fragments.is_empty() {
                let _ = notify_tx.send(Notification::PlayAudio(reply.joined_audio()));
            }
            if reply.is_empty() {
                tracing::warn!("server returned an empty reply");
                let _ = notify_tx.send(Notification::StatusUpdate(
                    "Server returned an empty reply".to_string(),
                ));
            }
        }
    }
}
