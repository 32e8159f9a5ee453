#[cfg(test)]
#[path = "link_test.rs"]
mod tests;

use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;

use super::framing;
use super::framing::WireFrame;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CompanionError;
use crate::domain::models::LinkCommand;
use crate::domain::models::LinkEvent;

const SAMPLE_RATE: u32 = 16000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone)]
pub struct LinkSettings {
    pub host: String,
    pub app_id: String,
    pub access_token: String,
    pub uid: String,
    /// Wrap outbound frames in the binary wire format instead of plain JSON.
    pub binary_frames: bool,
}

impl LinkSettings {
    pub fn from_config() -> LinkSettings {
        return LinkSettings {
            host: Config::get(ConfigKey::ServerHost),
            app_id: Config::get(ConfigKey::AsrAppId),
            access_token: Config::get(ConfigKey::AsrAccessToken),
            uid: Config::get(ConfigKey::AsrUid),
            binary_frames: Config::get(ConfigKey::AsrBinaryFrames) == "true",
        };
    }

    pub fn url(&self) -> String {
        return format!(
            "ws://{host}/ws/asr?app_id={app_id}&access_token={token}",
            host = self.host,
            app_id = urlencoding::encode(&self.app_id),
            token = urlencoding::encode(&self.access_token),
        );
    }
}

#[derive(Serialize)]
struct InitRequest {
    user: InitUser,
    audio: InitAudio,
    request: InitParams,
}

#[derive(Serialize)]
struct InitUser {
    uid: String,
}

#[derive(Serialize)]
struct InitAudio {
    format: String,
    sample_rate: u32,
    bits: u32,
    channel: u32,
}

#[derive(Serialize)]
struct InitParams {
    model_name: String,
    result_type: String,
    show_utterances: bool,
    end_window_size: u32,
    force_to_speech_time: u32,
}

impl InitRequest {
    fn new(uid: &str) -> InitRequest {
        return InitRequest {
            user: InitUser {
                uid: uid.to_string(),
            },
            audio: InitAudio {
                format: "pcm".to_string(),
                sample_rate: SAMPLE_RATE,
                bits: 16,
                channel: 1,
            },
            request: InitParams {
                model_name: "bigmodel".to_string(),
                result_type: "single".to_string(),
                show_utterances: true,
                end_window_size: 600,
                force_to_speech_time: 1500,
            },
        };
    }
}

#[derive(Serialize)]
struct AudioFrame {
    audio_data: String,
    sequence: i32,
}

#[derive(Deserialize)]
struct ControlMessage {
    error: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    is_final: Option<bool>,
    definite: Option<bool>,
}

#[derive(Deserialize)]
struct BinaryPayload {
    result: Option<Vec<BinaryUtterance>>,
    text: Option<String>,
    definite: Option<bool>,
}

#[derive(Deserialize)]
struct BinaryUtterance {
    text: Option<String>,
    definite: Option<bool>,
}

/// One connected lifetime of the recognition transport. The task owns the
/// socket and the per-link sequence counter; it reports every state change
/// and inbound message as a [`LinkEvent`] and never reconnects on its own.
pub struct RecognitionLink {}

impl RecognitionLink {
    pub fn spawn(
        settings: LinkSettings,
        events: mpsc::UnboundedSender<LinkEvent>,
        commands: mpsc::UnboundedReceiver<LinkCommand>,
    ) -> JoinHandle<()> {
        return tokio::spawn(async move {
            Self::run(settings, events, commands).await;
        });
    }

    async fn run(
        settings: LinkSettings,
        events: mpsc::UnboundedSender<LinkEvent>,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    ) {
        let url = settings.url();
        let (mut ws, _) = match connect_async(url.as_str()).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!(error = %err, "recognition link connect failed");
                let _ = events.send(LinkEvent::Failed(err.to_string()));
                let _ = events.send(LinkEvent::Closed { code: None });
                return;
            }
        };

        let _ = events.send(LinkEvent::Opened);

        if let Err(err) = Self::send_init(&mut ws, &settings).await {
            tracing::error!(error = %err, "failed to send recognition init frame");
            let _ = events.send(LinkEvent::Failed(err.to_string()));
            let _ = events.send(LinkEvent::Closed { code: None });
            return;
        }

        // Resets on every link; each audio frame takes the next value.
        let mut sequence: i32 = 0;

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(LinkCommand::Audio(pcm)) => {
                        sequence += 1;
                        if let Err(err) = Self::send_audio(&mut ws, &settings, sequence, &pcm).await {
                            tracing::error!(error = %err, sequence, "failed to send audio frame");
                            let _ = events.send(LinkEvent::Failed(err.to_string()));
                            let _ = events.send(LinkEvent::Closed { code: None });
                            break;
                        }
                    }
                    Some(LinkCommand::Close) | None => {
                        let close_frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client stopped".into(),
                        };
                        let _ = ws.close(Some(close_frame)).await;
                        let _ = events.send(LinkEvent::Closed { code: Some(1000) });
                        break;
                    }
                },
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => Self::route_text(&text, &events),
                    Some(Ok(Message::Binary(bytes))) => Self::route_binary(&bytes, &events),
                    Some(Ok(Message::Close(close))) => {
                        let code = close.map(|frame| return u16::from(frame.code));
                        tracing::info!(code = ?code, "recognition link closed by remote");
                        let _ = events.send(LinkEvent::Closed { code });
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::error!(error = %err, "recognition link read failed");
                        let _ = events.send(LinkEvent::Failed(err.to_string()));
                        let _ = events.send(LinkEvent::Closed { code: None });
                        break;
                    }
                    None => {
                        let _ = events.send(LinkEvent::Closed { code: None });
                        break;
                    }
                },
            }
        }
    }

    async fn send_init(ws: &mut WsStream, settings: &LinkSettings) -> Result<(), CompanionError> {
        let init = InitRequest::new(&settings.uid);
        let payload = serde_json::to_string(&init)
            .map_err(|err| return CompanionError::Protocol(err.to_string()))?;

        let message = if settings.binary_frames {
            let frame =
                WireFrame::client_request(framing::FULL_CLIENT_REQUEST, 0, payload.as_bytes())?;
            Message::Binary(frame.encode())
        } else {
            Message::Text(payload)
        };

        return ws
            .send(message)
            .await
            .map_err(|err| return CompanionError::Link(err.to_string()));
    }

    async fn send_audio(
        ws: &mut WsStream,
        settings: &LinkSettings,
        sequence: i32,
        pcm: &[u8],
    ) -> Result<(), CompanionError> {
        let frame = AudioFrame {
            audio_data: b64.encode(pcm),
            sequence,
        };
        let payload = serde_json::to_string(&frame)
            .map_err(|err| return CompanionError::Protocol(err.to_string()))?;

        let message = if settings.binary_frames {
            let wire =
                WireFrame::client_request(framing::AUDIO_ONLY_REQUEST, sequence, payload.as_bytes())?;
            Message::Binary(wire.encode())
        } else {
            Message::Text(payload)
        };

        return ws
            .send(message)
            .await
            .map_err(|err| return CompanionError::Link(err.to_string()));
    }

    fn route_text(text: &str, events: &mpsc::UnboundedSender<LinkEvent>) {
        let control = match serde_json::from_str::<ControlMessage>(text) {
            Ok(control) => control,
            Err(err) => {
                tracing::warn!(error = %err, "dropping unparseable recognition message");
                return;
            }
        };

        if let Some(error) = control.error {
            let _ = events.send(LinkEvent::RemoteError(error));
            return;
        }

        if control.kind.as_deref() == Some("ack") {
            let _ = events.send(LinkEvent::Ack);
            return;
        }

        if let Some(text) = control.text {
            if !text.trim().is_empty() {
                let is_final = control.is_final.or(control.definite).unwrap_or(false);
                let _ = events.send(LinkEvent::Transcript { text, is_final });
            }
        }
    }

    fn route_binary(bytes: &[u8], events: &mpsc::UnboundedSender<LinkEvent>) {
        let frame = match WireFrame::parse(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "dropping unparseable binary frame");
                return;
            }
        };

        if frame.is_ack() {
            let _ = events.send(LinkEvent::Ack);
            return;
        }

        if frame.message_type != framing::FULL_SERVER_RESPONSE {
            tracing::debug!(
                message_type = frame.message_type,
                "ignoring binary frame type"
            );
            return;
        }

        let payload = match frame
            .payload_json()
            .and_then(|value| {
                return serde_json::from_value::<BinaryPayload>(value)
                    .map_err(|err| return CompanionError::Protocol(err.to_string()));
            }) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "dropping undecodable recognition payload");
                return;
            }
        };

        let (text, is_final) = match payload.result.and_then(|mut list| {
            if list.is_empty() {
                return None;
            }
            return Some(list.remove(0));
        }) {
            Some(utterance) => (
                utterance.text.unwrap_or_default(),
                utterance.definite.unwrap_or(false),
            ),
            None => (
                payload.text.unwrap_or_default(),
                payload.definite.unwrap_or(false),
            ),
        };

        if !text.trim().is_empty() {
            let _ = events.send(LinkEvent::Transcript { text, is_final });
        }
    }
}
