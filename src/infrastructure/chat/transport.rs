#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

use serde::Serialize;

use super::decoder::ResponseDecoder;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatTurn;
use crate::domain::models::CompanionError;
use crate::domain::models::DecodedReply;

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    stream: bool,
    messages: Vec<TurnMessage>,
}

#[derive(Serialize)]
struct TurnMessage {
    role: String,
    content: Vec<ContentItem>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentItem {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

#[derive(Serialize)]
struct ImageRef {
    url: String,
}

/// One-shot client for the chat completion endpoint. Sends a single turn
/// (text and/or image) tagged with the session identity and hands the
/// response to the decoder.
pub struct ChatClient {
    host: String,
    model: String,
}

impl ChatClient {
    pub fn from_config() -> ChatClient {
        return ChatClient {
            host: Config::get(ConfigKey::ServerHost),
            model: Config::get(ConfigKey::Model),
        };
    }

    fn endpoint(&self) -> String {
        return format!("http://{host}/api/v3/bots/chat/completions", host = self.host);
    }

    pub async fn send_turn(
        &self,
        turn: &ChatTurn,
        context_id: &str,
    ) -> Result<DecodedReply, CompanionError> {
        if self.host.is_empty() {
            return Err(CompanionError::Config("server host".to_string()));
        }

        let req = CompletionRequest {
            model: self.model.to_string(),
            stream: turn.wants_stream,
            messages: vec![Self::build_message(turn)],
        };

        let res = reqwest::Client::new()
            .post(self.endpoint())
            .header("X-Context-Id", context_id)
            .json(&req)
            .send()
            .await
            .map_err(|err| return CompanionError::Connect(err.to_string()))?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(
                status = status,
                body = body.chars().take(200).collect::<String>(),
                "chat request failed"
            );
            return Err(CompanionError::Transport { status });
        }

        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|value| return value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            return ResponseDecoder::decode_stream(res).await;
        }

        let body = res
            .text()
            .await
            .map_err(|err| return CompanionError::Connect(err.to_string()))?;

        return ResponseDecoder::decode_buffered(&body);
    }

    fn build_message(turn: &ChatTurn) -> TurnMessage {
        let mut content = vec![ContentItem::Text {
            text: turn.text.to_string(),
        }];

        if let Some(image) = &turn.image {
            content.push(ContentItem::ImageUrl {
                image_url: ImageRef {
                    url: format!("data:image/jpeg;base64,{image}"),
                },
            });
        }

        return TurnMessage {
            role: "user".to_string(),
            content,
        };
    }
}
