#[cfg(test)]
#[path = "decoder_test.rs"]
mod tests;

use futures::stream::TryStreamExt;
use serde::Deserialize;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::domain::models::CompanionError;
use crate::domain::models::DecodedReply;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChoiceResponse>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct ChoiceResponse {
    delta: Option<TurnContent>,
    message: Option<TurnContent>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct TurnContent {
    content: Option<String>,
    audio: Option<AudioContent>,
}

#[derive(Default, Debug, Clone, Deserialize)]
struct AudioContent {
    transcript: Option<String>,
    data: Option<String>,
}

/// Demultiplexes model responses into one [`DecodedReply`], whether they
/// arrive as an event stream or as a single JSON object. Callers never need
/// to know which path produced the reply.
pub struct ResponseDecoder {}

impl ResponseDecoder {
    /// Incremental decode of a `text/event-stream` body. Malformed records
    /// are skipped, and a stream lost mid-way keeps whatever was already
    /// accumulated; the caller sees an empty reply as the anomaly signal.
    pub async fn decode_stream(res: reqwest::Response) -> Result<DecodedReply, CompanionError> {
        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();

        let mut reply = DecodedReply::default();
        let mut records = 0;
        loop {
            match lines_reader.next_line().await {
                Ok(None) => break,
                Ok(Some(line)) => {
                    if Self::apply_record(&line, &mut reply) {
                        records += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, records, "stream ended early, keeping partial reply");
                    break;
                }
            }
        }

        tracing::debug!(
            records,
            fragments = reply.audio_fragments.len(),
            "stream decode complete"
        );

        return Ok(reply);
    }

    /// Decode of a body that was read in one piece: either a full
    /// event-stream transcript delivered without the streaming content type,
    /// or a single JSON object.
    pub fn decode_buffered(body: &str) -> Result<DecodedReply, CompanionError> {
        if body.trim_start().starts_with("data:") {
            return Ok(Self::decode_sse_text(body));
        }

        return Self::decode_json(body);
    }

    /// Parses a complete event-stream body line by line, identically to the
    /// incremental path.
    pub fn decode_sse_text(body: &str) -> DecodedReply {
        let mut reply = DecodedReply::default();
        for line in body.split('\n') {
            Self::apply_record(line, &mut reply);
        }

        return reply;
    }

    fn apply_record(line: &str, reply: &mut DecodedReply) -> bool {
        let trimmed = line.trim();
        if !trimmed.starts_with("data:") {
            return false;
        }

        let record = trimmed[5..].trim();
        if record.is_empty() || record == "[DONE]" {
            return false;
        }

        let chunk = match serde_json::from_str::<ChunkResponse>(record) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed stream record");
                return false;
            }
        };

        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(part) = choice.delta {
                if let Some(content) = part.content {
                    reply.transcript += &content;
                }
                if let Some(audio) = part.audio {
                    if let Some(transcript) = audio.transcript {
                        reply.transcript += &transcript;
                    }
                    if let Some(data) = audio.data {
                        reply.audio_fragments.push(data);
                    }
                }
            }
        }

        return true;
    }

    fn decode_json(body: &str) -> Result<DecodedReply, CompanionError> {
        let parsed = serde_json::from_str::<ChunkResponse>(body)
            .map_err(|err| return CompanionError::Protocol(err.to_string()))?;

        let mut reply = DecodedReply::default();
        if let Some(choice) = parsed.choices.into_iter().next() {
            if let Some(part) = choice.message {
                Self::apply_single(part, &mut reply);
            }
            // Some backends answer a non-streaming request with one
            // stream-shaped chunk.
            if reply.is_empty() {
                if let Some(part) = choice.delta {
                    Self::apply_single(part, &mut reply);
                }
            }
        }

        return Ok(reply);
    }

    // Audio-mode responses carry a null `content`; the transcript inside the
    // audio object wins over `content` when both are present.
    fn apply_single(part: TurnContent, reply: &mut DecodedReply) {
        if let Some(audio) = part.audio {
            if let Some(transcript) = audio.transcript {
                reply.transcript = transcript;
            }
            if let Some(data) = audio.data {
                reply.audio_fragments.push(data);
            }
        }

        if reply.transcript.is_empty() {
            if let Some(content) = part.content {
                reply.transcript = content;
            }
        }
    }
}
