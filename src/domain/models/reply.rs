#[cfg(test)]
#[path = "reply_test.rs"]
mod tests;

/// The demultiplexed result of one assistant turn: the accumulated reply
/// transcript plus ordered base64 audio fragments. Callers never see whether
/// it came from a streamed or a single-shot response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedReply {
    pub transcript: String,
    pub audio_fragments: Vec<String>,
}

impl DecodedReply {
    /// A reply with no transcript and no audio is a protocol anomaly the
    /// caller must surface, not an ordinary empty result.
    pub fn is_empty(&self) -> bool {
        return self.transcript.is_empty() && self.audio_fragments.is_empty();
    }

    /// Concatenated in arrival order the fragments form one playable asset.
    pub fn joined_audio(&self) -> String {
        return self.audio_fragments.join("");
    }
}
