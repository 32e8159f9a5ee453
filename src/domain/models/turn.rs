/// One outbound chat turn. Created per dispatch, never persisted.
pub struct ChatTurn {
    pub text: String,
    pub wants_stream: bool,
    /// Base64-encoded JPEG attached to screenshot uploads.
    pub image: Option<String>,
}

impl ChatTurn {
    pub fn text(text: &str) -> ChatTurn {
        return ChatTurn {
            text: text.to_string(),
            wants_stream: true,
            image: None,
        };
    }

    pub fn screenshot(encoded_image: String) -> ChatTurn {
        return ChatTurn {
            text: "".to_string(),
            wants_stream: false,
            image: Some(encoded_image),
        };
    }
}

/// Where a turn came from decides its fate when another turn is in flight:
/// user text queues, proactive prompts are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOrigin {
    User,
    Proactive,
}
