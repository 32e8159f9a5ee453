/// Fire-and-forget broadcast from the coordinator to whatever surface renders
/// the session. Delivery is best-effort; nothing in the core waits on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    ShowPanel,
    HidePanel,
    StatusUpdate(String),
    AiResponse(String),
    UserSpeech(String),
    AsrPartial(String),
    PlayAudio(String),
}
