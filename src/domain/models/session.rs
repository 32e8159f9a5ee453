use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Runtime identity of the one session this process coordinates. The context
/// id correlates every turn of a conversation on the remote side.
#[derive(Default)]
pub struct Session {
    pub context_id: String,
    pub running: bool,
}

/// The slice of session state that survives process restarts, so a resumed
/// session keeps talking in the same remote conversation context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub context_id: String,
    pub is_running: bool,
}
