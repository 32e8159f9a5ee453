/// Lifecycle of one recognition transport link, from open to close.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

/// Discrete events the link task reports back to the session manager. Each
/// produces at most one state transition there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Closed { code: Option<u16> },
    Failed(String),
    Ack,
    RemoteError(String),
    Transcript { text: String, is_final: bool },
}

/// Commands the session manager hands to the running link task.
pub enum LinkCommand {
    /// Raw PCM to wrap with the next per-link sequence number and send.
    Audio(Vec<u8>),
    /// Close with a normal-closure code.
    Close,
}
