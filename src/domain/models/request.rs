use std::collections::HashMap;

/// Inbound commands from the surface that drives the session.
pub enum Request {
    Start,
    Stop,
    ConfigUpdated(HashMap<String, String>),
    MicStart,
    MicStop,
    SendText(String),
    /// One fixed-size chunk of 16-bit 16kHz mono PCM from the audio source.
    AudioChunk(Vec<u8>),
}
