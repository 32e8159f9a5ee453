pub mod noop;

pub use noop::NoopAudio;
