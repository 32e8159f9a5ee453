pub mod noop;

pub use noop::NoopCapture;
