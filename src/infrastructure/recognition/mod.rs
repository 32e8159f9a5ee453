pub mod framing;
pub mod link;

pub use framing::WireFrame;
pub use link::LinkSettings;
pub use link::RecognitionLink;
