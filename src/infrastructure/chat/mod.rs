pub mod decoder;
pub mod transport;

pub use decoder::ResponseDecoder;
pub use transport::ChatClient;
