mod cadence;
mod coordinator;
mod dispatch;
mod recognition;

pub use cadence::*;
pub use coordinator::*;
pub use dispatch::*;
pub use recognition::*;
