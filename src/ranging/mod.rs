mod distance;
mod echo_capture;
mod echo_channel;
mod protocol;

pub use distance::Distance;
pub use echo_capture::{CycleId, CycleOutcome, EchoCapture, EchoHandler, Edge, Phase};
pub use echo_channel::EchoChannel;
pub use protocol::{ProtocolState, RangingProtocol};
