//! UART link between the matrix controller and its Wi-Fi co-processor

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{HttpMethod, LinkFailure, LinkReply, LinkRequest};
