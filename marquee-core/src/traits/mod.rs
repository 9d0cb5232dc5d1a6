//! Collaborator traits
//!
//! These traits define the interface between the message runtime and the
//! board: the pixel driver, the network transport, the asset decoder, the
//! watchdog and the clock.

pub mod clock;
pub mod decoder;
pub mod display;
pub mod transport;
pub mod watchdog;

pub use clock::Clock;
pub use decoder::{Decoded, ResourceDecoder};
pub use display::DisplayDriver;
pub use transport::{FeedTransport, Method, Request, Response, TransportError};
pub use watchdog::Watchdog;
