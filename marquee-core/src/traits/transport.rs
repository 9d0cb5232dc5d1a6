//! Feed service transport trait

use alloc::vec::Vec;
use core::fmt;

use marquee_protocol::LinkFailure;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Delete,
}

/// One outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    /// The transport must give up after this long
    pub timeout_ms: u16,
}

/// A completed HTTP exchange, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
        }
    }
}

/// Transport-level failures (no HTTP status was obtained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Request did not complete within its timeout
    Timeout,
    /// Connection dropped mid-request
    ConnectionReset,
    /// Session is unusable (stale sockets, TLS state lost)
    Session,
    /// Network is down
    LinkDown,
    /// Response was truncated or otherwise unreadable
    Io,
}

impl TransportError {
    /// Whether this failure points at the session rather than the request
    pub fn is_session_level(self) -> bool {
        matches!(self, TransportError::ConnectionReset | TransportError::Session)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => f.write_str("timeout"),
            TransportError::ConnectionReset => f.write_str("connection reset"),
            TransportError::Session => f.write_str("session failure"),
            TransportError::LinkDown => f.write_str("link down"),
            TransportError::Io => f.write_str("i/o error"),
        }
    }
}

impl From<LinkFailure> for TransportError {
    fn from(failure: LinkFailure) -> Self {
        match failure {
            LinkFailure::Timeout => TransportError::Timeout,
            LinkFailure::ConnectionReset => TransportError::ConnectionReset,
            LinkFailure::NoNetwork => TransportError::LinkDown,
            LinkFailure::NotFound | LinkFailure::Other => TransportError::Io,
        }
    }
}

/// Trait for the network path to the feed service
///
/// Calls block until a response, an error or the request timeout.
pub trait FeedTransport {
    fn request(&mut self, request: &Request<'_>) -> Result<Response, TransportError>;

    /// Tear down and rebuild the HTTP session
    fn reset_session(&mut self);

    /// Whether the network is up; a down link skips the poll cycle
    fn link_up(&mut self) -> bool {
        true
    }
}
