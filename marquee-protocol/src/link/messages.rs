//! Message types for the co-processor link
//!
//! Message types are divided into two directions:
//! - Controller → co-processor: session control, HTTP requests, asset reads
//! - Co-processor → controller: streamed responses, failures, heartbeat replies
//!
//! A response is streamed as one `ResponseHead`, zero or more
//! `ResponseChunk`s and a closing `ResponseEnd`, all carrying the request's
//! sequence number. Asset reads reuse the same reply stream.

use heapless::Vec;

use super::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

// Message type IDs: controller → co-processor
pub const MSG_PING: u8 = 0x01;
pub const MSG_OPEN_SESSION: u8 = 0x02;
pub const MSG_RESET_SESSION: u8 = 0x03;
pub const MSG_HTTP_REQUEST: u8 = 0x10;
pub const MSG_READ_ASSET: u8 = 0x11;

// Message type IDs: co-processor → controller
pub const MSG_PONG: u8 = 0x81;
pub const MSG_RESPONSE_HEAD: u8 = 0x90;
pub const MSG_RESPONSE_CHUNK: u8 = 0x91;
pub const MSG_RESPONSE_END: u8 = 0x92;
pub const MSG_FAILURE: u8 = 0x9F;

/// HTTP method requested from the co-processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpMethod {
    Get,
    Delete,
}

impl HttpMethod {
    pub fn to_byte(self) -> u8 {
        match self {
            HttpMethod::Get => 0,
            HttpMethod::Delete => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(HttpMethod::Get),
            1 => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

/// Failure reported by the co-processor instead of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkFailure {
    /// Request exceeded its timeout
    Timeout,
    /// TCP/TLS connection dropped mid-request
    ConnectionReset,
    /// Wi-Fi is not associated
    NoNetwork,
    /// Asset does not exist
    NotFound,
    /// Anything else
    Other,
}

impl LinkFailure {
    pub fn to_byte(self) -> u8 {
        match self {
            LinkFailure::Timeout => 1,
            LinkFailure::ConnectionReset => 2,
            LinkFailure::NoNetwork => 3,
            LinkFailure::NotFound => 4,
            LinkFailure::Other => 0xFF,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => LinkFailure::Timeout,
            2 => LinkFailure::ConnectionReset,
            3 => LinkFailure::NoNetwork,
            4 => LinkFailure::NotFound,
            _ => LinkFailure::Other,
        }
    }
}

/// Requests from the controller to the co-processor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkRequest<'a> {
    /// Heartbeat, answered with `Pong`
    Ping,
    /// Install the API key used for every following request
    OpenSession { api_key: &'a str },
    /// Drop the HTTP session and its sockets
    ResetSession,
    /// Perform an HTTP request
    Http {
        method: HttpMethod,
        timeout_ms: u16,
        url: &'a str,
    },
    /// Stream a file from the co-processor's asset storage
    ReadAsset { path: &'a str },
}

impl<'a> LinkRequest<'a> {
    /// Encode this request into a frame
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        match self {
            LinkRequest::Ping => Ok(Frame::empty(MSG_PING, seq)),
            LinkRequest::OpenSession { api_key } => {
                Frame::new(MSG_OPEN_SESSION, seq, api_key.as_bytes())
            }
            LinkRequest::ResetSession => Ok(Frame::empty(MSG_RESET_SESSION, seq)),
            LinkRequest::Http {
                method,
                timeout_ms,
                url,
            } => {
                // Payload: [method][timeout lo][timeout hi][url...]
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload
                    .push(method.to_byte())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .extend_from_slice(&timeout_ms.to_le_bytes())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .extend_from_slice(url.as_bytes())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Frame::new(MSG_HTTP_REQUEST, seq, &payload)
            }
            LinkRequest::ReadAsset { path } => Frame::new(MSG_READ_ASSET, seq, path.as_bytes()),
        }
    }

    /// Parse a request from a frame (co-processor side and simulation)
    pub fn from_frame(frame: &'a Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_PING => Ok(LinkRequest::Ping),
            MSG_OPEN_SESSION => Ok(LinkRequest::OpenSession {
                api_key: utf8(&frame.payload)?,
            }),
            MSG_RESET_SESSION => Ok(LinkRequest::ResetSession),
            MSG_HTTP_REQUEST => {
                if frame.payload.len() < 3 {
                    return Err(FrameError::InvalidFrame);
                }
                let method =
                    HttpMethod::from_byte(frame.payload[0]).ok_or(FrameError::InvalidFrame)?;
                Ok(LinkRequest::Http {
                    method,
                    timeout_ms: u16::from_le_bytes([frame.payload[1], frame.payload[2]]),
                    url: utf8(&frame.payload[3..])?,
                })
            }
            MSG_READ_ASSET => Ok(LinkRequest::ReadAsset {
                path: utf8(&frame.payload)?,
            }),
            _ => Err(FrameError::InvalidFrame),
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, FrameError> {
    core::str::from_utf8(bytes).map_err(|_| FrameError::InvalidFrame)
}

/// Replies from the co-processor to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkReply {
    /// Heartbeat reply with the radio's association state
    Pong { wifi_up: bool },
    /// Status line and total body length of a response
    ResponseHead { status: u16, length: u32 },
    /// Next slice of the response body
    ResponseChunk(Vec<u8, MAX_PAYLOAD_SIZE>),
    /// Body complete
    ResponseEnd,
    /// Request failed before a response was produced
    Failure(LinkFailure),
}

impl LinkReply {
    /// Parse a reply from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let p = &frame.payload;
        match frame.msg_type {
            MSG_PONG => Ok(LinkReply::Pong {
                wifi_up: p.first().copied().unwrap_or(0) != 0,
            }),
            MSG_RESPONSE_HEAD => {
                if p.len() != 6 {
                    return Err(FrameError::InvalidFrame);
                }
                Ok(LinkReply::ResponseHead {
                    status: u16::from_le_bytes([p[0], p[1]]),
                    length: u32::from_le_bytes([p[2], p[3], p[4], p[5]]),
                })
            }
            MSG_RESPONSE_CHUNK => Ok(LinkReply::ResponseChunk(p.clone())),
            MSG_RESPONSE_END => Ok(LinkReply::ResponseEnd),
            MSG_FAILURE => Ok(LinkReply::Failure(LinkFailure::from_byte(
                p.first().copied().unwrap_or(0xFF),
            ))),
            _ => Err(FrameError::InvalidFrame),
        }
    }

    /// Encode this reply into a frame (co-processor side and simulation)
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        match self {
            LinkReply::Pong { wifi_up } => Frame::new(MSG_PONG, seq, &[*wifi_up as u8]),
            LinkReply::ResponseHead { status, length } => {
                let mut payload = [0u8; 6];
                payload[..2].copy_from_slice(&status.to_le_bytes());
                payload[2..].copy_from_slice(&length.to_le_bytes());
                Frame::new(MSG_RESPONSE_HEAD, seq, &payload)
            }
            LinkReply::ResponseChunk(bytes) => Frame::new(MSG_RESPONSE_CHUNK, seq, bytes),
            LinkReply::ResponseEnd => Ok(Frame::empty(MSG_RESPONSE_END, seq)),
            LinkReply::Failure(kind) => Frame::new(MSG_FAILURE, seq, &[kind.to_byte()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_layout() {
        let req = LinkRequest::Http {
            method: HttpMethod::Delete,
            timeout_ms: 10_000,
            url: "https://h/x",
        };
        let frame = req.to_frame(42).unwrap();
        assert_eq!(frame.msg_type, MSG_HTTP_REQUEST);
        assert_eq!(frame.seq, 42);
        assert_eq!(frame.payload[0], 1);
        assert_eq!(&frame.payload[1..3], &10_000u16.to_le_bytes());
        assert_eq!(&frame.payload[3..], b"https://h/x");
        assert_eq!(LinkRequest::from_frame(&frame).unwrap(), req);
    }

    #[test]
    fn test_oversized_url_rejected() {
        let url = [b'a'; MAX_PAYLOAD_SIZE];
        let url = core::str::from_utf8(&url).unwrap();
        let req = LinkRequest::Http {
            method: HttpMethod::Get,
            timeout_ms: 1,
            url,
        };
        assert_eq!(req.to_frame(0), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_response_head_decode() {
        let frame = LinkReply::ResponseHead {
            status: 404,
            length: 70_000,
        }
        .to_frame(5)
        .unwrap();
        assert_eq!(
            LinkReply::from_frame(&frame),
            Ok(LinkReply::ResponseHead {
                status: 404,
                length: 70_000
            })
        );
    }

    #[test]
    fn test_failure_unknown_kind_maps_to_other() {
        let frame = Frame::new(MSG_FAILURE, 0, &[0x33]).unwrap();
        assert_eq!(
            LinkReply::from_frame(&frame),
            Ok(LinkReply::Failure(LinkFailure::Other))
        );
    }

    #[test]
    fn test_unknown_reply_type() {
        let frame = Frame::empty(0x55, 0);
        assert_eq!(LinkReply::from_frame(&frame), Err(FrameError::InvalidFrame));
    }
}
