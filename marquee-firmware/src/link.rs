//! UART link to the Wi-Fi co-processor
//!
//! The co-processor owns the radio and the HTTP client. Every exchange is one
//! request frame followed by reply frames carrying the same sequence number.
//! Replies with any other sequence number belong to an exchange that already
//! timed out and are dropped.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use defmt::*;
use embassy_futures::block_on;
use embassy_rp::uart::BufferedUart;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::{Read, Write};
use heapless::Deque;

use marquee_core::config::MAX_KEY_LEN;
use marquee_core::traits::{FeedTransport, Method, Request, Response, TransportError};
use marquee_protocol::link::HttpMethod;
use marquee_protocol::{Frame, FrameParser, LinkFailure, LinkReply, LinkRequest};

/// Time the co-processor gets on top of the request's own timeout
const LINK_MARGIN_MS: u64 = 1_000;

/// Heartbeat reply deadline
const PING_TIMEOUT_MS: u64 = 500;

/// Largest body accepted from the co-processor
const MAX_BODY: usize = 32 * 1024;

/// Completed frames waiting to be claimed
const INBOX_DEPTH: usize = 4;

/// Why an exchange over the link failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum LinkError {
    /// The co-processor reported a failure
    Failure(LinkFailure),
    /// No complete reply before the deadline
    Timeout,
    /// UART error or a reply that breaks the exchange
    Io,
}

impl From<LinkError> for TransportError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Failure(failure) => failure.into(),
            LinkError::Timeout => TransportError::Timeout,
            LinkError::Io => TransportError::Io,
        }
    }
}

/// Controller side of the co-processor link
pub struct CoprocessorLink {
    uart: BufferedUart,
    parser: FrameParser,
    inbox: Deque<Frame, INBOX_DEPTH>,
    seq: u8,
    api_key: heapless::String<MAX_KEY_LEN>,
}

impl CoprocessorLink {
    pub fn new(uart: BufferedUart, api_key: &str) -> Self {
        let mut key = heapless::String::new();
        // Config validation bounds the key length
        let _ = key.push_str(api_key);
        Self {
            uart,
            parser: FrameParser::new(),
            inbox: Deque::new(),
            seq: 0,
            api_key: key,
        }
    }

    /// Install the API key on the co-processor
    pub fn open_session(&mut self) -> Result<(), LinkError> {
        let key = self.api_key.clone();
        self.send(&LinkRequest::OpenSession { api_key: &key })?;
        Ok(())
    }

    /// Drop the co-processor's HTTP session and open a fresh one
    pub fn reset_session(&mut self) -> Result<(), LinkError> {
        self.send(&LinkRequest::ResetSession)?;
        self.open_session()
    }

    /// Heartbeat; returns the radio's association state
    pub fn ping(&mut self) -> Result<bool, LinkError> {
        let seq = self.send(&LinkRequest::Ping)?;
        let deadline = Instant::now() + Duration::from_millis(PING_TIMEOUT_MS);
        loop {
            match self.receive(seq, deadline)? {
                LinkReply::Pong { wifi_up } => return Ok(wifi_up),
                LinkReply::Failure(failure) => return Err(LinkError::Failure(failure)),
                _ => continue,
            }
        }
    }

    /// Perform an HTTP request through the co-processor
    pub fn http(&mut self, method: HttpMethod, url: &str, timeout_ms: u16) -> Result<Response, LinkError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64 + LINK_MARGIN_MS);
        self.exchange(
            &LinkRequest::Http {
                method,
                timeout_ms,
                url,
            },
            deadline,
        )
    }

    /// Read a file from the co-processor's asset storage
    pub fn read_asset(&mut self, path: &str, timeout_ms: u16) -> Result<Vec<u8>, LinkError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let response = self.exchange(&LinkRequest::ReadAsset { path }, deadline)?;
        if response.status == 404 {
            return Err(LinkError::Failure(LinkFailure::NotFound));
        }
        Ok(response.body)
    }

    /// Send a request and reassemble head, chunks and end into a response
    fn exchange(&mut self, request: &LinkRequest<'_>, deadline: Instant) -> Result<Response, LinkError> {
        let seq = self.send(request)?;

        let mut status = None;
        let mut expected = 0usize;
        let mut body = Vec::new();
        loop {
            match self.receive(seq, deadline)? {
                LinkReply::ResponseHead { status: s, length } => {
                    expected = length as usize;
                    if expected > MAX_BODY {
                        warn!("Response of {} bytes exceeds the body limit", expected);
                        return Err(LinkError::Io);
                    }
                    body.reserve(expected);
                    status = Some(s);
                }
                LinkReply::ResponseChunk(bytes) => {
                    if status.is_none() || body.len() + bytes.len() > expected {
                        return Err(LinkError::Io);
                    }
                    body.extend_from_slice(&bytes);
                }
                LinkReply::ResponseEnd => {
                    let status = status.ok_or(LinkError::Io)?;
                    if body.len() != expected {
                        warn!("Truncated response: {} of {} bytes", body.len(), expected);
                        return Err(LinkError::Io);
                    }
                    return Ok(Response { status, body });
                }
                LinkReply::Failure(failure) => return Err(LinkError::Failure(failure)),
                LinkReply::Pong { .. } => continue,
            }
        }
    }

    fn send(&mut self, request: &LinkRequest<'_>) -> Result<u8, LinkError> {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;
        let frame = request.to_frame(seq).map_err(|_| LinkError::Io)?;
        let bytes = frame.encode_to_vec().map_err(|_| LinkError::Io)?;
        block_on(self.uart.write_all(&bytes)).map_err(|_| LinkError::Io)?;
        Ok(seq)
    }

    /// Next reply for `seq`, or a timeout at `deadline`
    fn receive(&mut self, seq: u8, deadline: Instant) -> Result<LinkReply, LinkError> {
        loop {
            while let Some(frame) = self.inbox.pop_front() {
                if frame.seq != seq {
                    debug!("Dropping stale reply {:x} (seq {})", frame.msg_type, frame.seq);
                    continue;
                }
                match LinkReply::from_frame(&frame) {
                    Ok(reply) => return Ok(reply),
                    Err(e) => warn!("Bad reply frame: {:?}", e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                self.parser.reset();
                return Err(LinkError::Timeout);
            }

            let mut buf = [0u8; 64];
            let n = match block_on(with_timeout(deadline - now, self.uart.read(&mut buf))) {
                Ok(Ok(n)) => n,
                Ok(Err(_)) => {
                    warn!("UART read error");
                    return Err(LinkError::Io);
                }
                Err(_) => continue,
            };

            for &byte in &buf[..n] {
                match self.parser.feed(byte) {
                    Ok(Some(frame)) => {
                        if self.inbox.is_full() {
                            self.inbox.pop_front();
                        }
                        let _ = self.inbox.push_back(frame);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Frame parse error: {:?}", e),
                }
            }
        }
    }
}

/// Feed transport over the shared link
pub struct LinkTransport {
    link: Rc<RefCell<CoprocessorLink>>,
}

impl LinkTransport {
    pub fn new(link: Rc<RefCell<CoprocessorLink>>) -> Self {
        Self { link }
    }
}

impl FeedTransport for LinkTransport {
    fn request(&mut self, request: &Request<'_>) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => HttpMethod::Get,
            Method::Delete => HttpMethod::Delete,
        };
        let response = self
            .link
            .borrow_mut()
            .http(method, request.url, request.timeout_ms)?;
        Ok(response)
    }

    fn reset_session(&mut self) {
        if let Err(e) = self.link.borrow_mut().reset_session() {
            warn!("Session reset failed: {:?}", e);
        }
    }

    fn link_up(&mut self) -> bool {
        match self.link.borrow_mut().ping() {
            Ok(wifi_up) => wifi_up,
            Err(e) => {
                warn!("Co-processor did not answer: {:?}", e);
                false
            }
        }
    }
}
