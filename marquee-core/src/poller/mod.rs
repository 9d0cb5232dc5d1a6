//! Retry and session recovery around the feed service
//!
//! Every outbound call goes through [`ResilientPoller::call`]: transient
//! failures are retried with capped exponential backoff, repeated
//! session-level failures rebuild the transport session, and running out of
//! attempts ends the call with [`PollError::Exhausted`]. A poll cycle wraps a
//! batch of calls with [`ResilientPoller::cycle`], which pulses the watchdog
//! exactly once when the batch concludes, whether it succeeded or not.

mod backlog;

pub use backlog::Backlog;

use alloc::vec::Vec;
use core::fmt;

use marquee_protocol::{decode_group, decode_items, FeedItem, FeedSetting, WireError};

use crate::config::NetworkConfig;
use crate::traits::{Clock, FeedTransport, Method, Request, Response, TransportError, Watchdog};

/// Why a call produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u8, last: TransportError },
    /// The service answered with a status that retrying will not fix
    Status(u16),
    /// The network is down
    LinkDown,
    /// The body did not decode
    Malformed,
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempts ({})", attempts, last)
            }
            PollError::Status(status) => write!(f, "HTTP status {}", status),
            PollError::LinkDown => f.write_str("link down"),
            PollError::Malformed => f.write_str("malformed response"),
        }
    }
}

impl From<WireError> for PollError {
    fn from(_: WireError) -> Self {
        PollError::Malformed
    }
}

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub backoff_base_ms: u32,
    pub backoff_cap_ms: u32,
    pub timeout_ms: u16,
    /// Consecutive session-level failures before the session is rebuilt
    pub session_rebuild_after: u8,
}

impl RetryPolicy {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base_ms: config.backoff_base_ms,
            backoff_cap_ms: config.backoff_cap_ms,
            timeout_ms: config.http_timeout_ms,
            session_rebuild_after: config.session_rebuild_after.max(1),
        }
    }

    /// Wait after the `failures`-th failed attempt
    pub fn backoff_ms(&self, failures: u8) -> u32 {
        let shift = failures.saturating_sub(1).min(31) as u32;
        self.backoff_base_ms
            .saturating_mul(1u32 << shift)
            .min(self.backoff_cap_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

/// Poller counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollStats {
    pub requests: u32,
    pub retries: u32,
    pub session_rebuilds: u32,
    pub cycles_ok: u32,
    pub cycles_skipped: u32,
}

/// How a poll cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome<R> {
    Completed(R),
    /// The rest of the cycle was skipped; no new items
    Skipped(PollError),
}

enum Attempt<R> {
    Done(R),
    Retry(TransportError),
    Fail(PollError),
}

/// Retrying wrapper around a [`FeedTransport`]
pub struct ResilientPoller<T: FeedTransport> {
    transport: T,
    policy: RetryPolicy,
    session_failures: u8,
    last_cycle_ok: bool,
    stats: PollStats,
}

impl<T: FeedTransport> ResilientPoller<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            session_failures: 0,
            last_cycle_ok: true,
            stats: PollStats::default(),
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether the most recent cycle completed
    pub fn healthy(&self) -> bool {
        self.last_cycle_ok
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run one poll cycle and pulse the watchdog once it concludes
    ///
    /// `work` issues the cycle's calls. A down link skips the cycle before any
    /// request is made.
    pub fn cycle<W, C, R, F>(&mut self, watchdog: &mut W, clock: &mut C, work: F) -> CycleOutcome<R>
    where
        W: Watchdog,
        C: Clock,
        F: FnOnce(&mut Self, &mut C) -> Result<R, PollError>,
    {
        let result = if self.transport.link_up() {
            work(self, clock)
        } else {
            Err(PollError::LinkDown)
        };

        let outcome = match result {
            Ok(value) => {
                self.stats.cycles_ok += 1;
                self.last_cycle_ok = true;
                CycleOutcome::Completed(value)
            }
            Err(e) => {
                self.stats.cycles_skipped += 1;
                self.last_cycle_ok = false;
                error!("Poll cycle skipped: {}", e);
                CycleOutcome::Skipped(e)
            }
        };
        watchdog.pulse();
        outcome
    }

    /// Issue one request with retries, decoding a successful body with `decode`
    ///
    /// Timeouts, resets, unreadable bodies, 5xx and 429 are retried. Other
    /// non-2xx statuses fail immediately with [`PollError::Status`].
    pub fn call<C, R, F>(&mut self, method: Method, url: &str, clock: &mut C, mut decode: F) -> Result<R, PollError>
    where
        C: Clock,
        F: FnMut(&[u8]) -> Result<R, WireError>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = TransportError::Io;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let wait = self.policy.backoff_ms(attempt - 1);
                warn!("Retrying request (attempt {} of {}) in {} ms", attempt, attempts, wait);
                self.stats.retries += 1;
                clock.sleep_ms(wait);
            }
            if self.session_failures >= self.policy.session_rebuild_after {
                warn!("Rebuilding session after {} failures", self.session_failures);
                self.transport.reset_session();
                self.session_failures = 0;
                self.stats.session_rebuilds += 1;
            }

            self.stats.requests += 1;
            let request = Request {
                method,
                url,
                timeout_ms: self.policy.timeout_ms,
            };
            match self.attempt(&request, &mut decode) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => last = e,
            }
        }

        Err(PollError::Exhausted { attempts, last })
    }

    fn attempt<R, F>(&mut self, request: &Request<'_>, decode: &mut F) -> Attempt<R>
    where
        F: FnMut(&[u8]) -> Result<R, WireError>,
    {
        let Response { status, body } = match self.transport.request(request) {
            Ok(response) => response,
            Err(TransportError::LinkDown) => return Attempt::Fail(PollError::LinkDown),
            Err(e) => {
                if e.is_session_level() {
                    self.session_failures = self.session_failures.saturating_add(1);
                }
                warn!("Request failed: {}", e);
                return Attempt::Retry(e);
            }
        };
        self.session_failures = 0;

        match status {
            200..=299 => match decode(&body) {
                Ok(value) => Attempt::Done(value),
                Err(e) => {
                    warn!("Unreadable response body: {}", e);
                    Attempt::Retry(TransportError::Io)
                }
            },
            429 | 500..=599 => {
                warn!("Service busy (status {})", status);
                Attempt::Retry(TransportError::Io)
            }
            _ => Attempt::Fail(PollError::Status(status)),
        }
    }

    /// Fetch a data feed, oldest item first
    pub fn poll_items<C: Clock>(&mut self, url: &str, clock: &mut C) -> Result<Vec<FeedItem>, PollError> {
        self.call(Method::Get, url, clock, decode_items)
    }

    /// Fetch the settings group
    pub fn poll_settings<C: Clock>(&mut self, url: &str, clock: &mut C) -> Result<Vec<FeedSetting>, PollError> {
        self.call(Method::Get, url, clock, decode_group)
    }

    /// Delete a consumed item; an already-deleted item counts as done
    pub fn acknowledge<C: Clock>(&mut self, url: &str, clock: &mut C) -> Result<(), PollError> {
        match self.call(Method::Delete, url, clock, |_| Ok(())) {
            Err(PollError::Status(404)) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::string::String;

    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<Result<Response, TransportError>>,
        urls: Vec<String>,
        resets: u32,
        down: bool,
    }

    impl Scripted {
        fn with(replies: &[Result<Response, TransportError>]) -> Self {
            Self {
                replies: replies.iter().cloned().collect(),
                ..Self::default()
            }
        }
    }

    impl FeedTransport for Scripted {
        fn request(&mut self, request: &Request<'_>) -> Result<Response, TransportError> {
            self.urls.push(String::from(request.url));
            self.replies.pop_front().unwrap_or(Err(TransportError::Timeout))
        }

        fn reset_session(&mut self) {
            self.resets += 1;
        }

        fn link_up(&mut self) -> bool {
            !self.down
        }
    }

    #[derive(Default)]
    struct Sleeper {
        slept: Vec<u32>,
    }

    impl Clock for Sleeper {
        fn now_ms(&self) -> u64 {
            self.slept.iter().map(|&ms| ms as u64).sum()
        }

        fn sleep_ms(&mut self, ms: u32) {
            self.slept.push(ms);
        }
    }

    #[derive(Default)]
    struct Pulses(u32);

    impl Watchdog for Pulses {
        fn pulse(&mut self) {
            self.0 += 1;
        }
    }

    fn ok(body: &str) -> Result<Response, TransportError> {
        Ok(Response::new(200, body.as_bytes()))
    }

    fn poller(replies: &[Result<Response, TransportError>]) -> ResilientPoller<Scripted> {
        ResilientPoller::new(Scripted::with(replies), RetryPolicy::default())
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(1), 1000);
        assert_eq!(policy.backoff_ms(2), 2000);
        assert_eq!(policy.backoff_ms(3), 4000);
        assert_eq!(policy.backoff_ms(4), 8000);
        assert_eq!(policy.backoff_ms(9), 8000);
    }

    #[test]
    fn test_retries_then_succeeds() {
        let mut poller = poller(&[Err(TransportError::Timeout), ok(r#"[{"id":"1","value":"a"}]"#)]);
        let mut clock = Sleeper::default();
        let items = poller.poll_items("u", &mut clock).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(clock.slept, alloc::vec![1000]);
        assert_eq!(poller.stats().retries, 1);
    }

    #[test]
    fn test_exhaustion() {
        let mut poller = poller(&[]);
        let mut clock = Sleeper::default();
        assert_eq!(
            poller.poll_items("u", &mut clock),
            Err(PollError::Exhausted {
                attempts: 3,
                last: TransportError::Timeout
            })
        );
        assert_eq!(poller.stats().requests, 3);
        assert_eq!(clock.slept, alloc::vec![1000, 2000]);
    }

    #[test]
    fn test_client_error_not_retried() {
        let mut poller = poller(&[Ok(Response::new(403, b"")), ok("[]")]);
        let mut clock = Sleeper::default();
        assert_eq!(poller.poll_items("u", &mut clock), Err(PollError::Status(403)));
        assert_eq!(poller.stats().requests, 1);
    }

    #[test]
    fn test_server_error_and_bad_body_retried() {
        let mut poller = poller(&[Ok(Response::new(503, b"")), ok("<html>"), ok("[]")]);
        let mut clock = Sleeper::default();
        assert_eq!(poller.poll_items("u", &mut clock), Ok(Vec::new()));
        assert_eq!(poller.stats().retries, 2);
    }

    #[test]
    fn test_session_rebuilt_after_consecutive_resets() {
        let mut poller = poller(&[
            Err(TransportError::ConnectionReset),
            Err(TransportError::Session),
            ok("[]"),
        ]);
        let mut clock = Sleeper::default();
        assert!(poller.poll_items("u", &mut clock).is_ok());
        assert_eq!(poller.transport().resets, 1);
        assert_eq!(poller.stats().session_rebuilds, 1);
    }

    #[test]
    fn test_acknowledge_accepts_missing_item() {
        let mut poller = poller(&[Ok(Response::new(404, b""))]);
        let mut clock = Sleeper::default();
        assert_eq!(poller.acknowledge("u", &mut clock), Ok(()));
    }

    #[test]
    fn test_cycle_pulses_once_on_failure() {
        let mut poller = poller(&[]);
        let mut clock = Sleeper::default();
        let mut watchdog = Pulses::default();
        let outcome = poller.cycle(&mut watchdog, &mut clock, |p, c| p.poll_items("u", c));
        assert!(matches!(outcome, CycleOutcome::Skipped(PollError::Exhausted { .. })));
        assert_eq!(watchdog.0, 1);
        assert!(!poller.healthy());
        assert_eq!(poller.stats().cycles_skipped, 1);
    }

    #[test]
    fn test_link_down_skips_without_requests() {
        let mut poller = poller(&[ok("[]")]);
        poller.transport_mut().down = true;
        let mut clock = Sleeper::default();
        let mut watchdog = Pulses::default();
        let outcome = poller.cycle(&mut watchdog, &mut clock, |p, c| p.poll_items("u", c));
        assert_eq!(outcome, CycleOutcome::Skipped(PollError::LinkDown));
        assert!(poller.transport().urls.is_empty());
        assert_eq!(watchdog.0, 1);
    }
}
