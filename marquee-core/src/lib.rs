//! Board-agnostic message runtime for the Marquee display
//!
//! This crate contains everything between the feed service and the pixels
//! that does not depend on a particular board:
//!
//! - Collaborator traits (display, transport, decoder, watchdog, clock)
//! - Dual work queue with watermark deduplication
//! - Structured message parser
//! - Two-tier style state
//! - Animation planning and the effect catalogue
//! - Font and image cache with pinning
//! - Retry and session recovery for the feed service
//! - The main loop that wires them together
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod animation;
pub mod cache;
pub mod config;
pub mod message;
pub mod poller;
pub mod queue;
pub mod runtime;
pub mod style;
pub mod traits;

pub use runtime::{LoopReport, Runtime};
