//! Marquee wire protocols
//!
//! This crate defines everything that crosses a wire:
//!
//! - Feed service payloads: item lists, group settings snapshots and the
//!   structured message document carried in an item's value
//! - Feed service endpoint URLs
//! - The BMP files used for stored images and inline icons
//! - The UART link between the matrix controller and its Wi-Fi co-processor
//!
//! # Link Overview
//!
//! The controller never talks TCP itself. It asks the co-processor to perform
//! HTTP requests over a binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────┬─────────────┬───────┐
//! │ START │ LENGTH │ TYPE │ SEQ │ PAYLOAD     │ CRC-8 │
//! │ 1B    │ 1B     │ 1B   │ 1B  │ 0–240B      │ 1B    │
//! └───────┴────────┴──────┴─────┴─────────────┴───────┘
//! ```
//!
//! Replies echo the request's sequence number so a late reply to a request
//! that already timed out can be discarded.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod bmp;
pub mod endpoint;
pub mod error;
pub mod feed;
pub mod icon;
pub mod link;
pub mod message;

pub use bmp::{decode_bmp, Bitmap, BmpError};
pub use endpoint::{timestamp, FeedEndpoints};
pub use error::WireError;
pub use feed::{decode_group, decode_items, FeedItem, FeedSetting, ItemId};
pub use icon::{classify_icon, IconSource};
pub use link::{Frame, FrameError, FrameParser, LinkFailure, LinkReply, LinkRequest};
pub use message::{WireElement, WireMessage};
