//! Feed service URLs
//!
//! Layout follows the feed service's REST API:
//! - group snapshot: `{base}/{user}/groups/{group}`
//! - feed data: `{base}/{user}/feeds/{group}.{feed}/data?limit={n}`
//! - older feed data: `...data?limit={n}&end_time={RFC 3339 UTC}`
//! - single item: `{base}/{user}/feeds/{group}.{feed}/data/{id}`

use alloc::format;
use alloc::string::String;

use chrono::{DateTime, SecondsFormat};

use crate::feed::ItemId;

/// Resolved URLs for one device's settings group and its two data feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// Group snapshot URL
    pub settings: String,
    /// Plain-text feed data URL
    pub text: String,
    /// Structured-message feed data URL
    pub messages: String,
    text_base: String,
    message_base: String,
}

impl FeedEndpoints {
    /// Build endpoint URLs
    ///
    /// `page_size` bounds how many items one data request returns.
    pub fn new(
        base_url: &str,
        username: &str,
        group: &str,
        text_feed: &str,
        message_feed: &str,
        page_size: usize,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let text_base = format!("{}/{}/feeds/{}.{}/data", base, username, group, text_feed);
        let message_base = format!("{}/{}/feeds/{}.{}/data", base, username, group, message_feed);
        Self {
            settings: format!("{}/{}/groups/{}", base, username, group),
            text: format!("{}?limit={}", text_base, page_size),
            messages: format!("{}?limit={}", message_base, page_size),
            text_base,
            message_base,
        }
    }

    /// Plain-text feed page of items created at or before `epoch`
    pub fn text_before(&self, epoch: u64) -> String {
        page_before(&self.text, epoch)
    }

    /// Structured-message feed page of items created at or before `epoch`
    pub fn messages_before(&self, epoch: u64) -> String {
        page_before(&self.messages, epoch)
    }

    /// URL of one item in the plain-text feed
    pub fn text_item(&self, id: &ItemId) -> String {
        format!("{}/{}", self.text_base, id)
    }

    /// URL of one item in the structured-message feed
    pub fn message_item(&self, id: &ItemId) -> String {
        format!("{}/{}", self.message_base, id)
    }
}

fn page_before(page: &str, epoch: u64) -> String {
    match timestamp(epoch) {
        Some(end) => format!("{}&end_time={}", page, end),
        None => String::from(page),
    }
}

/// Seconds since the epoch as an RFC 3339 UTC timestamp
///
/// Timestamps have a fixed width, so they compare in time order as text.
pub fn timestamp(epoch: u64) -> Option<String> {
    let secs = i64::try_from(epoch).ok()?;
    let time = DateTime::from_timestamp(secs, 0)?;
    Some(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let endpoints = FeedEndpoints::new(
            "https://io.example.com/api/v2/",
            "alice",
            "scroller",
            "text-queue",
            "message-queue",
            20,
        );
        assert_eq!(
            endpoints.settings,
            "https://io.example.com/api/v2/alice/groups/scroller"
        );
        assert_eq!(
            endpoints.text,
            "https://io.example.com/api/v2/alice/feeds/scroller.text-queue/data?limit=20"
        );
        let id = ItemId::new("0ABC").unwrap();
        assert_eq!(
            endpoints.message_item(&id),
            "https://io.example.com/api/v2/alice/feeds/scroller.message-queue/data/0ABC"
        );
        assert_eq!(
            endpoints.messages_before(1_700_000_000),
            "https://io.example.com/api/v2/alice/feeds/scroller.message-queue/data?limit=20&end_time=2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn test_timestamps_order_as_text() {
        assert_eq!(timestamp(0).as_deref(), Some("1970-01-01T00:00:00Z"));
        let earlier = timestamp(1_006).unwrap();
        let later = timestamp(86_400 * 400).unwrap();
        assert!(earlier < later);
        assert_eq!(timestamp(u64::MAX), None);
    }
}
