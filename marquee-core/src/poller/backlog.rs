//! Oldest-first reads of a newest-first feed
//!
//! A data request answers with only the newest `page_size` items. When a page
//! comes back full, older items can sit behind it, and admitting from that
//! page alone would lift the watermark over them for good. The walk follows
//! the creation time of each page's oldest item until a page comes back
//! short, a page reaches down to the watermark, or this poll's page budget
//! runs out. In the last case the cursor is kept and the next poll carries on
//! from it. Only the oldest `page_size` items are held in memory.

use alloc::string::String;
use alloc::vec::Vec;

use marquee_protocol::{FeedItem, ItemId};

use super::{PollError, ResilientPoller};
use crate::traits::{Clock, FeedTransport};

/// Paging state for one data feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlog {
    page_size: usize,
    max_pages: u8,
    /// Creation time the next walk starts from
    resume: Option<u64>,
}

impl Backlog {
    pub fn new(page_size: u8, max_pages: u8) -> Self {
        Self {
            page_size: page_size.max(1) as usize,
            max_pages: max_pages.max(1),
            resume: None,
        }
    }

    pub fn resume(&self) -> Option<u64> {
        self.resume
    }

    /// Fetch the oldest items the feed holds, oldest first
    ///
    /// `page` builds a request URL: `None` for the newest page, `Some(t)` for
    /// items created at or before `t`. Returns `Ok(None)` when the page budget
    /// ran out before the oldest item was reached.
    pub fn fetch<T, C, F>(
        &mut self,
        poller: &mut ResilientPoller<T>,
        watermark: Option<&ItemId>,
        clock: &mut C,
        page: F,
    ) -> Result<Option<Vec<FeedItem>>, PollError>
    where
        T: FeedTransport,
        C: Clock,
        F: Fn(Option<u64>) -> String,
    {
        let started_at = self.resume;
        let mut cursor = started_at;
        let mut kept: Vec<FeedItem> = Vec::new();

        for _ in 0..self.max_pages {
            let items = poller.poll_items(&page(cursor), clock)?;
            let full = items.len() >= self.page_size;
            let oldest = items.first().map(|item| (item.id.clone(), item.created_epoch));
            let fresh = keep_oldest(&mut kept, items, self.page_size);

            let reached_seen = oldest
                .as_ref()
                .is_some_and(|(id, _)| watermark.is_some_and(|mark| id <= mark));
            let next = match oldest {
                Some((_, Some(epoch))) if full && fresh > 0 && !reached_seen => Some(epoch),
                Some((_, None)) if full && fresh > 0 && !reached_seen => {
                    warn!("Feed items carry no creation time, cannot page back");
                    None
                }
                _ => None,
            };

            match next {
                Some(epoch) => cursor = Some(epoch),
                None => {
                    self.settle(started_at, &kept, watermark);
                    return Ok(Some(kept));
                }
            }
        }

        warn!("Feed backlog deeper than {} pages, continuing next poll", self.max_pages);
        self.resume = cursor;
        Ok(None)
    }

    /// Keep a resumed cursor while items at or before it are still pending
    fn settle(&mut self, started_at: Option<u64>, kept: &[FeedItem], watermark: Option<&ItemId>) {
        let pending = kept
            .iter()
            .any(|item| !watermark.is_some_and(|mark| item.id <= *mark));
        self.resume = started_at.filter(|_| pending);
    }
}

/// Add items not already kept, then keep only the oldest `limit`
///
/// Returns how many items were new.
fn keep_oldest(kept: &mut Vec<FeedItem>, items: Vec<FeedItem>, limit: usize) -> usize {
    let mut fresh = 0;
    for item in items {
        if !kept.iter().any(|k| k.id == item.id) {
            kept.push(item);
            fresh += 1;
        }
    }
    kept.sort_by(|a, b| a.id.cmp(&b.id));
    kept.truncate(limit);
    fresh
}
