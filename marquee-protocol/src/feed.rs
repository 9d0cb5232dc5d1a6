//! Feed service payloads
//!
//! A data request answers with a JSON array of items, newest first:
//! ```text
//! [{"id": "0F3A...", "value": "Hello", "created_epoch": 1700000000}, ...]
//! ```
//! A group request answers with the latest value of every feed in the group:
//! ```text
//! {"feeds": [{"key": "scroller.font", "last_value": "lemon"}, ...]}
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::{self, Write};

use serde_json::{Map, Value};

use crate::error::WireError;

/// Maximum item identifier length in bytes
pub const MAX_ITEM_ID_LEN: usize = 48;

/// Feed-assigned item identifier
///
/// Identifiers order by length first, then byte-wise. Numeric ids sort
/// numerically (`"9" < "10"`) and fixed-width time-ordered ids sort by
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ItemId(heapless::String<MAX_ITEM_ID_LEN>);

impl ItemId {
    /// Create an identifier from its textual form
    pub fn new(raw: &str) -> Result<Self, WireError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WireError::MissingField);
        }
        let mut id = heapless::String::new();
        id.push_str(raw).map_err(|_| WireError::IdTooLong)?;
        Ok(Self(id))
    }

    /// Create an identifier from a numeric id
    pub fn from_number(value: u64) -> Self {
        let mut id = heapless::String::new();
        // u64 has at most 20 digits
        let _ = write!(id, "{}", value);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s).ok(),
            Value::Number(n) => n.as_u64().map(Self::from_number),
            _ => None,
        }
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a data feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: ItemId,
    /// Item value; a JSON structure value is re-serialized to text
    pub value: String,
    /// Creation time in seconds since the epoch, when the service reports it
    pub created_epoch: Option<u64>,
}

impl FeedItem {
    fn from_value(entry: Value) -> Option<Self> {
        let Value::Object(mut fields) = entry else {
            return None;
        };
        let id = ItemId::from_value(fields.get("id")?)?;
        let value = match fields.remove("value")? {
            Value::String(s) if !s.trim().is_empty() => s,
            Value::String(_) | Value::Null => return None,
            other => serde_json::to_string(&other).ok()?,
        };
        let created_epoch = fields.get("created_epoch").and_then(epoch_seconds);
        Some(Self {
            id,
            value,
            created_epoch,
        })
    }
}

fn epoch_seconds(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// Decode a data feed response into items sorted oldest-first
///
/// Entries without an identifier or with an empty value are skipped; the rest
/// of the batch is still returned.
pub fn decode_items(body: &[u8]) -> Result<Vec<FeedItem>, WireError> {
    let doc: Value = serde_json::from_slice(body).map_err(|_| WireError::NotJson)?;
    let Value::Array(entries) = doc else {
        return Err(WireError::UnexpectedShape);
    };

    let mut items: Vec<FeedItem> = entries.into_iter().filter_map(FeedItem::from_value).collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(items)
}

/// Latest value of one feed in a settings group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSetting {
    /// Full feed key, e.g. `scroller.font`
    pub key: String,
    pub value: String,
}

/// Decode a group snapshot into its (key, value) pairs
///
/// Feeds with a null `last_value` have never been written and are left out.
pub fn decode_group(body: &[u8]) -> Result<Vec<FeedSetting>, WireError> {
    let doc: Value = serde_json::from_slice(body).map_err(|_| WireError::NotJson)?;
    let Value::Object(mut group) = doc else {
        return Err(WireError::UnexpectedShape);
    };
    let Some(Value::Array(feeds)) = group.remove("feeds") else {
        return Err(WireError::UnexpectedShape);
    };

    Ok(feeds
        .into_iter()
        .filter_map(|feed| match feed {
            Value::Object(fields) => setting_from_fields(fields),
            _ => None,
        })
        .collect())
}

fn setting_from_fields(mut fields: Map<String, Value>) -> Option<FeedSetting> {
    let key = match fields.remove("key")? {
        Value::String(key) if !key.is_empty() => key,
        _ => return None,
    };
    let value = match fields.remove("last_value")? {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(FeedSetting { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_numeric_order() {
        let nine = ItemId::new("9").unwrap();
        let ten = ItemId::new("10").unwrap();
        assert!(nine < ten);
        assert_eq!(ItemId::from_number(10), ten);
    }

    #[test]
    fn test_item_id_rejects_blank_and_oversized() {
        assert_eq!(ItemId::new("  "), Err(WireError::MissingField));
        let long = "x".repeat(MAX_ITEM_ID_LEN + 1);
        assert_eq!(ItemId::new(&long), Err(WireError::IdTooLong));
    }

    #[test]
    fn test_decode_items_sorted_oldest_first() {
        let body = br#"[
            {"id": "12", "value": "newest", "created_epoch": 1700000200},
            {"id": 3, "value": "oldest", "created_epoch": 1700000000},
            {"id": "7", "value": "middle"}
        ]"#;
        let items = decode_items(body).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["3", "7", "12"]);
        assert_eq!(items[0].created_epoch, Some(1_700_000_000));
        assert_eq!(items[1].created_epoch, None);
    }

    #[test]
    fn test_decode_items_skips_incomplete_entries() {
        let body = br#"[{"value": "no id"}, {"id": "1", "value": ""}, {"id": "2", "value": "ok"}, 5]"#;
        let items = decode_items(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "ok");
    }

    #[test]
    fn test_decode_items_structured_value_is_reserialized() {
        let body = br#"[{"id": "1", "value": {"name": "n", "elements": []}}]"#;
        let items = decode_items(body).unwrap();
        assert!(items[0].value.contains("\"elements\""));
    }

    #[test]
    fn test_decode_items_rejects_non_array() {
        assert_eq!(decode_items(b"{}"), Err(WireError::UnexpectedShape));
        assert_eq!(decode_items(b"<html>"), Err(WireError::NotJson));
    }

    #[test]
    fn test_decode_group() {
        let body = br#"{"name": "scroller", "feeds": [
            {"key": "scroller.font", "last_value": "lemon"},
            {"key": "scroller.icon", "last_value": null},
            {"key": "scroller.system-on", "last_value": true}
        ]}"#;
        let settings = decode_group(body).unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0].key, "scroller.font");
        assert_eq!(settings[1].value, "true");
    }

    #[test]
    fn test_decode_group_requires_feeds() {
        assert_eq!(decode_group(br#"{"name": "x"}"#), Err(WireError::UnexpectedShape));
    }
}
