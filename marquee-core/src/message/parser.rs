//! Raw payload to message conversion
//!
//! Structured payloads are validated element by element: a bad element is
//! dropped with a warning and the rest of the message survives. A message is
//! only rejected outright when its document is unreadable or nothing
//! displayable remains.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use marquee_protocol::WireMessage;

use super::{Element, ElementKind, Message, Origin, MAX_CATEGORY_LEN};
use crate::style::Color;

/// Why a payload produced no message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Payload does not decode into the structured message shape
    Malformed,
    /// No displayable text remains after validation
    Empty,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed => f.write_str("malformed message"),
            ParseError::Empty => f.write_str("message has no text"),
        }
    }
}

/// Parser counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseStats {
    pub parsed: u32,
    pub malformed: u32,
    pub empty: u32,
    /// Individual elements skipped inside otherwise valid messages
    pub dropped_elements: u32,
}

/// Converts raw feed payloads into messages
#[derive(Debug, Default)]
pub struct MessageParser {
    stats: ParseStats,
}

impl MessageParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Parse a raw payload
    ///
    /// The returned message has `sequence_id` 0 and no item id; the queue
    /// manager stamps both on admission.
    pub fn parse(&mut self, origin: Origin, raw: &str) -> Result<Message, ParseError> {
        let result = match origin {
            Origin::PlainText => parse_plain(raw),
            Origin::Structured => self.parse_structured(raw),
        };
        match result {
            Ok(_) => self.stats.parsed += 1,
            Err(ParseError::Malformed) => {
                self.stats.malformed += 1;
                warn!("Discarding malformed {} payload", origin);
            }
            Err(ParseError::Empty) => {
                self.stats.empty += 1;
                warn!("Discarding {} payload with no text", origin);
            }
        }
        result
    }

    fn parse_structured(&mut self, raw: &str) -> Result<Message, ParseError> {
        let wire = WireMessage::decode(raw).map_err(|_| ParseError::Malformed)?;

        let name = wire.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Err(ParseError::Malformed);
        }
        let mut category = heapless::String::<MAX_CATEGORY_LEN>::new();
        for c in name.chars() {
            if category.push(c).is_err() {
                break;
            }
        }

        let mut elements = Vec::with_capacity(wire.elements.len());
        for (index, element) in wire.elements.into_iter().enumerate() {
            let Some(kind) = element.tag.as_deref().and_then(ElementKind::from_tag) else {
                self.stats.dropped_elements += 1;
                warn!("Element {} of '{}': unknown type, skipped", index, category.as_str());
                continue;
            };
            match element.data.as_deref().and_then(|data| normalize(kind, data)) {
                Some(payload) => elements.push(Element { kind, payload }),
                None => {
                    self.stats.dropped_elements += 1;
                    warn!(
                        "Element {} of '{}': invalid {} data, skipped",
                        index,
                        category.as_str(),
                        kind
                    );
                }
            }
        }

        if !elements.iter().any(|e| e.kind == ElementKind::Text) {
            return Err(ParseError::Empty);
        }

        Ok(Message {
            origin: Origin::Structured,
            category: Some(category),
            elements,
            sequence_id: 0,
            item_id: None,
        })
    }
}

fn parse_plain(raw: &str) -> Result<Message, ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(Message::system(text))
}

/// Validate and normalize one element payload
fn normalize(kind: ElementKind, data: &str) -> Option<String> {
    match kind {
        // Leading and trailing spaces are part of the layout
        ElementKind::Text => (!data.trim().is_empty()).then(|| data.to_string()),
        ElementKind::Color => Color::parse(data).map(|c| c.hex().as_str().to_string()),
        ElementKind::Effect => {
            let effect = data.trim();
            (!effect.is_empty()).then(|| effect.to_ascii_lowercase())
        }
        ElementKind::Font | ElementKind::Background | ElementKind::Icon => {
            let value = data.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(msg: &Message) -> Vec<ElementKind> {
        msg.elements.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_plain_text_single_element() {
        let mut parser = MessageParser::new();
        let msg = parser.parse(Origin::PlainText, "  Hello  ").unwrap();
        assert_eq!(msg.origin, Origin::PlainText);
        assert_eq!(msg.category, None);
        assert_eq!(msg.elements, alloc::vec![Element::new(ElementKind::Text, "Hello")]);
    }

    #[test]
    fn test_plain_text_is_not_decoded() {
        let mut parser = MessageParser::new();
        let raw = r#"{"name": "x", "elements": []}"#;
        let msg = parser.parse(Origin::PlainText, raw).unwrap();
        assert_eq!(msg.elements[0].payload, raw);
    }

    #[test]
    fn test_blank_plain_text_is_empty() {
        let mut parser = MessageParser::new();
        assert_eq!(parser.parse(Origin::PlainText, " \n"), Err(ParseError::Empty));
        assert_eq!(parser.stats().empty, 1);
    }

    #[test]
    fn test_structured_keeps_order_and_normalizes() {
        let mut parser = MessageParser::new();
        let msg = parser
            .parse(
                Origin::Structured,
                r#"{"name": "bday", "elements": [
                    {"type": "font", "data": " comic8 "},
                    {"type": "color", "data": "ff8800"},
                    {"type": "text", "data": "Hi "},
                    {"type": "fx", "data": "Top2Bottom"}
                ]}"#,
            )
            .unwrap();
        assert_eq!(msg.category.as_deref(), Some("bday"));
        assert_eq!(
            kinds(&msg),
            [ElementKind::Font, ElementKind::Color, ElementKind::Text, ElementKind::Effect]
        );
        assert_eq!(msg.elements[0].payload, "comic8");
        assert_eq!(msg.elements[1].payload, "#FF8800");
        assert_eq!(msg.elements[2].payload, "Hi ");
        assert_eq!(msg.elements[3].payload, "top2bottom");
    }

    #[test]
    fn test_bad_elements_are_dropped_not_fatal() {
        let mut parser = MessageParser::new();
        let msg = parser
            .parse(
                Origin::Structured,
                r#"{"name": "n", "elements": [
                    {"type": "sparkle", "data": "x"},
                    {"type": "color", "data": "not-a-color"},
                    {"type": "font", "data": ""},
                    {"data": "no type"},
                    {"type": "text", "data": "kept"}
                ]}"#,
            )
            .unwrap();
        assert_eq!(kinds(&msg), [ElementKind::Text]);
        assert_eq!(parser.stats().dropped_elements, 4);
    }

    #[test]
    fn test_structured_without_text_is_empty() {
        let mut parser = MessageParser::new();
        let result = parser.parse(
            Origin::Structured,
            r##"{"name": "n", "elements": [{"type": "color", "data": "#FFFFFF"}, {"type": "text", "data": "  "}]}"##,
        );
        assert_eq!(result, Err(ParseError::Empty));
    }

    #[test]
    fn test_structured_malformed() {
        let mut parser = MessageParser::new();
        assert_eq!(parser.parse(Origin::Structured, "Hello"), Err(ParseError::Malformed));
        assert_eq!(
            parser.parse(Origin::Structured, r#"{"elements": [{"type": "text", "data": "x"}]}"#),
            Err(ParseError::Malformed)
        );
        assert_eq!(parser.stats().malformed, 2);
        assert_eq!(parser.stats().parsed, 0);
    }
}
