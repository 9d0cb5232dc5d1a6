use core::fmt;

/// Errors raised while decoding a feed service payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Body is not valid JSON
    NotJson,
    /// JSON is valid but not the expected document shape
    UnexpectedShape,
    /// A required field is absent or empty
    MissingField,
    /// Item identifier exceeds `MAX_ITEM_ID_LEN`
    IdTooLong,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::NotJson => f.write_str("body is not JSON"),
            WireError::UnexpectedShape => f.write_str("unexpected document shape"),
            WireError::MissingField => f.write_str("required field missing"),
            WireError::IdTooLong => f.write_str("item id too long"),
        }
    }
}
