//! Serde field adapters for form-shaped JSON input.
//!
//! HTML forms submit `""` for "nothing selected" and often send numbers as
//! text. These adapters normalise both before validation sees the value, and
//! keep "field absent" apart from "field explicitly null" for partial updates.

use serde::de::{self, Deserialize, Deserializer};
use uuid::Uuid;

/// Wraps any present value (including `null`) in `Some`.
///
/// Combined with `#[serde(default)]`, an absent field stays `None` while an
/// explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses an optional id where `null` and `""` both mean "none".
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Uuid::parse_str(text)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid id `{text}`"))),
    }
}

/// [`optional_id`] for partial updates: absent stays `None`.
pub fn nullable_id<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_id(deserializer).map(Some)
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Parses an optional number given as JSON number or numeric text.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid number `{trimmed}`")))
        }
    }
}

/// [`optional_number`] for partial updates: absent stays `None`.
pub fn nullable_number<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_number(deserializer).map(Some)
}
