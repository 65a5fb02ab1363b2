//! Field-level validation rules shared by location and property inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static POSTER_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").expect("poster uri pattern is valid")
});

/// Validation failure for listing input.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `cityName` is missing or blank after trim.
    BlankCityName,
    /// Poster value is not an absolute http(s) URI.
    InvalidPosterUri { field: &'static str, value: String },
    /// `propertyPrice` is negative or not a finite number.
    InvalidPrice(f64),
    /// Request body does not match the input shape (unknown field, bad type).
    Malformed(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankCityName => write!(f, "cityName must not be blank"),
            Self::InvalidPosterUri { field, value } => {
                write!(f, "{field} must be an http(s) URI, got `{value}`")
            }
            Self::InvalidPrice(value) => {
                write!(f, "propertyPrice must be a finite non-negative number, got {value}")
            }
            Self::Malformed(message) => write!(f, "malformed input: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Checks an optional poster URI.
pub fn validate_poster(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(uri) if !POSTER_URI.is_match(uri) => Err(ValidationError::InvalidPosterUri {
            field,
            value: uri.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Checks an optional price.
pub fn validate_price(value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(price) if !price.is_finite() || price < 0.0 => Err(ValidationError::InvalidPrice(price)),
        _ => Ok(()),
    }
}

/// Trims text; blank values collapse to `None`.
pub fn trim_to_option(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
