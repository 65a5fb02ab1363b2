//! Location domain model.
//!
//! # Responsibility
//! - Define the canonical location record and its populated read view.
//! - Define create/update inputs and the delete policy.
//!
//! # Invariants
//! - `city_name` is non-blank and unique across locations.
//! - `property_refs` lists each located property exactly once, in the order
//!   the properties were assigned.

use crate::model::fields::nullable;
use crate::model::property::{Property, PropertyId};
use crate::model::validation::{trim_to_option, validate_poster, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a location.
pub type LocationId = Uuid;

/// Canonical location record with back-references as ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub city_name: String,
    pub city_poster: Option<String>,
    pub street_name: String,
    /// Back-reference list, maintained only by the relationship maintainer.
    pub property_refs: Vec<PropertyId>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Location with `property_refs` resolved to full property records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedLocation {
    pub id: LocationId,
    pub city_name: String,
    pub city_poster: Option<String>,
    pub street_name: String,
    pub property_refs: Vec<Property>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PopulatedLocation {
    /// Builds the view from a location and its already resolved properties.
    pub fn new(location: Location, properties: Vec<Property>) -> Self {
        Self {
            id: location.id,
            city_name: location.city_name,
            city_poster: location.city_poster,
            street_name: location.street_name,
            property_refs: properties,
            created_at: location.created_at,
            updated_at: location.updated_at,
        }
    }
}

/// Input for creating a location. New locations start with no properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLocation {
    #[serde(default)]
    pub city_name: String,
    #[serde(default)]
    pub city_poster: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
}

impl NewLocation {
    /// Creates input with only the required city name.
    pub fn new(city_name: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            ..Self::default()
        }
    }

    /// Trims text fields and collapses blank optionals to `None`.
    pub fn normalized(self) -> Self {
        Self {
            city_name: self.city_name.trim().to_string(),
            city_poster: trim_to_option(self.city_poster),
            street_name: trim_to_option(self.street_name),
        }
    }

    /// Checks field rules. Expects normalized input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.city_name.trim().is_empty() {
            return Err(ValidationError::BlankCityName);
        }
        validate_poster("cityPoster", self.city_poster.as_deref())
    }
}

/// Partial update for a location.
///
/// `None` leaves a field untouched. `city_poster: Some(None)` clears it.
/// Back-references are not client-writable, so `propertyRefs` is rejected
/// as an unknown field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocationUpdate {
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub city_poster: Option<Option<String>>,
    #[serde(default)]
    pub street_name: Option<String>,
}

impl LocationUpdate {
    /// Returns whether the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.city_name.is_none() && self.city_poster.is_none() && self.street_name.is_none()
    }

    /// Trims text fields; a blank poster becomes an explicit clear.
    pub fn normalized(self) -> Self {
        Self {
            city_name: self.city_name.map(|name| name.trim().to_string()),
            city_poster: self.city_poster.map(trim_to_option),
            street_name: self.street_name.map(|street| street.trim().to_string()),
        }
    }

    /// Checks field rules for present fields. Expects normalized input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.city_name {
            if name.trim().is_empty() {
                return Err(ValidationError::BlankCityName);
            }
        }
        if let Some(poster) = &self.city_poster {
            validate_poster("cityPoster", poster.as_deref())?;
        }
        Ok(())
    }
}

/// What happens to a deleted location's properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationDeletePolicy {
    /// Keep the properties and clear their location reference.
    #[default]
    Orphan,
    /// Delete every property located at the location.
    Cascade,
}

impl LocationDeletePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orphan => "orphan",
            Self::Cascade => "cascade",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LocationDeletePolicy, LocationUpdate, NewLocation};
    use crate::model::validation::ValidationError;

    #[test]
    fn new_location_normalizes_and_validates() {
        let input = NewLocation {
            city_name: "  Pune ".to_string(),
            city_poster: Some("   ".to_string()),
            street_name: Some(" FC Road ".to_string()),
        }
        .normalized();

        assert_eq!(input.city_name, "Pune");
        assert_eq!(input.city_poster, None);
        assert_eq!(input.street_name.as_deref(), Some("FC Road"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_city_name_is_rejected() {
        let input = NewLocation::new("   ").normalized();
        assert_eq!(input.validate(), Err(ValidationError::BlankCityName));
    }

    #[test]
    fn update_with_blank_poster_becomes_clear() {
        let update = LocationUpdate {
            city_poster: Some(Some("  ".to_string())),
            ..LocationUpdate::default()
        }
        .normalized();
        assert_eq!(update.city_poster, Some(None));
        assert!(!update.is_empty());
    }

    #[test]
    fn delete_policy_defaults_to_orphan() {
        assert_eq!(LocationDeletePolicy::default(), LocationDeletePolicy::Orphan);
        assert_eq!(LocationDeletePolicy::Cascade.as_str(), "cascade");
    }
}
