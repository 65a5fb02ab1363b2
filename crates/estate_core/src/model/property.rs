//! Property domain model.
//!
//! # Responsibility
//! - Define the canonical property record and its populated read view.
//! - Define create/update inputs and the location assignment transition.
//!
//! # Invariants
//! - `location_ref` is either `None` (unassigned) or the id of an existing
//!   location that lists this property in its `property_refs`.

use crate::model::fields::{nullable, nullable_id, nullable_number, optional_id, optional_number};
use crate::model::location::{Location, LocationId};
use crate::model::validation::{trim_to_option, validate_poster, validate_price, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a property.
pub type PropertyId = Uuid;

/// Poster used when a property is created without one.
pub const DEFAULT_PROPERTY_POSTER: &str = "https://saterdesign.com/cdn/shop/products/property-placeholder_a9ec7710-1f1e-4654-9893-28c34e3b6399.jpg?v=1500393334";

/// Kind of listed property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Plot,
    #[default]
    Flat,
    #[serde(rename = "Independent Home", alias = "IndependentHome")]
    IndependentHome,
}

impl PropertyType {
    /// Storage representation used in `properties.property_type`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Plot => "plot",
            Self::Flat => "flat",
            Self::IndependentHome => "independent_home",
        }
    }

    /// Parses the storage representation.
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "plot" => Some(Self::Plot),
            "flat" => Some(Self::Flat),
            "independent_home" => Some(Self::IndependentHome),
            _ => None,
        }
    }
}

/// Canonical property record with its forward reference as an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub property_name: String,
    pub property_poster: String,
    pub property_type: PropertyType,
    pub property_price: Option<f64>,
    /// Forward reference, maintained only by the relationship maintainer.
    #[serde(rename = "Location")]
    pub location_ref: Option<LocationId>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Property with `location_ref` resolved to the full location record.
///
/// `location` is `None` both for unassigned properties and for a reference
/// that could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedProperty {
    pub id: PropertyId,
    pub property_name: String,
    pub property_poster: String,
    pub property_type: PropertyType,
    pub property_price: Option<f64>,
    #[serde(rename = "Location")]
    pub location: Option<Location>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PopulatedProperty {
    /// Builds the view from a property and its resolved location.
    pub fn new(property: Property, location: Option<Location>) -> Self {
        Self {
            id: property.id,
            property_name: property.property_name,
            property_poster: property.property_poster,
            property_type: property.property_type,
            property_price: property.property_price,
            location,
            created_at: property.created_at,
            updated_at: property.updated_at,
        }
    }
}

/// Input for creating a property.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProperty {
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_poster: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default, deserialize_with = "optional_number")]
    pub property_price: Option<f64>,
    #[serde(default, rename = "Location", deserialize_with = "optional_id")]
    pub location_ref: Option<LocationId>,
}

impl NewProperty {
    /// Creates input with a name and every other field defaulted.
    pub fn named(property_name: impl Into<String>) -> Self {
        Self {
            property_name: Some(property_name.into()),
            ..Self::default()
        }
    }

    /// Sets the owning location.
    pub fn located_at(mut self, location_id: LocationId) -> Self {
        self.location_ref = Some(location_id);
        self
    }

    /// Trims text fields and collapses blank optionals to `None`.
    pub fn normalized(self) -> Self {
        Self {
            property_name: trim_to_option(self.property_name),
            property_poster: trim_to_option(self.property_poster),
            ..self
        }
    }

    /// Checks field rules. Expects normalized input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_poster("propertyPoster", self.property_poster.as_deref())?;
        validate_price(self.property_price)
    }
}

/// Partial update for a property.
///
/// `location_ref`: absent leaves the assignment alone, `null` (or `""`)
/// unassigns, an id assigns or reassigns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyUpdate {
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub property_poster: Option<Option<String>>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default, deserialize_with = "nullable_number")]
    pub property_price: Option<Option<f64>>,
    #[serde(default, rename = "Location", deserialize_with = "nullable_id")]
    pub location_ref: Option<Option<LocationId>>,
}

impl PropertyUpdate {
    /// Update that only moves the property.
    pub fn assign(location_ref: Option<LocationId>) -> Self {
        Self {
            location_ref: Some(location_ref),
            ..Self::default()
        }
    }

    /// Returns whether the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.property_name.is_none()
            && self.property_poster.is_none()
            && self.property_type.is_none()
            && self.property_price.is_none()
            && self.location_ref.is_none()
    }

    /// Trims text fields. A blank poster resets to the default placeholder.
    pub fn normalized(self) -> Self {
        Self {
            property_name: self.property_name.map(|name| name.trim().to_string()),
            property_poster: self.property_poster.map(trim_to_option),
            ..self
        }
    }

    /// Checks field rules for present fields. Expects normalized input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(poster) = &self.property_poster {
            validate_poster("propertyPoster", poster.as_deref())?;
        }
        if let Some(price) = self.property_price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Assignment transition requested by this update.
    pub fn assignment(&self) -> LocationAssignment {
        match self.location_ref {
            None => LocationAssignment::Unchanged,
            Some(None) => LocationAssignment::Unassign,
            Some(Some(location_id)) => LocationAssignment::Assign(location_id),
        }
    }
}

/// Location assignment transition of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAssignment {
    /// Keep the current assignment.
    Unchanged,
    /// Assign (or reassign) to the given location.
    Assign(LocationId),
    /// Clear the assignment.
    Unassign,
}

impl LocationAssignment {
    /// Target reference after the transition, given the current one.
    pub fn resolve(self, current: Option<LocationId>) -> Option<LocationId> {
        match self {
            Self::Unchanged => current,
            Self::Assign(location_id) => Some(location_id),
            Self::Unassign => None,
        }
    }
}
