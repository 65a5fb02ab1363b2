//! Property use-case service.
//!
//! # Responsibility
//! - Provide property create/get/list/update/delete entry points.
//! - Expose assignment transitions (`move_property`) as a first-class call.
//!
//! # Invariants
//! - Input is normalized before validation and persistence.
//! - Assignment changes always go through the store, never around it.

use crate::model::location::LocationId;
use crate::model::property::{
    LocationAssignment, NewProperty, PopulatedProperty, Property, PropertyId, PropertyUpdate,
};
use crate::repo::property_repo::PropertyRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::with_retry;
use log::info;

/// Use-case service wrapper for property operations.
pub struct PropertyService<R: PropertyRepository> {
    repo: R,
}

impl<R: PropertyRepository> PropertyService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one property, optionally located.
    pub fn create_property(&self, input: NewProperty) -> RepoResult<Property> {
        let input = input.normalized();
        let property = with_retry("create_property", || self.repo.create_property(&input))?;
        info!(
            "event=property_create module=service status=ok property={} located={}",
            property.id,
            property.location_ref.is_some()
        );
        Ok(property)
    }

    /// Gets one property with its location as an id.
    pub fn get_property(&self, id: PropertyId) -> RepoResult<Property> {
        self.repo
            .get_property(id)?
            .ok_or(RepoError::PropertyNotFound(id))
    }

    /// Gets one property with its location resolved.
    pub fn get_populated_property(&self, id: PropertyId) -> RepoResult<PopulatedProperty> {
        self.repo
            .get_populated_property(id)?
            .ok_or(RepoError::PropertyNotFound(id))
    }

    /// Lists all properties with locations as ids.
    pub fn list_properties(&self) -> RepoResult<Vec<Property>> {
        self.repo.list_properties()
    }

    /// Lists all properties with locations resolved.
    pub fn list_populated_properties(&self) -> RepoResult<Vec<PopulatedProperty>> {
        self.repo.list_populated_properties()
    }

    /// Applies a partial update, moving the property if `Location` is present.
    pub fn update_property(&self, id: PropertyId, update: PropertyUpdate) -> RepoResult<()> {
        let update = update.normalized();
        with_retry("update_property", || self.repo.update_property(id, &update))?;
        info!(
            "event=property_update module=service status=ok property={} assignment={} empty={}",
            id,
            describe_assignment(update.assignment()),
            update.is_empty()
        );
        Ok(())
    }

    /// Assigns, reassigns or unassigns one property.
    pub fn move_property(&self, id: PropertyId, target: Option<LocationId>) -> RepoResult<()> {
        self.update_property(id, PropertyUpdate::assign(target))
    }

    /// Deletes one property.
    pub fn delete_property(&self, id: PropertyId) -> RepoResult<()> {
        with_retry("delete_property", || self.repo.delete_property(id))?;
        info!(
            "event=property_delete module=service status=ok property={}",
            id
        );
        Ok(())
    }
}

fn describe_assignment(assignment: LocationAssignment) -> String {
    match assignment {
        LocationAssignment::Unchanged => "unchanged".to_string(),
        LocationAssignment::Assign(location_id) => format!("assign:{location_id}"),
        LocationAssignment::Unassign => "unassign".to_string(),
    }
}
