//! Location use-case service.
//!
//! # Responsibility
//! - Provide location create/get/list/update/delete entry points.
//! - Turn missing records into `NotFound` errors for callers.
//!
//! # Invariants
//! - Input is normalized before validation and persistence.
//! - Service APIs never bypass store validation or the relationship maintainer.

use crate::model::location::{
    Location, LocationDeletePolicy, LocationId, LocationUpdate, NewLocation, PopulatedLocation,
};
use crate::repo::location_repo::{LocationDeletion, LocationRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::with_retry;
use log::info;

/// Use-case service wrapper for location operations.
pub struct LocationService<R: LocationRepository> {
    repo: R,
}

impl<R: LocationRepository> LocationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one location.
    pub fn create_location(&self, input: NewLocation) -> RepoResult<Location> {
        let input = input.normalized();
        let location = with_retry("create_location", || self.repo.create_location(&input))?;
        info!(
            "event=location_create module=service status=ok location={}",
            location.id
        );
        Ok(location)
    }

    /// Gets one location with back-references as ids.
    pub fn get_location(&self, id: LocationId) -> RepoResult<Location> {
        self.repo
            .get_location(id)?
            .ok_or(RepoError::LocationNotFound(id))
    }

    /// Gets one location with its properties resolved.
    pub fn get_populated_location(&self, id: LocationId) -> RepoResult<PopulatedLocation> {
        self.repo
            .get_populated_location(id)?
            .ok_or(RepoError::LocationNotFound(id))
    }

    /// Lists all locations with back-references as ids.
    pub fn list_locations(&self) -> RepoResult<Vec<Location>> {
        self.repo.list_locations()
    }

    /// Lists all locations with their properties resolved.
    pub fn list_populated_locations(&self) -> RepoResult<Vec<PopulatedLocation>> {
        self.repo.list_populated_locations()
    }

    /// Applies a partial update. An empty update only checks existence.
    pub fn update_location(&self, id: LocationId, update: LocationUpdate) -> RepoResult<()> {
        let update = update.normalized();
        with_retry("update_location", || self.repo.update_location(id, &update))?;
        info!(
            "event=location_update module=service status=ok location={} empty={}",
            id,
            update.is_empty()
        );
        Ok(())
    }

    /// Deletes one location, applying `policy` to its properties.
    pub fn delete_location(
        &self,
        id: LocationId,
        policy: LocationDeletePolicy,
    ) -> RepoResult<LocationDeletion> {
        let deletion = with_retry("delete_location", || self.repo.delete_location(id, policy))?;
        info!(
            "event=location_delete module=service status=ok location={} policy={} affected={}",
            id,
            policy.as_str(),
            deletion.affected_properties.len()
        );
        Ok(deletion)
    }
}
