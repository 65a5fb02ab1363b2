//! Core domain logic for the estate listings service.
//! This crate is the single source of truth for location/property
//! referential integrity.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, Database, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::location::{
    Location, LocationDeletePolicy, LocationId, LocationUpdate, NewLocation, PopulatedLocation,
};
pub use model::property::{
    LocationAssignment, NewProperty, PopulatedProperty, Property, PropertyId, PropertyType,
    PropertyUpdate, DEFAULT_PROPERTY_POSTER,
};
pub use model::validation::ValidationError;
pub use repo::location_repo::{LocationDeletion, LocationRepository, SqliteLocationRepository};
pub use repo::property_repo::{PropertyRepository, SqlitePropertyRepository};
pub use repo::relation::{check_integrity, IntegrityReport, IntegrityViolation};
pub use repo::{ErrorKind, RepoError, RepoResult};
pub use service::location_service::LocationService;
pub use service::property_service::PropertyService;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
