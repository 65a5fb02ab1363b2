//! Location repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete APIs over `locations`.
//! - Resolve back-references to full property records on read (populate).
//! - Route location deletion through the relationship maintainer.
//!
//! # Invariants
//! - `city_name` uniqueness is checked under the write lock before insert
//!   or rename, so collisions surface as `DuplicateCityName`.
//! - Populated reads omit back-references that cannot be resolved.

use crate::model::location::{
    Location, LocationDeletePolicy, LocationId, LocationUpdate, NewLocation, PopulatedLocation,
};
use crate::model::property::{Property, PropertyId};
use crate::repo::relation::RelationshipMaintainer;
use crate::repo::rows::{
    begin_read, begin_write, ensure_connection_ready, load_all_locations, load_all_properties,
    load_location, parse_property_row, NOW_MS_SQL, PROPERTY_SELECT_SQL,
};
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of a location deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDeletion {
    pub location_id: LocationId,
    pub policy: LocationDeletePolicy,
    /// Properties that were detached (orphan) or deleted (cascade).
    pub affected_properties: Vec<PropertyId>,
}

/// Repository interface for location operations.
pub trait LocationRepository {
    /// Creates one location with an empty back-reference list.
    fn create_location(&self, input: &NewLocation) -> RepoResult<Location>;
    /// Loads one location with back-references as ids.
    fn get_location(&self, id: LocationId) -> RepoResult<Option<Location>>;
    /// Loads one location with back-references resolved.
    fn get_populated_location(&self, id: LocationId) -> RepoResult<Option<PopulatedLocation>>;
    /// Lists all locations in creation order.
    fn list_locations(&self) -> RepoResult<Vec<Location>>;
    /// Lists all locations with back-references resolved.
    fn list_populated_locations(&self) -> RepoResult<Vec<PopulatedLocation>>;
    /// Applies a partial update.
    fn update_location(&self, id: LocationId, update: &LocationUpdate) -> RepoResult<()>;
    /// Deletes one location, applying `policy` to its properties.
    fn delete_location(
        &self,
        id: LocationId,
        policy: LocationDeletePolicy,
    ) -> RepoResult<LocationDeletion>;
}

/// SQLite-backed location repository.
pub struct SqliteLocationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLocationRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LocationRepository for SqliteLocationRepository<'_> {
    fn create_location(&self, input: &NewLocation) -> RepoResult<Location> {
        input.validate()?;

        let tx = begin_write(self.conn)?;
        if city_name_taken(&tx, &input.city_name, None)? {
            return Err(RepoError::DuplicateCityName(input.city_name.clone()));
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO locations (
                location_uuid,
                city_name,
                city_poster,
                street_name
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                input.city_name.as_str(),
                input.city_poster.as_deref(),
                input.street_name.as_deref().unwrap_or_default(),
            ],
        )?;
        let location = load_location(&tx, id)?.ok_or(RepoError::LocationNotFound(id))?;
        tx.commit()?;
        Ok(location)
    }

    fn get_location(&self, id: LocationId) -> RepoResult<Option<Location>> {
        let tx = begin_read(self.conn)?;
        let location = load_location(&tx, id)?;
        tx.commit()?;
        Ok(location)
    }

    fn get_populated_location(&self, id: LocationId) -> RepoResult<Option<PopulatedLocation>> {
        let tx = begin_read(self.conn)?;
        let Some(location) = load_location(&tx, id)? else {
            return Ok(None);
        };
        let properties = load_located_properties(&tx, id)?;
        tx.commit()?;
        Ok(Some(populate(location, &index_by_id(properties))))
    }

    fn list_locations(&self) -> RepoResult<Vec<Location>> {
        let tx = begin_read(self.conn)?;
        let locations = load_all_locations(&tx)?;
        tx.commit()?;
        Ok(locations)
    }

    fn list_populated_locations(&self) -> RepoResult<Vec<PopulatedLocation>> {
        let tx = begin_read(self.conn)?;
        let locations = load_all_locations(&tx)?;
        let properties = index_by_id(load_all_properties(&tx)?);
        tx.commit()?;
        Ok(locations
            .into_iter()
            .map(|location| populate(location, &properties))
            .collect())
    }

    fn update_location(&self, id: LocationId, update: &LocationUpdate) -> RepoResult<()> {
        update.validate()?;

        let tx = begin_write(self.conn)?;
        if load_location(&tx, id)?.is_none() {
            return Err(RepoError::LocationNotFound(id));
        }
        if let Some(name) = &update.city_name {
            if city_name_taken(&tx, name, Some(id))? {
                return Err(RepoError::DuplicateCityName(name.clone()));
            }
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = &update.city_name {
            assignments.push("city_name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(poster) = &update.city_poster {
            assignments.push("city_poster = ?");
            bind_values.push(poster.clone().map_or(Value::Null, Value::Text));
        }
        if let Some(street) = &update.street_name {
            assignments.push("street_name = ?");
            bind_values.push(Value::Text(street.clone()));
        }

        if !assignments.is_empty() {
            bind_values.push(Value::Text(id.to_string()));
            tx.execute(
                &format!(
                    "UPDATE locations
                     SET {},
                         updated_at = {NOW_MS_SQL}
                     WHERE location_uuid = ?;",
                    assignments.join(", ")
                ),
                params_from_iter(bind_values),
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_location(
        &self,
        id: LocationId,
        policy: LocationDeletePolicy,
    ) -> RepoResult<LocationDeletion> {
        let tx = begin_write(self.conn)?;
        let location = load_location(&tx, id)?.ok_or(RepoError::LocationNotFound(id))?;

        let affected_properties = RelationshipMaintainer::new(&tx).on_location_deleted(
            id,
            &location.property_refs,
            policy,
        )?;
        tx.execute(
            "DELETE FROM locations WHERE location_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;

        Ok(LocationDeletion {
            location_id: id,
            policy,
            affected_properties,
        })
    }
}

fn city_name_taken(
    conn: &Connection,
    city_name: &str,
    except: Option<LocationId>,
) -> RepoResult<bool> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM locations
            WHERE city_name = ?1
              AND (?2 IS NULL OR location_uuid <> ?2)
        );",
        params![city_name, except.map(|id| id.to_string())],
        |row| row.get(0),
    )?;
    Ok(taken == 1)
}

fn load_located_properties(conn: &Connection, location_id: LocationId) -> RepoResult<Vec<Property>> {
    let mut stmt = conn.prepare(&format!(
        "{PROPERTY_SELECT_SQL}
         WHERE property_uuid IN (
            SELECT property_uuid
            FROM location_property_refs
            WHERE location_uuid = ?1
         );"
    ))?;
    let mut rows = stmt.query([location_id.to_string()])?;
    let mut properties = Vec::new();
    while let Some(row) = rows.next()? {
        properties.push(parse_property_row(row)?);
    }
    Ok(properties)
}

fn index_by_id(properties: Vec<Property>) -> HashMap<PropertyId, Property> {
    properties
        .into_iter()
        .map(|property| (property.id, property))
        .collect()
}

/// Read-time join: resolves back-references in list order.
fn populate(location: Location, properties: &HashMap<PropertyId, Property>) -> PopulatedLocation {
    let mut resolved = Vec::with_capacity(location.property_refs.len());
    for property_id in &location.property_refs {
        match properties.get(property_id) {
            Some(property) => resolved.push(property.clone()),
            None => warn!(
                "event=populate module=location_repo status=error location={} property={} error_code=dangling_back_reference",
                location.id, property_id
            ),
        }
    }
    PopulatedLocation::new(location, resolved)
}
