//! Property repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete APIs over `properties`.
//! - Resolve the forward reference to the full location on read (populate).
//! - Route every assignment change through the relationship maintainer.
//!
//! # Invariants
//! - A property row and its back-reference are written in the same
//!   transaction; a failed back-reference write rolls back the insert.
//! - A populated property whose location cannot be resolved reads as
//!   unassigned instead of failing.

use crate::model::location::{Location, LocationId};
use crate::model::property::{
    NewProperty, PopulatedProperty, Property, PropertyId, PropertyUpdate,
    DEFAULT_PROPERTY_POSTER,
};
use crate::repo::relation::RelationshipMaintainer;
use crate::repo::rows::{
    begin_read, begin_write, ensure_connection_ready, load_all_locations, load_all_properties,
    load_location, load_property, NOW_MS_SQL,
};
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use uuid::Uuid;

/// Repository interface for property operations.
pub trait PropertyRepository {
    /// Creates one property, registering it with its location if any.
    fn create_property(&self, input: &NewProperty) -> RepoResult<Property>;
    /// Loads one property with its forward reference as an id.
    fn get_property(&self, id: PropertyId) -> RepoResult<Option<Property>>;
    /// Loads one property with its location resolved.
    fn get_populated_property(&self, id: PropertyId) -> RepoResult<Option<PopulatedProperty>>;
    /// Lists all properties in creation order.
    fn list_properties(&self) -> RepoResult<Vec<Property>>;
    /// Lists all properties with locations resolved.
    fn list_populated_properties(&self) -> RepoResult<Vec<PopulatedProperty>>;
    /// Applies a partial update, moving the property when `Location` is set.
    fn update_property(&self, id: PropertyId, update: &PropertyUpdate) -> RepoResult<()>;
    /// Deletes one property and its back-reference.
    fn delete_property(&self, id: PropertyId) -> RepoResult<()>;
}

/// SQLite-backed property repository.
pub struct SqlitePropertyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePropertyRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PropertyRepository for SqlitePropertyRepository<'_> {
    fn create_property(&self, input: &NewProperty) -> RepoResult<Property> {
        input.validate()?;

        let tx = begin_write(self.conn)?;
        let maintainer = RelationshipMaintainer::new(&tx);
        maintainer.ensure_assignable(input.location_ref)?;

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO properties (
                property_uuid,
                property_name,
                property_poster,
                property_type,
                property_price,
                location_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                input.property_name.as_deref().unwrap_or_default(),
                input
                    .property_poster
                    .as_deref()
                    .unwrap_or(DEFAULT_PROPERTY_POSTER),
                input.property_type.unwrap_or_default().as_db_str(),
                input.property_price,
                input.location_ref.map(|location_id| location_id.to_string()),
            ],
        )?;

        let property = load_property(&tx, id)?.ok_or(RepoError::PropertyNotFound(id))?;
        maintainer.on_property_created(&property)?;
        tx.commit()?;
        Ok(property)
    }

    fn get_property(&self, id: PropertyId) -> RepoResult<Option<Property>> {
        load_property(self.conn, id)
    }

    fn get_populated_property(&self, id: PropertyId) -> RepoResult<Option<PopulatedProperty>> {
        let tx = begin_read(self.conn)?;
        let Some(property) = load_property(&tx, id)? else {
            return Ok(None);
        };
        let location = match property.location_ref {
            Some(location_id) => load_location(&tx, location_id)?,
            None => None,
        };
        tx.commit()?;
        Ok(Some(populate(property, location)))
    }

    fn list_properties(&self) -> RepoResult<Vec<Property>> {
        load_all_properties(self.conn)
    }

    fn list_populated_properties(&self) -> RepoResult<Vec<PopulatedProperty>> {
        let tx = begin_read(self.conn)?;
        let properties = load_all_properties(&tx)?;
        let locations: HashMap<LocationId, Location> = load_all_locations(&tx)?
            .into_iter()
            .map(|location| (location.id, location))
            .collect();
        tx.commit()?;

        Ok(properties
            .into_iter()
            .map(|property| {
                let location = property
                    .location_ref
                    .and_then(|location_id| locations.get(&location_id).cloned());
                populate(property, location)
            })
            .collect())
    }

    fn update_property(&self, id: PropertyId, update: &PropertyUpdate) -> RepoResult<()> {
        update.validate()?;

        let tx = begin_write(self.conn)?;
        let current = load_property(&tx, id)?.ok_or(RepoError::PropertyNotFound(id))?;

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = &update.property_name {
            assignments.push("property_name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(poster) = &update.property_poster {
            assignments.push("property_poster = ?");
            bind_values.push(Value::Text(
                poster
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROPERTY_POSTER.to_string()),
            ));
        }
        if let Some(kind) = update.property_type {
            assignments.push("property_type = ?");
            bind_values.push(Value::Text(kind.as_db_str().to_string()));
        }
        if let Some(price) = update.property_price {
            assignments.push("property_price = ?");
            bind_values.push(price.map_or(Value::Null, Value::Real));
        }

        if !assignments.is_empty() {
            bind_values.push(Value::Text(id.to_string()));
            tx.execute(
                &format!(
                    "UPDATE properties
                     SET {},
                         updated_at = {NOW_MS_SQL}
                     WHERE property_uuid = ?;",
                    assignments.join(", ")
                ),
                params_from_iter(bind_values),
            )?;
        }

        let target = update.assignment().resolve(current.location_ref);
        RelationshipMaintainer::new(&tx).on_property_location_changed(
            id,
            current.location_ref,
            target,
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete_property(&self, id: PropertyId) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let current = load_property(&tx, id)?.ok_or(RepoError::PropertyNotFound(id))?;

        RelationshipMaintainer::new(&tx).on_property_deleted(id, current.location_ref)?;
        tx.execute(
            "DELETE FROM properties WHERE property_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

/// Read-time join: resolves the forward reference.
fn populate(property: Property, location: Option<Location>) -> PopulatedProperty {
    if let (Some(location_id), None) = (property.location_ref, location.as_ref()) {
        warn!(
            "event=populate module=property_repo status=error property={} location={} error_code=dangling_forward_reference",
            property.id, location_id
        );
    }
    PopulatedProperty::new(property, location)
}
