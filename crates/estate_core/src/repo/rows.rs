//! Shared SQL fragments, row parsing and transaction helpers.

use crate::db::migrations::latest_version;
use crate::model::location::{Location, LocationId};
use crate::model::property::{Property, PropertyId, PropertyType};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) const LOCATION_SELECT_SQL: &str = "SELECT
    location_uuid,
    city_name,
    city_poster,
    street_name,
    created_at,
    updated_at
FROM locations";

pub(crate) const PROPERTY_SELECT_SQL: &str = "SELECT
    property_uuid,
    property_name,
    property_poster,
    property_type,
    property_price,
    location_uuid,
    created_at,
    updated_at
FROM properties";

pub(crate) const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

/// Starts a write transaction holding SQLite's reserved lock.
pub(crate) fn begin_write(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

/// Starts a read transaction so multi-query reads share one snapshot.
pub(crate) fn begin_read(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Deferred,
    )?)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_location_row(
    row: &Row<'_>,
    property_refs: Vec<PropertyId>,
) -> RepoResult<Location> {
    let id_text: String = row.get("location_uuid")?;
    Ok(Location {
        id: parse_uuid(&id_text, "locations.location_uuid")?,
        city_name: row.get("city_name")?,
        city_poster: row.get("city_poster")?,
        street_name: row.get("street_name")?,
        property_refs,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_property_row(row: &Row<'_>) -> RepoResult<Property> {
    let id_text: String = row.get("property_uuid")?;
    let type_text: String = row.get("property_type")?;
    let property_type = PropertyType::from_db_str(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid property type `{type_text}` in properties.property_type"
        ))
    })?;
    let location_ref = row
        .get::<_, Option<String>>("location_uuid")?
        .map(|value| parse_uuid(&value, "properties.location_uuid"))
        .transpose()?;

    Ok(Property {
        id: parse_uuid(&id_text, "properties.property_uuid")?,
        property_name: row.get("property_name")?,
        property_poster: row.get("property_poster")?,
        property_type,
        property_price: row.get("property_price")?,
        location_ref,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Back-reference list of one location, in assignment order.
pub(crate) fn list_property_refs(
    conn: &Connection,
    location_id: LocationId,
) -> RepoResult<Vec<PropertyId>> {
    let mut stmt = conn.prepare(
        "SELECT property_uuid
         FROM location_property_refs
         WHERE location_uuid = ?1
         ORDER BY position ASC, property_uuid ASC;",
    )?;
    let mut rows = stmt.query([location_id.to_string()])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        refs.push(parse_uuid(&value, "location_property_refs.property_uuid")?);
    }
    Ok(refs)
}

/// Back-reference lists of every location, keyed by location id.
pub(crate) fn all_property_refs(
    conn: &Connection,
) -> RepoResult<HashMap<LocationId, Vec<PropertyId>>> {
    let mut stmt = conn.prepare(
        "SELECT location_uuid, property_uuid
         FROM location_property_refs
         ORDER BY location_uuid ASC, position ASC, property_uuid ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut refs: HashMap<LocationId, Vec<PropertyId>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let location_text: String = row.get(0)?;
        let property_text: String = row.get(1)?;
        refs.entry(parse_uuid(
            &location_text,
            "location_property_refs.location_uuid",
        )?)
        .or_default()
        .push(parse_uuid(
            &property_text,
            "location_property_refs.property_uuid",
        )?);
    }
    Ok(refs)
}

pub(crate) fn load_location(
    conn: &Connection,
    location_id: LocationId,
) -> RepoResult<Option<Location>> {
    let mut stmt = conn.prepare(&format!("{LOCATION_SELECT_SQL} WHERE location_uuid = ?1;"))?;
    let mut rows = stmt.query([location_id.to_string()])?;
    if let Some(row) = rows.next()? {
        let refs = list_property_refs(conn, location_id)?;
        return Ok(Some(parse_location_row(row, refs)?));
    }
    Ok(None)
}

pub(crate) fn load_all_locations(conn: &Connection) -> RepoResult<Vec<Location>> {
    let mut refs = all_property_refs(conn)?;
    let mut stmt = conn.prepare(&format!(
        "{LOCATION_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut locations = Vec::new();
    while let Some(row) = rows.next()? {
        let mut location = parse_location_row(row, Vec::new())?;
        location.property_refs = refs.remove(&location.id).unwrap_or_default();
        locations.push(location);
    }
    Ok(locations)
}

pub(crate) fn load_property(
    conn: &Connection,
    property_id: PropertyId,
) -> RepoResult<Option<Property>> {
    let mut stmt = conn.prepare(&format!("{PROPERTY_SELECT_SQL} WHERE property_uuid = ?1;"))?;
    let mut rows = stmt.query([property_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_property_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_all_properties(conn: &Connection) -> RepoResult<Vec<Property>> {
    let mut stmt = conn.prepare(&format!(
        "{PROPERTY_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut properties = Vec::new();
    while let Some(row) = rows.next()? {
        properties.push(parse_property_row(row)?);
    }
    Ok(properties)
}

pub(crate) fn location_exists(conn: &Connection, location_id: LocationId) -> RepoResult<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM locations WHERE location_uuid = ?1;",
            [location_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
