//! Relationship maintainer between locations and properties.
//!
//! # Responsibility
//! - Keep a location's back-reference list (`location_property_refs`) and
//!   each property's forward reference (`properties.location_uuid`) in step.
//! - Apply location delete policy to the properties of a deleted location.
//! - Audit both sides for divergence.
//!
//! # Invariants
//! - Only constructible from an open write transaction; every change made
//!   here commits or rolls back together with the store mutation.
//! - Every back-reference names an existing property whose forward
//!   reference points back at the same location.
//! - Every property with a forward reference is listed exactly once in
//!   that location's back-references.

use crate::model::location::{LocationDeletePolicy, LocationId};
use crate::model::property::{Property, PropertyId};
use crate::repo::rows::{begin_read, location_exists, parse_uuid, NOW_MS_SQL};
use crate::repo::{RepoError, RepoResult};
use log::{debug, warn};
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

/// Reconciles both sides of the location/property reference.
pub struct RelationshipMaintainer<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RelationshipMaintainer<'conn> {
    /// Binds the maintainer to the caller's write transaction.
    pub(crate) fn new(tx: &'conn Transaction<'_>) -> Self {
        Self { conn: tx }
    }

    /// Fails with `DanglingReference` unless `location_ref` is absent or exists.
    pub fn ensure_assignable(&self, location_ref: Option<LocationId>) -> RepoResult<()> {
        match location_ref {
            Some(location_id) if !location_exists(self.conn, location_id)? => {
                Err(RepoError::DanglingReference(location_id))
            }
            _ => Ok(()),
        }
    }

    /// Registers a freshly inserted property with its location.
    pub fn on_property_created(&self, property: &Property) -> RepoResult<()> {
        let Some(location_id) = property.location_ref else {
            return Ok(());
        };
        self.ensure_assignable(Some(location_id))?;
        self.append_back_reference(location_id, property.id)?;
        debug!(
            "event=relation_assign module=relation status=ok property={} location={}",
            property.id, location_id
        );
        Ok(())
    }

    /// Moves a property between locations (either side may be `None`).
    ///
    /// The forward reference is swapped only if it still equals `old`;
    /// otherwise another writer moved the property first.
    pub fn on_property_location_changed(
        &self,
        property_id: PropertyId,
        old: Option<LocationId>,
        new: Option<LocationId>,
    ) -> RepoResult<()> {
        if old == new {
            return Ok(());
        }
        self.ensure_assignable(new)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE properties
                 SET location_uuid = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE property_uuid = ?1
                   AND location_uuid IS ?3;"
            ),
            params![
                property_id.to_string(),
                new.map(|id| id.to_string()),
                old.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ConcurrentModification(format!(
                "property {property_id} no longer references {}",
                describe_ref(old)
            )));
        }

        let removed = self.remove_back_references(property_id)?;
        if removed != usize::from(old.is_some()) {
            warn!(
                "event=relation_repair module=relation status=ok property={} removed_refs={} expected_refs={}",
                property_id,
                removed,
                usize::from(old.is_some())
            );
        }
        if let Some(location_id) = new {
            self.append_back_reference(location_id, property_id)?;
        }

        debug!(
            "event=relation_move module=relation status=ok property={} from={} to={}",
            property_id,
            describe_ref(old),
            describe_ref(new)
        );
        Ok(())
    }

    /// Drops the back-reference of a property that is about to be deleted.
    pub fn on_property_deleted(
        &self,
        property_id: PropertyId,
        location_ref: Option<LocationId>,
    ) -> RepoResult<()> {
        let removed = self.remove_back_references(property_id)?;
        if removed != usize::from(location_ref.is_some()) {
            warn!(
                "event=relation_repair module=relation status=ok property={} removed_refs={} expected_refs={}",
                property_id,
                removed,
                usize::from(location_ref.is_some())
            );
        }
        debug!(
            "event=relation_unlink module=relation status=ok property={} location={}",
            property_id,
            describe_ref(location_ref)
        );
        Ok(())
    }

    /// Detaches or deletes every property of a location about to be deleted.
    ///
    /// Acts on all properties whose forward reference names the location,
    /// including ones missing from `property_refs`. Returns the affected ids.
    pub fn on_location_deleted(
        &self,
        location_id: LocationId,
        property_refs: &[PropertyId],
        policy: LocationDeletePolicy,
    ) -> RepoResult<Vec<PropertyId>> {
        let affected = self.properties_referencing(location_id)?;
        if affected.len() != property_refs.len()
            || affected.iter().any(|id| !property_refs.contains(id))
        {
            warn!(
                "event=relation_repair module=relation status=ok location={} listed_refs={} forward_refs={}",
                location_id,
                property_refs.len(),
                affected.len()
            );
        }

        self.conn.execute(
            "DELETE FROM location_property_refs
             WHERE location_uuid = ?1
                OR property_uuid IN (
                    SELECT property_uuid FROM properties WHERE location_uuid = ?1
                );",
            [location_id.to_string()],
        )?;

        match policy {
            LocationDeletePolicy::Orphan => {
                self.conn.execute(
                    &format!(
                        "UPDATE properties
                         SET location_uuid = NULL,
                             updated_at = {NOW_MS_SQL}
                         WHERE location_uuid = ?1;"
                    ),
                    [location_id.to_string()],
                )?;
            }
            LocationDeletePolicy::Cascade => {
                self.conn.execute(
                    "DELETE FROM properties WHERE location_uuid = ?1;",
                    [location_id.to_string()],
                )?;
            }
        }

        debug!(
            "event=relation_location_deleted module=relation status=ok location={} policy={} affected={}",
            location_id,
            policy.as_str(),
            affected.len()
        );
        Ok(affected)
    }

    fn append_back_reference(
        &self,
        location_id: LocationId,
        property_id: PropertyId,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO location_property_refs (location_uuid, property_uuid, position)
             SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
             FROM location_property_refs
             WHERE location_uuid = ?1;",
            params![location_id.to_string(), property_id.to_string()],
        )?;
        Ok(())
    }

    fn remove_back_references(&self, property_id: PropertyId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM location_property_refs WHERE property_uuid = ?1;",
            [property_id.to_string()],
        )?)
    }

    fn properties_referencing(&self, location_id: LocationId) -> RepoResult<Vec<PropertyId>> {
        let mut stmt = self.conn.prepare(
            "SELECT property_uuid
             FROM properties
             WHERE location_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([location_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "properties.property_uuid")?);
        }
        Ok(ids)
    }
}

fn describe_ref(location_ref: Option<LocationId>) -> String {
    location_ref.map_or_else(|| "none".to_string(), |id| id.to_string())
}

/// One divergence between back-references and forward references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "camelCase")]
pub enum IntegrityViolation {
    /// A location lists a property that does not exist.
    #[serde(rename_all = "camelCase")]
    MissingProperty {
        location_id: LocationId,
        property_id: PropertyId,
    },
    /// A location lists a property whose forward reference points elsewhere.
    #[serde(rename_all = "camelCase")]
    ForeignBackReference {
        location_id: LocationId,
        property_id: PropertyId,
        actual_location_id: Option<LocationId>,
    },
    /// A property points at a location that does not list it.
    #[serde(rename_all = "camelCase")]
    MissingBackReference {
        location_id: LocationId,
        property_id: PropertyId,
    },
    /// A property points at a location that does not exist.
    #[serde(rename_all = "camelCase")]
    DanglingForwardReference {
        property_id: PropertyId,
        location_id: LocationId,
    },
}

/// Result of a full consistency scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub locations_checked: usize,
    pub properties_checked: usize,
    pub back_references_checked: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    /// Whether both reference sets agree.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Scans both reference sets and reports every divergence.
pub fn check_integrity(conn: &Connection) -> RepoResult<IntegrityReport> {
    let tx = begin_read(conn)?;
    let locations_checked = count_rows(&tx, "locations")?;
    let properties_checked = count_rows(&tx, "properties")?;
    let back_references_checked = count_rows(&tx, "location_property_refs")?;

    let mut violations = Vec::new();
    collect_missing_properties(&tx, &mut violations)?;
    collect_foreign_back_references(&tx, &mut violations)?;
    collect_unlisted_forward_references(&tx, &mut violations)?;
    tx.commit()?;

    if !violations.is_empty() {
        warn!(
            "event=integrity_check module=relation status=error violations={}",
            violations.len()
        );
    }

    Ok(IntegrityReport {
        locations_checked,
        properties_checked,
        back_references_checked,
        violations,
    })
}

fn count_rows(conn: &Connection, table: &str) -> RepoResult<usize> {
    let value: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    usize::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count for {table}")))
}

fn collect_missing_properties(
    conn: &Connection,
    violations: &mut Vec<IntegrityViolation>,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT r.location_uuid, r.property_uuid
         FROM location_property_refs r
         LEFT JOIN properties p ON p.property_uuid = r.property_uuid
         WHERE p.property_uuid IS NULL
         ORDER BY r.location_uuid, r.position;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let location_text: String = row.get(0)?;
        let property_text: String = row.get(1)?;
        violations.push(IntegrityViolation::MissingProperty {
            location_id: parse_uuid(&location_text, "location_property_refs.location_uuid")?,
            property_id: parse_uuid(&property_text, "location_property_refs.property_uuid")?,
        });
    }
    Ok(())
}

fn collect_foreign_back_references(
    conn: &Connection,
    violations: &mut Vec<IntegrityViolation>,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT r.location_uuid, r.property_uuid, p.location_uuid
         FROM location_property_refs r
         INNER JOIN properties p ON p.property_uuid = r.property_uuid
         WHERE p.location_uuid IS NOT r.location_uuid
         ORDER BY r.location_uuid, r.position;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let location_text: String = row.get(0)?;
        let property_text: String = row.get(1)?;
        let actual_location_id = row
            .get::<_, Option<String>>(2)?
            .map(|value| parse_uuid(&value, "properties.location_uuid"))
            .transpose()?;
        violations.push(IntegrityViolation::ForeignBackReference {
            location_id: parse_uuid(&location_text, "location_property_refs.location_uuid")?,
            property_id: parse_uuid(&property_text, "location_property_refs.property_uuid")?,
            actual_location_id,
        });
    }
    Ok(())
}

fn collect_unlisted_forward_references(
    conn: &Connection,
    violations: &mut Vec<IntegrityViolation>,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT p.property_uuid, p.location_uuid, l.location_uuid IS NOT NULL
         FROM properties p
         LEFT JOIN location_property_refs r
           ON r.property_uuid = p.property_uuid
          AND r.location_uuid = p.location_uuid
         LEFT JOIN locations l ON l.location_uuid = p.location_uuid
         WHERE p.location_uuid IS NOT NULL
           AND r.property_uuid IS NULL
         ORDER BY p.created_at, p.rowid;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let property_text: String = row.get(0)?;
        let location_text: String = row.get(1)?;
        let property_id = parse_uuid(&property_text, "properties.property_uuid")?;
        let location_id = parse_uuid(&location_text, "properties.location_uuid")?;
        let location_exists: bool = row.get(2)?;
        violations.push(if location_exists {
            IntegrityViolation::MissingBackReference {
                location_id,
                property_id,
            }
        } else {
            IntegrityViolation::DanglingForwardReference {
                property_id,
                location_id,
            }
        });
    }
    Ok(())
}
