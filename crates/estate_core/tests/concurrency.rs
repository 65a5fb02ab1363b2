use estate_core::db::Database;
use estate_core::{
    check_integrity, LocationService, NewLocation, NewProperty, PropertyService,
    SqliteLocationRepository, SqlitePropertyRepository,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_reassignments_leave_property_under_one_location() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::init(dir.path().join("estate.sqlite3")).unwrap());

    let conn = db.connect().unwrap();
    let locations = LocationService::new(SqliteLocationRepository::try_new(&conn).unwrap());
    let properties = PropertyService::new(SqlitePropertyRepository::try_new(&conn).unwrap());
    let targets: Vec<_> = ["Pune", "Mumbai", "Nagpur", "Nashik"]
        .into_iter()
        .map(|name| locations.create_location(NewLocation::new(name)).unwrap().id)
        .collect();
    let villa = properties
        .create_property(NewProperty::named("Villa A").located_at(targets[0]))
        .unwrap();

    let barrier = Arc::new(Barrier::new(targets.len()));
    let handles: Vec<_> = targets
        .iter()
        .copied()
        .map(|target| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = db.connect().unwrap();
                let service =
                    PropertyService::new(SqlitePropertyRepository::try_new(&conn).unwrap());
                barrier.wait();
                for _ in 0..10 {
                    service.move_property(villa.id, Some(target)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let final_location = properties.get_property(villa.id).unwrap().location_ref;
    let listing_locations: Vec<_> = targets
        .iter()
        .filter(|id| {
            locations
                .get_location(**id)
                .unwrap()
                .property_refs
                .contains(&villa.id)
        })
        .copied()
        .collect();
    assert_eq!(listing_locations.len(), 1);
    assert_eq!(Some(listing_locations[0]), final_location);
    assert!(check_integrity(&conn).unwrap().is_consistent());
}

#[test]
fn concurrent_creates_under_one_location_are_all_listed() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::init(dir.path().join("estate.sqlite3")).unwrap());

    let conn = db.connect().unwrap();
    let locations = LocationService::new(SqliteLocationRepository::try_new(&conn).unwrap());
    let pune = locations.create_location(NewLocation::new("Pune")).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let conn = db.connect().unwrap();
                let service =
                    PropertyService::new(SqlitePropertyRepository::try_new(&conn).unwrap());
                (0..5)
                    .map(|n| {
                        service
                            .create_property(
                                NewProperty::named(format!("W{worker}-{n}")).located_at(pune.id),
                            )
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut created = Vec::new();
    for handle in handles {
        created.extend(handle.join().unwrap());
    }

    let refs = locations.get_location(pune.id).unwrap().property_refs;
    assert_eq!(refs.len(), created.len());
    for id in &created {
        assert_eq!(refs.iter().filter(|listed| *listed == id).count(), 1);
    }
    assert!(check_integrity(&conn).unwrap().is_consistent());
}
