use domain::{
    Device, DeviceStatus, EntityKind, EntityRef, FleetError, GeoPoint, IdGenerator, ManualClock,
    RequestContext, UsageStatus, Vehicle, VehicleLocation, VehicleStatus,
};
use fleet_registry::{
    CheckinRequest, CheckoutRequest, Registry, RegistryStores, RetryPolicy, SeedData,
    VehicleStatusUpdate,
};
use fleet_storage::UpsertOutcome;
use std::sync::Arc;
use std::time::{Duration, Instant};

const T0: i64 = 1_699_927_200_000;

fn registry_with(policy: RetryPolicy) -> (Registry, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = Registry::new(
        RegistryStores::in_memory(),
        policy,
        Arc::new(IdGenerator::new()),
        clock.clone(),
    );
    (registry, clock)
}

async fn seeded() -> (Registry, Arc<ManualClock>) {
    let (registry, clock) = registry_with(RetryPolicy::default());
    registry
        .apply_seed(&RequestContext::system(), &SeedData::demo())
        .await
        .expect("seed");
    (registry, clock)
}

#[tokio::test]
async fn seed_populates_stores_and_index() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();

    assert_eq!(registry.list_zones(&ctx).await.expect("zones").len(), 4);
    assert_eq!(registry.list_vehicles(&ctx, false).await.expect("vehicles").len(), 2);
    let in_a1 = registry.by_zone(&ctx, "A1").await.expect("by zone");
    assert_eq!(
        in_a1,
        vec![
            EntityRef::vehicle("ABC1234"),
            EntityRef::device("LOCK001"),
            EntityRef::device("SENSOR001"),
        ]
    );
    let sensor = registry.get_device(&ctx, "SENSOR001").await.expect("sensor");
    assert_eq!(sensor.last_communication_ms, Some(T0));

    let again = registry
        .apply_seed(&ctx, &SeedData::demo())
        .await
        .expect("reseed");
    assert_eq!(again.vehicles, 0);
    assert_eq!(again.zones, 0);
    assert_eq!(again.devices, 0);
}

#[tokio::test]
async fn moving_a_vehicle_updates_zone_and_nearby() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();

    let location = VehicleLocation {
        point: Some(GeoPoint::new(-23.5560, -46.6400)),
        ..VehicleLocation::in_zone("B1")
    };
    registry
        .update_vehicle_location(&ctx, "abc1234", location)
        .await
        .expect("move");

    let a1 = registry.by_zone(&ctx, "A1").await.expect("a1");
    assert!(!a1.contains(&EntityRef::vehicle("ABC1234")));
    let b1 = registry.by_zone(&ctx, "B1").await.expect("b1");
    assert_eq!(b1, vec![EntityRef::vehicle("ABC1234")]);

    let near = registry
        .nearby(&ctx, &GeoPoint::new(-23.5505, -46.6333), 50.0)
        .await
        .expect("nearby");
    assert!(near.iter().all(|hit| hit.entity != EntityRef::vehicle("ABC1234")));
}

#[tokio::test]
async fn unknown_zone_is_rejected() {
    let (registry, _) = seeded().await;
    let err = registry
        .update_vehicle_location(
            &RequestContext::system(),
            "ABC1234",
            VehicleLocation::in_zone("Z9"),
        )
        .await
        .expect_err("zone missing");
    assert!(matches!(err, FleetError::NotFound { kind: EntityKind::Zone, .. }));
}

#[tokio::test]
async fn retired_vehicle_leaves_the_index() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();

    let retired = registry.retire_vehicle(&ctx, "ABC1234").await.expect("retire");
    assert!(retired.retired);
    assert_eq!(retired.status, VehicleStatus::Inactive);
    assert!(!registry
        .by_zone(&ctx, "A1")
        .await
        .expect("a1")
        .contains(&EntityRef::vehicle("ABC1234")));
    assert_eq!(registry.list_vehicles(&ctx, false).await.expect("list").len(), 1);
    assert_eq!(registry.list_vehicles(&ctx, true).await.expect("list").len(), 2);

    let err = registry
        .retire_vehicle(&ctx, "DEF5678")
        .await
        .expect_err("in use");
    assert!(matches!(err, FleetError::Conflict(_)));
}

#[tokio::test]
async fn checkout_then_checkin_round_trip() {
    let (registry, clock) = seeded().await;
    let ctx = RequestContext::system();

    let usage = registry
        .checkout(
            &ctx,
            CheckoutRequest {
                plate: "ABC1234".to_string(),
                user_id: "98765432109".to_string(),
                origin: Some("A1".to_string()),
                notes: None,
            },
        )
        .await
        .expect("checkout");
    assert_eq!(usage.status, UsageStatus::InProgress);
    assert_eq!(usage.user_name, "Maria Santos");
    let vehicle = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    assert_eq!(vehicle.status, VehicleStatus::InUse);
    assert_eq!(vehicle.current_user.as_deref(), Some("98765432109"));

    let again = registry
        .checkout(
            &ctx,
            CheckoutRequest {
                plate: "ABC1234".to_string(),
                user_id: "12345678901".to_string(),
                origin: None,
                notes: None,
            },
        )
        .await
        .expect_err("already out");
    assert!(matches!(again, FleetError::Conflict(_)));

    clock.advance(45 * 60_000);
    let closed = registry
        .checkin(
            &ctx,
            &usage.usage_id,
            CheckinRequest {
                destination: Some("A2".to_string()),
                distance_km: Some(12.5),
                location: Some(VehicleLocation::in_zone("A2")),
                battery_level: Some(70),
                ..CheckinRequest::default()
            },
        )
        .await
        .expect("checkin");
    assert_eq!(closed.status, UsageStatus::Finished);
    assert_eq!(closed.duration_minutes, Some(45));

    let vehicle = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    assert_eq!(vehicle.status, VehicleStatus::Available);
    assert_eq!(vehicle.battery_level, 70);
    assert!(registry
        .by_zone(&ctx, "A2")
        .await
        .expect("a2")
        .contains(&EntityRef::vehicle("ABC1234")));

    let twice = registry
        .checkin(&ctx, &usage.usage_id, CheckinRequest::default())
        .await
        .expect_err("closed");
    assert!(matches!(twice, FleetError::Conflict(_)));
    assert_eq!(
        registry.usage_history(&ctx, "abc1234").await.expect("history").len(),
        1
    );
}

#[tokio::test]
async fn checkin_cannot_end_before_start() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();
    let usage = registry
        .checkout(
            &ctx,
            CheckoutRequest {
                plate: "ABC1234".to_string(),
                user_id: "12345678901".to_string(),
                origin: None,
                notes: None,
            },
        )
        .await
        .expect("checkout");

    let err = registry
        .checkin(
            &ctx,
            &usage.usage_id,
            CheckinRequest {
                ended_at_ms: Some(T0 - 1),
                ..CheckinRequest::default()
            },
        )
        .await
        .expect_err("ends early");
    assert!(matches!(err, FleetError::Validation(_)));
    let vehicle = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    assert_eq!(vehicle.status, VehicleStatus::InUse);
}

#[tokio::test]
async fn in_use_status_only_changes_through_usage() {
    let (registry, _) = seeded().await;
    let err = registry
        .update_vehicle_status(
            &RequestContext::system(),
            "ABC1234",
            VehicleStatusUpdate {
                status: Some(VehicleStatus::InUse),
                battery_level: None,
            },
        )
        .await
        .expect_err("in use");
    assert!(matches!(err, FleetError::Conflict(_)));
}

#[tokio::test]
async fn held_lock_surfaces_contention() {
    let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1));
    let (registry, _) = registry_with(policy);
    let ctx = RequestContext::system();
    registry
        .apply_seed(&ctx, &SeedData::demo())
        .await
        .expect("seed");

    let _held = registry
        .locks()
        .acquire(&ctx, &EntityRef::vehicle("ABC1234"))
        .await
        .expect("hold");
    let err = registry
        .update_vehicle_status(
            &ctx,
            "ABC1234",
            VehicleStatusUpdate {
                status: None,
                battery_level: Some(50),
            },
        )
        .await
        .expect_err("contended");
    assert!(matches!(err, FleetError::Contention { attempts: 2, .. }));
}

#[tokio::test]
async fn expired_deadline_writes_nothing() {
    let (registry, _) = seeded().await;
    let expired = RequestContext::new("tester", Some(Instant::now()));

    let err = registry
        .update_vehicle_location(&expired, "ABC1234", VehicleLocation::in_zone("B1"))
        .await
        .expect_err("expired");
    assert_eq!(err, FleetError::DeadlineExceeded);

    let ctx = RequestContext::system();
    let vehicle = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    assert_eq!(vehicle.location.zone, "A1");
    assert!(registry.by_zone(&ctx, "B1").await.expect("b1").is_empty());
}

#[tokio::test]
async fn heartbeat_brings_offline_device_back() {
    let (registry, clock) = seeded().await;
    let ctx = RequestContext::system();
    registry
        .set_device_status(&ctx, "CAMERA001", DeviceStatus::Offline)
        .await
        .expect("offline");

    clock.advance(5_000);
    let device = registry
        .record_heartbeat(&ctx, "CAMERA001", T0 + 5_000)
        .await
        .expect("heartbeat");
    assert_eq!(device.status, DeviceStatus::Online);
    assert_eq!(device.last_communication_ms, Some(T0 + 5_000));

    registry
        .set_device_status(&ctx, "LOCK001", DeviceStatus::Maintenance)
        .await
        .expect("maintenance");
    let lock = registry
        .record_heartbeat(&ctx, "LOCK001", T0 + 6_000)
        .await
        .expect("heartbeat");
    assert_eq!(lock.status, DeviceStatus::Maintenance);
}

#[tokio::test]
async fn unchanged_upsert_reports_unchanged() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();
    let vehicle = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    let outcome = registry.upsert_vehicle(&ctx, vehicle).await.expect("upsert");
    assert_eq!(outcome, UpsertOutcome::Unchanged);
}

#[tokio::test]
async fn rebuild_matches_incremental_index() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();
    registry.retire_device(&ctx, "LOCK001").await.expect("retire");

    let before = registry.by_zone(&ctx, "A1").await.expect("before");
    let report = registry.rebuild_index(&ctx).await.expect("rebuild");
    assert_eq!(report.entries, 4);
    assert_eq!(report.replayed, 0);
    assert_eq!(registry.by_zone(&ctx, "A1").await.expect("after"), before);
}

#[tokio::test]
async fn addresses_and_users_are_hard_deleted() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();

    registry.delete_user(&ctx, "98765432109").await.expect("delete user");
    assert!(matches!(
        registry.get_user(&ctx, "98765432109").await,
        Err(FleetError::NotFound { .. })
    ));
    assert!(matches!(
        registry.delete_user(&ctx, "98765432109").await,
        Err(FleetError::NotFound { .. })
    ));

    registry
        .delete_address(&ctx, "04038001")
        .await
        .expect("delete address");
    assert!(matches!(
        registry.get_address(&ctx, "04038001").await,
        Err(FleetError::NotFound { .. })
    ));
    registry.get_address(&ctx, "01310100").await.expect("other address");
}

#[tokio::test]
async fn upsert_cannot_release_an_in_use_vehicle() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();
    registry
        .checkout(
            &ctx,
            CheckoutRequest {
                plate: "ABC1234".to_string(),
                user_id: "98765432109".to_string(),
                origin: None,
                notes: None,
            },
        )
        .await
        .expect("checkout");

    let mut released = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    released.status = VehicleStatus::Available;
    released.current_user = None;
    let err = registry
        .upsert_vehicle(&ctx, released)
        .await
        .expect_err("release through upsert");
    assert!(matches!(err, FleetError::Conflict(_)));

    let mut reassigned = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    reassigned.current_user = Some("12345678901".to_string());
    let err = registry
        .upsert_vehicle(&ctx, reassigned)
        .await
        .expect_err("reassign through upsert");
    assert!(matches!(err, FleetError::Conflict(_)));

    let mut renamed = registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle");
    renamed.model = "Honda CG 160 Titan".to_string();
    let outcome = registry.upsert_vehicle(&ctx, renamed).await.expect("rename");
    assert_eq!(outcome, UpsertOutcome::Replaced);

    let history = registry.usage_history(&ctx, "ABC1234").await.expect("history");
    let open = history
        .iter()
        .filter(|usage| usage.status == UsageStatus::InProgress)
        .count();
    assert_eq!(open, 1);
}

#[tokio::test]
async fn retired_entities_stay_retired_on_upsert() {
    let (registry, _) = seeded().await;
    let ctx = RequestContext::system();

    let vehicle = registry.retire_vehicle(&ctx, "ABC1234").await.expect("retire");
    let revived = Vehicle {
        retired: false,
        status: VehicleStatus::Available,
        ..vehicle
    };
    let err = registry
        .upsert_vehicle(&ctx, revived)
        .await
        .expect_err("revive vehicle");
    assert!(matches!(err, FleetError::Conflict(_)));
    assert!(registry.get_vehicle(&ctx, "ABC1234").await.expect("vehicle").retired);
    let a1 = registry.by_zone(&ctx, "A1").await.expect("a1");
    assert!(!a1.contains(&EntityRef::vehicle("ABC1234")));

    let device = registry.retire_device(&ctx, "LOCK001").await.expect("retire");
    let revived = Device {
        retired: false,
        status: DeviceStatus::Online,
        ..device
    };
    let err = registry
        .upsert_device(&ctx, revived)
        .await
        .expect_err("revive device");
    assert!(matches!(err, FleetError::Conflict(_)));
    let a1 = registry.by_zone(&ctx, "A1").await.expect("a1");
    assert!(!a1.contains(&EntityRef::device("LOCK001")));
}

#[tokio::test]
async fn new_device_counts_as_communicating_at_registration() {
    let (registry, clock) = seeded().await;
    let ctx = RequestContext::system();
    clock.advance(5 * 60_000);

    let template = registry.get_device(&ctx, "SENSOR001").await.expect("sensor");
    let fresh = Device {
        device_id: "NEW001".to_string(),
        last_communication_ms: None,
        ..template
    };
    registry.upsert_device(&ctx, fresh).await.expect("insert");
    let stored = registry.get_device(&ctx, "NEW001").await.expect("stored");
    assert_eq!(stored.last_communication_ms, Some(T0 + 5 * 60_000));
    assert_eq!(stored.created_at_ms, T0 + 5 * 60_000);
}
