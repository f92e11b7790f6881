use domain::{
    Address, Device, DeviceLocation, DeviceStatus, DeviceType, FleetError, RouteSummary,
    UsageRecord, UsageStatus, Vehicle, VehicleDocuments, VehicleLocation, VehicleStatus,
};
use fleet_storage::{
    AddressStore, DeviceStore, InMemoryAddressStore, InMemoryDeviceStore, InMemoryUsageStore,
    InMemoryVehicleStore, UpsertOutcome, UsageStore, VehicleStore,
};
use std::collections::BTreeMap;

fn address(street: &str) -> Address {
    Address {
        postal_code: "01310100".to_string(),
        country: "Brasil".to_string(),
        state: "SP".to_string(),
        city: "São Paulo".to_string(),
        district: "Bela Vista".to_string(),
        street: street.to_string(),
        number: "1000".to_string(),
        complement: None,
    }
}

fn vehicle(chassis: Option<&str>) -> Vehicle {
    Vehicle {
        plate: "ABC1234".to_string(),
        model: "Honda CG 160".to_string(),
        owner_id: None,
        documents: VehicleDocuments {
            chassis: chassis.map(str::to_string),
            ..VehicleDocuments::default()
        },
        location: VehicleLocation::in_zone("A1"),
        status: VehicleStatus::Available,
        battery_level: 95,
        current_user: None,
        retired: false,
        updated_at_ms: 1,
    }
}

fn device(device_type: DeviceType) -> Device {
    Device {
        device_id: "SENSOR001".to_string(),
        name: "Sensor Movimento A1".to_string(),
        device_type,
        status: DeviceStatus::Online,
        location: DeviceLocation {
            zone: "A1".to_string(),
            point: None,
            description: None,
        },
        config: BTreeMap::new(),
        last_communication_ms: None,
        retired: false,
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

#[tokio::test]
async fn address_is_immutable_once_created() {
    let store = InMemoryAddressStore::new();
    let first = store
        .upsert_address(address("Avenida Paulista"))
        .await
        .expect("insert");
    assert_eq!(first, UpsertOutcome::Inserted);

    let again = store
        .upsert_address(address("Avenida Paulista"))
        .await
        .expect("same");
    assert_eq!(again, UpsertOutcome::Unchanged);

    let err = store
        .upsert_address(address("Rua Augusta"))
        .await
        .expect_err("changed");
    assert!(matches!(err, FleetError::Conflict(_)));
    let stored = store
        .find_address("01310100")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(stored.street, "Avenida Paulista");

    assert!(store.delete_address("01310100").await.expect("delete"));
    assert!(store.find_address("01310100").await.expect("find").is_none());
}

#[tokio::test]
async fn vehicle_chassis_is_locked_after_set() {
    let store = InMemoryVehicleStore::new();
    store.upsert_vehicle(vehicle(None)).await.expect("insert");
    let outcome = store
        .upsert_vehicle(vehicle(Some("9C2JC4110JR000001")))
        .await
        .expect("set chassis");
    assert_eq!(outcome, UpsertOutcome::Replaced);

    let err = store
        .upsert_vehicle(vehicle(Some("9C2JC4110JR999999")))
        .await
        .expect_err("chassis change");
    assert!(matches!(err, FleetError::Conflict(_)));

    let found = store
        .find_vehicle("abc1234")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(found.documents.chassis.as_deref(), Some("9C2JC4110JR000001"));
}

#[tokio::test]
async fn vehicle_rejects_lower_case_plate_and_bad_battery() {
    let store = InMemoryVehicleStore::new();
    let mut lower = vehicle(None);
    lower.plate = "abc1234".to_string();
    assert!(matches!(
        store.upsert_vehicle(lower).await,
        Err(FleetError::Validation(_))
    ));

    let mut overcharged = vehicle(None);
    overcharged.battery_level = 101;
    assert!(matches!(
        store.upsert_vehicle(overcharged).await,
        Err(FleetError::Validation(_))
    ));
}

#[tokio::test]
async fn device_type_cannot_change() {
    let store = InMemoryDeviceStore::new();
    store
        .upsert_device(device(DeviceType::MotionSensor))
        .await
        .expect("insert");
    let err = store
        .upsert_device(device(DeviceType::Camera))
        .await
        .expect_err("type change");
    assert!(matches!(err, FleetError::Conflict(_)));
    assert_eq!(store.list_devices().await.expect("list").len(), 1);
}

fn usage(started_at_ms: i64) -> UsageRecord {
    UsageRecord {
        usage_id: "USG-000001".to_string(),
        vehicle_plate: "ABC1234".to_string(),
        vehicle_model: "Honda CG 160".to_string(),
        user_id: "12345678901".to_string(),
        user_name: "João Silva".to_string(),
        started_at_ms,
        ended_at_ms: None,
        duration_minutes: None,
        route: RouteSummary::default(),
        status: UsageStatus::InProgress,
        metrics: None,
        notes: None,
    }
}

#[tokio::test]
async fn usage_closes_once_and_never_before_start() {
    let store = InMemoryUsageStore::new();
    store.create_usage(usage(10_000)).await.expect("create");

    let mut early = usage(10_000);
    early.ended_at_ms = Some(5_000);
    assert!(matches!(
        store.close_usage(early).await,
        Err(FleetError::Validation(_))
    ));

    let mut closed = usage(10_000);
    closed.ended_at_ms = Some(70_000);
    closed.duration_minutes = Some(1);
    let stored = store.close_usage(closed.clone()).await.expect("close");
    assert_eq!(stored.status, UsageStatus::Finished);

    let err = store.close_usage(closed).await.expect_err("closed twice");
    assert!(matches!(err, FleetError::Conflict(_)));

    let history = store
        .list_usage_by_vehicle("ABC1234")
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ended_at_ms, Some(70_000));
}
