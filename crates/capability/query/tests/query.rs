use domain::{
    AlertCategory, DeviceStatus, EntityRef, GeoPoint, IdGenerator, ManualClock, RequestContext,
    Severity, Vehicle, VehicleDocuments, VehicleLocation, VehicleStatus, Zone,
};
use fleet_alert::{AlertEngine, Condition, RuleSpec};
use fleet_ingest::{IngestRequest, Ingestor};
use fleet_query::QueryService;
use fleet_registry::{Registry, RegistryStores, RetryPolicy, SeedData, VehicleStatusUpdate};
use fleet_storage::AlertQuery;
use serde_json::json;
use std::sync::Arc;

const T0: i64 = 1_699_927_200_000;

async fn service(seed: bool) -> (QueryService, Arc<AlertEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = Arc::new(Registry::new(
        RegistryStores::in_memory(),
        RetryPolicy::default(),
        Arc::new(IdGenerator::new()),
        clock.clone(),
    ));
    if seed {
        registry
            .apply_seed(&RequestContext::system(), &SeedData::demo())
            .await
            .expect("seed");
    }
    let engine = Arc::new(AlertEngine::new(registry));
    (QueryService::new(engine.clone()), engine, clock)
}

fn parked(plate: &str, point: GeoPoint) -> Vehicle {
    Vehicle {
        plate: plate.to_string(),
        model: "Honda CG 160".to_string(),
        owner_id: None,
        documents: VehicleDocuments::default(),
        location: VehicleLocation {
            point: Some(point),
            ..VehicleLocation::in_zone("A1")
        },
        status: VehicleStatus::Available,
        battery_level: 80,
        current_user: None,
        retired: false,
        updated_at_ms: 0,
    }
}

#[tokio::test]
async fn nearby_returns_only_vehicles_within_radius() {
    let (query, engine, _) = service(false).await;
    let ctx = RequestContext::system();
    let registry = engine.registry();
    registry
        .define_zone(
            &ctx,
            Zone {
                code: "A1".to_string(),
                name: "Setor A".to_string(),
                description: None,
            },
        )
        .await
        .expect("zone");
    // 约 10 m 与 600 m
    registry
        .upsert_vehicle(&ctx, parked("NEAR001", GeoPoint::new(-23.55041, -46.6333)))
        .await
        .expect("near");
    registry
        .upsert_vehicle(&ctx, parked("FAR0001", GeoPoint::new(-23.5451, -46.6333)))
        .await
        .expect("far");

    let hits = query
        .nearby(&ctx, -23.5505, -46.6333, 500.0)
        .await
        .expect("nearby");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity, EntityRef::vehicle("NEAR001"));
    assert!((hits[0].distance_m - 10.0).abs() < 0.1);

    let wider = query
        .nearby(&ctx, -23.5505, -46.6333, 1_000.0)
        .await
        .expect("wider");
    let order: Vec<&str> = wider.iter().map(|hit| hit.entity.id.as_str()).collect();
    assert_eq!(order, vec!["NEAR001", "FAR0001"]);
}

#[tokio::test]
async fn available_in_zone_tracks_status_changes() {
    let (query, engine, _) = service(true).await;
    let ctx = RequestContext::system();

    let a1 = query
        .vehicles_available_in_zone(&ctx, "A1")
        .await
        .expect("a1");
    assert_eq!(a1.len(), 1);
    assert_eq!(a1[0].plate, "ABC1234");
    // DEF5678 está em uso
    assert!(query
        .vehicles_available_in_zone(&ctx, "A2")
        .await
        .expect("a2")
        .is_empty());

    engine
        .registry()
        .update_vehicle_status(
            &ctx,
            "ABC1234",
            VehicleStatusUpdate {
                status: Some(VehicleStatus::Maintenance),
                battery_level: None,
            },
        )
        .await
        .expect("maintenance");
    assert!(query
        .vehicles_available_in_zone(&ctx, "A1")
        .await
        .expect("a1")
        .is_empty());
    assert!(query
        .vehicles_available_in_zone(&ctx, "Z9")
        .await
        .is_err());
}

#[tokio::test]
async fn fleet_summary_counts_vehicles_and_devices() {
    let (query, engine, _) = service(true).await;
    let ctx = RequestContext::system();
    engine
        .registry()
        .update_vehicle_status(
            &ctx,
            "ABC1234",
            VehicleStatusUpdate {
                status: None,
                battery_level: Some(8),
            },
        )
        .await
        .expect("battery");
    engine
        .registry()
        .set_device_status(&ctx, "CAMERA001", DeviceStatus::Offline)
        .await
        .expect("offline");

    let summary = query.fleet_summary(&ctx).await.expect("summary");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.available, 1);
    assert_eq!(summary.in_use, 1);
    assert_eq!(summary.low_battery, 1);
    assert_eq!(summary.critical_battery, 1);
    assert_eq!(summary.average_battery, 43.0);
    assert_eq!(summary.devices_online, 2);
    assert_eq!(summary.devices_offline, 1);

    let offline = query.offline_devices(&ctx).await.expect("offline");
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0].device_id, "CAMERA001");
}

#[tokio::test]
async fn device_status_includes_latest_reading_and_alerts() {
    let (query, engine, clock) = service(true).await;
    let ctx = RequestContext::system();
    engine
        .create_rule(RuleSpec {
            name: "hot".to_string(),
            category: AlertCategory::Iot,
            severity: Severity::High,
            condition: Condition::ValueAbove { threshold: 40.0 },
            title: "Temperatura alta".to_string(),
            description: "{value} {unit}".to_string(),
            cooldown_seconds: 600,
            confidence: None,
        })
        .expect("rule");
    let ingestor = Ingestor::new(engine.clone());
    for (offset, value) in [(0, 25.0), (60_000, 45.0)] {
        ingestor
            .ingest(
                &ctx,
                IngestRequest {
                    device_id: "SENSOR001".to_string(),
                    reading_type: "temperature".to_string(),
                    value,
                    unit: "C".to_string(),
                    ts_ms: T0 + offset,
                    raw_payload: json!({ "valor": value }),
                    event_type: None,
                },
            )
            .await
            .expect("ingest");
    }
    clock.advance(5 * 60_000);

    let view = query.device_status(&ctx, "SENSOR001").await.expect("view");
    assert_eq!(view.active_alerts, 1);
    assert_eq!(view.latest_reading.map(|reading| reading.value), Some(45.0));
    assert_eq!(view.silent_minutes, Some(5));

    let recent = query
        .recent_readings(&ctx, "SENSOR001", Some(10))
        .await
        .expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].ts_ms, T0 + 60_000);

    let alerts = query
        .active_alerts(
            &ctx,
            AlertQuery {
                zone: Some("A1".to_string()),
                min_severity: Some(Severity::High),
                ..AlertQuery::default()
            },
        )
        .await
        .expect("alerts");
    assert_eq!(alerts.len(), 1);
    assert!(query
        .active_alerts(
            &ctx,
            AlertQuery {
                zone: Some("ENTRADA".to_string()),
                ..AlertQuery::default()
            },
        )
        .await
        .expect("alerts")
        .is_empty());
}
