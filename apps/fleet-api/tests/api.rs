use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use domain::{IdGenerator, ManualClock, RequestContext};
use fleet_alert::AlertEngine;
use fleet_api::{AppState, build_app};
use fleet_registry::{Registry, RegistryStores, RetryPolicy, SeedData};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// 2023-11-14 02:00 UTC
const T0: i64 = 1_699_927_200_000;

async fn app() -> Router {
    let registry = Arc::new(Registry::new(
        RegistryStores::in_memory(),
        RetryPolicy::default(),
        Arc::new(IdGenerator::new()),
        Arc::new(ManualClock::new(T0)),
    ));
    registry
        .apply_seed(&RequestContext::system(), &SeedData::demo())
        .await
        .expect("seed");
    let engine = Arc::new(AlertEngine::new(registry));
    build_app(AppState::new(engine, Duration::from_secs(5)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes: Bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json")
    };
    (status, value)
}

fn night_motion_rule(cooldown: Option<u64>) -> Value {
    let mut rule = json!({
        "name": "night motion",
        "category": "movement",
        "severity": "MEDIUM",
        "condition": {
            "op": "all",
            "conditions": [
                { "op": "reading_type", "value": "motion" },
                { "op": "value_above", "threshold": 0.5 },
                { "op": "local_time_between", "start_minute": 1320, "end_minute": 360 }
            ]
        },
        "title": "Movimento Detectado",
        "description": "{device} em {zone}"
    });
    if let Some(cooldown) = cooldown {
        rule["cooldownSeconds"] = json!(cooldown);
    }
    rule
}

fn motion_reading() -> Value {
    json!({
        "deviceId": "SENSOR001",
        "readingType": "motion",
        "value": 1,
        "unit": "bool",
        "timestamp": T0,
        "rawPayload": { "confidence": 0.92 }
    })
}

#[tokio::test]
async fn health_sets_request_headers() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-trace-id"));
}

#[tokio::test]
async fn rule_without_cooldown_is_rejected() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/alert-rules",
        Some(night_motion_rule(None)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("INVALID.REQUEST"));

    let (status, body) = send(&app, "GET", "/api/alert-rules", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn night_motion_flows_from_ingest_to_resolution() {
    let app = app().await;
    let (status, rule) =
        send(&app, "POST", "/api/alert-rules", Some(night_motion_rule(Some(300)))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["data"]["cooldownSeconds"], json!(300));

    let (status, first) = send(&app, "POST", "/api/readings", Some(motion_reading())).await;
    assert_eq!(status, StatusCode::CREATED);
    let reading_id = first["data"]["readingId"].clone();
    assert_eq!(first["data"]["duplicate"], json!(false));
    assert!(first["data"]["eventId"].is_string());
    assert_eq!(first["data"]["alertIds"].as_array().map(Vec::len), Some(1));

    let (status, again) = send(&app, "POST", "/api/readings", Some(motion_reading())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["duplicate"], json!(true));
    assert_eq!(again["data"]["readingId"], reading_id);

    let (status, alerts) = send(&app, "GET", "/api/alerts?zone=A1", None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["severity"], json!("MEDIUM"));
    assert_eq!(alerts[0]["readingId"], reading_id);
    assert_eq!(alerts[0]["description"], json!("SENSOR001 em A1"));
    let alert_id = alerts[0]["alertId"].as_str().unwrap_or_default().to_string();

    let (status, readings) = send(&app, "GET", "/api/devices/SENSOR001/readings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readings["data"].as_array().map(Vec::len), Some(1));

    let resolve_uri = format!("/api/alerts/{alert_id}/resolve");
    let (status, _) = send(&app, "POST", &resolve_uri, Some(json!({ "resolverId": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resolved) = send(
        &app,
        "POST",
        &resolve_uri,
        Some(json!({ "resolverId": "12345678901", "notes": "ronda verificada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["data"]["active"], json!(false));
    assert_eq!(resolved["data"]["resolvedBy"], json!("12345678901"));

    let (status, twice) = send(
        &app,
        "POST",
        &resolve_uri,
        Some(json!({ "resolverId": "98765432109" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(twice["error"]["code"], json!("ALERT.ALREADY_RESOLVED"));

    let (_, detail) = send(&app, "GET", &format!("/api/alerts/{alert_id}"), None).await;
    assert_eq!(detail["data"]["resolvedBy"], json!("12345678901"));

    let (_, active) = send(&app, "GET", "/api/alerts", None).await;
    assert_eq!(active["data"], json!([]));
}

#[tokio::test]
async fn unknown_device_is_unprocessable() {
    let app = app().await;
    let mut reading = motion_reading();
    reading["deviceId"] = json!("GHOST001");
    let (status, body) = send(&app, "POST", "/api/readings", Some(reading)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("INGEST.UNKNOWN_DEVICE"));
}

#[tokio::test]
async fn nearby_filters_by_radius() {
    let app = app().await;
    for (plate, latitude) in [("NEAR001", -22.9068 + 0.00009), ("FAR0001", -22.9068 + 0.0054)] {
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/vehicles/{plate}"),
            Some(json!({
                "model": "Honda CG 160",
                "batteryLevel": 80,
                "location": { "zone": "B1", "latitude": latitude, "longitude": -43.1729 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = "/api/nearby?lat=-22.9068&lon=-43.1729&radius=500";
    let (status, body) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], json!("NEAR001"));
    assert_eq!(hits[0]["kind"], json!("vehicle"));

    let (_, zone) = send(&app, "GET", "/api/zones/B1/entities", None).await;
    let ids: Vec<Value> = zone["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|entity| entity["id"].clone())
        .collect();
    assert!(ids.contains(&json!("NEAR001")));
    assert!(ids.contains(&json!("FAR0001")));
}

#[tokio::test]
async fn unknown_zone_is_not_found() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/zones/Z9/vehicles/available", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("RESOURCE.NOT_FOUND"));
}

#[tokio::test]
async fn checkout_and_checkin_round_trip() {
    let app = app().await;
    let (status, usage) = send(
        &app,
        "POST",
        "/api/vehicles/abc1234/checkout",
        Some(json!({ "userId": "12345678901", "origin": "A1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(usage["data"]["status"], json!("in_progress"));
    let usage_id = usage["data"]["usageId"].as_str().unwrap_or_default().to_string();

    let (_, available) = send(&app, "GET", "/api/zones/A1/vehicles/available", None).await;
    assert_eq!(available["data"], json!([]));

    let (status, closed) = send(
        &app,
        "POST",
        &format!("/api/usage/{usage_id}/checkin"),
        Some(json!({ "endedAtMs": T0 + 45 * 60_000, "destination": "B1", "batteryLevel": 70 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["data"]["durationMinutes"], json!(45));

    let (_, vehicle) = send(&app, "GET", "/api/vehicles/ABC1234", None).await;
    assert_eq!(vehicle["data"]["status"], json!("available"));
    assert_eq!(vehicle["data"]["batteryLevel"], json!(70));

    let (_, history) = send(&app, "GET", "/api/vehicles/ABC1234/usage", None).await;
    assert_eq!(history["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn summary_and_metrics_are_exposed() {
    let app = app().await;
    let (status, summary) = send(&app, "GET", "/api/fleet/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["data"]["total"], json!(2));
    assert_eq!(summary["data"]["inUse"], json!(1));
    assert_eq!(summary["data"]["devicesOnline"], json!(3));

    let (status, metrics) = send(&app, "GET", "/api/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics["data"]["readingsIngested"].is_u64());
}

#[tokio::test]
async fn device_status_reports_latest_reading() {
    let app = app().await;
    let (status, _) = send(&app, "POST", "/api/readings", Some(motion_reading())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, view) = send(&app, "GET", "/api/devices/SENSOR001/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["data"]["device"]["status"], json!("online"));
    assert_eq!(view["data"]["latestReading"]["readingType"], json!("motion"));
    assert_eq!(view["data"]["activeAlerts"], json!(0));
}
