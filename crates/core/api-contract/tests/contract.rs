use api_contract::{
    AlertDto, CheckinRequestDto, CreateRuleRequest, IngestReadingRequest, IngestReceiptDto,
    NearbyQuery, ResolveAlertRequest, UpsertVehicleRequest,
};
use serde_json::{Value, json};

#[test]
fn ingest_request_accepts_camel_case() {
    let payload = r#"{
        "deviceId": "SENSOR001",
        "readingType": "motion",
        "value": 1,
        "unit": "bool",
        "timestamp": 1699927200000,
        "rawPayload": {"confidence": 0.9},
        "eventType": "motion_detected"
    }"#;
    let req: IngestReadingRequest = serde_json::from_str(payload).expect("parse");
    assert_eq!(req.device_id, "SENSOR001");
    assert_eq!(req.reading_type, "motion");
    assert_eq!(req.value, 1.0);
    assert_eq!(req.timestamp, 1_699_927_200_000);
    assert_eq!(req.event_type.as_deref(), Some("motion_detected"));
    assert_eq!(req.raw_payload, Some(json!({"confidence": 0.9})));
}

#[test]
fn ingest_request_accepts_portuguese_aliases() {
    let payload = r#"{"dispositivoId":"SENSOR002","tipo":"temperatura","valor":41.5,"unidade":"C","ts":1699927200000}"#;
    let req: IngestReadingRequest = serde_json::from_str(payload).expect("parse");
    assert_eq!(req.device_id, "SENSOR002");
    assert_eq!(req.reading_type, "temperatura");
    assert_eq!(req.unit, "C");
    assert!(req.raw_payload.is_none());
    assert!(req.event_type.is_none());
}

#[test]
fn ingest_receipt_is_camel_case() {
    let receipt = IngestReceiptDto {
        reading_id: "RDG-000001".to_string(),
        event_id: Some("EVT-20231114-000001".to_string()),
        alert_ids: vec!["ALR-20231114-000001".to_string()],
        duplicate: false,
    };
    let value = serde_json::to_value(receipt).expect("serialize");
    assert!(value.get("readingId").is_some());
    assert!(value.get("eventId").is_some());
    assert!(matches!(value.get("alertIds"), Some(Value::Array(_))));
    assert!(value.get("reading_id").is_none());
}

#[test]
fn create_rule_keeps_missing_cooldown_visible() {
    let payload = json!({
        "name": "night motion",
        "category": "movement",
        "severity": "MEDIUM",
        "condition": { "op": "reading_type", "value": "motion" },
        "title": "Movimento Detectado"
    });
    let req: CreateRuleRequest = serde_json::from_value(payload).expect("parse");
    assert!(req.cooldown_seconds.is_none());
    assert_eq!(req.description, "");

    let req: CreateRuleRequest = serde_json::from_value(json!({
        "name": "night motion",
        "category": "movement",
        "severity": "MEDIUM",
        "condition": { "op": "reading_type", "value": "motion" },
        "title": "Movimento Detectado",
        "cooldown_seconds": 300
    }))
    .expect("parse");
    assert_eq!(req.cooldown_seconds, Some(300));
}

#[test]
fn resolve_request_accepts_both_cases() {
    let req: ResolveAlertRequest =
        serde_json::from_str(r#"{"resolverId":"12345678901","notes":"ok"}"#).expect("parse");
    assert_eq!(req.resolver_id, "12345678901");
    let req: ResolveAlertRequest =
        serde_json::from_str(r#"{"resolver_id":"12345678901","observacoes":"visto"}"#)
            .expect("parse");
    assert_eq!(req.notes.as_deref(), Some("visto"));
}

#[test]
fn vehicle_request_reads_nested_location() {
    let payload = json!({
        "model": "Honda CG 160",
        "batteryLevel": 85,
        "location": { "zona": "A1", "latitude": -23.5505, "longitude": -46.6333, "vaga": "A1-01" }
    });
    let req: UpsertVehicleRequest = serde_json::from_value(payload).expect("parse");
    assert_eq!(req.location.zone, "A1");
    assert_eq!(req.location.slot.as_deref(), Some("A1-01"));
    assert!(req.status.is_none());
}

#[test]
fn checkin_request_defaults_to_empty() {
    let req: CheckinRequestDto = serde_json::from_str("{}").expect("parse");
    assert!(req.ended_at_ms.is_none());
    assert!(req.location.is_none());
}

#[test]
fn nearby_query_parses_short_names() {
    let query: NearbyQuery =
        serde_json::from_str(r#"{"lat":-23.5505,"lon":-46.6333,"radius":500}"#).expect("parse");
    assert_eq!(query.radius, 500.0);
}

#[test]
fn alert_dto_is_camel_case() {
    let alert = AlertDto {
        alert_id: "ALR-20231114-000001".to_string(),
        category: "movement".to_string(),
        severity: "MEDIUM".to_string(),
        title: "Movimento Detectado".to_string(),
        description: String::new(),
        device_id: Some("SENSOR001".to_string()),
        vehicle_plate: None,
        zone: Some("A1".to_string()),
        active: true,
        created_at_ms: 1_699_927_200_000,
        source_ts_ms: 1_699_927_200_000,
        resolved_at_ms: None,
        resolved_by: None,
        resolution_notes: None,
        reading_id: Some("RDG-000001".to_string()),
        event_id: None,
        rule_id: Some("RULE-000001".to_string()),
        confidence: None,
        open_minutes: 0,
    };
    let value = serde_json::to_value(alert).expect("serialize");
    assert!(value.get("alertId").is_some());
    assert!(value.get("createdAtMs").is_some());
    assert!(value.get("openMinutes").is_some());
    assert!(value.get("alert_id").is_none());
}
