use fleet_ingest::{IngestError, parse_payload};
use serde_json::json;

#[test]
fn camel_case_payload_parses() {
    let payload = json!({
        "readingType": "temperature",
        "value": 41.5,
        "unit": "C",
        "timestamp": 1_699_927_200_000_i64,
        "eventType": "overheat"
    });
    let request = parse_payload("TEMP001", payload.to_string().as_bytes()).expect("parse");
    assert_eq!(request.device_id, "TEMP001");
    assert_eq!(request.reading_type, "temperature");
    assert_eq!(request.value, 41.5);
    assert_eq!(request.unit, "C");
    assert_eq!(request.ts_ms, 1_699_927_200_000);
    assert_eq!(request.event_type.as_deref(), Some("overheat"));
    assert_eq!(request.raw_payload, payload);
}

#[test]
fn portuguese_aliases_and_booleans_parse() {
    let payload = json!({ "tipo": "motion", "valor": true, "unidade": "bool", "ts": 42 });
    let request = parse_payload("SENSOR001", payload.to_string().as_bytes()).expect("parse");
    assert_eq!(request.reading_type, "motion");
    assert_eq!(request.value, 1.0);
    assert_eq!(request.unit, "bool");
    assert_eq!(request.ts_ms, 42);
    assert!(request.event_type.is_none());
}

#[test]
fn text_values_are_rejected() {
    let payload = json!({ "tipo": "motion", "valor": "sim", "ts": 42 });
    let err = parse_payload("SENSOR001", payload.to_string().as_bytes()).expect_err("text");
    assert!(matches!(err, IngestError::Payload(_)));
    let err = parse_payload("SENSOR001", b"not json").expect_err("json");
    assert!(matches!(err, IngestError::Payload(_)));
}

#[test]
fn payload_without_source_timestamp_is_rejected() {
    let payload = json!({ "tipo": "motion", "valor": true, "unidade": "bool" });
    let err = parse_payload("SENSOR001", payload.to_string().as_bytes()).expect_err("no ts");
    assert!(matches!(err, IngestError::Payload(message) if message.contains("timestamp")));
}
