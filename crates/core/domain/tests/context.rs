use domain::{Alert, AlertCategory, EntityKind, EntityRef, FleetError, RequestContext, Severity};
use std::collections::BTreeMap;
use std::time::Duration;

#[test]
fn request_context_without_deadline_stays_live() {
    let ctx = RequestContext::system();

    assert_eq!(ctx.actor_id, "system");
    assert!(ctx.remaining().is_none());
    assert!(ctx.ensure_live().is_ok());
}

#[test]
fn expired_context_reports_deadline() {
    let ctx = RequestContext::new("operator-1", None).with_timeout(Duration::ZERO);

    assert!(ctx.is_expired());
    assert_eq!(ctx.ensure_live(), Err(FleetError::DeadlineExceeded));
}

#[test]
fn error_codes_are_stable() {
    let err = FleetError::not_found(EntityKind::Vehicle, "XYZ0000");
    assert_eq!(err.code(), "RESOURCE.NOT_FOUND");
    assert_eq!(err.to_string(), "vehicle not found: XYZ0000");
    assert_eq!(
        FleetError::Contention {
            resource: "device:SENSOR001".to_string(),
            attempts: 3
        }
        .code(),
        "RESOURCE.CONTENTION"
    );
}

#[test]
fn severity_orders_low_to_critical() {
    let mut items = vec![Severity::High, Severity::Low, Severity::Critical, Severity::Medium];
    items.sort();
    assert_eq!(
        items,
        vec![Severity::Low, Severity::Medium, Severity::High, Severity::Critical]
    );
    assert_eq!("medium".parse::<Severity>().ok(), Some(Severity::Medium));
}

#[test]
fn entity_ref_display() {
    assert_eq!(EntityRef::vehicle("ABC1234").to_string(), "vehicle:ABC1234");
    assert!(EntityRef::vehicle("ABC1234") < EntityRef::vehicle("DEF5678"));
}

#[test]
fn alert_open_duration_stops_at_resolution() {
    let mut alert = Alert {
        alert_id: "ALR-20231114-000001".to_string(),
        category: AlertCategory::Security,
        severity: Severity::Medium,
        title: "Movimento detectado".to_string(),
        description: String::new(),
        device_id: Some("SENSOR001".to_string()),
        vehicle_plate: None,
        zone: Some("A1".to_string()),
        active: true,
        created_at_ms: 0,
        source_ts_ms: 0,
        resolved_at_ms: None,
        resolved_by: None,
        resolution_notes: None,
        reading_id: None,
        event_id: None,
        rule_id: None,
        confidence: None,
        metadata: BTreeMap::new(),
    };
    assert_eq!(alert.open_minutes(600_000), 10);
    alert.resolved_at_ms = Some(120_000);
    assert_eq!(alert.open_minutes(600_000), 2);
}
