use api_contract::ApiResponse;
use serde_json::json;

#[test]
fn api_response_success() {
    let response = ApiResponse::success("ok");
    assert!(response.success);
    assert!(response.data.is_some());
    assert!(response.error.is_none());
}

#[test]
fn api_response_error() {
    let response = ApiResponse::<()>::error("ALERT.ALREADY_RESOLVED", "alert already resolved");
    assert!(!response.success);
    assert!(response.data.is_none());
    assert!(response.error.is_some());
}

#[test]
fn error_envelope_shape() {
    let response = ApiResponse::<()>::error("INGEST.UNKNOWN_DEVICE", "unknown device: X");
    let value = serde_json::to_value(response).expect("serialize");
    assert_eq!(
        value,
        json!({
            "success": false,
            "data": null,
            "error": { "code": "INGEST.UNKNOWN_DEVICE", "message": "unknown device: X" }
        })
    );
}
