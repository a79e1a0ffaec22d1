use std::path::PathBuf;

use inctrack::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::ActivityNotFound(4);
    assert_eq!(missing.exit_code(), exit_codes::USER_ERROR);

    let locked = Error::LockedResource(PathBuf::from("incident_numbers.json"));
    assert_eq!(locked.exit_code(), exit_codes::BLOCKED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn locked_resource_message_names_the_file() {
    let err = Error::LockedResource(PathBuf::from("/data/incident_numbers.json"));
    let message = err.to_string();
    assert!(message.contains("/data/incident_numbers.json"));
    assert!(message.contains("Close it"));
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::IncidentNotFound(3);
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.error.contains("position 3"));
    assert_eq!(json.details, Some(serde_json::json!({ "position": 3 })));

    let corrupt = Error::CorruptStore {
        path: PathBuf::from("ledger.json"),
        reason: "expected value".to_string(),
    };
    let json = JsonError::from(&corrupt);
    assert_eq!(json.code, exit_codes::OPERATION_FAILED);
    assert_eq!(
        json.details,
        Some(serde_json::json!({ "path": "ledger.json", "reason": "expected value" }))
    );
}
