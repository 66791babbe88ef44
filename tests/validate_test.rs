use ctrepo_guard::breaking::rules::{PROTOCOL_ID_CHANGED, TARGET_ENROLLMENT_CHANGED};
use ctrepo_guard::{
    HistoryError, MemoryRevisionHistory, ProtocolDocument, ProtocolValidator, RevisionHistory,
    SchemaDefinition, integrity_hash, validate_protocol_update,
};
use std::fs;

fn data_path(file_name: &str) -> String {
    format!("{}/tests/data/{file_name}", env!("CARGO_MANIFEST_DIR"))
}

fn read_protocol(file_name: &str) -> String {
    fs::read_to_string(data_path(file_name)).expect("Could not read test protocol file")
}

fn builtin() -> SchemaDefinition {
    SchemaDefinition::builtin().expect("built-in schema compiles")
}

struct UnavailableHistory;

impl RevisionHistory for UnavailableHistory {
    fn most_recent_document(
        &self,
        repository_id: &str,
    ) -> Result<Option<ProtocolDocument>, HistoryError> {
        Err(HistoryError::RepositoryNotFound(repository_id.to_string()))
    }
}

#[test]
fn test_unparseable_text_is_invalid() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    history.append("nsclc", read_protocol("protocol_v1.yaml"));

    for raw in ["meta: {id: P1", "key: [unclosed", "- just\n- a list\n", "", "42"] {
        let result = validate_protocol_update("nsclc", raw, &schema, &history);
        assert!(!result.valid, "{raw:?} should be rejected");
        assert!(result.integrity_hash.is_none());
        assert!(result.breaking_changes.is_none());
        assert!(result.warnings().is_empty());
        let error = result.error.expect("error message");
        assert!(error.starts_with("Protocol parse error"), "got {error}");
    }
}

#[test]
fn test_valid_protocol_on_fresh_repository() {
    let raw = read_protocol("protocol_v1.yaml");
    let result = validate_protocol_update("fresh", &raw, &builtin(), &MemoryRevisionHistory::new());

    assert!(result.valid, "{:?}", result.error);
    assert_eq!(result.document_id.as_deref(), Some("BST-NSCLC-002"));
    assert_eq!(result.document_version.as_deref(), Some("1.0"));
    assert_eq!(result.integrity_hash, Some(integrity_hash(&raw)));
    assert_eq!(result.breaking_changes, Some(vec![]));
    assert!(result.error.is_none());
}

#[test]
fn test_hash_covers_raw_text_not_parsed_form() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    let raw = read_protocol("protocol_v1.yaml");
    // Same document, different bytes: comment removed.
    let stripped: String = raw
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| format!("{line}\n"))
        .collect();

    let a = validate_protocol_update("t", &raw, &schema, &history);
    let b = validate_protocol_update("t", &stripped, &schema, &history);

    assert!(a.valid && b.valid);
    assert_eq!(a.document_id, b.document_id);
    assert_ne!(a.integrity_hash, b.integrity_hash);
}

#[test]
fn test_single_byte_change_changes_hash() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    let raw = read_protocol("protocol_v1.yaml");
    let tweaked = raw.replace("Bastion Health", "Bastion Healti");

    let a = validate_protocol_update("t", &raw, &schema, &history);
    let b = validate_protocol_update("t", &tweaked, &schema, &history);

    assert!(a.valid && b.valid);
    assert_ne!(a.integrity_hash, b.integrity_hash);
}

#[test]
fn test_validation_is_idempotent() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    history.append("nsclc", read_protocol("protocol_v1.yaml"));
    let raw = read_protocol("protocol_new_id.yaml");

    let first = validate_protocol_update("nsclc", &raw, &schema, &history);
    let second = validate_protocol_update("nsclc", &raw, &schema, &history);

    assert!(first.same_outcome(&second));
    assert_eq!(first.integrity_hash, second.integrity_hash);
}

#[test]
fn test_breaking_changes_reported_for_valid_update() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    history.append("nsclc", read_protocol("protocol_v1.yaml"));

    let result = validate_protocol_update(
        "nsclc",
        &read_protocol("protocol_v2_enrollment.yaml"),
        &schema,
        &history,
    );

    assert!(result.valid);
    assert_eq!(result.warnings(), [TARGET_ENROLLMENT_CHANGED]);
}

#[test]
fn test_new_protocol_id_first_warning() {
    let schema = builtin();
    let history = MemoryRevisionHistory::new();
    history.append("nsclc", read_protocol("protocol_v1.yaml"));

    let result = validate_protocol_update(
        "nsclc",
        &read_protocol("protocol_new_id.yaml"),
        &schema,
        &history,
    );

    assert!(result.valid);
    assert_eq!(result.warnings().first().map(String::as_str), Some(PROTOCOL_ID_CHANGED));
}

#[test]
fn test_missing_required_id_is_invalid() {
    let schema = SchemaDefinition::from_path(data_path("minimal.schema.json")).unwrap();
    let result = validate_protocol_update(
        "nsclc",
        &read_protocol("protocol_missing_id.yaml"),
        &schema,
        &MemoryRevisionHistory::new(),
    );

    assert!(!result.valid);
    assert!(result.integrity_hash.is_none());
    assert!(result.warnings().is_empty());
    let error = result.error.expect("error message");
    assert!(error.contains("\"id\""), "error should name the missing field: {error}");
    // Reported metadata still comes from the parsed document.
    assert_eq!(result.document_version.as_deref(), Some("v1.0"));
}

#[test]
fn test_schema_violation_reports_first_violation_only() {
    let raw = "meta: {id: P1}\npopulation: {target_size: many, inclusion: 3}\n";
    let result = validate_protocol_update("t", raw, &builtin(), &MemoryRevisionHistory::new());

    assert!(!result.valid);
    let error = result.error.expect("error message");
    assert!(error.starts_with("Schema violation at "), "got {error}");
    assert_eq!(error.matches("Schema violation").count(), 1);
}

#[test]
fn test_unavailable_history_does_not_block_acceptance() {
    let raw = read_protocol("protocol_new_id.yaml");
    let result = ProtocolValidator::new(&builtin(), &UnavailableHistory).validate("nsclc", &raw);

    assert!(result.valid);
    assert!(result.integrity_hash.is_some());
    assert_eq!(result.breaking_changes, Some(vec![]));
}

#[test]
fn test_json_input_is_accepted() {
    let raw = r#"{"meta": {"id": "J1", "version": "2"},
                  "population": {"target_size": 10, "inclusion": []},
                  "endpoints": {"primary": ["OS"]}}"#;
    let result = validate_protocol_update("t", raw, &builtin(), &MemoryRevisionHistory::new());

    assert!(result.valid, "{:?}", result.error);
    assert_eq!(result.document_id.as_deref(), Some("J1"));
}
