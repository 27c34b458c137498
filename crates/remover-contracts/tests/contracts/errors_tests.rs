use super::*;

#[test]
fn with_code_overrides_code_and_keeps_context() {
    let error = AppError::new("inner", "inner failure").with_context("path", "/tmp/a");
    let result: AppResult<()> = Err(error);
    let mapped = result
        .with_code("remover_staging_failure", "staging unavailable")
        .expect_err("should stay an error");

    assert_eq!(mapped.code, "remover_staging_failure");
    assert_eq!(mapped.message, "staging unavailable");
    assert_eq!(mapped.context_value("path"), Some("/tmp/a"));
}

#[test]
fn io_errors_keep_their_cause_chain() {
    let io_result: Result<(), std::io::Error> = Err(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "denied by test",
    ));
    let error = io_result
        .with_ctx("path", "/Library/Foo")
        .expect_err("should map io error");

    assert_eq!(error.code, DEFAULT_CODE);
    assert_eq!(error.context_value("path"), Some("/Library/Foo"));
    if cfg!(debug_assertions) {
        assert_eq!(error.causes, vec!["denied by test".to_string()]);
    }
}

#[test]
fn payload_serializes_camel_case_and_skips_empty_lists() {
    let error = AppError::new("remover_unresolvable_identity", "identity too weak");
    let value = serde_json::to_value(&error).expect("serialize error");

    assert_eq!(value["code"], "remover_unresolvable_identity");
    assert!(value.get("context").is_none());
    assert!(value.get("causes").is_none());
}

#[test]
fn with_source_collects_nested_causes() {
    let error = AppError::new("remover_restore_failure", "restore failed").with_source(
        std::io::Error::new(std::io::ErrorKind::NotFound, "staged payload gone"),
    );
    assert_eq!(error.causes, vec!["staged payload gone".to_string()]);
}
