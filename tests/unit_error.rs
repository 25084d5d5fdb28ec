/// Unit tests for DiError and DiResult types
/// These tests pin the user-facing messages of each error variant

use tenant_di::{DiError, DiResult};
use std::error::Error;

#[test]
fn test_error_display_configuration() {
    let error = DiError::configuration("Repository<_>", "no closing for [u8]");
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Configuration error for Repository<_>: no closing for [u8]");
}

#[test]
fn test_error_display_binding_not_found() {
    let error = DiError::BindingNotFound("app::Mailer".to_string());
    assert_eq!(error.to_string(), "No binding found for service app::Mailer");
}

#[test]
fn test_error_display_context() {
    let error = DiError::Context("no tenant established".to_string());
    let display_str = error.to_string();
    assert!(display_str.starts_with("No tenant in the current execution context"));
    assert!(display_str.ends_with("no tenant established"));
}

#[test]
fn test_error_display_duplicate_binding() {
    let error = DiError::DuplicateBinding("dyn app::Logger".to_string());
    assert_eq!(error.to_string(), "Duplicate binding for service dyn app::Logger");
}

#[test]
fn test_error_display_circular() {
    let path = vec!["ServiceA".to_string(), "ServiceB".to_string(), "ServiceA".to_string()];
    let error = DiError::Circular(path);
    assert_eq!(error.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
}

#[test]
fn test_error_display_circular_single() {
    let error = DiError::Circular(vec!["Node".to_string()]);
    assert_eq!(error.to_string(), "Circular dependency: Node");
}

#[test]
fn test_error_display_depth_exceeded() {
    assert_eq!(DiError::DepthExceeded(1024).to_string(), "Max depth 1024 exceeded");
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch("alloc::string::String".to_string());
    assert_eq!(error.to_string(), "Type mismatch for: alloc::string::String");
}

#[test]
fn test_error_display_factory() {
    let error = DiError::factory("Session", "database unreachable");
    assert_eq!(error.to_string(), "Factory for Session failed: database unreachable");
}

#[test]
fn test_error_equality_and_clone() {
    let error = DiError::factory("Session", "boom");
    assert_eq!(error.clone(), error);
    assert_ne!(error, DiError::factory("Session", "other"));
    assert_ne!(
        DiError::BindingNotFound("A".to_string()),
        DiError::TypeMismatch("A".to_string())
    );
}

#[test]
fn test_error_is_std_error_without_source() {
    let error = DiError::DepthExceeded(3);
    let as_error: &dyn Error = &error;
    assert!(as_error.source().is_none());
}

#[test]
fn test_di_result_propagates_with_question_mark() {
    fn inner() -> DiResult<u32> {
        Err(DiError::Context("none".to_string()))
    }
    fn outer() -> DiResult<u32> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert_eq!(outer(), Err(DiError::Context("none".to_string())));
}
