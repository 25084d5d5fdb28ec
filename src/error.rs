//! Error types for tenant-aware resolution.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents the conditions that can occur while declaring bindings,
/// validating them at startup, or resolving services for a tenant.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{BindingCollection, DiError, FixedTenant, Resolver, TenantId};
/// use std::sync::Arc;
///
/// let container = BindingCollection::new()
///     .build(Arc::new(FixedTenant::new(TenantId::new_v4())))
///     .unwrap();
///
/// match container.get::<String>() {
///     Err(DiError::BindingNotFound(service)) => {
///         assert_eq!(service, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// A target type cannot be constructed as declared
    ///
    /// Raised when a type descriptor has zero or several constructors, when an
    /// open generic binding cannot be parameterized from the requested
    /// service, or when a constructed type does not expose the service.
    #[error("Configuration error for {type_name}: {reason}")]
    Configuration {
        /// Type the configuration problem belongs to
        type_name: String,
        /// What is wrong with it
        reason: String,
    },
    /// No binding or registration source can produce the service
    #[error("No binding found for service {0}")]
    BindingNotFound(String),
    /// No tenant is active for the calling execution context
    #[error("No tenant in the current execution context: {0}")]
    Context(String),
    /// The same service was bound twice
    #[error("Duplicate binding for service {0}")]
    DuplicateBinding(String),
    /// Cyclic resolution detected on the calling thread (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),
    /// A factory callback reported a failure
    #[error("Factory for {service} failed: {message}")]
    Factory {
        /// Service whose factory failed
        service: String,
        /// Failure reported by the factory
        message: String,
    },
}

impl DiError {
    /// Shorthand for [`DiError::Configuration`].
    pub fn configuration(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        DiError::Configuration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DiError::Factory`].
    pub fn factory(service: impl Into<String>, message: impl Into<String>) -> Self {
        DiError::Factory {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Result type for DI operations
///
/// A convenience alias for `Result<T, DiError>` used throughout the crate.
///
/// ```rust
/// use tenant_di::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::BindingNotFound("some_service".to_string()))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
