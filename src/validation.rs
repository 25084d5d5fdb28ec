//! Startup validation of bindings.
//!
//! Catches configuration mistakes before the first resolution instead of on
//! the first request that happens to hit them.
//!
//! # Validation Rules
//!
//! - **Constructor count**: Error - a type must declare exactly one constructor
//! - **Exposure**: Error - a type must be exposable as the service it is bound to
//! - **Generic mismatch**: Error - open targets need a generic service and vice versa
//! - **Missing dependencies**: Error - constructor parameters nobody can provide
//! - **Singleton → per-tenant**: Warning - the first tenant's instance is kept for everyone
//! - **Singleton → transient**: Warning - the singleton holds one transient forever

use std::fmt;
use std::sync::Arc;

use crate::descriptors::{Target, TypeDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceId;
use crate::registration::{Binding, BindingRegistry, Strategy};
use crate::scope::Scope;
use crate::traits::RegistrationSource;

/// A problem that makes a binding unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The target type does not have exactly one constructor
    Constructor { service: String, error: DiError },
    /// The target type cannot be handed out as the bound service
    NotExposed { service: String, implementation: String },
    /// An open target bound to a non-generic service, or the reverse
    GenericMismatch { service: String, target: String },
    /// A constructor parameter has no binding and no source provides it
    MissingDependency { service: String, dependency: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Constructor { service, error } => {
                write!(f, "{}: {}", service, error)
            }
            ValidationError::NotExposed { service, implementation } => {
                write!(f, "{}: {} is not exposed as this service", service, implementation)
            }
            ValidationError::GenericMismatch { service, target } => {
                write!(f, "{}: target {} does not match the service's genericity", service, target)
            }
            ValidationError::MissingDependency { service, dependency } => {
                write!(f, "{}: no binding for dependency {}", service, dependency)
            }
        }
    }
}

/// A configuration that works but is probably not what was meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A singleton captures a per-tenant dependency
    SingletonCapturesTenant { service: String, dependency: String },
    /// A singleton captures a transient dependency
    SingletonCapturesTransient { service: String, dependency: String },
}

/// Result of validating every binding of a container.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that must be fixed
    pub errors: Vec<ValidationError>,
    /// Potentially problematic configurations
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` when there are no errors; otherwise a configuration error listing them.
    pub fn into_result(self) -> DiResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let reasons: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        Err(DiError::configuration("container", reasons.join("; ")))
    }
}

/// Validates all bindings of `registry`.
///
/// Dependencies are considered available when a binding or one of `sources`
/// provides them. Type callbacks are not evaluated.
pub fn validate(
    registry: &BindingRegistry,
    sources: &[Arc<dyn RegistrationSource>],
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for binding in registry.iter() {
        validate_binding(binding, registry, sources, &mut report);
    }

    for error in &report.errors {
        tracing::warn!(error = %error, "binding validation failed");
    }
    for warning in &report.warnings {
        tracing::debug!(warning = ?warning, "binding validation warning");
    }
    report
}

fn validate_binding(
    binding: &Binding,
    registry: &BindingRegistry,
    sources: &[Arc<dyn RegistrationSource>],
    report: &mut ValidationReport,
) {
    let service = binding.service();
    let target = match binding.strategy() {
        Strategy::Type(target) => target,
        _ => return,
    };

    match target {
        Target::Closed(descriptor) => {
            let Some(key) = service.type_key() else {
                report.errors.push(ValidationError::GenericMismatch {
                    service: service.to_string(),
                    target: target.name(),
                });
                return;
            };
            if !descriptor.exposes(&key) {
                report.errors.push(ValidationError::NotExposed {
                    service: service.to_string(),
                    implementation: target.name(),
                });
            }
            validate_descriptor(binding, descriptor, registry, sources, report);
        }
        Target::Open(open) => {
            if !service.is_open() {
                report.errors.push(ValidationError::GenericMismatch {
                    service: service.to_string(),
                    target: target.name(),
                });
                return;
            }
            for (_, descriptor) in open.closings() {
                validate_descriptor(binding, descriptor, registry, sources, report);
            }
        }
    }
}

fn validate_descriptor(
    binding: &Binding,
    descriptor: &TypeDescriptor,
    registry: &BindingRegistry,
    sources: &[Arc<dyn RegistrationSource>],
    report: &mut ValidationReport,
) {
    let service = binding.service().to_string();
    let constructor = match descriptor.designated_constructor() {
        Ok(constructor) => constructor,
        Err(error) => {
            report.errors.push(ValidationError::Constructor { service, error });
            return;
        }
    };

    for param in constructor.params() {
        match registry.lookup(param) {
            Some(dependency) => {
                if binding.scope() == Scope::Singleton {
                    check_capture(&service, param, dependency.scope(), report);
                }
            }
            None if provided_by_source(param, sources) => {}
            None => report.errors.push(ValidationError::MissingDependency {
                service: service.clone(),
                dependency: param.to_string(),
            }),
        }
    }
}

fn check_capture(service: &str, param: &ServiceId, scope: Scope, report: &mut ValidationReport) {
    let dependency = param.to_string();
    let service = service.to_string();
    match scope {
        Scope::SingletonPerTenant => report
            .warnings
            .push(ValidationWarning::SingletonCapturesTenant { service, dependency }),
        Scope::Transient => report
            .warnings
            .push(ValidationWarning::SingletonCapturesTransient { service, dependency }),
        Scope::Singleton => {}
    }
}

fn provided_by_source(service: &ServiceId, sources: &[Arc<dyn RegistrationSource>]) -> bool {
    sources
        .iter()
        .any(|source| source.registration_for(service).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::OpenType;
    use crate::key::GenericDef;
    use std::sync::Arc;

    struct Clock;
    struct Session;
    struct Audit {
        _clock: Arc<Clock>,
        _session: Arc<Session>,
    }

    fn audit_descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Audit>()
            .inject(|(clock, session): (Arc<Clock>, Arc<Session>)| Audit {
                _clock: clock,
                _session: session,
            })
            .build()
    }

    fn add(registry: &mut BindingRegistry, service: ServiceId, target: Target, scope: Scope) {
        registry
            .add_binding(Binding::new(service, Strategy::Type(target), scope))
            .unwrap();
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let mut registry = BindingRegistry::new();
        add(&mut registry, ServiceId::of::<Audit>(), audit_descriptor().into(), Scope::Transient);
        add(&mut registry, ServiceId::of::<Clock>(), TypeDescriptor::of(|| Clock).into(), Scope::Singleton);

        let report = validate(&registry, &[]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            ValidationError::MissingDependency { dependency, .. } if dependency.contains("Session")
        ));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn singleton_capturing_per_tenant_warns() {
        let mut registry = BindingRegistry::new();
        add(&mut registry, ServiceId::of::<Audit>(), audit_descriptor().into(), Scope::Singleton);
        add(&mut registry, ServiceId::of::<Clock>(), TypeDescriptor::of(|| Clock).into(), Scope::Singleton);
        add(
            &mut registry,
            ServiceId::of::<Session>(),
            TypeDescriptor::of(|| Session).into(),
            Scope::SingletonPerTenant,
        );

        let report = validate(&registry, &[]);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            ValidationWarning::SingletonCapturesTenant { .. }
        ));
    }

    #[test]
    fn open_target_on_plain_service_is_a_mismatch() {
        let mut registry = BindingRegistry::new();
        let open = OpenType::builder(GenericDef::new("Store", 1)).build();
        add(&mut registry, ServiceId::of::<Clock>(), open.into(), Scope::Transient);

        let report = validate(&registry, &[]);
        assert!(matches!(report.errors[0], ValidationError::GenericMismatch { .. }));
    }

    #[test]
    fn unexposed_service_is_reported() {
        let mut registry = BindingRegistry::new();
        add(&mut registry, ServiceId::of::<Session>(), TypeDescriptor::of(|| Clock).into(), Scope::Transient);

        let report = validate(&registry, &[]);
        assert!(matches!(report.errors[0], ValidationError::NotExposed { .. }));
    }
}
