//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::DiResult;
use crate::key::{Parameterized, ServiceId};
use crate::registration::Instance;

/// Object-safe capability to resolve a service.
///
/// The activation of a type resolves each constructor parameter through this
/// trait, so whoever implements it decides where nested dependencies come
/// from. [`Container`](crate::Container) is the implementation used in
/// practice.
pub trait DependencyResolver: Send + Sync {
    /// Resolves `service` into a type-erased instance.
    fn resolve_service(&self, service: &ServiceId) -> DiResult<Instance>;
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for Arc<R> {
    fn resolve_service(&self, service: &ServiceId) -> DiResult<Instance> {
        (**self).resolve_service(service)
    }
}

/// Typed resolution helpers, available on every [`DependencyResolver`].
///
/// # Examples
///
/// ```
/// use tenant_di::{BindingCollection, FixedTenant, Resolver, TenantId};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut bindings = BindingCollection::new();
/// bindings.bind::<usize>().to_constant(42usize);
/// bindings
///     .bind::<dyn Logger>()
///     .to_constant(Arc::new(ConsoleLogger) as Arc<dyn Logger>);
///
/// let container = bindings.build(Arc::new(FixedTenant::new(TenantId::new_v4()))).unwrap();
///
/// assert_eq!(*container.get_required::<usize>(), 42);
/// let logger = container.get::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("resolved"), "LOG: resolved");
/// ```
pub trait Resolver: DependencyResolver {
    /// Resolves a concrete type or trait object.
    fn get<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        self.resolve_service(&ServiceId::of::<S>())?.downcast::<S>()
    }

    /// Resolves a closed generic service, falling back to a binding declared
    /// for its generic definition.
    fn get_closed<S: ?Sized + Parameterized + Send + Sync>(&self) -> DiResult<Arc<S>> {
        self.resolve_service(&ServiceId::closed::<S>())?.downcast::<S>()
    }

    /// Resolves a service, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved (no binding, no tenant for a
    /// per-tenant binding, a failed factory, a cycle, etc.).
    fn get_required<S: ?Sized + Send + Sync + 'static>(&self) -> Arc<S> {
        self.get::<S>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<S>(), e))
    }

    /// Resolves a closed generic service, panicking on failure.
    fn get_closed_required<S: ?Sized + Parameterized + Send + Sync>(&self) -> Arc<S> {
        self.get_closed::<S>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<S>(), e))
    }
}

impl<R: DependencyResolver + ?Sized> Resolver for R {}
