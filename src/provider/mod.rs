//! The container: composition root of a configured set of bindings.

use std::fmt;
use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::internal::with_cycle_check;
use crate::key::ServiceId;
use crate::registration::{Binding, Instance};
use crate::traits::{DependencyResolver, RegistrationSource};
use crate::validation::{self, ValidationReport};

pub mod context;
pub use context::ResolverContext;

/// Resolves services from bindings, then from additional registration
/// sources.
///
/// The container is the [`DependencyResolver`] handed to activations, so
/// constructor parameters go through the same lookup as top-level requests,
/// including cycle detection. It is thread-safe and cheap to clone.
///
/// # Examples
///
/// ```
/// use tenant_di::{BindingCollection, FixedTenant, Resolver, TenantId, TypeDescriptor};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut bindings = BindingCollection::new();
/// bindings
///     .bind::<Database>()
///     .to_constant(Database { url: "postgres://localhost".to_string() });
/// bindings
///     .bind::<UserService>()
///     .to_type(
///         TypeDescriptor::builder::<UserService>()
///             .inject(|(db,): (Arc<Database>,)| UserService { db })
///             .build(),
///     );
///
/// let container = bindings.build(Arc::new(FixedTenant::new(TenantId::new_v4()))).unwrap();
/// let users = container.get_required::<UserService>();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    context: ResolverContext,
    sources: Vec<Arc<dyn RegistrationSource>>,
    options: ContainerOptions,
}

impl Container {
    pub(crate) fn new(
        context: ResolverContext,
        sources: Vec<Arc<dyn RegistrationSource>>,
        options: ContainerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                context,
                sources,
                options,
            }),
        }
    }

    /// The resolution façade over this container's bindings.
    pub fn context(&self) -> &ResolverContext {
        &self.inner.context
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Checks every binding without resolving anything.
    pub fn validate(&self) -> ValidationReport {
        validation::validate(self.inner.context.registry(), &self.inner.sources)
    }

    /// Resolves `binding` for its own service, using this container for
    /// nested dependencies.
    pub fn resolve_binding(&self, binding: &Binding) -> DiResult<Instance> {
        self.inner.context.resolve_binding(binding, self)
    }

    /// Resolves `binding` on behalf of `requested`.
    pub fn resolve_binding_for(&self, binding: &Binding, requested: &ServiceId) -> DiResult<Instance> {
        self.inner.context.resolve_binding_for(binding, requested, self)
    }

    // Identity used to scope cycle detection of source-provided services
    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn resolve_from_sources(&self, service: &ServiceId) -> DiResult<Instance> {
        for source in &self.inner.sources {
            if let Some(registration) = source.registration_for(service) {
                tracing::debug!(service = %service, "resolved through registration source");
                return registration.activate(self);
            }
        }

        Err(DiError::BindingNotFound(service.to_string()))
    }
}

impl DependencyResolver for Container {
    // Bound services are cycle-checked by the context itself
    fn resolve_service(&self, service: &ServiceId) -> DiResult<Instance> {
        if let Some(binding) = self.inner.context.registry().lookup(service) {
            return self.inner.context.resolve_binding_for(binding, service, self);
        }
        with_cycle_check(self.id(), service, self.inner.options.max_depth, || {
            self.resolve_from_sources(service)
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("context", &self.inner.context)
            .field("sources", &self.inner.sources.len())
            .field("options", &self.inner.options)
            .finish()
    }
}
