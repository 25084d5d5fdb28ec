//! The resolution façade: binding lookup, scope handling and caching.

use std::fmt;
use std::sync::Arc;

use crate::activation::activate;
use crate::cache::InstanceCache;
use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::internal::with_cycle_check;
use crate::key::{CacheKey, ServiceId};
use crate::registration::{Binding, BindingRegistry, Instance};
use crate::scope::Scope;
use crate::tenant::TenantContextSource;
use crate::traits::{DependencyResolver, Registration, RegistrationSource};

struct ContextInner {
    registry: BindingRegistry,
    cache: InstanceCache,
    tenants: Arc<dyn TenantContextSource>,
    max_depth: usize,
}

/// Decides, for a binding and a requested service, whether to reuse a cached
/// instance or build a new one.
///
/// Nested dependencies are resolved through the [`DependencyResolver`] passed
/// to each call, so the context itself never recurses. Cloning is cheap and
/// clones share the registry and the cache.
///
/// The tenant context source is only consulted for
/// [`Scope::SingletonPerTenant`] bindings.
///
/// Every entry point records the requested service on the calling thread's
/// resolution stack, so a cycle through `deps` fails with
/// [`DiError::Circular`] before a half-built cache entry is waited on.
#[derive(Clone)]
pub struct ResolverContext {
    inner: Arc<ContextInner>,
}

impl ResolverContext {
    pub fn new(
        registry: BindingRegistry,
        tenants: Arc<dyn TenantContextSource>,
        options: &ContainerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                registry,
                cache: InstanceCache::new(options.cache_shards),
                tenants,
                max_depth: options.max_depth,
            }),
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.inner.registry
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.inner.cache
    }

    pub fn tenants(&self) -> &Arc<dyn TenantContextSource> {
        &self.inner.tenants
    }

    /// Resolves `service` from the bindings, preferring an exact binding over
    /// one declared for the service's generic definition.
    pub fn resolve(&self, service: &ServiceId, deps: &dyn DependencyResolver) -> DiResult<Instance> {
        let binding = self.inner.registry.find_binding(service)?;
        self.resolve_binding_for(binding, service, deps)
    }

    /// Resolves `binding` for its own service.
    ///
    /// Bindings declared for a generic definition need to know which
    /// instantiation is wanted; use [`resolve_binding_for`](Self::resolve_binding_for)
    /// for those.
    pub fn resolve_binding(
        &self,
        binding: &Binding,
        deps: &dyn DependencyResolver,
    ) -> DiResult<Instance> {
        if binding.service().is_open() {
            return Err(DiError::configuration(
                binding.service().to_string(),
                "generic binding resolved without a requested instantiation",
            ));
        }
        self.resolve_binding_for(binding, binding.service(), deps)
    }

    /// Resolves `binding` on behalf of `requested`, whose type arguments
    /// parameterize generic targets.
    pub fn resolve_binding_for(
        &self,
        binding: &Binding,
        requested: &ServiceId,
        deps: &dyn DependencyResolver,
    ) -> DiResult<Instance> {
        with_cycle_check(self.id(), requested, self.inner.max_depth, || {
            self.resolve_in_scope(binding, requested, deps)
        })
    }

    fn resolve_in_scope(
        &self,
        binding: &Binding,
        requested: &ServiceId,
        deps: &dyn DependencyResolver,
    ) -> DiResult<Instance> {
        match binding.scope() {
            Scope::Transient => activate(binding, requested, deps),
            Scope::Singleton | Scope::SingletonPerTenant => {
                let key = self.cache_key(binding, requested)?;
                self.inner
                    .cache
                    .get_or_create(&key, || activate(binding, requested, deps))
            }
        }
    }

    // Identity used to scope cycle detection to this context and its clones
    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// The cache key `binding` uses for `requested` in the current context.
    ///
    /// Reads the current tenant for per-tenant bindings and fails with
    /// [`DiError::Context`] when there is none.
    pub fn cache_key(&self, binding: &Binding, requested: &ServiceId) -> DiResult<CacheKey> {
        let tenant = if binding.scope().is_per_tenant() {
            let tenant = self.inner.tenants.current_tenant()?;
            tracing::trace!(tenant = %tenant, service = %requested, "resolving per-tenant");
            Some(tenant)
        } else {
            None
        };
        Ok(CacheKey::new(
            tenant,
            binding.service().clone(),
            requested.clone(),
        ))
    }
}

impl RegistrationSource for ResolverContext {
    fn registration_for(&self, service: &ServiceId) -> Option<Registration> {
        let binding = self.inner.registry.lookup(service)?.clone();
        let context = self.clone();
        let requested = service.clone();
        Some(Registration::new(service.clone(), move |deps| {
            context.resolve_binding_for(&binding, &requested, deps)
        }))
    }
}

impl fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("bindings", &self.inner.registry.len())
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
