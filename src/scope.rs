//! Binding scope definitions.

/// Scopes controlling whether and how resolved instances are cached
///
/// The scope decides whether the tenant takes part in the cache key. It is
/// the only thing that distinguishes a process-wide singleton from a
/// per-tenant one.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{BindingCollection, ExecutionContextManager, Resolver, TenantId};
/// use std::sync::Arc;
///
/// struct Settings;
/// struct Session;
/// struct Request;
///
/// let mut bindings = BindingCollection::new();
/// bindings.bind::<Settings>().to_callback(|| Arc::new(Settings)).singleton();
/// bindings.bind::<Session>().to_callback(|| Arc::new(Session)).singleton_per_tenant();
/// bindings.bind::<Request>().to_callback(|| Arc::new(Request));
///
/// let contexts = ExecutionContextManager::new();
/// let container = bindings.build(Arc::new(contexts.clone())).unwrap();
///
/// let (a, b) = (TenantId::new_v4(), TenantId::new_v4());
///
/// let _guard = contexts.current_for(a);
/// let settings_a = container.get_required::<Settings>();
/// let session_a = container.get_required::<Session>();
/// drop(_guard);
///
/// let _guard = contexts.current_for(b);
/// let settings_b = container.get_required::<Settings>();
/// let session_b = container.get_required::<Session>();
///
/// assert!(Arc::ptr_eq(&settings_a, &settings_b)); // Shared by all tenants
/// assert!(!Arc::ptr_eq(&session_a, &session_b)); // One per tenant
///
/// let r1 = container.get_required::<Request>();
/// let r2 = container.get_required::<Request>();
/// assert!(!Arc::ptr_eq(&r1, &r2)); // Always fresh
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// New instance per resolution, never cached
    #[default]
    Transient,
    /// Single instance shared by every tenant, cached forever
    Singleton,
    /// Single instance per tenant, cached forever
    ///
    /// Resolution reads the current tenant from the tenant context source
    /// and fails with a context error when none is active.
    SingletonPerTenant,
}

impl Scope {
    /// Whether instances of this scope are memoized at all.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Scope::Transient)
    }

    /// Whether the tenant is part of the cache key.
    pub fn is_per_tenant(&self) -> bool {
        matches!(self, Scope::SingletonPerTenant)
    }
}
