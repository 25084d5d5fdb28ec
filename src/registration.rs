//! Bindings and the registry holding them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::DuplicatePolicy;
use crate::descriptors::Target;
use crate::error::{DiError, DiResult};
use crate::key::ServiceId;
use crate::scope::Scope;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A resolved, type-erased service instance.
///
/// The payload is the `Arc<S>` of the service `S` it was produced for, so the
/// same representation serves concrete types and trait objects. Clones share
/// the payload; [`Instance::ptr_eq`] compares identity.
#[derive(Clone)]
pub struct Instance(AnyArc);

impl Instance {
    /// Wraps a shared value of service `S`.
    pub fn new<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        Self(Arc::new(value))
    }

    /// The payload as `Arc<S>`.
    pub fn downcast<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        self.0
            .downcast_ref::<Arc<S>>()
            .cloned()
            .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<S>().to_string()))
    }

    /// Whether the payload was produced for service `S`.
    pub fn is<S: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.0.is::<Arc<S>>()
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

/// Zero-argument factory producing an instance.
pub type Callback = Arc<dyn Fn() -> DiResult<Instance> + Send + Sync>;

/// Zero-argument factory producing the type to instantiate.
pub type TypeCallback = Arc<dyn Fn() -> Target + Send + Sync>;

/// How a binding produces instances.
#[derive(Clone)]
pub enum Strategy {
    /// Construct the target type, injecting its constructor parameters
    Type(Target),
    /// Hand out a precomputed value
    Constant(Instance),
    /// Call a factory
    Callback(Callback),
    /// Call a factory for the type, then construct it
    TypeCallback(TypeCallback),
}

impl Strategy {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Type(_) => "type",
            Strategy::Constant(_) => "constant",
            Strategy::Callback(_) => "callback",
            Strategy::TypeCallback(_) => "type-callback",
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Type(target) => f.debug_tuple("Type").field(target).finish(),
            Strategy::Constant(instance) => f.debug_tuple("Constant").field(instance).finish(),
            Strategy::Callback(_) => f.write_str("Callback(..)"),
            Strategy::TypeCallback(_) => f.write_str("TypeCallback(..)"),
        }
    }
}

/// Declared association between a service, how to produce it and how long
/// produced instances live.
#[derive(Clone, Debug)]
pub struct Binding {
    service: ServiceId,
    strategy: Strategy,
    scope: Scope,
}

impl Binding {
    pub fn new(service: ServiceId, strategy: Strategy, scope: Scope) -> Self {
        Self {
            service,
            strategy,
            scope,
        }
    }

    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub(crate) fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }
}

/// Bindings by service.
///
/// Filled during configuration and read-only once the container is built.
/// Lookup prefers an exact match over the generic definition of a
/// parameterized service.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<ServiceId, Binding>,
    order: Vec<ServiceId>,
    policy: DuplicatePolicy,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Adds a binding.
    ///
    /// A second binding for the same service fails with
    /// [`DiError::DuplicateBinding`] unless the registry was created with
    /// [`DuplicatePolicy::Replace`].
    pub fn add_binding(&mut self, binding: Binding) -> DiResult<()> {
        let service = binding.service().clone();
        if self.bindings.contains_key(&service) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(DiError::DuplicateBinding(service.to_string()));
                }
                DuplicatePolicy::Replace => {
                    tracing::warn!(service = %service, "replacing existing binding");
                    self.bindings.insert(service, binding);
                    return Ok(());
                }
            }
        }

        tracing::debug!(
            service = %service,
            strategy = binding.strategy().kind(),
            scope = ?binding.scope(),
            "binding added"
        );
        self.order.push(service.clone());
        self.bindings.insert(service, binding);
        Ok(())
    }

    /// The binding for `service`, falling back to its generic definition.
    pub fn find_binding(&self, service: &ServiceId) -> DiResult<&Binding> {
        self.lookup(service)
            .ok_or_else(|| DiError::BindingNotFound(service.to_string()))
    }

    /// Like [`find_binding`](Self::find_binding) but without an error.
    pub fn lookup(&self, service: &ServiceId) -> Option<&Binding> {
        self.bindings.get(service).or_else(|| {
            service
                .definition()
                .and_then(|definition| self.bindings.get(&definition))
        })
    }

    /// The binding declared for exactly `service`.
    pub fn get(&self, service: &ServiceId) -> Option<&Binding> {
        self.bindings.get(service)
    }

    pub fn contains(&self, service: &ServiceId) -> bool {
        self.lookup(service).is_some()
    }

    /// Bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.order.iter().filter_map(|service| self.bindings.get(service))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{GenericDef, TypeArgs, TypeKey};

    const STORE: GenericDef = GenericDef::new("Store", 1);

    fn constant<T: Send + Sync + 'static>(value: T) -> Strategy {
        Strategy::Constant(Instance::new(Arc::new(value)))
    }

    fn closed_store<T: 'static>() -> ServiceId {
        STORE
            .close(TypeArgs::of::<(T,)>(), TypeKey::of::<Vec<T>>())
            .unwrap()
    }

    #[test]
    fn duplicate_binding_is_rejected_by_default() {
        let mut registry = BindingRegistry::new();
        registry
            .add_binding(Binding::new(ServiceId::of::<u32>(), constant(1u32), Scope::Singleton))
            .unwrap();

        let result =
            registry.add_binding(Binding::new(ServiceId::of::<u32>(), constant(2u32), Scope::Singleton));
        assert_eq!(result, Err(DiError::DuplicateBinding("u32".to_string())));
    }

    #[test]
    fn replace_policy_keeps_last_binding() {
        let mut registry = BindingRegistry::with_policy(DuplicatePolicy::Replace);
        registry
            .add_binding(Binding::new(ServiceId::of::<u32>(), constant(1u32), Scope::Singleton))
            .unwrap();
        registry
            .add_binding(Binding::new(ServiceId::of::<u32>(), constant(2u32), Scope::Transient))
            .unwrap();

        assert_eq!(registry.len(), 1);
        let binding = registry.find_binding(&ServiceId::of::<u32>()).unwrap();
        assert_eq!(binding.scope(), Scope::Transient);
    }

    #[test]
    fn exact_match_wins_over_generic_definition() {
        let mut registry = BindingRegistry::new();
        registry
            .add_binding(Binding::new(ServiceId::open(STORE), constant(0u8), Scope::Transient))
            .unwrap();
        registry
            .add_binding(Binding::new(closed_store::<String>(), constant(1u8), Scope::Singleton))
            .unwrap();

        let exact = registry.find_binding(&closed_store::<String>()).unwrap();
        assert_eq!(exact.scope(), Scope::Singleton);

        let fallback = registry.find_binding(&closed_store::<u64>()).unwrap();
        assert!(fallback.service().is_open());
    }

    #[test]
    fn unknown_service_is_not_found() {
        let registry = BindingRegistry::new();
        assert!(matches!(
            registry.find_binding(&ServiceId::of::<String>()),
            Err(DiError::BindingNotFound(_))
        ));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = BindingRegistry::new();
        registry
            .add_binding(Binding::new(ServiceId::of::<u8>(), constant(1u8), Scope::Singleton))
            .unwrap();
        registry
            .add_binding(Binding::new(ServiceId::of::<u16>(), constant(1u16), Scope::Singleton))
            .unwrap();

        let services: Vec<_> = registry.iter().map(|b| b.service().clone()).collect();
        assert_eq!(services, vec![ServiceId::of::<u8>(), ServiceId::of::<u16>()]);
    }
}
