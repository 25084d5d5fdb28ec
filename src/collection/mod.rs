//! Binding collection for declaring services and building a container.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::descriptors::{OpenType, Target, TypeDescriptor};
use crate::error::DiResult;
use crate::key::{GenericDef, Parameterized, ServiceId};
use crate::provider::{Container, ResolverContext};
use crate::registration::{Binding, BindingRegistry, Instance, Strategy};
use crate::scope::Scope;
use crate::tenant::TenantContextSource;
use crate::traits::RegistrationSource;

/// Bindings being declared, before the container exists.
///
/// Every strategy method commits a [`Scope::Transient`] binding; the returned
/// [`BindingHandle`] changes its scope.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{BindingCollection, ExecutionContextManager, Resolver, TenantId};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn tenant(&self) -> String;
/// }
///
/// struct ConsoleLogger { tenant: String }
/// impl Logger for ConsoleLogger {
///     fn tenant(&self) -> String { self.tenant.clone() }
/// }
///
/// let contexts = ExecutionContextManager::new();
/// let source = contexts.clone();
///
/// let mut bindings = BindingCollection::new();
/// bindings
///     .bind::<dyn Logger>()
///     .to_callback(move || {
///         let tenant = source.current().map(|t| t.to_string()).unwrap_or_default();
///         Arc::new(ConsoleLogger { tenant }) as Arc<dyn Logger>
///     })
///     .singleton_per_tenant();
///
/// let container = bindings.build(Arc::new(contexts.clone())).unwrap();
///
/// let tenant = TenantId::new_v4();
/// let _guard = contexts.current_for(tenant);
/// assert_eq!(container.get_required::<dyn Logger>().tenant(), tenant.to_string());
/// ```
#[derive(Default)]
pub struct BindingCollection {
    bindings: Vec<Binding>,
    sources: Vec<Arc<dyn RegistrationSource>>,
    options: ContainerOptions,
}

impl BindingCollection {
    /// Creates an empty collection with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    /// Starts a binding for a concrete type or trait object.
    pub fn bind<S: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_, S> {
        BindingBuilder::new(self, ServiceId::of::<S>())
    }

    /// Starts a binding for one instantiation of a generic service.
    ///
    /// It takes precedence over a binding declared for the service's
    /// definition.
    pub fn bind_closed<S: ?Sized + Parameterized + Send + Sync>(&mut self) -> BindingBuilder<'_, S> {
        BindingBuilder::new(self, ServiceId::closed::<S>())
    }

    /// Starts a binding for every instantiation of a generic definition.
    pub fn bind_open(&mut self, definition: GenericDef) -> OpenBindingBuilder<'_> {
        OpenBindingBuilder {
            collection: self,
            definition,
        }
    }

    /// Adds a prebuilt binding.
    pub fn add(&mut self, binding: Binding) -> BindingHandle<'_> {
        self.bindings.push(binding);
        BindingHandle {
            index: self.bindings.len() - 1,
            collection: self,
        }
    }

    /// Adds a source consulted for services that have no binding.
    pub fn add_source(&mut self, source: Arc<dyn RegistrationSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Bindings declared so far, in declaration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Builds the container.
    ///
    /// Fails on invalid options and, under [`DuplicatePolicy::Reject`], on
    /// two bindings for the same service. Binding validity is checked
    /// separately by [`Container::validate`].
    ///
    /// [`DuplicatePolicy::Reject`]: crate::DuplicatePolicy::Reject
    pub fn build(self, tenants: Arc<dyn TenantContextSource>) -> DiResult<Container> {
        self.options.validate()?;

        let mut registry = BindingRegistry::with_policy(self.options.duplicate_policy);
        for binding in self.bindings {
            registry.add_binding(binding)?;
        }

        tracing::debug!(
            bindings = registry.len(),
            sources = self.sources.len(),
            "container built"
        );
        let context = ResolverContext::new(registry, tenants, &self.options);
        Ok(Container::new(context, self.sources, self.options))
    }
}

/// Chooses the strategy of a binding for service `S`.
pub struct BindingBuilder<'a, S: ?Sized> {
    collection: &'a mut BindingCollection,
    service: ServiceId,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: ?Sized + Send + Sync + 'static> BindingBuilder<'a, S> {
    fn new(collection: &'a mut BindingCollection, service: ServiceId) -> Self {
        Self {
            collection,
            service,
            _service: PhantomData,
        }
    }

    fn commit(self, strategy: Strategy) -> BindingHandle<'a> {
        self.collection
            .add(Binding::new(self.service, strategy, Scope::Transient))
    }

    /// Builds `descriptor`'s type, injecting its constructor parameters.
    ///
    /// The type must expose `S`, either by being `S` or through a view.
    pub fn to_type(self, descriptor: TypeDescriptor) -> BindingHandle<'a> {
        self.commit(Strategy::Type(Target::Closed(descriptor)))
    }

    /// Hands out `value` on every resolution.
    pub fn to_constant(self, value: impl Into<Arc<S>>) -> BindingHandle<'a> {
        self.commit(Strategy::Constant(Instance::new(value.into())))
    }

    /// Calls `factory` to produce instances.
    pub fn to_callback<F>(self, factory: F) -> BindingHandle<'a>
    where
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.commit(Strategy::Callback(Arc::new(move || {
            Ok(Instance::new(factory()))
        })))
    }

    /// Calls a fallible `factory` to produce instances.
    ///
    /// A failure is returned to the caller and is never cached.
    pub fn try_to_callback<F>(self, factory: F) -> BindingHandle<'a>
    where
        F: Fn() -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        self.commit(Strategy::Callback(Arc::new(move || {
            factory().map(Instance::new)
        })))
    }

    /// Calls `factory` for the type to build, then builds it.
    pub fn to_type_callback<F>(self, factory: F) -> BindingHandle<'a>
    where
        F: Fn() -> TypeDescriptor + Send + Sync + 'static,
    {
        self.commit(Strategy::TypeCallback(Arc::new(move || {
            Target::Closed(factory())
        })))
    }
}

/// Chooses the strategy of a binding for a generic definition.
pub struct OpenBindingBuilder<'a> {
    collection: &'a mut BindingCollection,
    definition: GenericDef,
}

impl<'a> OpenBindingBuilder<'a> {
    fn commit(self, strategy: Strategy) -> BindingHandle<'a> {
        self.collection.add(Binding::new(
            ServiceId::open(self.definition),
            strategy,
            Scope::Transient,
        ))
    }

    /// Closes `open` over the requested instantiation's type arguments.
    pub fn to_open_type(self, open: OpenType) -> BindingHandle<'a> {
        self.commit(Strategy::Type(Target::Open(open)))
    }

    /// Hands out `value` for every instantiation.
    pub fn to_constant(self, value: Instance) -> BindingHandle<'a> {
        self.commit(Strategy::Constant(value))
    }

    /// Calls `factory` for every instantiation.
    pub fn to_callback<F>(self, factory: F) -> BindingHandle<'a>
    where
        F: Fn() -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.commit(Strategy::Callback(Arc::new(factory)))
    }

    /// Calls `factory` for the target, then builds it for the requested
    /// instantiation.
    pub fn to_type_callback<F>(self, factory: F) -> BindingHandle<'a>
    where
        F: Fn() -> Target + Send + Sync + 'static,
    {
        self.commit(Strategy::TypeCallback(Arc::new(factory)))
    }
}

/// A committed binding whose scope can still be changed.
pub struct BindingHandle<'a> {
    collection: &'a mut BindingCollection,
    index: usize,
}

impl BindingHandle<'_> {
    pub fn in_scope(self, scope: Scope) {
        self.collection.bindings[self.index].set_scope(scope);
    }

    /// One instance for the whole process.
    pub fn singleton(self) {
        self.in_scope(Scope::Singleton)
    }

    /// One instance per tenant.
    pub fn singleton_per_tenant(self) {
        self.in_scope(Scope::SingletonPerTenant)
    }

    /// A new instance per resolution. This is the default.
    pub fn transient(self) {
        self.in_scope(Scope::Transient)
    }
}
