//! Explicit descriptions of constructible types.
//!
//! A [`TypeDescriptor`] states, at registration time, how a type is built:
//! which constructors it has, which services each constructor needs, and which
//! services (typically trait objects) the built value can be handed out as.
//! An [`OpenType`] does the same for a generic type, one closing per set of
//! type arguments.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{GenericDef, Parameterized, ServiceId, TypeArgs, TypeKey, TypeList};
use crate::registration::Instance;

type Invoke = Arc<dyn Fn(&Arguments) -> DiResult<Instance> + Send + Sync>;
type Cast = Arc<dyn Fn(&Instance) -> DiResult<Instance> + Send + Sync>;

/// Resolved constructor arguments, in parameter order.
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    /// The type-erased argument at `index`.
    pub fn instance(&self, index: usize) -> DiResult<&Instance> {
        self.values.get(index).ok_or_else(|| {
            DiError::configuration(
                "constructor",
                format!("argument {} requested but only {} resolved", index, self.values.len()),
            )
        })
    }

    /// The argument at `index` as `Arc<S>`.
    pub fn get<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<S>> {
        self.instance(index)?.downcast::<S>()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A constructor parameter that can be injected.
pub trait Dependency: Sized {
    /// The service this parameter is resolved as.
    fn service() -> ServiceId;
    /// Converts the resolved instance into the parameter.
    fn extract(instance: &Instance) -> DiResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Arc<T> {
    fn service() -> ServiceId {
        ServiceId::of::<T>()
    }

    fn extract(instance: &Instance) -> DiResult<Self> {
        instance.downcast::<T>()
    }
}

/// A closed generic parameter, resolved through its generic definition.
pub struct Generic<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized + Parameterized + Send + Sync> Dependency for Generic<T> {
    fn service() -> ServiceId {
        ServiceId::closed::<T>()
    }

    fn extract(instance: &Instance) -> DiResult<Self> {
        instance.downcast::<T>().map(Generic)
    }
}

/// A tuple of constructor parameters.
pub trait Dependencies: Sized {
    /// The services of each parameter, in order.
    fn services() -> Vec<ServiceId>;
    /// Builds the tuple from resolved arguments.
    fn extract(args: &Arguments) -> DiResult<Self>;
}

impl Dependencies for () {
    fn services() -> Vec<ServiceId> {
        Vec::new()
    }

    fn extract(_args: &Arguments) -> DiResult<Self> {
        Ok(())
    }
}

macro_rules! impl_dependencies {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Dependency),+> Dependencies for ($($name,)+) {
            fn services() -> Vec<ServiceId> {
                vec![$($name::service()),+]
            }

            fn extract(args: &Arguments) -> DiResult<Self> {
                Ok(($($name::extract(args.instance($idx)?)?,)+))
            }
        }
    };
}

impl_dependencies!(A: 0);
impl_dependencies!(A: 0, B: 1);
impl_dependencies!(A: 0, B: 1, C: 2);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// One way of building a type: its parameter list plus the function invoked
/// with the resolved parameters.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ServiceId>,
    invoke: Invoke,
}

impl Constructor {
    /// The services to resolve before invoking, in order.
    pub fn params(&self) -> &[ServiceId] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &Arguments) -> DiResult<Instance> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

struct DescriptorInner {
    ty: TypeKey,
    constructors: Vec<Constructor>,
    views: HashMap<TypeId, Cast>,
}

/// Constructors and service views of one concrete type.
///
/// # Examples
///
/// ```rust
/// use tenant_di::TypeDescriptor;
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct Config { level: u8 }
/// struct ConsoleLogger { config: Arc<Config> }
/// impl Logger for ConsoleLogger {}
///
/// let descriptor = TypeDescriptor::builder::<ConsoleLogger>()
///     .inject(|(config,): (Arc<Config>,)| ConsoleLogger { config })
///     .exposes::<dyn Logger>(|logger| logger as Arc<dyn Logger>)
///     .build();
///
/// assert_eq!(descriptor.designated_constructor().unwrap().params().len(), 1);
/// ```
#[derive(Clone)]
pub struct TypeDescriptor {
    inner: Arc<DescriptorInner>,
}

impl TypeDescriptor {
    /// Starts describing `T`.
    pub fn builder<T: Send + Sync + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            constructors: Vec::new(),
            views: HashMap::new(),
            _type: PhantomData,
        }
    }

    /// Describes `T` with a single parameterless constructor.
    pub fn of<T, F>(ctor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder::<T>().constructor(ctor).build()
    }

    pub fn type_key(&self) -> TypeKey {
        self.inner.ty
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.inner.constructors
    }

    /// The one constructor used for activation.
    ///
    /// Types with no constructor or with more than one are rejected rather
    /// than guessed at.
    pub fn designated_constructor(&self) -> DiResult<&Constructor> {
        match self.inner.constructors.as_slice() {
            [single] => Ok(single),
            [] => Err(DiError::configuration(
                self.inner.ty.name(),
                "no constructor declared",
            )),
            many => Err(DiError::configuration(
                self.inner.ty.name(),
                format!("{} constructors declared, exactly one is required", many.len()),
            )),
        }
    }

    /// Whether an instance of this type can be handed out as `service`.
    pub fn exposes(&self, service: &TypeKey) -> bool {
        *service == self.inner.ty || self.inner.views.contains_key(&service.id())
    }

    /// Converts a freshly built instance into the `service` it was requested as.
    pub(crate) fn expose_as(&self, instance: Instance, service: &TypeKey) -> DiResult<Instance> {
        if *service == self.inner.ty {
            return Ok(instance);
        }
        match self.inner.views.get(&service.id()) {
            Some(cast) => cast(&instance),
            None => Err(DiError::configuration(
                self.inner.ty.name(),
                format!("does not expose service {}", service.name()),
            )),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.inner.ty.name())
            .field("constructors", &self.inner.constructors)
            .field("views", &self.inner.views.len())
            .finish()
    }
}

/// Builder for [`TypeDescriptor`].
pub struct DescriptorBuilder<T> {
    constructors: Vec<Constructor>,
    views: HashMap<TypeId, Cast>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    /// Adds a parameterless constructor.
    pub fn constructor<F>(self, ctor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.inject(move |()| ctor())
    }

    /// Adds a constructor whose parameters are injected.
    ///
    /// The parameter list is taken from the closure's argument tuple type:
    /// `|(db, log): (Arc<Database>, Arc<dyn Logger>)| ...`.
    pub fn inject<D, F>(self, ctor: F) -> Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.try_inject(move |deps: D| Ok(ctor(deps)))
    }

    /// Adds a fallible constructor whose parameters are injected.
    pub fn try_inject<D, F>(mut self, ctor: F) -> Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: D::services(),
            invoke: Arc::new(move |args: &Arguments| -> DiResult<Instance> {
                let value = ctor(D::extract(args)?)?;
                Ok(Instance::new(Arc::new(value)))
            }),
        });
        self
    }

    /// Adds a constructor over an explicit parameter list.
    pub fn constructor_from_fn<F>(mut self, params: Vec<ServiceId>, ctor: F) -> Self
    where
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params,
            invoke: Arc::new(move |args: &Arguments| -> DiResult<Instance> {
                Ok(Instance::new(Arc::new(ctor(args)?)))
            }),
        });
        self
    }

    /// Declares that `T` can be handed out as `S`.
    pub fn exposes<S>(mut self, cast: impl Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.views.insert(
            TypeId::of::<S>(),
            Arc::new(move |instance: &Instance| -> DiResult<Instance> {
                let value = instance.downcast::<T>()?;
                Ok(Instance::new(cast(value)))
            }),
        );
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            inner: Arc::new(DescriptorInner {
                ty: TypeKey::of::<T>(),
                constructors: self.constructors,
                views: self.views,
            }),
        }
    }
}

struct OpenTypeInner {
    definition: GenericDef,
    closings: HashMap<TypeArgs, TypeDescriptor>,
}

/// A generic target type with one descriptor per supported set of type
/// arguments.
///
/// Closing an open type is the explicit counterpart of instantiating a
/// generic type definition at runtime.
///
/// ```rust
/// use tenant_di::{GenericDef, OpenType, TypeDescriptor};
///
/// struct MemoryStore<T>(Vec<T>);
///
/// fn store<T: Send + Sync + 'static>() -> TypeDescriptor {
///     TypeDescriptor::of(|| MemoryStore::<T>(Vec::new()))
/// }
///
/// let open = OpenType::builder(GenericDef::new("MemoryStore", 1))
///     .close::<(String,)>(store::<String>())
///     .close::<(u64,)>(store::<u64>())
///     .build();
///
/// assert!(open.close(&[tenant_di::TypeKey::of::<u64>()]).is_ok());
/// assert!(open.close(&[tenant_di::TypeKey::of::<u8>()]).is_err());
/// ```
#[derive(Clone)]
pub struct OpenType {
    inner: Arc<OpenTypeInner>,
}

impl OpenType {
    pub fn builder(definition: GenericDef) -> OpenTypeBuilder {
        OpenTypeBuilder {
            definition,
            closings: HashMap::new(),
        }
    }

    pub fn definition(&self) -> GenericDef {
        self.inner.definition
    }

    /// The descriptor of this type closed over `args`.
    pub fn close(&self, args: &[TypeKey]) -> DiResult<TypeDescriptor> {
        let definition = self.inner.definition;
        if args.len() != definition.arity() {
            return Err(DiError::configuration(
                definition.to_string(),
                format!("expected {} type argument(s), got {}", definition.arity(), args.len()),
            ));
        }
        let args: TypeArgs = args.iter().copied().collect();
        self.inner.closings.get(&args).cloned().ok_or_else(|| {
            DiError::configuration(
                definition.to_string(),
                format!("no closing declared for <{}>", args),
            )
        })
    }

    /// All declared closings.
    pub fn closings(&self) -> impl Iterator<Item = (&TypeArgs, &TypeDescriptor)> {
        self.inner.closings.iter()
    }
}

impl fmt::Debug for OpenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenType")
            .field("definition", &self.inner.definition)
            .field("closings", &self.inner.closings.len())
            .finish()
    }
}

/// Builder for [`OpenType`].
pub struct OpenTypeBuilder {
    definition: GenericDef,
    closings: HashMap<TypeArgs, TypeDescriptor>,
}

impl OpenTypeBuilder {
    /// Declares the descriptor used for the type arguments in `L`.
    pub fn close<L: TypeList>(self, descriptor: TypeDescriptor) -> Self {
        self.close_with(TypeArgs::of::<L>(), descriptor)
    }

    /// Declares the descriptor used for `args`.
    pub fn close_with(mut self, args: TypeArgs, descriptor: TypeDescriptor) -> Self {
        self.closings.insert(args, descriptor);
        self
    }

    pub fn build(self) -> OpenType {
        OpenType {
            inner: Arc::new(OpenTypeInner {
                definition: self.definition,
                closings: self.closings,
            }),
        }
    }
}

/// What a type strategy builds: a concrete type, or a generic type to be
/// closed over the requested service's type arguments.
#[derive(Clone, Debug)]
pub enum Target {
    Closed(TypeDescriptor),
    Open(OpenType),
}

impl Target {
    /// Display name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            Target::Closed(descriptor) => descriptor.type_key().name().to_string(),
            Target::Open(open) => open.definition().to_string(),
        }
    }
}

impl From<TypeDescriptor> for Target {
    fn from(descriptor: TypeDescriptor) -> Self {
        Target::Closed(descriptor)
    }
}

impl From<OpenType> for Target {
    fn from(open: OpenType) -> Self {
        Target::Open(open)
    }
}
