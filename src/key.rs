//! Service identity types: concrete types, generic definitions and cache keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::tenant::TenantId;

/// Runtime identity of a Rust type.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// diagnostics and error messages.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`. Trait objects are allowed (`TypeKey::of::<dyn Logger>()`).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The `std::any::type_name` of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ordered type arguments of a parameterized instantiation.
///
/// ```rust
/// use tenant_di::{TypeArgs, TypeKey};
///
/// let args = TypeArgs::of::<(String, u32)>();
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.as_slice()[0], TypeKey::of::<String>());
/// assert_ne!(args, TypeArgs::of::<(u32, String)>());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeArgs(SmallVec<[TypeKey; 2]>);

impl TypeArgs {
    /// Empty argument list.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Arguments taken from a tuple type, in order.
    pub fn of<L: TypeList>() -> Self {
        L::type_args()
    }

    /// Appends one argument.
    pub fn push(&mut self, key: TypeKey) {
        self.0.push(key);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[TypeKey] {
        &self.0
    }
}

impl FromIterator<TypeKey> for TypeArgs {
    fn from_iter<I: IntoIterator<Item = TypeKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for TypeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(key.name())?;
        }
        Ok(())
    }
}

/// A tuple of types that can be turned into [`TypeArgs`].
///
/// Implemented for `()` and tuples of up to six `'static` types. Trait object
/// arguments can be collected from [`TypeKey`]s instead.
pub trait TypeList {
    /// The tuple's element types, in order.
    fn type_args() -> TypeArgs;
}

impl TypeList for () {
    fn type_args() -> TypeArgs {
        TypeArgs::new()
    }
}

macro_rules! impl_type_list {
    ($($name:ident),+) => {
        impl<$($name: 'static),+> TypeList for ($($name,)+) {
            fn type_args() -> TypeArgs {
                let mut args = TypeArgs::new();
                $(args.push(TypeKey::of::<$name>());)+
                args
            }
        }
    };
}

impl_type_list!(A);
impl_type_list!(A, B);
impl_type_list!(A, B, C);
impl_type_list!(A, B, C, D);
impl_type_list!(A, B, C, D, E);
impl_type_list!(A, B, C, D, E, F);

/// An unparameterized generic definition, such as `Repository<_>`.
///
/// Rust has no runtime notion of an open generic type, so definitions are
/// named explicitly and declared once as constants:
///
/// ```rust
/// use tenant_di::GenericDef;
///
/// pub const REPOSITORY: GenericDef = GenericDef::new("Repository", 1);
/// assert_eq!(REPOSITORY.to_string(), "Repository<_>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDef {
    name: &'static str,
    arity: usize,
}

impl GenericDef {
    /// Declares a definition with the given name and number of type parameters.
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Builds the closed service id for `args`, checking the arity.
    pub fn close(&self, args: TypeArgs, ty: TypeKey) -> DiResult<ServiceId> {
        if args.len() != self.arity {
            return Err(DiError::configuration(
                self.to_string(),
                format!("expected {} type argument(s), got {}", self.arity, args.len()),
            ));
        }
        Ok(ServiceId::Closed {
            definition: *self,
            args,
            ty,
        })
    }
}

impl fmt::Display for GenericDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<", self.name)?;
        for i in 0..self.arity {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("_")?;
        }
        f.write_str(">")
    }
}

/// A closed generic type that can report its definition and type arguments.
///
/// This is what lets a generic binding declared against a [`GenericDef`] be
/// matched and parameterized from the requested type. Distinct types may
/// report the same definition and arguments; they still are distinct
/// services, each with its own closed bindings and cache entries.
///
/// ```rust
/// use tenant_di::{GenericDef, Parameterized, TypeArgs, ServiceId};
///
/// pub const REPOSITORY: GenericDef = GenericDef::new("Repository", 1);
///
/// pub trait Repository<T>: Send + Sync {
///     fn describe(&self) -> String;
/// }
///
/// impl<T: 'static> Parameterized for dyn Repository<T> {
///     fn definition() -> GenericDef { REPOSITORY }
///     fn type_args() -> TypeArgs { TypeArgs::of::<(T,)>() }
/// }
///
/// let id = ServiceId::closed::<dyn Repository<String>>();
/// assert_eq!(id.definition(), Some(ServiceId::open(REPOSITORY)));
/// assert_eq!(id.to_string(), "Repository<alloc::string::String>");
/// ```
pub trait Parameterized: 'static {
    /// The open definition this type instantiates.
    fn definition() -> GenericDef;
    /// The concrete type arguments, in declaration order.
    fn type_args() -> TypeArgs;
}

/// Identity of a requested or bound service.
///
/// # Variants
///
/// - **Type**: a concrete type or trait object (`Database`, `dyn Logger`)
/// - **Open**: an unparameterized generic definition (`Repository<_>`)
/// - **Closed**: a parameterized instantiation (`Repository<String>`), which
///   also carries the Rust type used to hand the instance back to the caller
#[derive(Debug, Clone)]
pub enum ServiceId {
    /// Concrete type or trait object
    Type(TypeKey),
    /// Unparameterized generic definition
    Open(GenericDef),
    /// Parameterized instantiation of a definition
    Closed {
        definition: GenericDef,
        args: TypeArgs,
        ty: TypeKey,
    },
}

impl ServiceId {
    /// Id of a concrete type or trait object.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceId::Type(TypeKey::of::<T>())
    }

    /// Id of an open generic definition.
    pub fn open(definition: GenericDef) -> Self {
        ServiceId::Open(definition)
    }

    /// Id of a closed generic type.
    pub fn closed<T: ?Sized + Parameterized>() -> Self {
        ServiceId::Closed {
            definition: T::definition(),
            args: T::type_args(),
            ty: TypeKey::of::<T>(),
        }
    }

    /// The Rust type instances of this service are handed out as.
    ///
    /// `None` for open definitions, which are never instantiated directly.
    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            ServiceId::Type(key) => Some(*key),
            ServiceId::Open(_) => None,
            ServiceId::Closed { ty, .. } => Some(*ty),
        }
    }

    /// The open definition of a closed service, or `None`.
    pub fn definition(&self) -> Option<ServiceId> {
        match self {
            ServiceId::Closed { definition, .. } => Some(ServiceId::Open(*definition)),
            _ => None,
        }
    }

    /// Type arguments of a closed service; empty otherwise.
    pub fn type_args(&self) -> &[TypeKey] {
        match self {
            ServiceId::Closed { args, .. } => args.as_slice(),
            _ => &[],
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ServiceId::Open(_))
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, ServiceId::Closed { .. })
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServiceId::Type(a), ServiceId::Type(b)) => a == b,
            (ServiceId::Open(a), ServiceId::Open(b)) => a == b,
            (
                ServiceId::Closed { definition: da, args: aa, ty: ta },
                ServiceId::Closed { definition: db, args: ab, ty: tb },
            ) => da == db && aa == ab && ta == tb,
            _ => false,
        }
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ServiceId::Type(key) => {
                0u8.hash(state);
                key.hash(state);
            }
            ServiceId::Open(definition) => {
                1u8.hash(state);
                definition.hash(state);
            }
            ServiceId::Closed { definition, args, ty } => {
                2u8.hash(state);
                definition.hash(state);
                args.hash(state);
                ty.hash(state);
            }
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Type(key) => fmt::Display::fmt(key, f),
            ServiceId::Open(definition) => fmt::Display::fmt(definition, f),
            ServiceId::Closed { definition, args, .. } => {
                write!(f, "{}<{}>", definition.name(), args)
            }
        }
    }
}

/// Key of one cached instance.
///
/// Composed of the tenant (absent for process-wide singletons), the service
/// the binding was declared for, and the service actually requested, whose
/// type arguments distinguish instantiations of an open binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant: Option<TenantId>,
    binding: ServiceId,
    requested: ServiceId,
}

impl CacheKey {
    pub fn new(tenant: Option<TenantId>, binding: ServiceId, requested: ServiceId) -> Self {
        Self {
            tenant,
            binding,
            requested,
        }
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant
    }

    pub fn binding(&self) -> &ServiceId {
        &self.binding
    }

    pub fn requested(&self) -> &ServiceId {
        &self.requested
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant {
            Some(tenant) => write!(f, "{}", tenant)?,
            None => f.write_str("*")?,
        }
        write!(f, "-{}-{}", self.binding, self.requested)
    }
}
