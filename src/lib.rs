//! # tenant-di
//!
//! Tenant-aware dependency injection: every binding's instances are built once
//! per process, once per tenant, or on every resolution.
//!
//! ## Features
//!
//! - **Tenant scopes**: Singleton, SingletonPerTenant and Transient bindings
//! - **Explicit constructors**: types describe their injectable constructor up front
//! - **Generic services**: bindings for a generic definition serve every instantiation
//! - **Single-flight caching**: concurrent first requests build an instance once
//! - **Circular dependency detection**: cycles are reported with their path
//! - **Pluggable sources**: services without a binding can come from a host
//!
//! ## Quick Start
//!
//! ```rust
//! use tenant_di::{BindingCollection, ExecutionContextManager, Resolver, TenantId, TypeDescriptor};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct Settings { prefix: String }
//! struct ConsoleLogger { settings: Arc<Settings> }
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("{} {}", self.settings.prefix, message)
//!     }
//! }
//!
//! let mut bindings = BindingCollection::new();
//! bindings
//!     .bind::<Settings>()
//!     .to_constant(Settings { prefix: "[app]".to_string() });
//! bindings
//!     .bind::<dyn Logger>()
//!     .to_type(
//!         TypeDescriptor::builder::<ConsoleLogger>()
//!             .inject(|(settings,): (Arc<Settings>,)| ConsoleLogger { settings })
//!             .exposes::<dyn Logger>(|logger| logger as Arc<dyn Logger>)
//!             .build(),
//!     )
//!     .singleton_per_tenant();
//!
//! let contexts = ExecutionContextManager::new();
//! let container = bindings.build(Arc::new(contexts.clone())).unwrap();
//! assert!(container.validate().is_valid());
//!
//! let (a, b) = (TenantId::new_v4(), TenantId::new_v4());
//! let logger_a = {
//!     let _tenant = contexts.current_for(a);
//!     container.get_required::<dyn Logger>()
//! };
//! let logger_b = {
//!     let _tenant = contexts.current_for(b);
//!     container.get_required::<dyn Logger>()
//! };
//!
//! assert_eq!(logger_a.log("hello"), "[app] hello");
//! assert!(!Arc::ptr_eq(&logger_a, &logger_b));
//! ```
//!
//! ## Generic Services
//!
//! Rust has no runtime generic definitions, so they are declared as
//! [`GenericDef`] constants and closed types report theirs via
//! [`Parameterized`]:
//!
//! ```rust
//! use tenant_di::{
//!     BindingCollection, FixedTenant, GenericDef, OpenType, Parameterized, Resolver, TenantId,
//!     TypeArgs, TypeDescriptor,
//! };
//! use std::marker::PhantomData;
//! use std::sync::Arc;
//!
//! const REPOSITORY: GenericDef = GenericDef::new("Repository", 1);
//!
//! trait Repository<T>: Send + Sync {
//!     fn entity(&self) -> &'static str;
//! }
//!
//! impl<T: 'static> Parameterized for dyn Repository<T> {
//!     fn definition() -> GenericDef { REPOSITORY }
//!     fn type_args() -> TypeArgs { TypeArgs::of::<(T,)>() }
//! }
//!
//! struct MemoryRepository<T>(PhantomData<fn() -> T>);
//!
//! impl<T: 'static> Repository<T> for MemoryRepository<T> {
//!     fn entity(&self) -> &'static str { std::any::type_name::<T>() }
//! }
//!
//! fn memory<T: 'static>() -> TypeDescriptor {
//!     TypeDescriptor::builder::<MemoryRepository<T>>()
//!         .constructor(|| MemoryRepository(PhantomData))
//!         .exposes::<dyn Repository<T>>(|repo| repo as Arc<dyn Repository<T>>)
//!         .build()
//! }
//!
//! let mut bindings = BindingCollection::new();
//! bindings
//!     .bind_open(REPOSITORY)
//!     .to_open_type(
//!         OpenType::builder(REPOSITORY)
//!             .close::<(String,)>(memory::<String>())
//!             .close::<(u64,)>(memory::<u64>())
//!             .build(),
//!     )
//!     .singleton();
//!
//! let container = bindings.build(Arc::new(FixedTenant::new(TenantId::new_v4()))).unwrap();
//! let users = container.get_closed_required::<dyn Repository<String>>();
//! assert_eq!(users.entity(), "alloc::string::String");
//! ```

pub mod activation;
pub mod cache;
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod provider;
pub mod registration;
pub mod scope;
pub mod tenant;
pub mod traits;
pub mod validation;

mod internal;

pub use activation::activate;
pub use cache::InstanceCache;
pub use collection::{BindingBuilder, BindingCollection, BindingHandle, OpenBindingBuilder};
pub use config::{ContainerOptions, DuplicatePolicy};
pub use descriptors::{
    Arguments, Constructor, Dependencies, Dependency, DescriptorBuilder, Generic, OpenType,
    OpenTypeBuilder, Target, TypeDescriptor,
};
pub use error::{DiError, DiResult};
pub use key::{CacheKey, GenericDef, Parameterized, ServiceId, TypeArgs, TypeKey, TypeList};
pub use provider::{Container, ResolverContext};
pub use registration::{Binding, BindingRegistry, Instance, Strategy};
pub use scope::Scope;
pub use tenant::{ExecutionContextManager, FixedTenant, TenantContextSource, TenantGuard, TenantId};
pub use traits::{DependencyResolver, Registration, RegistrationSource, Resolver};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};
