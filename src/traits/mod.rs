//! Core traits for resolution and the host registration hook.

mod resolver;
mod source;

pub use resolver::{DependencyResolver, Resolver};
pub use source::{Registration, RegistrationSource};
