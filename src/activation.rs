//! Turning a binding's strategy into a new instance.

use crate::descriptors::{Arguments, Target, TypeDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceId;
use crate::registration::{Binding, Instance, Strategy};
use crate::traits::DependencyResolver;

/// Produces a new instance for `requested` according to `binding`'s strategy.
///
/// Constructor parameters are resolved through `deps`. Nothing is cached
/// here; memoization is the caller's business.
pub fn activate(
    binding: &Binding,
    requested: &ServiceId,
    deps: &dyn DependencyResolver,
) -> DiResult<Instance> {
    tracing::trace!(
        service = %binding.service(),
        requested = %requested,
        strategy = binding.strategy().kind(),
        "activating"
    );
    match binding.strategy() {
        Strategy::Type(target) => activate_target(target, requested, deps),
        Strategy::Constant(instance) => Ok(instance.clone()),
        Strategy::Callback(callback) => callback(),
        Strategy::TypeCallback(callback) => activate_target(&callback(), requested, deps),
    }
}

fn activate_target(
    target: &Target,
    requested: &ServiceId,
    deps: &dyn DependencyResolver,
) -> DiResult<Instance> {
    match target {
        Target::Closed(descriptor) => construct(descriptor, requested, deps),
        Target::Open(open) => {
            let args = requested.type_args();
            if args.is_empty() {
                return Err(DiError::configuration(
                    open.definition().to_string(),
                    format!("requested service {} carries no type arguments", requested),
                ));
            }
            let descriptor = open.close(args)?;
            construct(&descriptor, requested, deps)
        }
    }
}

/// Builds `descriptor` through its single constructor and exposes the result
/// as `requested`.
fn construct(
    descriptor: &TypeDescriptor,
    requested: &ServiceId,
    deps: &dyn DependencyResolver,
) -> DiResult<Instance> {
    let service = requested.type_key().ok_or_else(|| {
        DiError::configuration(
            descriptor.type_key().name(),
            format!("cannot instantiate open service {}", requested),
        )
    })?;
    let constructor = descriptor.designated_constructor()?;

    let values = constructor
        .params()
        .iter()
        .map(|param| deps.resolve_service(param))
        .collect::<DiResult<Vec<_>>>()?;

    let instance = constructor.invoke(&Arguments::new(values))?;
    descriptor.expose_as(instance, &service)
}
