//! Hook through which a host asks "can you produce this service?".

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::key::ServiceId;
use crate::registration::Instance;
use crate::traits::DependencyResolver;

type Activator = Arc<dyn Fn(&dyn DependencyResolver) -> DiResult<Instance> + Send + Sync>;

/// A ready-to-activate answer to a registration query.
#[derive(Clone)]
pub struct Registration {
    service: ServiceId,
    activator: Activator,
}

impl Registration {
    pub fn new<F>(service: ServiceId, activator: F) -> Self
    where
        F: Fn(&dyn DependencyResolver) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Self {
            service,
            activator: Arc::new(activator),
        }
    }

    /// The service this registration answers for.
    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    /// Produces an instance, resolving nested dependencies through `deps`.
    pub fn activate(&self, deps: &dyn DependencyResolver) -> DiResult<Instance> {
        (self.activator)(deps)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Something that can supply registrations for services on demand.
///
/// A [`Container`](crate::Container) consults its own bindings first and then
/// each additional source, in the order they were added.
pub trait RegistrationSource: Send + Sync {
    /// A registration for `service`, or `None` when this source has none.
    fn registration_for(&self, service: &ServiceId) -> Option<Registration>;
}
