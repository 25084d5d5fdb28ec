#![no_main]

use libfuzzer_sys::fuzz_target;
use tenant_di::{
    BindingCollection, ExecutionContextManager, Resolver, TenantId, TypeDescriptor,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

struct Shared;
struct Session;
struct Request {
    _session: Arc<Session>,
}

fuzz_target!(|data: &[u8]| {
    let contexts = ExecutionContextManager::new();
    let mut bindings = BindingCollection::new();
    bindings.bind::<Shared>().to_type(TypeDescriptor::of(|| Shared)).singleton();
    bindings
        .bind::<Session>()
        .to_type(TypeDescriptor::of(|| Session))
        .singleton_per_tenant();
    bindings.bind::<Request>().to_type(
        TypeDescriptor::builder::<Request>()
            .inject(|(session,): (Arc<Session>,)| Request { _session: session })
            .build(),
    );
    let container = match bindings.build(Arc::new(contexts.clone())) {
        Ok(container) => container,
        Err(_) => return,
    };

    // Each byte picks a tenant (high bits, 0 means none) and a service (low bits)
    let mut sessions: HashMap<u8, Arc<Session>> = HashMap::new();
    let mut tenants = HashSet::new();
    for byte in data {
        let tenant = byte >> 4;
        let _guard = (tenant != 0).then(|| {
            tenants.insert(tenant);
            contexts.current_for(TenantId::from(Uuid::from_u128(tenant as u128)))
        });

        match byte % 3 {
            0 => assert!(container.get::<Shared>().is_ok()),
            1 => match container.get::<Session>() {
                Ok(session) => {
                    let first = sessions.entry(tenant).or_insert_with(|| session.clone());
                    assert!(Arc::ptr_eq(first, &session));
                }
                Err(_) => assert_eq!(tenant, 0),
            },
            _ => assert_eq!(container.get::<Request>().is_ok(), tenant != 0),
        }
    }
    assert!(container.context().cache().len() <= tenants.len() + 1);
});
