//! Tenant identifiers and the sources that report the current tenant.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DiError, DiResult};

/// Opaque identifier of a tenant.
///
/// Wraps a UUID; equality is by value. Tenant ids are supplied by the caller's
/// execution context, the container only consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(transparent))]
pub struct TenantId(Uuid);

impl TenantId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// A random tenant id, for tests and bootstrap code.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Reports the tenant of the calling execution context.
///
/// Queried only when a per-tenant binding is resolved.
pub trait TenantContextSource: Send + Sync {
    /// The current tenant, or [`DiError::Context`] when none is active.
    fn current_tenant(&self) -> DiResult<TenantId>;
}

/// A source that always reports the same tenant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTenant(TenantId);

impl FixedTenant {
    pub fn new(tenant: TenantId) -> Self {
        Self(tenant)
    }
}

impl TenantContextSource for FixedTenant {
    fn current_tenant(&self) -> DiResult<TenantId> {
        Ok(self.0)
    }
}

/// Tracks the current tenant of each thread.
///
/// Cloning is cheap and clones share state, so the composition root can hand
/// one clone to the container and keep another to establish contexts.
///
/// # Examples
///
/// ```rust
/// use tenant_di::{ExecutionContextManager, TenantContextSource, TenantId};
///
/// let contexts = ExecutionContextManager::new();
/// assert!(contexts.current_tenant().is_err());
///
/// let tenant = TenantId::new_v4();
/// {
///     let _guard = contexts.current_for(tenant);
///     assert_eq!(contexts.current_tenant().unwrap(), tenant);
/// }
/// assert!(contexts.current_tenant().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutionContextManager {
    state: Arc<ContextState>,
}

// Entry id of the tenant set by `set_current`; guards use ids from 1
const UNGUARDED: u64 = 0;

/// Per-thread stacks of `(entry id, tenant)`; the last entry is current.
#[derive(Debug, Default)]
struct ContextState {
    threads: RwLock<HashMap<ThreadId, Vec<(u64, TenantId)>>>,
    next_entry: AtomicU64,
}

impl ContextState {
    fn remove(&self, thread: ThreadId, entry: u64) {
        let mut threads = self.threads.write();
        if let Some(stack) = threads.get_mut(&thread) {
            stack.retain(|(id, _)| *id != entry);
            if stack.is_empty() {
                threads.remove(&thread);
            }
        }
    }
}

impl ExecutionContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `tenant` current for this thread until the guard is dropped.
    ///
    /// Dropping a guard removes only its own context, so guards may be
    /// dropped in any order: the current tenant is always the one of the
    /// most recently entered context still alive.
    pub fn current_for(&self, tenant: TenantId) -> TenantGuard {
        let thread = thread::current().id();
        let entry = self.state.next_entry.fetch_add(1, Ordering::Relaxed) + 1;
        self.state
            .threads
            .write()
            .entry(thread)
            .or_default()
            .push((entry, tenant));
        tracing::trace!(tenant = %tenant, "entered tenant context");
        TenantGuard {
            state: self.state.clone(),
            thread,
            entry,
        }
    }

    /// Makes `tenant` this thread's tenant outside of any guard.
    ///
    /// Contexts entered with [`current_for`](Self::current_for) take
    /// precedence while their guards are alive.
    pub fn set_current(&self, tenant: TenantId) {
        let mut threads = self.state.threads.write();
        let stack = threads.entry(thread::current().id()).or_default();
        if stack.first().is_some_and(|(id, _)| *id == UNGUARDED) {
            stack[0].1 = tenant;
        } else {
            stack.insert(0, (UNGUARDED, tenant));
        }
    }

    /// Leaves every tenant context on this thread.
    ///
    /// Threads that used [`set_current`](Self::set_current) should call this
    /// before exiting.
    pub fn clear(&self) {
        self.state.threads.write().remove(&thread::current().id());
    }

    /// The current tenant of this thread, if any.
    pub fn current(&self) -> Option<TenantId> {
        self.state
            .threads
            .read()
            .get(&thread::current().id())
            .and_then(|stack| stack.last())
            .map(|(_, tenant)| *tenant)
    }

    /// Number of threads with a tenant context.
    pub fn active_threads(&self) -> usize {
        self.state.threads.read().len()
    }
}

impl TenantContextSource for ExecutionContextManager {
    fn current_tenant(&self) -> DiResult<TenantId> {
        self.current().ok_or_else(|| {
            DiError::Context(format!(
                "no tenant established for thread {:?}",
                thread::current().id()
            ))
        })
    }
}

/// Ends the tenant context it was returned for when dropped.
#[must_use = "the tenant context ends when the guard is dropped"]
pub struct TenantGuard {
    state: Arc<ContextState>,
    thread: ThreadId,
    entry: u64,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        self.state.remove(self.thread, self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_contexts_restore_previous_tenant() {
        let contexts = ExecutionContextManager::new();
        let outer = TenantId::new_v4();
        let inner = TenantId::new_v4();

        let _outer = contexts.current_for(outer);
        {
            let _inner = contexts.current_for(inner);
            assert_eq!(contexts.current(), Some(inner));
        }
        assert_eq!(contexts.current(), Some(outer));
    }

    #[test]
    fn contexts_are_per_thread() {
        let contexts = ExecutionContextManager::new();
        contexts.set_current(TenantId::new_v4());

        let other = contexts.clone();
        let seen = thread::spawn(move || other.current()).join().unwrap();
        assert_eq!(seen, None);
        assert!(contexts.current().is_some());
    }

    #[test]
    fn tenant_id_round_trips_through_display() {
        let tenant = TenantId::new_v4();
        let parsed: TenantId = tenant.to_string().parse().unwrap();
        assert_eq!(parsed, tenant);
    }

    #[test]
    fn guards_dropped_out_of_order_leave_no_tenant() {
        let contexts = ExecutionContextManager::new();
        let (a, b) = (TenantId::new_v4(), TenantId::new_v4());

        let guard_a = contexts.current_for(a);
        let guard_b = contexts.current_for(b);
        drop(guard_a);
        assert_eq!(contexts.current(), Some(b));
        drop(guard_b);

        assert_eq!(contexts.current(), None);
        assert_eq!(contexts.active_threads(), 0);
    }

    #[test]
    fn reentering_a_tenant_keeps_the_inner_context() {
        let contexts = ExecutionContextManager::new();
        let (a, b) = (TenantId::new_v4(), TenantId::new_v4());

        let first_a = contexts.current_for(a);
        let _b = contexts.current_for(b);
        let _second_a = contexts.current_for(a);
        drop(first_a);

        assert_eq!(contexts.current(), Some(a));
    }

    #[test]
    fn guards_take_precedence_over_set_current() {
        let contexts = ExecutionContextManager::new();
        let (base, scoped) = (TenantId::new_v4(), TenantId::new_v4());

        let guard = contexts.current_for(scoped);
        contexts.set_current(base);
        assert_eq!(contexts.current(), Some(scoped));
        drop(guard);
        assert_eq!(contexts.current(), Some(base));

        contexts.clear();
        assert_eq!(contexts.active_threads(), 0);
    }

    #[test]
    fn missing_tenant_is_a_context_error() {
        let contexts = ExecutionContextManager::new();
        assert!(matches!(contexts.current_tenant(), Err(DiError::Context(_))));
    }
}
