//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::ServiceId;

// Services being resolved on this thread, tagged with the owning container
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(usize, ServiceId)>> = const { RefCell::new(Vec::new()) };
}

/// Guard for managing the thread-local resolution stack
pub(crate) struct StackGuard;

impl StackGuard {
    fn enter(owner: usize, service: &ServiceId, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Circular detection BEFORE pushing the new service
            if stack.iter().any(|(o, s)| *o == owner && s == service) {
                let mut path: Vec<String> = stack
                    .iter()
                    .filter(|(o, _)| *o == owner)
                    .map(|(_, s)| s.to_string())
                    .collect();
                path.push(service.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push((owner, service.clone()));
            Ok(StackGuard)
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `service` pushed on this thread's resolution stack.
///
/// Re-entering a service that is already being resolved by the same owner
/// fails with [`DiError::Circular`] before `f` runs.
pub(crate) fn with_cycle_check<T, F>(
    owner: usize,
    service: &ServiceId,
    max_depth: usize,
    f: F,
) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = StackGuard::enter(owner, service, max_depth)?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_is_reported_with_path() {
        let a = ServiceId::of::<u8>();
        let b = ServiceId::of::<u16>();

        let result = with_cycle_check(1, &a, 16, || {
            with_cycle_check(1, &b, 16, || with_cycle_check(1, &a, 16, || Ok(())))
        });

        assert_eq!(
            result,
            Err(DiError::Circular(vec!["u8".into(), "u16".into(), "u8".into()]))
        );
    }

    #[test]
    fn other_owners_do_not_count() {
        let a = ServiceId::of::<u8>();
        let result = with_cycle_check(1, &a, 16, || with_cycle_check(2, &a, 16, || Ok(7)));
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn depth_is_bounded() {
        fn nest(depth: usize) -> DiResult<()> {
            let service = ServiceId::of::<u8>();
            // A fresh owner per level so no cycle is seen
            with_cycle_check(depth, &service, 3, || nest(depth + 1))
        }
        assert_eq!(nest(0), Err(DiError::DepthExceeded(3)));
    }

    #[test]
    fn stack_unwinds_after_errors() {
        let a = ServiceId::of::<u8>();
        let _ = with_cycle_check(1, &a, 16, || Err::<(), _>(DiError::BindingNotFound("x".into())));
        assert_eq!(with_cycle_check(1, &a, 16, || Ok(1)), Ok(1));
    }
}
