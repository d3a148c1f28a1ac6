//! Context-scoped registry of disposable GPU resources.
//!
//! The registry holds weak references only. Resources register on construction
//! and unregister when dropped; context teardown upgrades whatever is still
//! alive and force-disposes it before the native context goes away.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Identifier handed out by [`DisposalRegistry::register`].
pub type DisposableId = u64;

/// A GPU resource whose native handle must be released before its context dies.
pub trait Disposable {
    /// Release the native handle. Must be idempotent.
    fn dispose(&self);

    /// Whether [`Disposable::dispose`] has run.
    fn is_disposed(&self) -> bool;
}

/// Weak set of disposables, ordered by registration.
#[derive(Debug, Default)]
pub struct DisposalRegistry {
    next_id: DisposableId,
    entries: BTreeMap<DisposableId, Weak<dyn Disposable>>,
}

impl DisposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a resource.
    pub fn register(&mut self, resource: Weak<dyn Disposable>) -> DisposableId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, resource);
        id
    }

    /// Stop tracking a resource. Returns `false` if `id` was unknown.
    pub fn unregister(&mut self, id: DisposableId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Strong references to every registered resource that is still alive and
    /// not yet disposed, in registration order.
    pub fn live(&self) -> Vec<Rc<dyn Disposable>> {
        self.entries
            .values()
            .filter_map(Weak::upgrade)
            .filter(|resource| !resource.is_disposed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        disposals: Cell<u32>,
    }

    impl Disposable for Counter {
        fn dispose(&self) {
            self.disposals.set(self.disposals.get() + 1);
        }

        fn is_disposed(&self) -> bool {
            self.disposals.get() > 0
        }
    }

    fn weak(resource: &Rc<Counter>) -> Weak<dyn Disposable> {
        let weak: Weak<Counter> = Rc::downgrade(resource);
        weak
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = DisposalRegistry::new();
        let a = Rc::new(Counter::default());
        let id = registry.register(weak(&a));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_does_not_own_resources() {
        let mut registry = DisposalRegistry::new();
        let a = Rc::new(Counter::default());
        registry.register(weak(&a));

        assert_eq!(Rc::strong_count(&a), 1);
        drop(a);
        assert!(registry.live().is_empty());
    }

    #[test]
    fn test_live_skips_disposed() {
        let mut registry = DisposalRegistry::new();
        let a = Rc::new(Counter::default());
        let b = Rc::new(Counter::default());
        registry.register(weak(&a));
        registry.register(weak(&b));

        a.dispose();
        let live = registry.live();
        assert_eq!(live.len(), 1);
        live[0].dispose();
        assert_eq!(b.disposals.get(), 1);
    }
}
