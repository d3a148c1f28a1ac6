//! Graphics context ownership and the activation gate.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glkit_common::{ContextConfig, GlKitError, Result};
use glkit_driver::Driver;
use tracing::{debug, info};

use crate::program::ProgramObject;
use crate::registry::{Disposable, DisposableId, DisposalRegistry};

/// Shared state of one native context.
///
/// Resources hold a `Weak` to this, never a strong reference, so dropping the
/// [`GraphicsContext`] is what ends the context's life.
pub(crate) struct ContextInner {
    driver: Rc<dyn Driver>,
    config: ContextConfig,
    lost: Cell<bool>,
    registry: RefCell<DisposalRegistry>,
}

impl ContextInner {
    /// Make this context current on the calling thread before issuing a driver call.
    pub(crate) fn activate(&self) -> Result<&dyn Driver> {
        if self.lost.get() {
            return Err(GlKitError::context_unavailable(format!(
                "context '{}' has been torn down",
                self.config.label
            )));
        }
        if !self.driver.is_current() && !self.driver.make_current() {
            return Err(GlKitError::context_unavailable(format!(
                "context '{}' could not be made current",
                self.config.label
            )));
        }
        Ok(&*self.driver)
    }

    pub(crate) fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub(crate) fn register(&self, resource: Weak<dyn Disposable>) -> DisposableId {
        self.registry.borrow_mut().register(resource)
    }

    pub(crate) fn unregister(&self, id: DisposableId) {
        self.registry.borrow_mut().unregister(id);
    }
}

/// A graphics context and the resources created in it.
///
/// Dropping the context tears it down: every program still alive is disposed
/// first, then the context refuses further activation.
pub struct GraphicsContext {
    inner: Rc<ContextInner>,
}

impl GraphicsContext {
    /// Wrap a driver with the default configuration.
    pub fn new(driver: Rc<dyn Driver>) -> Self {
        Self::with_config(driver, ContextConfig::default())
    }

    pub fn with_config(driver: Rc<dyn Driver>, config: ContextConfig) -> Self {
        info!(label = %config.label, "graphics context created");
        Self {
            inner: Rc::new(ContextInner {
                driver,
                config,
                lost: Cell::new(false),
                registry: RefCell::new(DisposalRegistry::new()),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.config.label
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Create a program object owned by this context.
    pub fn create_program(&self) -> Result<ProgramObject> {
        ProgramObject::new(self)
    }

    /// Number of resources currently registered for disposal.
    pub fn live_resources(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Whether [`GraphicsContext::teardown`] has run.
    pub fn is_lost(&self) -> bool {
        self.inner.lost.get()
    }

    /// Force-dispose every live resource, then mark the context lost.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        if self.inner.lost.get() {
            return;
        }
        // Collect first: disposal must not run while the registry is borrowed.
        let live = self.inner.registry.borrow().live();
        debug!(
            label = %self.inner.config.label,
            resources = live.len(),
            "tearing down graphics context"
        );
        for resource in &live {
            resource.dispose();
        }
        self.inner.lost.set(true);
    }

    pub(crate) fn inner(&self) -> &Rc<ContextInner> {
        &self.inner
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("label", &self.inner.config.label)
            .field("lost", &self.inner.lost.get())
            .field("live_resources", &self.live_resources())
            .finish()
    }
}
