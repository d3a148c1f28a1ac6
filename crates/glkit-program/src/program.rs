//! Linked GPU program objects.
//!
//! A [`ProgramObject`] owns one native program handle. Clones share the same
//! program; the handle is released when the last clone drops, when
//! [`ProgramObject::dispose`] is called, or when the owning context is torn
//! down, whichever comes first.
//!
//! Every operation checks for disposal before touching the driver and makes the
//! owning context current first. Locations and indices of `-1` mean "not
//! present"; passing them back in is a no-op.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glkit_common::{DriverFeature, GlKitError, InfoLogConfig, Result};
use glkit_driver::{constants, Driver, UniformValue};
use tracing::{debug, warn};

use crate::binding::ProgramBinding;
use crate::context::{ContextInner, GraphicsContext};
use crate::info_log::fetch_info_log;
use crate::reflection::{
    fetch_active, ProgramAttribute, ProgramUniform, ReflectionCache, ReflectionKind,
};
use crate::registry::{Disposable, DisposableId};
use crate::shader::ShaderStage;

struct ProgramInner {
    handle: Cell<u32>,
    disposed: Cell<bool>,
    stages: RefCell<Vec<ShaderStage>>,
    reflection: ReflectionCache,
    info_log: InfoLogConfig,
    context: Weak<ContextInner>,
    registry_id: DisposableId,
}

impl ProgramInner {
    fn ensure_live(&self) -> Result<()> {
        if self.disposed.get() {
            Err(GlKitError::disposed("program object"))
        } else {
            Ok(())
        }
    }

    /// Check disposal, activate the owning context, then run `f` with the driver.
    fn with_driver<R>(&self, f: impl FnOnce(&dyn Driver, u32) -> Result<R>) -> Result<R> {
        self.ensure_live()?;
        let context = self
            .context
            .upgrade()
            .ok_or_else(|| GlKitError::context_unavailable("graphics context was dropped"))?;
        let driver = context.activate()?;
        f(driver, self.handle.get())
    }
}

impl Disposable for ProgramInner {
    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let handle = self.handle.replace(0);
        self.reflection.invalidate();
        self.stages.borrow_mut().clear();
        if handle == 0 {
            return;
        }
        match self.context.upgrade() {
            Some(context) => match context.activate() {
                Ok(driver) => {
                    driver.delete_program(handle);
                    debug!(program = handle, "program deleted");
                }
                Err(err) => warn!(program = handle, %err, "program handle not released"),
            },
            None => warn!(program = handle, "context dropped before program, handle leaked"),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl Drop for ProgramInner {
    fn drop(&mut self) {
        self.dispose();
        if let Some(context) = self.context.upgrade() {
            context.unregister(self.registry_id);
        }
    }
}

fn require(driver: &dyn Driver, feature: DriverFeature) -> Result<()> {
    if driver.supports(feature) {
        Ok(())
    } else {
        Err(GlKitError::unsupported(feature))
    }
}

/// Transpose an `n`x`n` matrix stored in a flat array.
fn transposed<const L: usize>(m: &[f32; L], n: usize) -> [f32; L] {
    let mut out = [0.0; L];
    for col in 0..n {
        for row in 0..n {
            out[row * n + col] = m[col * n + row];
        }
    }
    out
}

/// A linked GPU program.
#[derive(Clone)]
pub struct ProgramObject {
    inner: Rc<ProgramInner>,
}

impl ProgramObject {
    /// Allocate a native program in `context` and register it for disposal.
    pub fn new(context: &GraphicsContext) -> Result<Self> {
        let shared = context.inner();
        let inner = Rc::new_cyclic(|weak: &Weak<ProgramInner>| {
            let resource: Weak<dyn Disposable> = weak.clone();
            ProgramInner {
                handle: Cell::new(0),
                disposed: Cell::new(false),
                stages: RefCell::new(Vec::new()),
                reflection: ReflectionCache::default(),
                info_log: shared.config().info_log.clone(),
                context: Rc::downgrade(shared),
                registry_id: shared.register(resource),
            }
        });

        let driver = shared.activate()?;
        let handle = driver.create_program();
        if handle == 0 {
            return Err(GlKitError::internal(
                "driver could not allocate a program object",
            ));
        }
        inner.handle.set(handle);
        debug!(program = handle, context = %shared.config().label, "program created");
        Ok(Self { inner })
    }

    // ==================== Lifecycle ====================

    /// The native handle.
    pub fn handle(&self) -> Result<u32> {
        self.inner.ensure_live()?;
        Ok(self.inner.handle.get())
    }

    /// Whether the native handle has been released.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Release the native handle now. Later calls are no-ops; every other
    /// operation fails with a disposed error afterwards.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    // ==================== Stages ====================

    /// Stages currently attached, in attach order.
    pub fn shaders(&self) -> Result<Vec<ShaderStage>> {
        self.inner.ensure_live()?;
        Ok(self.inner.stages.borrow().clone())
    }

    /// Attach a compiled stage. Attaching the same stage twice is not deduplicated.
    pub fn attach(&self, stage: &ShaderStage) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            self.inner.stages.borrow_mut().push(*stage);
            driver.attach_shader(handle, stage.handle());
            Ok(())
        })
    }

    /// Detach the first attached entry equal to `stage`. Does nothing if the
    /// stage is not attached.
    pub fn detach(&self, stage: &ShaderStage) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            let removed = {
                let mut stages = self.inner.stages.borrow_mut();
                match stages.iter().position(|s| s == stage) {
                    Some(index) => {
                        stages.remove(index);
                        true
                    }
                    None => false,
                }
            };
            if removed {
                driver.detach_shader(handle, stage.handle());
            }
            Ok(())
        })
    }

    // ==================== Link / Validate ====================

    /// Bind a generic vertex attribute index to a name. Takes effect on the next link.
    pub fn bind_attribute_location(&self, index: u32, name: &str) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            driver.bind_attrib_location(handle, index, name);
            Ok(())
        })
    }

    /// Bind a fragment shader output to a color number. Takes effect on the next link.
    pub fn bind_frag_data_location(&self, color_number: u32, name: &str) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::FragDataLocation)?;
            driver.bind_frag_data_location(handle, color_number, name);
            Ok(())
        })
    }

    /// Link the attached stages. Cached reflection is discarded whether or not
    /// the link succeeds.
    pub fn link(&self) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            driver.link_program(handle);
            self.inner.reflection.invalidate();
            debug!(program = handle, "program linked");
            Ok(())
        })
    }

    /// Ask the driver to validate the program against the current state.
    pub fn validate(&self) -> Result<()> {
        self.inner.with_driver(|driver, handle| {
            driver.validate_program(handle);
            Ok(())
        })
    }

    /// Whether the last link succeeded.
    pub fn link_status(&self) -> Result<bool> {
        self.inner
            .with_driver(|driver, handle| Ok(driver.get_program_iv(handle, constants::LINK_STATUS) != 0))
    }

    /// Whether the last validation succeeded.
    pub fn validate_status(&self) -> Result<bool> {
        self.inner.with_driver(|driver, handle| {
            Ok(driver.get_program_iv(handle, constants::VALIDATE_STATUS) != 0)
        })
    }

    /// Link/validate diagnostics. Text longer than the configured bound comes
    /// back truncated rather than as an error.
    pub fn info_log(&self) -> Result<String> {
        self.inner
            .with_driver(|driver, handle| Ok(fetch_info_log(driver, handle, &self.inner.info_log)))
    }

    // ==================== Reflection ====================

    /// Active uniforms in driver order.
    pub fn uniforms(&self) -> Result<Vec<ProgramUniform>> {
        self.reflect(ReflectionKind::Uniforms)
    }

    /// Active attributes in driver order.
    pub fn attributes(&self) -> Result<Vec<ProgramAttribute>> {
        self.reflect(ReflectionKind::Attributes)
    }

    /// Number of active uniforms.
    pub fn uniform_count(&self) -> Result<usize> {
        Ok(self.uniforms()?.len())
    }

    /// Number of active attributes.
    pub fn attribute_count(&self) -> Result<usize> {
        Ok(self.attributes()?.len())
    }

    fn reflect(&self, kind: ReflectionKind) -> Result<Vec<ProgramUniform>> {
        self.inner.ensure_live()?;
        self.inner.reflection.get_or_populate(kind, || {
            self.inner
                .with_driver(|driver, handle| Ok(fetch_active(driver, handle, kind)))
        })
    }

    /// Location of a uniform, or -1. Always asks the driver.
    pub fn uniform_location(&self, name: &str) -> Result<i32> {
        self.inner
            .with_driver(|driver, handle| Ok(driver.get_uniform_location(handle, name)))
    }

    /// Location of an attribute, or -1. Always asks the driver.
    pub fn attribute_location(&self, name: &str) -> Result<i32> {
        self.inner
            .with_driver(|driver, handle| Ok(driver.get_attrib_location(handle, name)))
    }

    /// Index of a uniform block, or -1 if the program has no such block.
    pub fn uniform_buffer_index(&self, block_name: &str) -> Result<i32> {
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::UniformBlocks)?;
            Ok(driver.get_uniform_block_index(handle, block_name))
        })
    }

    /// Index of a shader storage block, or -1 if the program has no such block.
    pub fn storage_buffer_index(&self, name: &str) -> Result<i32> {
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::StorageBlocks)?;
            Ok(driver.get_program_resource_index(handle, constants::SHADER_STORAGE_BLOCK, name))
        })
    }

    /// Data size in bytes of an active uniform block. A negative index yields 0.
    pub fn uniform_buffer_size(&self, block_index: i32) -> Result<i32> {
        self.inner.ensure_live()?;
        if block_index < 0 {
            return Ok(0);
        }
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::UniformBlocks)?;
            Ok(driver.get_active_uniform_block_iv(
                handle,
                block_index as u32,
                constants::UNIFORM_BLOCK_DATA_SIZE,
            ))
        })
    }

    // ==================== Block Bindings ====================

    /// Assign a uniform block to a buffer binding point. A negative block index
    /// is ignored without touching the driver.
    pub fn set_uniform_buffer_index(&self, block_index: i32, bind_index: u32) -> Result<()> {
        self.inner.ensure_live()?;
        if block_index < 0 {
            return Ok(());
        }
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::UniformBlocks)?;
            driver.uniform_block_binding(handle, block_index as u32, bind_index);
            Ok(())
        })
    }

    /// Assign a storage block to a buffer binding point. A negative index is
    /// ignored without touching the driver.
    pub fn set_storage_buffer_index(&self, buffer_index: i32, bind_unit_index: u32) -> Result<()> {
        self.inner.ensure_live()?;
        if buffer_index < 0 {
            return Ok(());
        }
        self.inner.with_driver(|driver, handle| {
            require(driver, DriverFeature::StorageBlocks)?;
            driver.shader_storage_block_binding(handle, buffer_index as u32, bind_unit_index);
            Ok(())
        })
    }

    // ==================== Uniform Values ====================

    /// Write a uniform value. The program is bound only for the duration of the
    /// call; whatever was current before is current again afterwards.
    ///
    /// Location -1 is ignored without touching the driver. Fails with an
    /// invalid-operation error if the driver will not bind this program, for
    /// example after a failed link.
    pub fn set_uniform(&self, location: i32, value: impl Into<UniformValue>) -> Result<()> {
        self.inner.ensure_live()?;
        if location == -1 {
            return Ok(());
        }
        let value = value.into();
        self.inner.with_driver(|driver, handle| {
            let _binding = ProgramBinding::bind(driver, handle)?;
            driver.set_uniform(location, &value);
            Ok(())
        })
    }

    /// Look up a uniform by name and write it. Unknown names are ignored.
    pub fn set_uniform_named(&self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform(location, value)
    }

    pub fn set_uniform1i(&self, location: i32, x: i32) -> Result<()> {
        self.set_uniform(location, x)
    }

    pub fn set_uniform2i(&self, location: i32, x: i32, y: i32) -> Result<()> {
        self.set_uniform(location, [x, y])
    }

    pub fn set_uniform3i(&self, location: i32, x: i32, y: i32, z: i32) -> Result<()> {
        self.set_uniform(location, [x, y, z])
    }

    pub fn set_uniform4i(&self, location: i32, x: i32, y: i32, z: i32, w: i32) -> Result<()> {
        self.set_uniform(location, [x, y, z, w])
    }

    pub fn set_uniform1f(&self, location: i32, x: f32) -> Result<()> {
        self.set_uniform(location, x)
    }

    pub fn set_uniform2f(&self, location: i32, x: f32, y: f32) -> Result<()> {
        self.set_uniform(location, [x, y])
    }

    pub fn set_uniform3f(&self, location: i32, x: f32, y: f32, z: f32) -> Result<()> {
        self.set_uniform(location, [x, y, z])
    }

    pub fn set_uniform4f(&self, location: i32, x: f32, y: f32, z: f32, w: f32) -> Result<()> {
        self.set_uniform(location, [x, y, z, w])
    }

    /// Write a float array uniform starting at `location`.
    pub fn set_uniform_floats(&self, location: i32, values: &[f32]) -> Result<()> {
        self.set_uniform(location, values.to_vec())
    }

    /// Write an int array uniform starting at `location`.
    pub fn set_uniform_ints(&self, location: i32, values: &[i32]) -> Result<()> {
        self.set_uniform(location, values.to_vec())
    }

    /// Write a column-major 2x2 matrix, or a row-major one when `transpose` is set.
    pub fn set_uniform_matrix2(&self, location: i32, m: &[f32; 4], transpose: bool) -> Result<()> {
        let m = if transpose { transposed(m, 2) } else { *m };
        self.set_uniform(location, UniformValue::Mat2(m))
    }

    pub fn set_uniform_matrix3(&self, location: i32, m: &[f32; 9], transpose: bool) -> Result<()> {
        let m = if transpose { transposed(m, 3) } else { *m };
        self.set_uniform(location, UniformValue::Mat3(m))
    }

    pub fn set_uniform_matrix4(&self, location: i32, m: &[f32; 16], transpose: bool) -> Result<()> {
        let m = if transpose { transposed(m, 4) } else { *m };
        self.set_uniform(location, UniformValue::Mat4(m))
    }
}

impl PartialEq for ProgramObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ProgramObject {}

impl std::fmt::Debug for ProgramObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramObject")
            .field("handle", &self.inner.handle.get())
            .field("disposed", &self.inner.disposed.get())
            .field("stages", &self.inner.stages.borrow().len())
            .finish()
    }
}
