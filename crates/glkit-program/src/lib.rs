//! # GLKit Program
//!
//! Lifecycle and introspection of linked GPU programs.
//!
//! ## Features
//!
//! - **GraphicsContext**: owns a driver, activates it before every call, and
//!   disposes live resources on teardown
//! - **ProgramObject**: attach/detach stages, link, validate, diagnostics
//! - **Reflection**: cached active uniform and attribute lists
//! - **Parameters**: uniform writes and block bindings under a scoped
//!   [`ProgramBinding`] that restores the previously current program
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use glkit_driver::{constants, ShaderInterface, SoftDriver};
//! use glkit_program::{GraphicsContext, ShaderKind, ShaderStage};
//!
//! let driver = Rc::new(SoftDriver::new());
//! let context = GraphicsContext::new(driver.clone());
//!
//! let vs = driver.create_shader(
//!     constants::VERTEX_SHADER,
//!     ShaderInterface::new().with_uniform("u_mvp", constants::FLOAT_MAT4),
//! );
//! let fs = driver.create_shader(constants::FRAGMENT_SHADER, ShaderInterface::new());
//!
//! let program = context.create_program()?;
//! program.attach(&ShaderStage::from_raw(vs, ShaderKind::Vertex))?;
//! program.attach(&ShaderStage::from_raw(fs, ShaderKind::Fragment))?;
//! program.link()?;
//! assert!(program.link_status()?);
//!
//! let mvp = program.uniform_location("u_mvp")?;
//! program.set_uniform_matrix4(mvp, &[0.0; 16], false)?;
//! # Ok::<(), glkit_program::GlKitError>(())
//! ```

mod binding;
mod context;
mod info_log;
mod program;
mod reflection;
mod registry;
mod shader;

pub use binding::ProgramBinding;
pub use context::GraphicsContext;
pub use program::ProgramObject;
pub use reflection::{ActiveVariable, ProgramAttribute, ProgramUniform};
pub use registry::{Disposable, DisposableId, DisposalRegistry};
pub use shader::{ShaderKind, ShaderStage};

pub use glkit_common::{ContextConfig, DriverFeature, GlKitError, InfoLogConfig, Result};
pub use glkit_driver::{Driver, UniformValue};
