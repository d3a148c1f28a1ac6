//! # GLKit Driver
//!
//! The graphics driver boundary used by GLKit program objects.
//!
//! ## Architecture
//!
//! [`Driver`] mirrors the subset of the OpenGL program API that program objects
//! need. Every call is synchronous and runs against whichever context is current
//! on the calling thread. Handles are plain GL names: `0` means "no object", and
//! `-1` is the "not found" location/index.
//!
//! [`SoftDriver`] is an in-memory implementation that behaves like a GL 4.3 core
//! context. It records every call it receives, which makes it the test double for
//! the higher-level crates.

pub mod soft;

pub use glkit_common::DriverFeature;
pub use soft::{BlockDecl, DriverFeatures, ShaderInterface, SoftDriver, VariableDecl};

// ==================== Constants ====================

/// GL constants used at the program boundary (values match the GL headers).
pub mod constants {
    // Shader types
    pub const FRAGMENT_SHADER: u32 = 0x8B30;
    pub const VERTEX_SHADER: u32 = 0x8B31;
    pub const GEOMETRY_SHADER: u32 = 0x8DD9;
    pub const TESS_EVALUATION_SHADER: u32 = 0x8E87;
    pub const TESS_CONTROL_SHADER: u32 = 0x8E88;
    pub const COMPUTE_SHADER: u32 = 0x91B9;

    // Program parameters
    pub const DELETE_STATUS: u32 = 0x8B80;
    pub const LINK_STATUS: u32 = 0x8B82;
    pub const VALIDATE_STATUS: u32 = 0x8B83;
    pub const INFO_LOG_LENGTH: u32 = 0x8B84;
    pub const ATTACHED_SHADERS: u32 = 0x8B85;
    pub const ACTIVE_UNIFORMS: u32 = 0x8B86;
    pub const ACTIVE_UNIFORM_MAX_LENGTH: u32 = 0x8B87;
    pub const ACTIVE_ATTRIBUTES: u32 = 0x8B89;
    pub const ACTIVE_ATTRIBUTE_MAX_LENGTH: u32 = 0x8B8A;
    pub const ACTIVE_UNIFORM_BLOCKS: u32 = 0x8A36;
    pub const CURRENT_PROGRAM: u32 = 0x8B8D;

    // Uniform block parameters
    pub const UNIFORM_BLOCK_BINDING: u32 = 0x8A3F;
    pub const UNIFORM_BLOCK_DATA_SIZE: u32 = 0x8A40;

    // Program interfaces
    pub const SHADER_STORAGE_BLOCK: u32 = 0x92E6;

    // Data types
    pub const INT: u32 = 0x1404;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;
    pub const FLOAT_VEC2: u32 = 0x8B50;
    pub const FLOAT_VEC3: u32 = 0x8B51;
    pub const FLOAT_VEC4: u32 = 0x8B52;
    pub const INT_VEC2: u32 = 0x8B53;
    pub const INT_VEC3: u32 = 0x8B54;
    pub const INT_VEC4: u32 = 0x8B55;
    pub const BOOL: u32 = 0x8B56;
    pub const FLOAT_MAT2: u32 = 0x8B5A;
    pub const FLOAT_MAT3: u32 = 0x8B5B;
    pub const FLOAT_MAT4: u32 = 0x8B5C;
    pub const SAMPLER_2D: u32 = 0x8B5E;
    pub const SAMPLER_CUBE: u32 = 0x8B60;

    // Error codes
    pub const NO_ERROR: u32 = 0;
    pub const INVALID_ENUM: u32 = 0x0500;
    pub const INVALID_VALUE: u32 = 0x0501;
    pub const INVALID_OPERATION: u32 = 0x0502;

    /// `GL_INVALID_INDEX`, reported through the `i32` API as `-1`.
    pub const INVALID_INDEX: u32 = 0xFFFF_FFFF;
}

// ==================== Values ====================

/// Metadata returned for one active uniform or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveInfo {
    /// Number of name bytes written, excluding the terminator.
    pub length: usize,
    /// Array size (1 for scalars).
    pub size: i32,
    /// GL type enum.
    pub type_: u32,
}

/// Uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    /// Column-major 2x2 matrix.
    Mat2([f32; 4]),
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
}

macro_rules! impl_uniform_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_uniform_from! {
    f32 => Float,
    [f32; 2] => Vec2,
    [f32; 3] => Vec3,
    [f32; 4] => Vec4,
    i32 => Int,
    [i32; 2] => IVec2,
    [i32; 3] => IVec3,
    [i32; 4] => IVec4,
    u32 => UInt,
    Vec<f32> => FloatArray,
    Vec<i32> => IntArray,
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Int(value as i32)
    }
}

// ==================== Driver ====================

/// Synchronous calls into the graphics driver.
///
/// Implementations wrap one native context. Methods take `&self` because the
/// driver owns its state; callers serialize access by keeping the context on a
/// single thread.
pub trait Driver {
    /// Whether this driver's context is current on the calling thread.
    fn is_current(&self) -> bool;

    /// Make this driver's context current. Returns `false` if that is impossible,
    /// e.g. because the native context was destroyed.
    fn make_current(&self) -> bool;

    /// Whether an optional entry point is available.
    fn supports(&self, feature: DriverFeature) -> bool;

    /// `glCreateProgram`. Returns 0 on failure.
    fn create_program(&self) -> u32;

    /// `glDeleteProgram`.
    fn delete_program(&self, program: u32);

    /// `glAttachShader`.
    fn attach_shader(&self, program: u32, shader: u32);

    /// `glDetachShader`.
    fn detach_shader(&self, program: u32, shader: u32);

    /// `glLinkProgram`.
    fn link_program(&self, program: u32);

    /// `glValidateProgram`.
    fn validate_program(&self, program: u32);

    /// `glGetProgramiv`.
    fn get_program_iv(&self, program: u32, pname: u32) -> i32;

    /// `glGetProgramInfoLog`. Writes at most `buf.len() - 1` bytes followed by a
    /// terminator and returns the number of bytes written before the terminator.
    fn get_program_info_log(&self, program: u32, buf: &mut [u8]) -> usize;

    /// `glGetActiveUniform`. The name is written into `name` like the info log.
    fn get_active_uniform(&self, program: u32, index: u32, name: &mut [u8]) -> ActiveInfo;

    /// `glGetActiveAttrib`.
    fn get_active_attrib(&self, program: u32, index: u32, name: &mut [u8]) -> ActiveInfo;

    /// `glGetUniformLocation`.
    fn get_uniform_location(&self, program: u32, name: &str) -> i32;

    /// `glGetAttribLocation`.
    fn get_attrib_location(&self, program: u32, name: &str) -> i32;

    /// `glGetUniformBlockIndex`, with `GL_INVALID_INDEX` reported as `-1`.
    fn get_uniform_block_index(&self, program: u32, name: &str) -> i32;

    /// `glGetActiveUniformBlockiv`.
    fn get_active_uniform_block_iv(&self, program: u32, block_index: u32, pname: u32) -> i32;

    /// `glGetProgramResourceIndex`, with `GL_INVALID_INDEX` reported as `-1`.
    fn get_program_resource_index(&self, program: u32, interface: u32, name: &str) -> i32;

    /// `glBindAttribLocation`.
    fn bind_attrib_location(&self, program: u32, index: u32, name: &str);

    /// `glBindFragDataLocation`.
    fn bind_frag_data_location(&self, program: u32, color_number: u32, name: &str);

    /// `glUniformBlockBinding`.
    fn uniform_block_binding(&self, program: u32, block_index: u32, binding: u32);

    /// `glShaderStorageBlockBinding`.
    fn shader_storage_block_binding(&self, program: u32, block_index: u32, binding: u32);

    /// `glGetIntegerv(GL_CURRENT_PROGRAM)`.
    fn current_program(&self) -> u32;

    /// `glUseProgram`.
    fn use_program(&self, program: u32);

    /// `glUniform*` / `glUniformMatrix*` against the current program.
    fn set_uniform(&self, location: i32, value: &UniformValue);
}
