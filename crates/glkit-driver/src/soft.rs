//! In-memory reference driver.
//!
//! Emulates the program-object half of a GL 4.3 core context: shaders carry a
//! declared interface instead of source, linking merges the interfaces of the
//! attached stages, and uniform writes land in per-program storage. Every
//! [`Driver`] call is appended to a call log so tests can assert on exactly
//! which driver calls were issued.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::trace;

use crate::{constants, ActiveInfo, Driver, DriverFeature, UniformValue};

// ==================== Shader Interface ====================

/// A uniform or attribute declared by a shader stage.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub size: i32,
    pub type_: u32,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, type_: u32) -> Self {
        Self::array(name, type_, 1)
    }

    pub fn array(name: impl Into<String>, type_: u32, size: i32) -> Self {
        Self {
            name: name.into(),
            size: size.max(1),
            type_,
        }
    }
}

/// A uniform or storage block declared by a shader stage.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDecl {
    pub name: String,
    pub data_size: i32,
}

/// What a "compiled" soft shader exposes to the linker.
#[derive(Debug, Clone, Default)]
pub struct ShaderInterface {
    pub attributes: Vec<VariableDecl>,
    pub uniforms: Vec<VariableDecl>,
    pub uniform_blocks: Vec<BlockDecl>,
    pub storage_blocks: Vec<BlockDecl>,
}

impl ShaderInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, type_: u32) -> Self {
        self.attributes.push(VariableDecl::new(name, type_));
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>, type_: u32) -> Self {
        self.uniforms.push(VariableDecl::new(name, type_));
        self
    }

    pub fn with_uniform_array(mut self, name: impl Into<String>, type_: u32, size: i32) -> Self {
        self.uniforms.push(VariableDecl::array(name, type_, size));
        self
    }

    pub fn with_uniform_block(mut self, name: impl Into<String>, data_size: i32) -> Self {
        self.uniform_blocks.push(BlockDecl {
            name: name.into(),
            data_size,
        });
        self
    }

    pub fn with_storage_block(mut self, name: impl Into<String>, data_size: i32) -> Self {
        self.storage_blocks.push(BlockDecl {
            name: name.into(),
            data_size,
        });
        self
    }
}

/// Optional entry points exposed by a [`SoftDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverFeatures {
    pub uniform_blocks: bool,
    pub storage_blocks: bool,
    pub frag_data_location: bool,
}

impl DriverFeatures {
    /// GL 4.3 core: everything available.
    pub fn all() -> Self {
        Self {
            uniform_blocks: true,
            storage_blocks: true,
            frag_data_location: true,
        }
    }

    /// GL 3.0: no uniform or storage blocks.
    pub fn gl30() -> Self {
        Self {
            uniform_blocks: false,
            storage_blocks: false,
            frag_data_location: true,
        }
    }

    /// GLES 2.0 / WebGL 1: none of the optional entry points.
    pub fn gles2() -> Self {
        Self {
            uniform_blocks: false,
            storage_blocks: false,
            frag_data_location: false,
        }
    }
}

impl Default for DriverFeatures {
    fn default() -> Self {
        Self::all()
    }
}

// ==================== Objects ====================

#[derive(Debug)]
struct ShaderData {
    kind: u32,
    interface: ShaderInterface,
}

#[derive(Debug, Clone)]
struct LinkedVariable {
    decl: VariableDecl,
    location: i32,
}

#[derive(Debug, Clone)]
struct LinkedBlock {
    decl: BlockDecl,
    binding: u32,
}

#[derive(Debug, Default)]
struct ProgramData {
    attached: Vec<u32>,
    linked: bool,
    validated: bool,
    deleted: bool,
    info_log: String,
    attrib_bindings: HashMap<String, u32>,
    frag_data_bindings: HashMap<String, u32>,
    attributes: Vec<LinkedVariable>,
    uniforms: Vec<LinkedVariable>,
    uniform_blocks: Vec<LinkedBlock>,
    storage_blocks: Vec<LinkedBlock>,
    uniform_values: HashMap<i32, UniformValue>,
}

impl ProgramData {
    fn clear_interface(&mut self) {
        self.attributes.clear();
        self.uniforms.clear();
        self.uniform_blocks.clear();
        self.storage_blocks.clear();
        self.uniform_values.clear();
    }

    fn find_uniform_location(&self, name: &str) -> i32 {
        if let Some(var) = self.uniforms.iter().find(|v| v.decl.name == name) {
            return var.location;
        }
        // `name[i]` addresses one element of an array uniform.
        let Some((base, rest)) = name.split_once('[') else {
            return -1;
        };
        let Some(index) = rest.strip_suffix(']').and_then(|i| i.parse::<i32>().ok()) else {
            return -1;
        };
        self.uniforms
            .iter()
            .find(|v| v.decl.name == base && index < v.decl.size)
            .map_or(-1, |v| v.location + index)
    }
}

#[derive(Debug)]
struct SoftState {
    next_object: u32,
    shaders: HashMap<u32, ShaderData>,
    programs: HashMap<u32, ProgramData>,
    current_program: u32,
    last_error: u32,
}

impl Default for SoftState {
    fn default() -> Self {
        Self {
            next_object: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: 0,
            last_error: constants::NO_ERROR,
        }
    }
}

impl SoftState {
    fn alloc(&mut self) -> u32 {
        let id = self.next_object;
        self.next_object += 1;
        id
    }

    fn program(&mut self, program: u32) -> Option<&mut ProgramData> {
        match self.programs.get_mut(&program) {
            Some(data) if !data.deleted => Some(data),
            _ => {
                self.last_error = constants::INVALID_VALUE;
                None
            }
        }
    }

    fn link(&mut self, program: u32) {
        let Some(data) = self.programs.get(&program).filter(|d| !d.deleted) else {
            self.last_error = constants::INVALID_VALUE;
            return;
        };

        let stages: Vec<&ShaderData> = data
            .attached
            .iter()
            .filter_map(|s| self.shaders.get(s))
            .collect();
        let has = |kind: u32| stages.iter().any(|s| s.kind == kind);

        let failure = if stages.is_empty() {
            Some("error: no shaders attached to program")
        } else if has(constants::COMPUTE_SHADER) && stages.len() > 1 {
            Some("error: compute shader cannot be linked with other stages")
        } else if !has(constants::COMPUTE_SHADER) && !has(constants::VERTEX_SHADER) {
            Some("error: program has no vertex shader attached")
        } else if !has(constants::COMPUTE_SHADER) && !has(constants::FRAGMENT_SHADER) {
            Some("error: program has no fragment shader attached")
        } else {
            None
        };

        let mut attributes = Vec::new();
        let mut uniforms: Vec<LinkedVariable> = Vec::new();
        let mut uniform_blocks: Vec<LinkedBlock> = Vec::new();
        let mut storage_blocks: Vec<LinkedBlock> = Vec::new();

        if failure.is_none() {
            let mut used: Vec<i32> = data.attrib_bindings.values().map(|&l| l as i32).collect();
            let mut next_free = 0;
            for stage in stages.iter().filter(|s| s.kind == constants::VERTEX_SHADER) {
                for decl in &stage.interface.attributes {
                    let location = match data.attrib_bindings.get(&decl.name) {
                        Some(&bound) => bound as i32,
                        None => {
                            while used.contains(&next_free) {
                                next_free += 1;
                            }
                            used.push(next_free);
                            next_free
                        }
                    };
                    attributes.push(LinkedVariable {
                        decl: decl.clone(),
                        location,
                    });
                }
            }

            let mut next_location = 0;
            for stage in &stages {
                for decl in &stage.interface.uniforms {
                    if uniforms.iter().any(|u| u.decl.name == decl.name) {
                        continue;
                    }
                    uniforms.push(LinkedVariable {
                        decl: decl.clone(),
                        location: next_location,
                    });
                    next_location += decl.size;
                }
                for decl in &stage.interface.uniform_blocks {
                    if !uniform_blocks.iter().any(|b| b.decl.name == decl.name) {
                        uniform_blocks.push(LinkedBlock {
                            decl: decl.clone(),
                            binding: 0,
                        });
                    }
                }
                for decl in &stage.interface.storage_blocks {
                    if !storage_blocks.iter().any(|b| b.decl.name == decl.name) {
                        storage_blocks.push(LinkedBlock {
                            decl: decl.clone(),
                            binding: 0,
                        });
                    }
                }
            }
        }

        let Some(data) = self.programs.get_mut(&program) else {
            return;
        };
        data.clear_interface();
        data.validated = false;
        match failure {
            Some(message) => {
                data.linked = false;
                data.info_log = message.to_string();
            }
            None => {
                data.linked = true;
                data.info_log.clear();
                data.attributes = attributes;
                data.uniforms = uniforms;
                data.uniform_blocks = uniform_blocks;
                data.storage_blocks = storage_blocks;
            }
        }
    }
}

/// Copy `text` into a GL-style output buffer.
fn write_gl_string(text: &str, buf: &mut [u8]) -> usize {
    if buf.is_empty() {
        return 0;
    }
    let n = text.len().min(buf.len() - 1);
    buf[..n].copy_from_slice(&text.as_bytes()[..n]);
    buf[n] = 0;
    n
}

fn gl_bool(value: bool) -> i32 {
    if value {
        1
    } else {
        0
    }
}

fn max_name_length(vars: &[LinkedVariable]) -> i32 {
    vars.iter()
        .map(|v| v.decl.name.len() as i32 + 1)
        .max()
        .unwrap_or(0)
}

// ==================== Soft Driver ====================

/// In-memory GL driver.
#[derive(Debug)]
pub struct SoftDriver {
    state: RefCell<SoftState>,
    calls: RefCell<Vec<&'static str>>,
    features: DriverFeatures,
    current: Cell<bool>,
    lost: Cell<bool>,
    fail_allocations: Cell<bool>,
}

impl Default for SoftDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftDriver {
    /// Create a driver with every optional entry point available.
    pub fn new() -> Self {
        Self::with_features(DriverFeatures::all())
    }

    /// Create a driver exposing only the given optional entry points.
    pub fn with_features(features: DriverFeatures) -> Self {
        Self {
            state: RefCell::new(SoftState::default()),
            calls: RefCell::new(Vec::new()),
            features,
            current: Cell::new(false),
            lost: Cell::new(false),
            fail_allocations: Cell::new(false),
        }
    }

    fn record(&self, call: &'static str) {
        trace!(call, "soft driver call");
        self.calls.borrow_mut().push(call);
    }

    // ==================== Test Controls ====================

    /// Create a compiled shader exposing `interface`.
    pub fn create_shader(&self, kind: u32, interface: ShaderInterface) -> u32 {
        let mut state = self.state.borrow_mut();
        let shader = state.alloc();
        state.shaders.insert(shader, ShaderData { kind, interface });
        shader
    }

    /// Replace the info log of a program.
    pub fn set_program_info_log(&self, program: u32, log: impl Into<String>) {
        if let Some(data) = self.state.borrow_mut().programs.get_mut(&program) {
            data.info_log = log.into();
        }
    }

    /// Destroy the native context; `make_current` fails from now on.
    pub fn lose_context(&self) {
        self.lost.set(true);
        self.current.set(false);
    }

    /// Make another context current on this thread.
    pub fn release_current(&self) {
        self.current.set(false);
    }

    /// Make `glCreateProgram` return 0.
    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    // ==================== Inspection ====================

    /// All recorded calls in issue order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls to `name` (e.g. `"glLinkProgram"`).
    pub fn calls_named(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|&&c| c == name).count()
    }

    /// Total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Get and clear the error.
    pub fn get_error(&self) -> u32 {
        std::mem::replace(&mut self.state.borrow_mut().last_error, constants::NO_ERROR)
    }

    /// Whether `program` names a live (not deleted) program.
    pub fn is_program(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|d| !d.deleted)
    }

    /// Number of live programs.
    pub fn live_programs(&self) -> usize {
        self.state
            .borrow()
            .programs
            .values()
            .filter(|d| !d.deleted)
            .count()
    }

    /// Shaders attached to `program`, in attach order.
    pub fn attached_shaders(&self, program: u32) -> Vec<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|d| d.attached.clone())
            .unwrap_or_default()
    }

    /// Value last written to `location` of `program`.
    pub fn uniform_value(&self, program: u32, location: i32) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|d| d.uniform_values.get(&location).cloned())
    }

    /// Binding point of the named uniform block.
    pub fn uniform_block_binding_of(&self, program: u32, block: &str) -> Option<u32> {
        self.state.borrow().programs.get(&program).and_then(|d| {
            d.uniform_blocks
                .iter()
                .find(|b| b.decl.name == block)
                .map(|b| b.binding)
        })
    }

    /// Binding point of the named storage block.
    pub fn storage_block_binding_of(&self, program: u32, block: &str) -> Option<u32> {
        self.state.borrow().programs.get(&program).and_then(|d| {
            d.storage_blocks
                .iter()
                .find(|b| b.decl.name == block)
                .map(|b| b.binding)
        })
    }

    /// Fragment output bound to `name` before the last link.
    pub fn frag_data_binding_of(&self, program: u32, name: &str) -> Option<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|d| d.frag_data_bindings.get(name).copied())
    }
}

impl Driver for SoftDriver {
    fn is_current(&self) -> bool {
        self.current.get()
    }

    fn make_current(&self) -> bool {
        self.record("makeCurrent");
        if self.lost.get() {
            return false;
        }
        self.current.set(true);
        true
    }

    fn supports(&self, feature: DriverFeature) -> bool {
        match feature {
            DriverFeature::UniformBlocks => self.features.uniform_blocks,
            DriverFeature::StorageBlocks => self.features.storage_blocks,
            DriverFeature::FragDataLocation => self.features.frag_data_location,
        }
    }

    fn create_program(&self) -> u32 {
        self.record("glCreateProgram");
        if self.fail_allocations.get() {
            return 0;
        }
        let mut state = self.state.borrow_mut();
        let program = state.alloc();
        state.programs.insert(program, ProgramData::default());
        program
    }

    fn delete_program(&self, program: u32) {
        self.record("glDeleteProgram");
        if program == 0 {
            return;
        }
        let mut state = self.state.borrow_mut();
        if state.current_program == program {
            // Deletion is deferred until the program is no longer in use.
            if let Some(data) = state.programs.get_mut(&program) {
                data.deleted = true;
            }
        } else if state.programs.remove(&program).is_none() {
            state.last_error = constants::INVALID_VALUE;
        }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record("glAttachShader");
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.last_error = constants::INVALID_VALUE;
            return;
        }
        let Some(data) = state.program(program) else {
            return;
        };
        if data.attached.contains(&shader) {
            state.last_error = constants::INVALID_OPERATION;
            return;
        }
        data.attached.push(shader);
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.record("glDetachShader");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return;
        };
        match data.attached.iter().position(|&s| s == shader) {
            Some(index) => {
                data.attached.remove(index);
            }
            None => state.last_error = constants::INVALID_OPERATION,
        }
    }

    fn link_program(&self, program: u32) {
        self.record("glLinkProgram");
        self.state.borrow_mut().link(program);
    }

    fn validate_program(&self, program: u32) {
        self.record("glValidateProgram");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return;
        };
        data.validated = data.linked;
        if !data.linked {
            data.info_log = "validation failed: program is not linked".to_string();
        }
    }

    fn get_program_iv(&self, program: u32, pname: u32) -> i32 {
        self.record("glGetProgramiv");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return 0;
        };
        let value = match pname {
            constants::LINK_STATUS => gl_bool(data.linked),
            constants::VALIDATE_STATUS => gl_bool(data.validated),
            constants::DELETE_STATUS => gl_bool(data.deleted),
            constants::INFO_LOG_LENGTH if data.info_log.is_empty() => 0,
            constants::INFO_LOG_LENGTH => data.info_log.len() as i32 + 1,
            constants::ATTACHED_SHADERS => data.attached.len() as i32,
            constants::ACTIVE_UNIFORMS => data.uniforms.len() as i32,
            constants::ACTIVE_UNIFORM_MAX_LENGTH => max_name_length(&data.uniforms),
            constants::ACTIVE_ATTRIBUTES => data.attributes.len() as i32,
            constants::ACTIVE_ATTRIBUTE_MAX_LENGTH => max_name_length(&data.attributes),
            constants::ACTIVE_UNIFORM_BLOCKS => data.uniform_blocks.len() as i32,
            _ => {
                state.last_error = constants::INVALID_ENUM;
                0
            }
        };
        value
    }

    fn get_program_info_log(&self, program: u32, buf: &mut [u8]) -> usize {
        self.record("glGetProgramInfoLog");
        let mut state = self.state.borrow_mut();
        match state.program(program) {
            Some(data) => write_gl_string(&data.info_log, buf),
            None => 0,
        }
    }

    fn get_active_uniform(&self, program: u32, index: u32, name: &mut [u8]) -> ActiveInfo {
        self.record("glGetActiveUniform");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return ActiveInfo::default();
        };
        match data.uniforms.get(index as usize) {
            Some(var) => ActiveInfo {
                length: write_gl_string(&var.decl.name, name),
                size: var.decl.size,
                type_: var.decl.type_,
            },
            None => {
                state.last_error = constants::INVALID_VALUE;
                ActiveInfo::default()
            }
        }
    }

    fn get_active_attrib(&self, program: u32, index: u32, name: &mut [u8]) -> ActiveInfo {
        self.record("glGetActiveAttrib");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return ActiveInfo::default();
        };
        match data.attributes.get(index as usize) {
            Some(var) => ActiveInfo {
                length: write_gl_string(&var.decl.name, name),
                size: var.decl.size,
                type_: var.decl.type_,
            },
            None => {
                state.last_error = constants::INVALID_VALUE;
                ActiveInfo::default()
            }
        }
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> i32 {
        self.record("glGetUniformLocation");
        let mut state = self.state.borrow_mut();
        match state.program(program) {
            Some(data) if data.linked => data.find_uniform_location(name),
            Some(_) => {
                state.last_error = constants::INVALID_OPERATION;
                -1
            }
            None => -1,
        }
    }

    fn get_attrib_location(&self, program: u32, name: &str) -> i32 {
        self.record("glGetAttribLocation");
        let mut state = self.state.borrow_mut();
        match state.program(program) {
            Some(data) if data.linked => data
                .attributes
                .iter()
                .find(|a| a.decl.name == name)
                .map_or(-1, |a| a.location),
            Some(_) => {
                state.last_error = constants::INVALID_OPERATION;
                -1
            }
            None => -1,
        }
    }

    fn get_uniform_block_index(&self, program: u32, name: &str) -> i32 {
        self.record("glGetUniformBlockIndex");
        let mut state = self.state.borrow_mut();
        state
            .program(program)
            .and_then(|d| d.uniform_blocks.iter().position(|b| b.decl.name == name))
            .map_or(constants::INVALID_INDEX as i32, |i| i as i32)
    }

    fn get_active_uniform_block_iv(&self, program: u32, block_index: u32, pname: u32) -> i32 {
        self.record("glGetActiveUniformBlockiv");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return 0;
        };
        let Some(block) = data.uniform_blocks.get(block_index as usize) else {
            state.last_error = constants::INVALID_VALUE;
            return 0;
        };
        match pname {
            constants::UNIFORM_BLOCK_DATA_SIZE => block.decl.data_size,
            constants::UNIFORM_BLOCK_BINDING => block.binding as i32,
            _ => {
                state.last_error = constants::INVALID_ENUM;
                0
            }
        }
    }

    fn get_program_resource_index(&self, program: u32, interface: u32, name: &str) -> i32 {
        self.record("glGetProgramResourceIndex");
        let mut state = self.state.borrow_mut();
        if interface != constants::SHADER_STORAGE_BLOCK {
            state.last_error = constants::INVALID_ENUM;
            return constants::INVALID_INDEX as i32;
        }
        state
            .program(program)
            .and_then(|d| d.storage_blocks.iter().position(|b| b.decl.name == name))
            .map_or(constants::INVALID_INDEX as i32, |i| i as i32)
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        self.record("glBindAttribLocation");
        let mut state = self.state.borrow_mut();
        if let Some(data) = state.program(program) {
            data.attrib_bindings.insert(name.to_string(), index);
        }
    }

    fn bind_frag_data_location(&self, program: u32, color_number: u32, name: &str) {
        self.record("glBindFragDataLocation");
        let mut state = self.state.borrow_mut();
        if let Some(data) = state.program(program) {
            data.frag_data_bindings.insert(name.to_string(), color_number);
        }
    }

    fn uniform_block_binding(&self, program: u32, block_index: u32, binding: u32) {
        self.record("glUniformBlockBinding");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return;
        };
        match data.uniform_blocks.get_mut(block_index as usize) {
            Some(block) => block.binding = binding,
            None => state.last_error = constants::INVALID_VALUE,
        }
    }

    fn shader_storage_block_binding(&self, program: u32, block_index: u32, binding: u32) {
        self.record("glShaderStorageBlockBinding");
        let mut state = self.state.borrow_mut();
        let Some(data) = state.program(program) else {
            return;
        };
        match data.storage_blocks.get_mut(block_index as usize) {
            Some(block) => block.binding = binding,
            None => state.last_error = constants::INVALID_VALUE,
        }
    }

    fn current_program(&self) -> u32 {
        self.record("glGetIntegerv(GL_CURRENT_PROGRAM)");
        self.state.borrow().current_program
    }

    fn use_program(&self, program: u32) {
        self.record("glUseProgram");
        let mut state = self.state.borrow_mut();
        if program != 0 {
            match state.programs.get(&program) {
                Some(data) if !data.deleted && data.linked => {}
                Some(_) => {
                    state.last_error = constants::INVALID_OPERATION;
                    return;
                }
                None => {
                    state.last_error = constants::INVALID_VALUE;
                    return;
                }
            }
        }
        let previous = std::mem::replace(&mut state.current_program, program);
        if previous != program
            && state
                .programs
                .get(&previous)
                .is_some_and(|d| d.deleted)
        {
            state.programs.remove(&previous);
        }
    }

    fn set_uniform(&self, location: i32, value: &UniformValue) {
        self.record("glUniform");
        let mut state = self.state.borrow_mut();
        let current = state.current_program;
        if current == 0 {
            state.last_error = constants::INVALID_OPERATION;
            return;
        }
        if location == -1 {
            return;
        }
        if let Some(data) = state.programs.get_mut(&current) {
            data.uniform_values.insert(location, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked_program(driver: &SoftDriver) -> u32 {
        let vs = driver.create_shader(
            constants::VERTEX_SHADER,
            ShaderInterface::new()
                .with_attribute("a_position", constants::FLOAT_VEC2)
                .with_attribute("a_uv", constants::FLOAT_VEC2)
                .with_uniform("u_mvp", constants::FLOAT_MAT4),
        );
        let fs = driver.create_shader(
            constants::FRAGMENT_SHADER,
            ShaderInterface::new()
                .with_uniform("u_mvp", constants::FLOAT_MAT4)
                .with_uniform_array("u_colors", constants::FLOAT_VEC4, 3)
                .with_uniform_block("Lights", 256),
        );
        let program = driver.create_program();
        driver.attach_shader(program, vs);
        driver.attach_shader(program, fs);
        driver.link_program(program);
        program
    }

    #[test]
    fn test_link_merges_interfaces() {
        let driver = SoftDriver::new();
        let program = linked_program(&driver);

        assert_eq!(driver.get_program_iv(program, constants::LINK_STATUS), 1);
        assert_eq!(driver.get_program_iv(program, constants::ACTIVE_ATTRIBUTES), 2);
        // u_mvp is shared between stages and reported once.
        assert_eq!(driver.get_program_iv(program, constants::ACTIVE_UNIFORMS), 2);
        assert_eq!(
            driver.get_program_iv(program, constants::ACTIVE_UNIFORM_MAX_LENGTH),
            "u_colors".len() as i32 + 1
        );
        assert_eq!(driver.get_error(), constants::NO_ERROR);
    }

    #[test]
    fn test_link_without_fragment_stage_fails() {
        let driver = SoftDriver::new();
        let vs = driver.create_shader(constants::VERTEX_SHADER, ShaderInterface::new());
        let program = driver.create_program();
        driver.attach_shader(program, vs);
        driver.link_program(program);

        assert_eq!(driver.get_program_iv(program, constants::LINK_STATUS), 0);
        assert!(driver.get_program_iv(program, constants::INFO_LOG_LENGTH) > 0);
    }

    #[test]
    fn test_array_uniform_element_locations() {
        let driver = SoftDriver::new();
        let program = linked_program(&driver);

        let base = driver.get_uniform_location(program, "u_colors");
        assert_eq!(driver.get_uniform_location(program, "u_colors[2]"), base + 2);
        assert_eq!(driver.get_uniform_location(program, "u_colors[3]"), -1);
        assert_eq!(driver.get_uniform_location(program, "missing"), -1);
    }

    #[test]
    fn test_bound_attribute_location_survives_link() {
        let driver = SoftDriver::new();
        let vs = driver.create_shader(
            constants::VERTEX_SHADER,
            ShaderInterface::new()
                .with_attribute("a_position", constants::FLOAT_VEC3)
                .with_attribute("a_normal", constants::FLOAT_VEC3),
        );
        let fs = driver.create_shader(constants::FRAGMENT_SHADER, ShaderInterface::new());
        let program = driver.create_program();
        driver.attach_shader(program, vs);
        driver.attach_shader(program, fs);
        driver.bind_attrib_location(program, 0, "a_normal");
        driver.link_program(program);

        assert_eq!(driver.get_attrib_location(program, "a_normal"), 0);
        assert_eq!(driver.get_attrib_location(program, "a_position"), 1);
    }

    #[test]
    fn test_info_log_truncates_to_buffer() {
        let driver = SoftDriver::new();
        let program = driver.create_program();
        driver.set_program_info_log(program, "0123456789");

        let mut small = [0u8; 4];
        assert_eq!(driver.get_program_info_log(program, &mut small), 3);
        assert_eq!(&small, b"012\0");

        let mut large = [0u8; 32];
        assert_eq!(driver.get_program_info_log(program, &mut large), 10);
    }

    #[test]
    fn test_uniform_write_requires_current_program() {
        let driver = SoftDriver::new();
        let program = linked_program(&driver);
        let location = driver.get_uniform_location(program, "u_mvp");

        driver.set_uniform(location, &UniformValue::Float(1.0));
        assert_eq!(driver.get_error(), constants::INVALID_OPERATION);

        driver.use_program(program);
        driver.set_uniform(location, &UniformValue::Float(1.0));
        assert_eq!(
            driver.uniform_value(program, location),
            Some(UniformValue::Float(1.0))
        );
    }

    #[test]
    fn test_delete_current_program_is_deferred() {
        let driver = SoftDriver::new();
        let program = linked_program(&driver);
        driver.use_program(program);
        driver.delete_program(program);

        assert!(!driver.is_program(program));
        assert_eq!(driver.current_program(), program);

        driver.use_program(0);
        assert_eq!(driver.live_programs(), 0);
    }

    #[test]
    fn test_call_log() {
        let driver = SoftDriver::new();
        let program = driver.create_program();
        driver.link_program(program);
        driver.link_program(program);

        assert_eq!(driver.calls_named("glLinkProgram"), 2);
        assert_eq!(driver.calls(), vec!["glCreateProgram", "glLinkProgram", "glLinkProgram"]);
        driver.clear_calls();
        assert_eq!(driver.call_count(), 0);
    }

    #[test]
    fn test_lost_context_refuses_activation() {
        let driver = SoftDriver::new();
        assert!(driver.make_current());
        assert!(driver.is_current());

        driver.lose_context();
        assert!(!driver.is_current());
        assert!(!driver.make_current());
    }
}
