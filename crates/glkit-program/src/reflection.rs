//! Active uniform and attribute reflection.
//!
//! Reflection is fetched lazily and cached per program. The cache is a tagged
//! state rather than an emptiness check, so a program with no active uniforms
//! is not re-queried on every read. Only `link` invalidates it.

use std::cell::RefCell;

use glkit_common::Result;
use glkit_driver::{constants, Driver};
use tracing::trace;

/// One active uniform or attribute as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    /// Element count; 1 for non-arrays.
    pub array_size: i32,
    /// GL type enum, passed through uninterpreted.
    pub driver_type: u32,
    /// Binding location, or -1 if the driver did not assign one.
    pub location: i32,
}

impl ActiveVariable {
    pub fn is_array(&self) -> bool {
        self.array_size > 1
    }
}

pub type ProgramUniform = ActiveVariable;
pub type ProgramAttribute = ActiveVariable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReflectionKind {
    Uniforms,
    Attributes,
}

impl ReflectionKind {
    fn count_and_max_length(&self) -> (u32, u32) {
        match self {
            ReflectionKind::Uniforms => (
                constants::ACTIVE_UNIFORMS,
                constants::ACTIVE_UNIFORM_MAX_LENGTH,
            ),
            ReflectionKind::Attributes => (
                constants::ACTIVE_ATTRIBUTES,
                constants::ACTIVE_ATTRIBUTE_MAX_LENGTH,
            ),
        }
    }
}

#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Empty,
    Populated(Vec<ActiveVariable>),
}

#[derive(Debug, Default)]
pub(crate) struct ReflectionCache {
    uniforms: RefCell<CacheState>,
    attributes: RefCell<CacheState>,
}

impl ReflectionCache {
    fn slot(&self, kind: ReflectionKind) -> &RefCell<CacheState> {
        match kind {
            ReflectionKind::Uniforms => &self.uniforms,
            ReflectionKind::Attributes => &self.attributes,
        }
    }

    /// Return a copy of the cached list, running `populate` first if empty.
    pub(crate) fn get_or_populate(
        &self,
        kind: ReflectionKind,
        populate: impl FnOnce() -> Result<Vec<ActiveVariable>>,
    ) -> Result<Vec<ActiveVariable>> {
        let slot = self.slot(kind);
        if let CacheState::Populated(list) = &*slot.borrow() {
            return Ok(list.clone());
        }
        let list = populate()?;
        *slot.borrow_mut() = CacheState::Populated(list.clone());
        Ok(list)
    }

    #[cfg(test)]
    pub(crate) fn is_populated(&self, kind: ReflectionKind) -> bool {
        matches!(*self.slot(kind).borrow(), CacheState::Populated(_))
    }

    pub(crate) fn invalidate(&self) {
        *self.uniforms.borrow_mut() = CacheState::Empty;
        *self.attributes.borrow_mut() = CacheState::Empty;
    }
}

/// Enumerate active variables in driver order.
pub(crate) fn fetch_active(
    driver: &dyn Driver,
    program: u32,
    kind: ReflectionKind,
) -> Vec<ActiveVariable> {
    let (count_pname, max_length_pname) = kind.count_and_max_length();
    let count = driver.get_program_iv(program, count_pname).max(0) as u32;
    let max_length = driver.get_program_iv(program, max_length_pname).max(0) as usize;

    let mut name_buf = vec![0u8; max_length + 1];
    let variables: Vec<ActiveVariable> = (0..count)
        .map(|index| {
            let info = match kind {
                ReflectionKind::Uniforms => driver.get_active_uniform(program, index, &mut name_buf),
                ReflectionKind::Attributes => driver.get_active_attrib(program, index, &mut name_buf),
            };
            let length = info.length.min(name_buf.len());
            let name = String::from_utf8_lossy(&name_buf[..length]).into_owned();
            let location = match kind {
                ReflectionKind::Uniforms => driver.get_uniform_location(program, &name),
                ReflectionKind::Attributes => driver.get_attrib_location(program, &name),
            };
            ActiveVariable {
                name,
                array_size: info.size.max(1),
                driver_type: info.type_,
                location,
            }
        })
        .collect();

    trace!(program, ?kind, count = variables.len(), "reflection populated");
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use glkit_driver::{ShaderInterface, SoftDriver};

    fn program(driver: &SoftDriver) -> u32 {
        let vs = driver.create_shader(
            constants::VERTEX_SHADER,
            ShaderInterface::new()
                .with_attribute("a_position", constants::FLOAT_VEC3)
                .with_attribute("a_color", constants::FLOAT_VEC4)
                .with_uniform("u_mvp", constants::FLOAT_MAT4),
        );
        let fs = driver.create_shader(
            constants::FRAGMENT_SHADER,
            ShaderInterface::new()
                .with_uniform("u_texture", constants::SAMPLER_2D)
                .with_uniform_array("u_weights", constants::FLOAT, 4),
        );
        let program = driver.create_program();
        driver.attach_shader(program, vs);
        driver.attach_shader(program, fs);
        driver.link_program(program);
        program
    }

    #[test]
    fn test_fetch_uniforms_in_driver_order() {
        let driver = SoftDriver::new();
        let program = program(&driver);

        let uniforms = fetch_active(&driver, program, ReflectionKind::Uniforms);
        let names: Vec<&str> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u_mvp", "u_texture", "u_weights"]);
        assert_eq!(uniforms[0].driver_type, constants::FLOAT_MAT4);
        assert_eq!(uniforms[2].array_size, 4);
        assert!(uniforms[2].is_array());
        assert!(uniforms.iter().all(|u| u.location >= 0));
    }

    #[test]
    fn test_fetch_attributes() {
        let driver = SoftDriver::new();
        let program = program(&driver);

        let attributes = fetch_active(&driver, program, ReflectionKind::Attributes);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[1].name, "a_color");
        assert_eq!(attributes[1].location, 1);
        assert!(!attributes[1].is_array());
    }

    #[test]
    fn test_fetch_on_unlinked_program_is_empty() {
        let driver = SoftDriver::new();
        let program = driver.create_program();
        assert!(fetch_active(&driver, program, ReflectionKind::Uniforms).is_empty());
        assert_eq!(driver.calls_named("glGetActiveUniform"), 0);
    }

    #[test]
    fn test_cache_populates_once() {
        let cache = ReflectionCache::default();
        let mut fetches = 0;
        for _ in 0..3 {
            let list = cache
                .get_or_populate(ReflectionKind::Uniforms, || {
                    fetches += 1;
                    Ok(Vec::new())
                })
                .unwrap();
            assert!(list.is_empty());
        }
        assert_eq!(fetches, 1);
        assert!(cache.is_populated(ReflectionKind::Uniforms));
        assert!(!cache.is_populated(ReflectionKind::Attributes));

        cache.invalidate();
        assert!(!cache.is_populated(ReflectionKind::Uniforms));
    }

    #[test]
    fn test_failed_population_leaves_cache_empty() {
        let cache = ReflectionCache::default();
        let result = cache.get_or_populate(ReflectionKind::Attributes, || {
            Err(glkit_common::GlKitError::context_unavailable("lost"))
        });
        assert!(result.is_err());
        assert!(!cache.is_populated(ReflectionKind::Attributes));
    }
}
