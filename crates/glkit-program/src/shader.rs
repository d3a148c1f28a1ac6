//! References to compiled shader stages.
//!
//! Compilation happens elsewhere; a program only needs the native handle and a
//! way to compare stages for detach.

use glkit_driver::constants;

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
}

impl ShaderKind {
    /// The GL shader type enum.
    pub fn gl_enum(&self) -> u32 {
        match self {
            ShaderKind::Vertex => constants::VERTEX_SHADER,
            ShaderKind::Fragment => constants::FRAGMENT_SHADER,
            ShaderKind::Geometry => constants::GEOMETRY_SHADER,
            ShaderKind::TessControl => constants::TESS_CONTROL_SHADER,
            ShaderKind::TessEvaluation => constants::TESS_EVALUATION_SHADER,
            ShaderKind::Compute => constants::COMPUTE_SHADER,
        }
    }

    pub fn from_gl_enum(value: u32) -> Option<Self> {
        match value {
            constants::VERTEX_SHADER => Some(ShaderKind::Vertex),
            constants::FRAGMENT_SHADER => Some(ShaderKind::Fragment),
            constants::GEOMETRY_SHADER => Some(ShaderKind::Geometry),
            constants::TESS_CONTROL_SHADER => Some(ShaderKind::TessControl),
            constants::TESS_EVALUATION_SHADER => Some(ShaderKind::TessEvaluation),
            constants::COMPUTE_SHADER => Some(ShaderKind::Compute),
            _ => None,
        }
    }
}

/// A compiled shader stage, identified by its native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderStage {
    handle: u32,
    kind: ShaderKind,
}

impl ShaderStage {
    /// Wrap an already-compiled native shader.
    pub fn from_raw(handle: u32, kind: ShaderKind) -> Self {
        Self { handle, kind }
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gl_enum_round_trip() {
        for kind in [
            ShaderKind::Vertex,
            ShaderKind::Fragment,
            ShaderKind::Geometry,
            ShaderKind::TessControl,
            ShaderKind::TessEvaluation,
            ShaderKind::Compute,
        ] {
            assert_eq!(ShaderKind::from_gl_enum(kind.gl_enum()), Some(kind));
        }
        assert_eq!(ShaderKind::from_gl_enum(constants::FLOAT), None);
    }

    #[test]
    fn test_stage_equality_is_by_handle_and_kind() {
        let a = ShaderStage::from_raw(3, ShaderKind::Vertex);
        assert_eq!(a, ShaderStage::from_raw(3, ShaderKind::Vertex));
        assert_ne!(a, ShaderStage::from_raw(4, ShaderKind::Vertex));
    }
}
