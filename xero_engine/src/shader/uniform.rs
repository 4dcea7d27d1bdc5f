/// User-visible uniform model: push-constant buffers, their members and
/// the flat resource declaration table

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};

/// Scalar component kind reported by reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int32,
    UInt32,
    Float32,
    Float64,
}

/// Type of a block member as reported by reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectedType {
    /// Single scalar
    Scalar(ScalarKind),
    /// Vector of `n` scalars
    Vector(ScalarKind, u32),
    /// Matrix of `columns` column vectors with `rows` components each
    Matrix {
        scalar: ScalarKind,
        columns: u32,
        rows: u32,
    },
    /// Arrays, nested structs, opaque types (described for diagnostics)
    Other(String),
}

/// Semantic type of a uniform member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderUniformType {
    Bool,
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    UVec2,
    UVec3,
    UVec4,
    Mat3,
    Mat4,
}

impl ShaderUniformType {
    /// Classify a reflected member type
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedType` for anything outside bool/int/uint/float
    /// scalars, 2-4 component int/uint/float vectors and float mat3/mat4.
    pub fn from_reflected(ty: &ReflectedType) -> Result<Self> {
        use ScalarKind::*;
        let uniform_type = match ty {
            ReflectedType::Scalar(Bool) => Self::Bool,
            ReflectedType::Scalar(Int32) => Self::Int,
            ReflectedType::Scalar(UInt32) => Self::UInt,
            ReflectedType::Scalar(Float32) => Self::Float,
            ReflectedType::Vector(Float32, 2) => Self::Vec2,
            ReflectedType::Vector(Float32, 3) => Self::Vec3,
            ReflectedType::Vector(Float32, 4) => Self::Vec4,
            ReflectedType::Vector(Int32, 2) => Self::IVec2,
            ReflectedType::Vector(Int32, 3) => Self::IVec3,
            ReflectedType::Vector(Int32, 4) => Self::IVec4,
            ReflectedType::Vector(UInt32, 2) => Self::UVec2,
            ReflectedType::Vector(UInt32, 3) => Self::UVec3,
            ReflectedType::Vector(UInt32, 4) => Self::UVec4,
            ReflectedType::Matrix { scalar: Float32, columns: 3, rows: 3 } => Self::Mat3,
            ReflectedType::Matrix { scalar: Float32, columns: 4, rows: 4 } => Self::Mat4,
            other => return Err(Error::UnsupportedType(format!("{:?}", other))),
        };
        Ok(uniform_type)
    }

    /// GLSL spelling of the type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::UVec2 => "uvec2",
            Self::UVec3 => "uvec3",
            Self::UVec4 => "uvec4",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
        }
    }
}

/// One member of a user-visible buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUniform {
    /// Qualified name, `block.member`
    pub name: String,
    pub uniform_type: ShaderUniformType,
    /// Size in bytes
    pub size: u32,
    /// Offset in bytes, relative to the start of the buffer's push-constant range
    pub offset: u32,
}

/// Named push-constant buffer exposed for runtime updates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBuffer {
    pub name: String,
    /// Visible size in bytes
    pub size: u32,
    /// Members keyed by qualified name
    pub uniforms: FxHashMap<String, ShaderUniform>,
}

/// Flat resource entry, independent of descriptor-set structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResourceDeclaration {
    pub name: String,
    /// Binding index
    pub register: u32,
    /// Number of descriptors (array size)
    pub count: u32,
}

#[cfg(test)]
#[path = "uniform_tests.rs"]
mod tests;
