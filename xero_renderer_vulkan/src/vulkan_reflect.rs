/// SpirqReflector - StageReflector over SPIR-V using spirq
///
/// Every resource declared by the module is reported, referenced or not,
/// so descriptor layouts stay identical across stages that only share the
/// declaration.

use xero_engine::xero::{Error, Result};
use xero_engine::xero::shader::{
    BlockMember, BufferDeclaration, ImageDeclaration, PushConstantBlock, ReflectedType, ScalarKind,
    ShaderStage, StageReflector, StageResources,
};
use xero_engine::{engine_error, engine_trace, engine_warn};

/// SPIR-V reflection backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SpirqReflector;

impl SpirqReflector {
    pub fn new() -> Self {
        Self
    }
}

impl StageReflector for SpirqReflector {
    fn reflect(&self, stage: ShaderStage, words: &[u32]) -> Result<StageResources> {
        let entry_points = spirq::ReflectConfig::new()
            .spv(words)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| {
                engine_error!("xero::vulkan", "SPIR-V reflection of {} stage failed: {:?}",
                    stage.marker_name(), e);
                Error::ReflectionFailed(format!("{:?}", e))
            })?;

        // Shared resources are listed once per entry point; only this stage's counts
        let entry_point = entry_points.iter()
            .find(|entry_point| entry_point.exec_model == execution_model(stage))
            .ok_or_else(|| {
                engine_error!("xero::vulkan", "SPIR-V module has no {} entry point", stage.marker_name());
                Error::ReflectionFailed(format!("no {} entry point in module", stage.marker_name()))
            })?;

        let mut resources = StageResources::default();

        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, ty, nbind } => {
                    let name = resource_name(name, ty);
                    let (set, binding) = (desc_bind.set(), desc_bind.bind());
                    add_descriptor(&mut resources, name, set, binding, desc_ty, ty, *nbind)?;
                }
                spirq::var::Variable::PushConstant { name, ty } => {
                    resources.push_constant_blocks.push(PushConstantBlock {
                        name: name.clone().unwrap_or_default(),
                        size: byte_size(ty),
                        members: block_members(ty),
                    });
                }
                _ => {}
            }
        }

        engine_trace!("xero::vulkan", "Reflected {} stage: {} UBO, {} SSBO, {} push constant, {} sampled, {} storage",
            stage.marker_name(),
            resources.uniform_buffers.len(),
            resources.storage_buffers.len(),
            resources.push_constant_blocks.len(),
            resources.sampled_images.len(),
            resources.storage_images.len());

        Ok(resources)
    }
}

/// Convert ShaderStage to the SPIR-V execution model of its entry point
pub fn execution_model(stage: ShaderStage) -> spirq::prelude::ExecutionModel {
    use spirq::prelude::ExecutionModel;
    match stage {
        ShaderStage::Vertex => ExecutionModel::Vertex,
        ShaderStage::Fragment => ExecutionModel::Fragment,
        ShaderStage::Compute => ExecutionModel::GLCompute,
    }
}

/// Route one descriptor variable to the matching resource list
///
/// Separate images and samplers have no layout kind of their own; they are
/// skipped with a warning and must be declared as combined image samplers.
fn add_descriptor(
    resources: &mut StageResources,
    name: String,
    set: u32,
    binding: u32,
    desc_ty: &spirq::ty::DescriptorType,
    ty: &spirq::ty::Type,
    nbind: u32,
) -> Result<()> {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => {
            resources.uniform_buffers.push(buffer_declaration(name, set, binding, ty));
        }
        DescriptorType::StorageBuffer(..) => {
            resources.storage_buffers.push(buffer_declaration(name, set, binding, ty));
        }
        DescriptorType::CombinedImageSampler() => {
            resources.sampled_images.push(ImageDeclaration { name, set, binding, array_size: array_size(nbind) });
        }
        DescriptorType::SampledImage() | DescriptorType::Sampler() => {
            engine_warn!("xero::vulkan",
                "Skipping separate image/sampler '{}' ({}, {}): use a combined image sampler",
                name, set, binding);
        }
        DescriptorType::StorageImage(..) => {
            resources.storage_images.push(ImageDeclaration { name, set, binding, array_size: array_size(nbind) });
        }
        other => {
            engine_error!("xero::vulkan", "Unsupported SPIR-V descriptor type for '{}': {:?}", name, other);
            return Err(Error::ReflectionFailed(format!(
                "unsupported descriptor type {:?} for '{}'", other, name
            )));
        }
    }
    Ok(())
}

fn buffer_declaration(name: String, set: u32, binding: u32, ty: &spirq::ty::Type) -> BufferDeclaration {
    let member_count = match ty {
        spirq::ty::Type::Struct(st) => st.members.len() as u32,
        _ => 0,
    };
    BufferDeclaration { name, set, binding, size: byte_size(ty), member_count }
}

/// Variable name, falling back to the block type name for anonymous instances
fn resource_name(name: &Option<String>, ty: &spirq::ty::Type) -> String {
    match name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => match ty {
            spirq::ty::Type::Struct(st) => st.name.clone().unwrap_or_default(),
            _ => String::new(),
        },
    }
}

/// Non-arrayed descriptors report a binding count of 1
fn array_size(nbind: u32) -> u32 {
    if nbind > 1 { nbind } else { 0 }
}

/// Sized types only; runtime arrays report 0
fn byte_size(ty: &spirq::ty::Type) -> u32 {
    ty.nbyte().map(|s| s as u32).unwrap_or(0)
}

fn block_members(ty: &spirq::ty::Type) -> Vec<BlockMember> {
    if let spirq::ty::Type::Struct(st) = ty {
        st.members.iter().map(|m| BlockMember {
            name: m.name.clone().unwrap_or_default(),
            ty: reflected_type(&m.ty),
            offset: m.offset.unwrap_or(0) as u32,
            size: byte_size(&m.ty),
        }).collect()
    } else {
        Vec::new()
    }
}

/// Convert a spirq ScalarType to our ScalarKind
fn scalar_kind(scalar_ty: &spirq::ty::ScalarType) -> Option<ScalarKind> {
    use spirq::ty::ScalarType;
    match scalar_ty {
        ScalarType::Float { bits: 64 } => Some(ScalarKind::Float64),
        ScalarType::Float { bits: 32 } => Some(ScalarKind::Float32),
        ScalarType::Integer { bits: 32, is_signed: true } => Some(ScalarKind::Int32),
        ScalarType::Integer { bits: 32, is_signed: false } => Some(ScalarKind::UInt32),
        ScalarType::Boolean => Some(ScalarKind::Bool),
        _ => None,
    }
}

/// Convert a spirq Type to a ReflectedType
///
/// Arrays, nested structs and scalars other than 32-bit ints or floats are
/// reported as `Other` with their spirq description.
pub(crate) fn reflected_type(ty: &spirq::ty::Type) -> ReflectedType {
    use spirq::ty::Type;
    let classified = match ty {
        Type::Scalar(s) => scalar_kind(s).map(ReflectedType::Scalar),
        Type::Vector(v) => scalar_kind(&v.scalar_ty).map(|kind| ReflectedType::Vector(kind, v.nscalar)),
        Type::Matrix(m) => scalar_kind(&m.vector_ty.scalar_ty).map(|scalar| ReflectedType::Matrix {
            scalar,
            columns: m.nvector,
            rows: m.vector_ty.nscalar,
        }),
        _ => None,
    };
    classified.unwrap_or_else(|| ReflectedType::Other(format!("{:?}", ty)))
}

#[cfg(test)]
#[path = "vulkan_reflect_tests.rs"]
mod tests;
