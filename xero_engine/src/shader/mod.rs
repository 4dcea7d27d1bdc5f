//! Shader pipeline
//!
//! Raw source with `#type` stage markers is split per stage, compiled (or
//! loaded from the on-disk binary cache), reflected into a unified
//! descriptor-set model and turned into descriptor-set layouts. `Shader`
//! drives the pipeline for one file, `ShaderLibrary` maps names to shared
//! shaders.

pub mod stage;
pub mod preprocessor;
pub mod cache;
pub mod compiler;
pub mod uniform;
pub mod reflection;
pub mod device;
pub mod descriptor;
pub mod pool_manager;
pub mod backend;
pub mod shader;
pub mod library;

#[cfg(test)]
pub(crate) mod mock_device;

pub use stage::{ShaderStage, ShaderStageFlags};
pub use preprocessor::{preprocess, ShaderSource, TYPE_TOKEN};
pub use cache::BinaryCache;
pub use compiler::{CompiledStage, CompiledStages, ShaderCompiler, StageCompiler};
pub use uniform::{
    ReflectedType, ScalarKind, ShaderBuffer, ShaderResourceDeclaration, ShaderUniform, ShaderUniformType,
};
pub use reflection::{
    BlockMember, BufferBinding, BufferDeclaration, ImageBinding, ImageDeclaration, PushConstantBlock,
    PushConstantRange, ReflectionSession, Reflector, ShaderDescriptorSet, ShaderReflection,
    StageReflector, StageResources,
};
pub use device::{
    DescriptorKind, DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetHandle, DescriptorSetLayoutDesc,
    DescriptorSetLayoutHandle, LayoutBindingDesc, ShaderDevice, ShaderModuleHandle,
};
pub use descriptor::{
    MAX_SET_INSTANCES,
    DescriptorLayouts, DescriptorSetAllocateRequest, MaterialDescriptorSet, WriteDescriptorTemplate,
};
pub use pool_manager::DescriptorPoolManager;
pub use backend::ShaderBackend;
pub use shader::{derive_name, Shader, ShaderRef, ShaderReloadedFn};
pub use library::ShaderLibrary;
