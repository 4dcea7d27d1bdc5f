/*!
# Xero Engine - Vulkan Shader Backend

Vulkan implementation of the capability traits of the Xero shader pipeline.

This crate provides the `ShaderDevice` over ash, SPIR-V reflection through
spirq and, with the `shaderc` feature, a GLSL compiler through shaderc.
The pieces are bundled into one `ShaderBackend` chosen at startup.
*/

// Vulkan implementation modules
mod vulkan_context;
mod vulkan_device;
mod vulkan_reflect;

#[cfg(feature = "shaderc")]
mod shaderc_compiler;

use std::sync::Arc;
use xero_engine::xero::Result;
use xero_engine::xero::config::ShaderConfig;
use xero_engine::xero::shader::{ShaderBackend, ShaderCompiler};
use xero_engine::engine_info;

pub use vulkan_context::GpuContext;
pub use vulkan_device::{descriptor_kind_to_vk, shader_stage_to_vk, stage_flags_to_vk, VulkanShaderDevice};
pub use vulkan_reflect::SpirqReflector;

#[cfg(feature = "shaderc")]
pub use shaderc_compiler::ShadercCompiler;

/// Bundle the Vulkan device and SPIR-V reflector with a caller-supplied compiler
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use xero_renderer_vulkan::{create_vulkan_backend, GpuContext};
/// use xero_engine::xero::config::ShaderConfig;
/// # fn run(context: Arc<GpuContext>, compiler: Arc<dyn xero_engine::xero::shader::ShaderCompiler>)
/// #     -> xero_engine::xero::Result<()> {
/// let backend = create_vulkan_backend(context, ShaderConfig::default(), compiler)?;
/// # Ok(()) }
/// ```
pub fn create_vulkan_backend(
    context: Arc<GpuContext>,
    config: ShaderConfig,
    compiler: Arc<dyn ShaderCompiler>,
) -> Result<Arc<ShaderBackend>> {
    engine_info!("xero::vulkan", "Creating {} shader backend (cache: {})",
        config.backend.name(), config.cache_directory().display());

    let device = Arc::new(VulkanShaderDevice::new(context));
    let reflector = Arc::new(SpirqReflector::new());
    Ok(Arc::new(ShaderBackend::new(config, device, compiler, reflector)))
}

/// Vulkan backend with the shaderc GLSL compiler
#[cfg(feature = "shaderc")]
pub fn create_default_vulkan_backend(context: Arc<GpuContext>, config: ShaderConfig) -> Result<Arc<ShaderBackend>> {
    create_vulkan_backend(context, config, Arc::new(ShadercCompiler::new()))
}
