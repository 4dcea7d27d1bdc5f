/// ShadercCompiler - GLSL -> SPIR-V through shaderc
///
/// Only built with the `shaderc` feature. A compiler instance is created
/// per call, so the type holds no native state and is trivially shareable.

use std::path::Path;
use xero_engine::xero::{Error, Result};
use xero_engine::xero::config::{CompileOptions, TargetEnvironment};
use xero_engine::xero::shader::{ShaderCompiler, ShaderStage};
use xero_engine::{engine_error, engine_warn};

/// Convert ShaderStage to shaderc shader kind
pub fn shader_kind(stage: ShaderStage) -> shaderc::ShaderKind {
    match stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        ShaderStage::Compute => shaderc::ShaderKind::Compute,
    }
}

/// Convert TargetEnvironment to shaderc environment version
pub fn env_version(target: TargetEnvironment) -> shaderc::EnvVersion {
    match target {
        TargetEnvironment::Vulkan1_0 => shaderc::EnvVersion::Vulkan1_0,
        TargetEnvironment::Vulkan1_1 => shaderc::EnvVersion::Vulkan1_1,
        TargetEnvironment::Vulkan1_2 => shaderc::EnvVersion::Vulkan1_2,
        TargetEnvironment::Vulkan1_3 => shaderc::EnvVersion::Vulkan1_3,
    }
}

/// shaderc-backed compilation backend
#[derive(Debug, Default, Clone, Copy)]
pub struct ShadercCompiler;

impl ShadercCompiler {
    pub fn new() -> Self {
        Self
    }

    fn options(options: &CompileOptions) -> Result<shaderc::CompileOptions<'static>> {
        let mut vk_options = shaderc::CompileOptions::new()
            .ok_or_else(|| Error::InitializationFailed("shaderc compile options unavailable".to_string()))?;

        vk_options.set_target_env(shaderc::TargetEnv::Vulkan, env_version(options.target_env) as u32);
        if options.warnings_as_errors {
            vk_options.set_warnings_as_errors();
        }
        if options.generate_debug_info {
            vk_options.set_generate_debug_info();
        }
        if options.optimize {
            vk_options.set_optimization_level(shaderc::OptimizationLevel::Performance);
        }
        Ok(vk_options)
    }
}

impl ShaderCompiler for ShadercCompiler {
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        source_path: &Path,
        entry_point: &str,
        options: &CompileOptions,
    ) -> Result<Vec<u32>> {
        let compiler = shaderc::Compiler::new()
            .ok_or_else(|| Error::InitializationFailed("shaderc not available".to_string()))?;
        let vk_options = Self::options(options)?;
        let file_name = source_path.display().to_string();

        let artifact = compiler
            .compile_into_spirv(source, shader_kind(stage), &file_name, entry_point, Some(&vk_options))
            .map_err(|e| {
                engine_error!("xero::vulkan", "shaderc failed on {} stage of '{}'", stage.marker_name(), file_name);
                Error::CompilationFailed(e.to_string())
            })?;

        if artifact.get_num_warnings() > 0 {
            engine_warn!("xero::vulkan", "{}", artifact.get_warning_messages());
        }

        Ok(artifact.as_binary().to_vec())
    }
}

#[cfg(test)]
#[path = "shaderc_compiler_tests.rs"]
mod tests;
