//! Shader pipeline configuration
//!
//! Selected once at startup: which backend compiles and reflects shaders,
//! where compiled binaries are cached and which compiler options apply.

use std::path::PathBuf;

/// Rendering backend the shader pipeline targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Vulkan (SPIR-V binaries)
    Vulkan,
}

impl Backend {
    /// Directory name under the cache root (`Resources/Cache/Shader/<name>`)
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Vulkan => "Vulkan",
        }
    }

    /// Lower-case tag used in cached binary file extensions
    pub fn tag(&self) -> &'static str {
        match self {
            Backend::Vulkan => "vulkan",
        }
    }
}

/// Target environment passed to the compilation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEnvironment {
    /// Vulkan 1.0 semantics
    Vulkan1_0,
    /// Vulkan 1.1 semantics
    Vulkan1_1,
    /// Vulkan 1.2 semantics
    Vulkan1_2,
    /// Vulkan 1.3 semantics
    Vulkan1_3,
}

/// Options handed to the compilation backend for every stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Target API version
    pub target_env: TargetEnvironment,
    /// Treat compiler warnings as errors
    pub warnings_as_errors: bool,
    /// Emit debug information (names survive into the binary for reflection)
    pub generate_debug_info: bool,
    /// Enable performance optimisation passes
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target_env: TargetEnvironment::Vulkan1_2,
            warnings_as_errors: true,
            generate_debug_info: true,
            optimize: false,
        }
    }
}

/// Shader pipeline configuration
#[derive(Debug, Clone)]
pub struct ShaderConfig {
    /// Backend selected at startup
    pub backend: Backend,
    /// Root of the compiled-binary cache; the backend name is appended
    pub cache_root: PathBuf,
    /// Compiler options
    pub compile: CompileOptions,
    /// Entry point name of every stage module
    pub entry_point: String,
    /// Push-constant block reserved for the renderer (excluded from the buffer map)
    pub renderer_push_constant_name: String,
}

impl ShaderConfig {
    /// Directory holding cached binaries for the selected backend
    pub fn cache_directory(&self) -> PathBuf {
        self.cache_root.join(self.backend.name())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Vulkan,
            cache_root: PathBuf::from("Resources/Cache/Shader"),
            compile: CompileOptions::default(),
            entry_point: "main".to_string(),
            renderer_push_constant_name: "u_Renderer".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
