/// Stage compiler: source -> binary, through the on-disk cache

use std::collections::BTreeMap;
use std::path::Path;
use crate::config::CompileOptions;
use crate::error::{Error, Result};
use crate::shader::cache::BinaryCache;
use crate::shader::preprocessor::ShaderSource;
use crate::shader::ShaderStage;
use crate::{engine_debug, engine_error};

/// Compilation backend (GLSL -> SPIR-V for Vulkan)
///
/// Implemented by backend crates; a failed compile returns
/// `Error::CompilationFailed` carrying the backend diagnostic.
pub trait ShaderCompiler: Send + Sync {
    /// Compile one stage to binary words
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        source_path: &Path,
        entry_point: &str,
        options: &CompileOptions,
    ) -> Result<Vec<u32>>;
}

/// Binary words for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStage {
    /// Stage the words belong to
    pub stage: ShaderStage,
    /// Binary words
    pub words: Vec<u32>,
    /// True if the words came from the cache instead of the compiler
    pub from_cache: bool,
}

/// Compiled stages in processing order
pub type CompiledStages = BTreeMap<ShaderStage, CompiledStage>;

/// Drives the compilation backend for all stages of one shader
pub struct StageCompiler<'a> {
    compiler: &'a dyn ShaderCompiler,
    cache: &'a BinaryCache,
    options: &'a CompileOptions,
    entry_point: &'a str,
}

impl<'a> StageCompiler<'a> {
    pub fn new(
        compiler: &'a dyn ShaderCompiler,
        cache: &'a BinaryCache,
        options: &'a CompileOptions,
        entry_point: &'a str,
    ) -> Self {
        Self { compiler, cache, options, entry_point }
    }

    /// Compile every stage, or load it from the cache
    ///
    /// Unless `force_compile` is set, a cache hit is used as is. On a miss the
    /// backend compiles the stage and the result is written to the cache
    /// before returning. Any compile failure aborts the whole shader.
    pub fn compile_or_get_binary(
        &self,
        source_path: &Path,
        sources: &ShaderSource,
        force_compile: bool,
    ) -> Result<CompiledStages> {
        let mut output = CompiledStages::new();

        for (&stage, source) in sources {
            if !force_compile {
                if let Some(words) = self.cache.read(source_path, stage) {
                    engine_debug!("xero::ShaderCompiler",
                        "Loaded cached {} binary for '{}' ({} words)",
                        stage.marker_name(), source_path.display(), words.len());
                    output.insert(stage, CompiledStage { stage, words, from_cache: true });
                    continue;
                }
            }

            let words = self
                .compiler
                .compile(source, stage, source_path, self.entry_point, self.options)
                .map_err(|e| {
                    engine_error!("xero::ShaderCompiler",
                        "Failed to compile {} stage of '{}': {}",
                        stage.marker_name(), source_path.display(), e);
                    match e {
                        Error::CompilationFailed(diagnostic) => Error::CompilationFailed(format!(
                            "{} ({}): {}", source_path.display(), stage.marker_name(), diagnostic
                        )),
                        other => other,
                    }
                })?;

            if words.is_empty() {
                return Err(Error::CompilationFailed(format!(
                    "{} ({}): backend produced an empty binary",
                    source_path.display(), stage.marker_name()
                )));
            }

            self.cache.write(source_path, stage, &words)?;
            engine_debug!("xero::ShaderCompiler",
                "Compiled {} stage of '{}' ({} words)",
                stage.marker_name(), source_path.display(), words.len());

            output.insert(stage, CompiledStage { stage, words, from_cache: false });
        }

        Ok(output)
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
