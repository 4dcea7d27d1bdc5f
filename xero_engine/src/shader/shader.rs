/// Shader object
///
/// Orchestrates the load pipeline for one source file:
/// read -> preprocess -> compile or load cached binaries -> create stage
/// modules -> reflect -> create descriptor-set layouts. Owns every derived
/// structure and the GPU objects it created; they are released on reload
/// and on drop (the device must be idle by then).

use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use rustc_hash::{FxHashMap, FxHasher};
use crate::error::{Error, Result};
use crate::shader::backend::ShaderBackend;
use crate::shader::compiler::{CompiledStages, StageCompiler};
use crate::shader::descriptor::{
    self, DescriptorLayouts, DescriptorSetAllocateRequest, MaterialDescriptorSet, WriteDescriptorTemplate,
};
use crate::shader::device::{DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetLayoutHandle, ShaderModuleHandle};
use crate::shader::preprocessor::{preprocess, ShaderSource};
use crate::shader::reflection::{
    BufferBinding, PushConstantRange, ReflectionSession, Reflector, ShaderDescriptorSet, ShaderReflection,
};
use crate::shader::uniform::{ShaderBuffer, ShaderResourceDeclaration};
use crate::shader::ShaderStage;
use crate::{engine_debug, engine_error, engine_info, engine_warn};

/// Shared handle held by the library and renderers
pub type ShaderRef = Arc<Mutex<Shader>>;

/// Callback invoked after every successful reload
pub type ShaderReloadedFn = Box<dyn Fn() + Send + Sync>;

/// Display name of a shader: file name without directories and extension
///
/// Both `/` and `\` separate directories; only the last extension is
/// stripped (`a/b/Blur.pass.glsl` -> `Blur.pass`).
pub fn derive_name(path: &Path) -> String {
    let full = path.to_string_lossy();
    let file_name = match full.rfind(|c: char| c == '/' || c == '\\') {
        Some(index) => &full[index + 1..],
        None => &full[..],
    };
    match file_name.rfind('.') {
        Some(index) => file_name[..index].to_string(),
        None => file_name.to_string(),
    }
}

pub struct Shader {
    path: PathBuf,
    name: String,
    backend: Arc<ShaderBackend>,
    sources: ShaderSource,
    content_hash: u64,
    stages: CompiledStages,
    stage_modules: BTreeMap<ShaderStage, ShaderModuleHandle>,
    reflection: ShaderReflection,
    layouts: DescriptorLayouts,
    /// Pools created by `create_descriptor_sets*`
    owned_pools: Vec<DescriptorPoolHandle>,
    reloaded_callbacks: Vec<ShaderReloadedFn>,
}

impl Shader {
    /// Load a shader from `path` and run the whole pipeline
    pub fn load(
        path: impl Into<PathBuf>,
        backend: Arc<ShaderBackend>,
        session: &mut ReflectionSession,
        force_compile: bool,
    ) -> Result<Self> {
        let path = path.into();
        let name = derive_name(&path);
        let mut shader = Self {
            path,
            name,
            backend,
            sources: ShaderSource::new(),
            content_hash: 0,
            stages: CompiledStages::new(),
            stage_modules: BTreeMap::new(),
            reflection: ShaderReflection::default(),
            layouts: DescriptorLayouts::default(),
            owned_pools: Vec::new(),
            reloaded_callbacks: Vec::new(),
        };
        shader.reload(session, force_compile)?;
        Ok(shader)
    }

    /// Release everything and rebuild from the source file
    ///
    /// On failure the shader is left empty (no modules, no layouts).
    pub fn reload(&mut self, session: &mut ReflectionSession, force_compile: bool) -> Result<()> {
        self.release_gpu_objects();
        self.sources.clear();
        self.stages.clear();
        self.reflection = ShaderReflection::default();
        self.layouts = DescriptorLayouts::default();
        self.content_hash = 0;

        if let Err(e) = self.build(session, force_compile) {
            engine_error!("xero::Shader", "Failed to load shader '{}': {}", self.path.display(), e);
            self.release_gpu_objects();
            return Err(e);
        }

        engine_info!("xero::Shader", "Loaded shader '{}' ({} stages, {} descriptor set layouts)",
            self.name, self.stages.len(), self.layouts.layouts.len());

        for callback in &self.reloaded_callbacks {
            callback();
        }
        Ok(())
    }

    fn build(&mut self, session: &mut ReflectionSession, force_compile: bool) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let config = backend.config();
        let cache = backend.cache();
        cache.ensure_directory()?;

        let text = fs::read_to_string(&self.path)
            .map_err(|e| Error::Io(format!("Could not open file '{}': {}", self.path.display(), e)))?;
        self.content_hash = hash_bytes(text.as_bytes());

        self.sources = preprocess(&text)?;

        self.stages = StageCompiler::new(backend.compiler(), &cache, &config.compile, &config.entry_point)
            .compile_or_get_binary(&self.path, &self.sources, force_compile)?;

        for (&stage, compiled) in &self.stages {
            let module = backend.device().create_shader_module(&compiled.words)?;
            self.stage_modules.insert(stage, module);
        }

        self.reflection = Reflector::new(session, &config.renderer_push_constant_name)
            .reflect_all(backend.reflector(), &self.stages, &self.name)?;

        self.layouts = descriptor::create_descriptor_layouts(backend.device(), &mut self.reflection, &self.name)?;
        Ok(())
    }

    fn release_gpu_objects(&mut self) {
        let device = self.backend.device();
        for pool in self.owned_pools.drain(..) {
            device.destroy_descriptor_pool(pool);
        }
        for (_, layout) in std::mem::take(&mut self.layouts.layouts) {
            device.destroy_descriptor_set_layout(layout);
        }
        for (_, module) in std::mem::take(&mut self.stage_modules) {
            device.destroy_shader_module(module);
        }
    }

    // ===== DESCRIPTOR ALLOCATION =====

    /// Create a pool sized for one instance of `set` and allocate that set
    pub fn create_descriptor_sets(&mut self, set: u32) -> Result<MaterialDescriptorSet> {
        self.create_descriptor_sets_n(set, 1)
    }

    /// Create a pool sized for `count` instances of `set` and allocate them all
    pub fn create_descriptor_sets_n(&mut self, set: u32, count: u32) -> Result<MaterialDescriptorSet> {
        let layout = self.layout_or_err(set)?;
        if count == 0 || count > descriptor::MAX_SET_INSTANCES {
            engine_error!("xero::Shader", "Cannot allocate {} instances of set {} (limit {})",
                count, set, descriptor::MAX_SET_INSTANCES);
            return Err(Error::InvalidResource(format!(
                "cannot allocate {} instances of set {}", count, set
            )));
        }
        let descriptor_set = self.reflection.descriptor_sets
            .get(set as usize)
            .ok_or(Error::MissingDescriptorSetLayout(set))?;
        let sizes = descriptor::pool_sizes(descriptor_set, count)?;

        let device = self.backend.device();
        let pool = device.create_descriptor_pool(&sizes, count)?;
        let layouts = vec![layout; count as usize];
        let descriptor_sets = match device.allocate_descriptor_sets(pool, &layouts) {
            Ok(sets) => sets,
            Err(e) => {
                device.destroy_descriptor_pool(pool);
                return Err(e);
            }
        };
        self.owned_pools.push(pool);

        engine_debug!("xero::Shader", "Allocated {} descriptor set(s) for set {} of '{}'",
            descriptor_sets.len(), set, self.name);

        Ok(MaterialDescriptorSet {
            pool: Some(pool),
            descriptor_sets,
        })
    }

    /// Describe an allocation of `set` for `DescriptorPoolManager` (no pool created)
    pub fn allocate_descriptor_set(&self, set: u32) -> Result<DescriptorSetAllocateRequest> {
        Ok(DescriptorSetAllocateRequest {
            set,
            layout: self.layout_or_err(set)?,
        })
    }

    fn layout_or_err(&self, set: u32) -> Result<DescriptorSetLayoutHandle> {
        self.layouts.layouts.get(&set).copied().ok_or_else(|| {
            engine_error!("xero::Shader", "Shader '{}' has no descriptor set layout for set {}", self.name, set);
            Error::MissingDescriptorSetLayout(set)
        })
    }

    /// Write template of resource `name` in `set`
    ///
    /// Returns `None` (with a warning) if the set or the name is unknown.
    pub fn get_descriptor_set(&self, name: &str, set: u32) -> Option<&WriteDescriptorTemplate> {
        let Some(descriptor_set) = self.reflection.descriptor_sets.get(set as usize).filter(|s| !s.is_empty()) else {
            engine_warn!("xero::Shader", "Shader '{}' does not contain descriptor set {}", self.name, set);
            return None;
        };
        let template = descriptor_set.write_descriptors.get(name);
        if template.is_none() {
            engine_warn!("xero::Shader", "Shader '{}' does not contain requested descriptor set {}", self.name, name);
        }
        template
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-stage source text of the last load
    pub fn sources(&self) -> &ShaderSource {
        &self.sources
    }

    pub fn compiled_stages(&self) -> &CompiledStages {
        &self.stages
    }

    pub fn stage_modules(&self) -> &BTreeMap<ShaderStage, ShaderModuleHandle> {
        &self.stage_modules
    }

    pub fn descriptor_set_layout(&self, set: u32) -> Option<DescriptorSetLayoutHandle> {
        self.layouts.layouts.get(&set).copied()
    }

    /// Layouts of every non-empty set, by ascending set index
    pub fn all_descriptor_set_layouts(&self) -> Vec<DescriptorSetLayoutHandle> {
        self.layouts.layouts.values().copied().collect()
    }

    pub fn has_descriptor_set(&self, set: u32) -> bool {
        self.layouts.pool_sizes.contains_key(&set)
    }

    /// Single-instance pool sizing of `set`
    pub fn pool_sizes(&self, set: u32) -> Option<&[DescriptorPoolSize]> {
        self.layouts.pool_sizes.get(&set).map(Vec::as_slice)
    }

    pub fn shader_descriptor_sets(&self) -> &[ShaderDescriptorSet] {
        &self.reflection.descriptor_sets
    }

    pub fn uniform_buffer(&self, binding: u32, set: u32) -> Option<&BufferBinding> {
        self.reflection.descriptor_sets.get(set as usize)?.uniform_buffers.get(&binding)
    }

    pub fn uniform_buffer_count(&self, set: u32) -> usize {
        self.reflection.descriptor_sets
            .get(set as usize)
            .map_or(0, |s| s.uniform_buffers.len())
    }

    pub fn shader_buffers(&self) -> &FxHashMap<String, ShaderBuffer> {
        &self.reflection.buffers
    }

    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.reflection.push_constant_ranges
    }

    pub fn resources(&self) -> &FxHashMap<String, ShaderResourceDeclaration> {
        &self.reflection.resources
    }

    /// Hash of the source path
    pub fn hash(&self) -> u64 {
        hash_bytes(self.path.to_string_lossy().as_bytes())
    }

    /// Hash of the source text read by the last load
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Register a callback run after every successful reload
    pub fn add_reloaded_callback<F: Fn() + Send + Sync + 'static>(&mut self, callback: F) {
        self.reloaded_callbacks.push(Box::new(callback));
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.release_gpu_objects();
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .field("descriptor_sets", &self.layouts.layouts.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
