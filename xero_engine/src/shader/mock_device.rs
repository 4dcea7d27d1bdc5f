/// Mock backend for unit tests (no GPU required)
///
/// `MockDevice` hands out sequential handles and records every live object
/// so tests can check what a shader created and released. `MockCompiler`
/// counts invocations, `MockReflector` returns canned stage resources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::config::{CompileOptions, ShaderConfig};
use crate::error::{Error, Result};
use crate::shader::backend::ShaderBackend;
use crate::shader::compiler::ShaderCompiler;
use crate::shader::device::{
    DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetHandle, DescriptorSetLayoutDesc,
    DescriptorSetLayoutHandle, ShaderDevice, ShaderModuleHandle,
};
use crate::shader::reflection::{StageReflector, StageResources};
use crate::shader::ShaderStage;

/// First word of every binary the mock compiler emits
pub const MOCK_MAGIC: u32 = 0x0723_0203;

// ============================================================================
// Mock Device
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPool {
    pub sizes: Vec<DescriptorPoolSize>,
    pub max_sets: u32,
    pub allocated: u32,
}

#[derive(Debug, Default)]
pub struct MockDeviceState {
    next_handle: u64,
    pub modules: BTreeMap<u64, Vec<u32>>,
    pub layouts: BTreeMap<u64, DescriptorSetLayoutDesc>,
    pub pools: BTreeMap<u64, MockPool>,
    /// Every pool ever requested, in creation order
    pub pool_requests: Vec<(Vec<DescriptorPoolSize>, u32)>,
    pub fail_layouts: bool,
}

impl MockDeviceState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Recording device
#[derive(Debug, Default)]
pub struct MockDevice {
    pub state: Mutex<MockDeviceState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_modules(&self) -> usize {
        self.state.lock().unwrap().modules.len()
    }

    pub fn live_layouts(&self) -> usize {
        self.state.lock().unwrap().layouts.len()
    }

    pub fn live_pools(&self) -> usize {
        self.state.lock().unwrap().pools.len()
    }

    pub fn pool_requests(&self) -> Vec<(Vec<DescriptorPoolSize>, u32)> {
        self.state.lock().unwrap().pool_requests.clone()
    }

    pub fn layout_desc(&self, layout: DescriptorSetLayoutHandle) -> Option<DescriptorSetLayoutDesc> {
        self.state.lock().unwrap().layouts.get(&layout.0).cloned()
    }

    pub fn module_words(&self, module: ShaderModuleHandle) -> Option<Vec<u32>> {
        self.state.lock().unwrap().modules.get(&module.0).cloned()
    }

    /// Make every following layout creation fail
    pub fn fail_layout_creation(&self) {
        self.state.lock().unwrap().fail_layouts = true;
    }
}

impl ShaderDevice for MockDevice {
    fn create_shader_module(&self, words: &[u32]) -> Result<ShaderModuleHandle> {
        let mut state = self.state.lock().unwrap();
        let handle = state.next();
        state.modules.insert(handle, words.to_vec());
        Ok(ShaderModuleHandle(handle))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        self.state.lock().unwrap().modules.remove(&module.0);
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_layouts {
            return Err(Error::BackendError("mock layout failure".to_string()));
        }
        let handle = state.next();
        state.layouts.insert(handle, desc.clone());
        Ok(DescriptorSetLayoutHandle(handle))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.state.lock().unwrap().layouts.remove(&layout.0);
    }

    fn create_descriptor_pool(&self, sizes: &[DescriptorPoolSize], max_sets: u32) -> Result<DescriptorPoolHandle> {
        let mut state = self.state.lock().unwrap();
        let handle = state.next();
        state.pools.insert(handle, MockPool { sizes: sizes.to_vec(), max_sets, allocated: 0 });
        state.pool_requests.push((sizes.to_vec(), max_sets));
        Ok(DescriptorPoolHandle(handle))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        self.state.lock().unwrap().pools.remove(&pool.0);
    }

    fn reset_descriptor_pool(&self, pool: DescriptorPoolHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.pools.get_mut(&pool.0) {
            Some(entry) => {
                entry.allocated = 0;
                Ok(())
            }
            None => Err(Error::InvalidResource(format!("unknown pool {}", pool.0))),
        }
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> Result<Vec<DescriptorSetHandle>> {
        let mut state = self.state.lock().unwrap();
        let count = layouts.len() as u32;
        match state.pools.get_mut(&pool.0) {
            Some(entry) if entry.allocated + count > entry.max_sets => return Err(Error::PoolExhausted),
            Some(entry) => entry.allocated += count,
            None => return Err(Error::InvalidResource(format!("unknown pool {}", pool.0))),
        }
        Ok((0..count).map(|_| DescriptorSetHandle(state.next())).collect())
    }
}

// ============================================================================
// Mock Compiler
// ============================================================================

/// Compiler emitting `[MOCK_MAGIC, stage index, source length]`
#[derive(Debug, Default)]
pub struct MockCompiler {
    pub invocations: AtomicUsize,
    pub failure: Mutex<Option<String>>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Make every following compile fail with `diagnostic`
    pub fn fail_with(&self, diagnostic: &str) {
        *self.failure.lock().unwrap() = Some(diagnostic.to_string());
    }
}

impl ShaderCompiler for MockCompiler {
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        _source_path: &Path,
        _entry_point: &str,
        _options: &CompileOptions,
    ) -> Result<Vec<u32>> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(diagnostic) = self.failure.lock().unwrap().clone() {
            return Err(Error::CompilationFailed(diagnostic));
        }
        Ok(vec![MOCK_MAGIC, stage as u32, source.len() as u32])
    }
}

// ============================================================================
// Mock Reflector
// ============================================================================

/// Reflector returning canned resources per stage
#[derive(Debug, Default)]
pub struct MockReflector {
    pub resources: BTreeMap<ShaderStage, StageResources>,
    pub failure: Option<Error>,
}

impl MockReflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, stage: ShaderStage, resources: StageResources) {
        self.resources.insert(stage, resources);
    }

    pub fn fail_with(&mut self, error: Error) {
        self.failure = Some(error);
    }
}

impl StageReflector for MockReflector {
    fn reflect(&self, stage: ShaderStage, _words: &[u32]) -> Result<StageResources> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.resources.get(&stage).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Helpers
// ============================================================================

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh empty directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let id = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("xero_engine_{}_{}_{}", std::process::id(), id, name));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Mock devices plus a backend bundle caching under `cache_root`
pub struct MockBackend {
    pub device: Arc<MockDevice>,
    pub compiler: Arc<MockCompiler>,
    pub backend: Arc<ShaderBackend>,
}

impl MockBackend {
    pub fn new(cache_root: &Path, reflector: MockReflector) -> Self {
        let device = Arc::new(MockDevice::new());
        let compiler = Arc::new(MockCompiler::new());
        let config = ShaderConfig {
            cache_root: cache_root.to_path_buf(),
            ..ShaderConfig::default()
        };
        let backend = Arc::new(ShaderBackend::new(
            config,
            device.clone(),
            compiler.clone(),
            Arc::new(reflector),
        ));
        Self { device, compiler, backend }
    }
}
