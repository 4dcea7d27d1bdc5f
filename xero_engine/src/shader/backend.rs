/// Backend bundle selected once at startup
///
/// Groups the three capabilities a backend provides (device, compiler,
/// reflector) with the pipeline configuration, so shaders and the library
/// can share one `Arc<ShaderBackend>`.

use std::sync::Arc;
use crate::config::{Backend, ShaderConfig};
use crate::shader::cache::BinaryCache;
use crate::shader::compiler::ShaderCompiler;
use crate::shader::device::ShaderDevice;
use crate::shader::reflection::StageReflector;

/// Capabilities of the selected rendering backend
pub struct ShaderBackend {
    config: ShaderConfig,
    device: Arc<dyn ShaderDevice>,
    compiler: Arc<dyn ShaderCompiler>,
    reflector: Arc<dyn StageReflector>,
}

impl ShaderBackend {
    pub fn new(
        config: ShaderConfig,
        device: Arc<dyn ShaderDevice>,
        compiler: Arc<dyn ShaderCompiler>,
        reflector: Arc<dyn StageReflector>,
    ) -> Self {
        Self { config, device, compiler, reflector }
    }

    /// Backend the bundle was built for
    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    pub fn device(&self) -> &dyn ShaderDevice {
        self.device.as_ref()
    }

    /// Owned handle to the device (for long-lived allocators)
    pub fn shared_device(&self) -> Arc<dyn ShaderDevice> {
        Arc::clone(&self.device)
    }

    pub fn compiler(&self) -> &dyn ShaderCompiler {
        self.compiler.as_ref()
    }

    pub fn reflector(&self) -> &dyn StageReflector {
        self.reflector.as_ref()
    }

    /// Binary cache under `<cache root>/<backend name>`
    pub fn cache(&self) -> BinaryCache {
        BinaryCache::new(self.config.cache_directory(), self.config.backend)
    }
}
