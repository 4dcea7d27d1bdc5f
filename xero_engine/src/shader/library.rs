/// Shader library: name -> shared shader, at most one per name

use std::path::Path;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::shader::backend::ShaderBackend;
use crate::shader::reflection::ReflectionSession;
use crate::shader::shader::{Shader, ShaderRef};
use crate::{engine_err, engine_error, engine_info};

pub struct ShaderLibrary {
    backend: Arc<ShaderBackend>,
    shaders: FxHashMap<String, ShaderRef>,
}

impl ShaderLibrary {
    pub fn new(backend: Arc<ShaderBackend>) -> Self {
        Self {
            backend,
            shaders: FxHashMap::default(),
        }
    }

    /// Register an already loaded shader under its own name
    pub fn add(&mut self, shader: ShaderRef) -> Result<()> {
        let name = shader
            .lock()
            .map_err(|_| engine_err!("xero::ShaderLibrary", "Shader lock poisoned"))?
            .name()
            .to_string();
        self.insert(name, shader)
    }

    /// Load `path` and register it under its derived name
    pub fn load(&mut self, path: impl AsRef<Path>, session: &mut ReflectionSession) -> Result<ShaderRef> {
        let shader = Shader::load(path.as_ref(), Arc::clone(&self.backend), session, false)?;
        let name = shader.name().to_string();
        self.register_new(name, shader)
    }

    /// Load `path` and register it under `name`
    pub fn load_named(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        session: &mut ReflectionSession,
    ) -> Result<ShaderRef> {
        if self.contains(name) {
            engine_error!("xero::ShaderLibrary", "Shader '{}' already exists", name);
            return Err(Error::DuplicateShader(name.to_string()));
        }
        let shader = Shader::load(path.as_ref(), Arc::clone(&self.backend), session, false)?;
        self.register_new(name.to_string(), shader)
    }

    /// Shader registered under `name`
    pub fn get(&self, name: &str) -> Result<ShaderRef> {
        self.shaders.get(name).cloned().ok_or_else(|| {
            engine_error!("xero::ShaderLibrary", "Shader '{}' not found", name);
            Error::ShaderNotFound(name.to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Registered names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    fn register_new(&mut self, name: String, shader: Shader) -> Result<ShaderRef> {
        let shared = Arc::new(Mutex::new(shader));
        self.insert(name, Arc::clone(&shared))?;
        Ok(shared)
    }

    fn insert(&mut self, name: String, shader: ShaderRef) -> Result<()> {
        if self.shaders.contains_key(&name) {
            engine_error!("xero::ShaderLibrary", "Shader '{}' already exists", name);
            return Err(Error::DuplicateShader(name));
        }
        engine_info!("xero::ShaderLibrary", "Registered shader '{}'", name);
        self.shaders.insert(name, shader);
        Ok(())
    }
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
