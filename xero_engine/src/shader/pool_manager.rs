/// Centralized descriptor pool allocator
///
/// Owns a growing list of fixed-capacity pools. Allocation goes to the most
/// recent pool; when it reports `Error::PoolExhausted` a new pool is created
/// and the allocation is issued again against it. All pools are destroyed
/// on drop, so the device must be idle by then.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::shader::descriptor::DescriptorSetAllocateRequest;
use crate::shader::device::{
    DescriptorKind, DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetHandle,
    DescriptorSetLayoutHandle, ShaderDevice,
};
use crate::{engine_err, engine_info};

/// Default number of sets per pool
pub const DEFAULT_MAX_SETS: u32 = 1024;

/// Default per-kind capacity of every pool
pub fn default_pool_sizes() -> Vec<DescriptorPoolSize> {
    vec![
        DescriptorPoolSize { kind: DescriptorKind::CombinedImageSampler, count: 2048 },
        DescriptorPoolSize { kind: DescriptorKind::UniformBuffer, count: 1024 },
        DescriptorPoolSize { kind: DescriptorKind::StorageBuffer, count: 1024 },
        DescriptorPoolSize { kind: DescriptorKind::StorageImage, count: 256 },
    ]
}

pub struct DescriptorPoolManager {
    device: Arc<dyn ShaderDevice>,
    pool_sizes: Vec<DescriptorPoolSize>,
    max_sets: u32,
    pools: Vec<DescriptorPoolHandle>,
}

impl DescriptorPoolManager {
    /// Manager with the default pool capacity
    pub fn new(device: Arc<dyn ShaderDevice>) -> Result<Self> {
        Self::with_capacity(device, default_pool_sizes(), DEFAULT_MAX_SETS)
    }

    /// Manager whose pools hold `max_sets` sets and `pool_sizes` descriptors
    pub fn with_capacity(
        device: Arc<dyn ShaderDevice>,
        pool_sizes: Vec<DescriptorPoolSize>,
        max_sets: u32,
    ) -> Result<Self> {
        if max_sets == 0 {
            return Err(Error::InvalidResource("descriptor pool capacity must be at least one set".to_string()));
        }
        let first = device.create_descriptor_pool(&pool_sizes, max_sets)?;
        Ok(Self {
            device,
            pool_sizes,
            max_sets,
            pools: vec![first],
        })
    }

    /// Number of pools created so far
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Allocate the set described by a shader's allocation request
    pub fn allocate(&mut self, request: &DescriptorSetAllocateRequest) -> Result<DescriptorSetHandle> {
        let mut sets = self.allocate_sets(&[request.layout])?;
        sets.pop()
            .ok_or_else(|| engine_err!("xero::DescriptorPoolManager",
                "Device returned no descriptor set for set {}", request.set))
    }

    /// Allocate one set per layout, growing the pool list if needed
    pub fn allocate_sets(&mut self, layouts: &[DescriptorSetLayoutHandle]) -> Result<Vec<DescriptorSetHandle>> {
        let current = *self.pools.last()
            .ok_or_else(|| engine_err!("xero::DescriptorPoolManager", "No descriptor pool available"))?;

        match self.device.allocate_descriptor_sets(current, layouts) {
            Ok(sets) => Ok(sets),
            Err(Error::PoolExhausted) => {
                let new_pool = self.device.create_descriptor_pool(&self.pool_sizes, self.max_sets)?;
                self.pools.push(new_pool);
                engine_info!("xero::DescriptorPoolManager",
                    "Descriptor pool exhausted, created new pool (total: {})",
                    self.pools.len());
                self.device.allocate_descriptor_sets(new_pool, layouts)
                    .map_err(|e| engine_err!("xero::DescriptorPoolManager",
                        "Failed to allocate descriptor set after pool growth: {}", e))
            }
            Err(e) => Err(engine_err!("xero::DescriptorPoolManager",
                "Failed to allocate descriptor set: {}", e)),
        }
    }

    /// Return every set to the pools, keeping only the first pool
    pub fn reset(&mut self) -> Result<()> {
        if self.pools.len() > 1 {
            for pool in self.pools.drain(1..) {
                self.device.destroy_descriptor_pool(pool);
            }
        }
        match self.pools.first() {
            Some(&pool) => self.device.reset_descriptor_pool(pool),
            None => Ok(()),
        }
    }
}

impl Drop for DescriptorPoolManager {
    fn drop(&mut self) {
        for pool in self.pools.drain(..) {
            self.device.destroy_descriptor_pool(pool);
        }
    }
}

#[cfg(test)]
#[path = "pool_manager_tests.rs"]
mod tests;
