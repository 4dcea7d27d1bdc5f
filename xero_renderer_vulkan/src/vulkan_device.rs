/// VulkanShaderDevice - ShaderDevice implementation over ash
///
/// Creates shader modules, descriptor-set layouts, descriptor pools and
/// descriptor sets on the context's logical device. Handles cross the
/// engine boundary as raw `u64` values.

use std::sync::Arc;
use ash::vk::{self, Handle};
use xero_engine::xero::{Error, Result};
use xero_engine::xero::shader::{
    DescriptorKind, DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetHandle,
    DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, ShaderDevice, ShaderModuleHandle,
    ShaderStage, ShaderStageFlags,
};
use xero_engine::{engine_debug, engine_err, engine_error};
use crate::vulkan_context::GpuContext;

/// Convert DescriptorKind to Vulkan descriptor type
pub fn descriptor_kind_to_vk(kind: DescriptorKind) -> vk::DescriptorType {
    match kind {
        DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorKind::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
    }
}

/// Convert ShaderStageFlags to Vulkan shader stage flags
pub fn stage_flags_to_vk(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut vk_flags = vk::ShaderStageFlags::empty();
    if flags.contains(ShaderStageFlags::VERTEX) { vk_flags |= vk::ShaderStageFlags::VERTEX; }
    if flags.contains(ShaderStageFlags::FRAGMENT) { vk_flags |= vk::ShaderStageFlags::FRAGMENT; }
    if flags.contains(ShaderStageFlags::COMPUTE) { vk_flags |= vk::ShaderStageFlags::COMPUTE; }
    vk_flags
}

/// Convert a single ShaderStage to Vulkan shader stage flags
pub fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    stage_flags_to_vk(stage.flag())
}

/// Map an allocation failure to the engine error taxonomy
fn allocation_error(result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => Error::PoolExhausted,
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
        other => Error::BackendError(format!("Failed to allocate descriptor sets: {:?}", other)),
    }
}

/// Vulkan shader device
pub struct VulkanShaderDevice {
    context: Arc<GpuContext>,
}

impl VulkanShaderDevice {
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }
}

impl ShaderDevice for VulkanShaderDevice {
    fn create_shader_module(&self, words: &[u32]) -> Result<ShaderModuleHandle> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(words);
        let module = unsafe {
            self.context.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("xero::vulkan", "Failed to create shader module: {:?}", e))?
        };
        Ok(ShaderModuleHandle(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe {
            self.context.device.destroy_shader_module(vk::ShaderModule::from_raw(module.raw()), None);
        }
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc.entries.iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(descriptor_kind_to_vk(entry.kind))
                    .descriptor_count(entry.count)
                    .stage_flags(stage_flags_to_vk(entry.stage_flags))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe {
            self.context.device.create_descriptor_set_layout(&create_info, None)
                .map_err(|e| engine_err!("xero::vulkan",
                    "Failed to create descriptor set layout for set {}: {:?}", desc.set, e))?
        };

        engine_debug!("xero::vulkan", "Created descriptor set layout for set {} ({} bindings)",
            desc.set, bindings.len());
        Ok(DescriptorSetLayoutHandle(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe {
            self.context.device.destroy_descriptor_set_layout(
                vk::DescriptorSetLayout::from_raw(layout.raw()), None);
        }
    }

    fn create_descriptor_pool(&self, sizes: &[DescriptorPoolSize], max_sets: u32) -> Result<DescriptorPoolHandle> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = sizes.iter()
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_kind_to_vk(size.kind),
                descriptor_count: size.count,
            })
            .collect();

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);

        let pool = unsafe {
            self.context.device.create_descriptor_pool(&create_info, None)
                .map_err(|e| {
                    engine_error!("xero::vulkan", "Failed to create descriptor pool: {:?}", e);
                    match e {
                        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
                        other => Error::BackendError(format!("Failed to create descriptor pool: {:?}", other)),
                    }
                })?
        };
        Ok(DescriptorPoolHandle(pool.as_raw()))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        unsafe {
            self.context.device.destroy_descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()), None);
        }
    }

    fn reset_descriptor_pool(&self, pool: DescriptorPoolHandle) -> Result<()> {
        unsafe {
            self.context.device
                .reset_descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()), vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| engine_err!("xero::vulkan", "Failed to reset descriptor pool: {:?}", e))
        }
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> Result<Vec<DescriptorSetHandle>> {
        let vk_layouts: Vec<vk::DescriptorSetLayout> = layouts.iter()
            .map(|layout| vk::DescriptorSetLayout::from_raw(layout.raw()))
            .collect();

        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk::DescriptorPool::from_raw(pool.raw()))
            .set_layouts(&vk_layouts);

        let sets = unsafe {
            self.context.device.allocate_descriptor_sets(&allocate_info)
                .map_err(allocation_error)?
        };
        Ok(sets.into_iter().map(|set| DescriptorSetHandle(set.as_raw())).collect())
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
