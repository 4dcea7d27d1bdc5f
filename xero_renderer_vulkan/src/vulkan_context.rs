/// GpuContext - ready logical device handed to the shader pipeline
///
/// Device, instance and physical-device selection happen outside the
/// shader pipeline. The context only borrows the result: a logical device
/// plus the queue it was created with.

use ash::vk;

/// Shared GPU context for the Vulkan shader device.
///
/// Note: the logical device is owned by whoever created it and must outlive
/// every shader and pool manager built on this context. Dropping the
/// context does not destroy the device.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// Graphics queue, carried for the renderer (descriptor work never submits)
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index, carried for the renderer
    pub graphics_queue_family: u32,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `graphics_queue` - Graphics queue for command submission
    /// * `graphics_queue_family` - Graphics queue family index
    pub fn new(device: ash::Device, graphics_queue: vk::Queue, graphics_queue_family: u32) -> Self {
        Self {
            device,
            graphics_queue,
            graphics_queue_family,
        }
    }

    /// Block until the device has finished all submitted work
    ///
    /// Call before reloading or dropping shaders whose descriptor pools may
    /// still be in use.
    pub fn wait_idle(&self) -> xero_engine::xero::Result<()> {
        unsafe {
            self.device.device_wait_idle()
                .map_err(|e| xero_engine::engine_err!("xero::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }
}
