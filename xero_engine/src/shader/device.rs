/// GPU device capability consumed by the shader pipeline
///
/// The pipeline never talks to a graphics API directly. Backends implement
/// `ShaderDevice` over a ready logical device; GPU objects cross the
/// boundary as opaque `u64` handles.

use crate::error::Result;
use crate::shader::ShaderStageFlags;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw backend handle value
            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

gpu_handle!(
    /// Stage module created from one binary
    ShaderModuleHandle
);
gpu_handle!(
    /// Descriptor-set layout of one set
    DescriptorSetLayoutHandle
);
gpu_handle!(
    /// Descriptor pool
    DescriptorPoolHandle
);
gpu_handle!(
    /// Descriptor set allocated from a pool
    DescriptorSetHandle
);

/// Descriptor kind of a layout binding or pool entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorKind {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
    StorageImage,
}

impl DescriptorKind {
    /// All kinds, in pool-sizing order
    pub const ALL: [DescriptorKind; 4] = [
        DescriptorKind::UniformBuffer,
        DescriptorKind::StorageBuffer,
        DescriptorKind::CombinedImageSampler,
        DescriptorKind::StorageImage,
    ];

    /// Human-readable kind name (used in conflict diagnostics)
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorKind::UniformBuffer => "uniform buffer",
            DescriptorKind::StorageBuffer => "storage buffer",
            DescriptorKind::CombinedImageSampler => "image sampler",
            DescriptorKind::StorageImage => "storage image",
        }
    }
}

/// Number of descriptors of one kind a pool must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolSize {
    pub kind: DescriptorKind,
    pub count: u32,
}

/// One binding of a descriptor-set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBindingDesc {
    pub binding: u32,
    pub kind: DescriptorKind,
    /// Number of descriptors (array size)
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

/// Descriptor-set layout description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetLayoutDesc {
    /// Set index the layout is created for
    pub set: u32,
    /// Bindings sorted by kind then binding index
    pub entries: Vec<LayoutBindingDesc>,
}

/// GPU device context
///
/// Implementations wrap a ready logical device. Pool allocation returns
/// `Error::PoolExhausted` when the pool has no room left so callers can
/// grow a new pool.
pub trait ShaderDevice: Send + Sync {
    /// Create a stage module from binary words
    fn create_shader_module(&self, words: &[u32]) -> Result<ShaderModuleHandle>;

    /// Destroy a stage module
    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    /// Create a descriptor-set layout
    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<DescriptorSetLayoutHandle>;

    /// Destroy a descriptor-set layout
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    /// Create a descriptor pool holding `max_sets` sets
    fn create_descriptor_pool(&self, sizes: &[DescriptorPoolSize], max_sets: u32) -> Result<DescriptorPoolHandle>;

    /// Destroy a descriptor pool (and every set allocated from it)
    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle);

    /// Return every set of the pool to it
    fn reset_descriptor_pool(&self, pool: DescriptorPoolHandle) -> Result<()>;

    /// Allocate one set per layout from `pool`
    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layouts: &[DescriptorSetLayoutHandle],
    ) -> Result<Vec<DescriptorSetHandle>>;
}
