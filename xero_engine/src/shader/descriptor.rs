/// Descriptor-set builder
///
/// Turns the merged reflection model into per-set pool sizing, layout
/// descriptions and write templates, then creates the layouts through the
/// `ShaderDevice`.

use std::collections::BTreeMap;
use crate::error::{Error, Result};
use crate::shader::device::{
    DescriptorKind, DescriptorPoolHandle, DescriptorPoolSize, DescriptorSetHandle,
    DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, LayoutBindingDesc, ShaderDevice,
};
use crate::shader::reflection::{ShaderDescriptorSet, ShaderReflection};
use crate::{engine_debug, engine_error};

/// Largest number of instances one `create_descriptor_sets_n` pool may hold
pub const MAX_SET_INSTANCES: u32 = 65536;

/// Pre-filled write record for one named resource
///
/// The renderer copies it and points it at the actual buffer or image view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDescriptorTemplate {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
    /// Number of descriptors written (array size)
    pub count: u32,
}

/// Deferred allocation: the layout to allocate, no pool attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetAllocateRequest {
    pub set: u32,
    pub layout: DescriptorSetLayoutHandle,
}

/// Descriptor sets allocated for one material instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialDescriptorSet {
    /// Pool the sets were allocated from (owned by the shader)
    pub pool: Option<DescriptorPoolHandle>,
    pub descriptor_sets: Vec<DescriptorSetHandle>,
}

/// Layouts and pool sizing of every non-empty set of a shader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorLayouts {
    pub layouts: BTreeMap<u32, DescriptorSetLayoutHandle>,
    pub pool_sizes: BTreeMap<u32, Vec<DescriptorPoolSize>>,
}

// ============================================================================
// Per-set derivations
// ============================================================================

/// Pool sizing for `instances` copies of one set
///
/// Image samplers count array elements; kinds the set does not use are
/// left out. A count that does not fit in `u32` is `Error::InvalidResource`.
pub fn pool_sizes(set: &ShaderDescriptorSet, instances: u32) -> Result<Vec<DescriptorPoolSize>> {
    let overflow = || Error::InvalidResource(format!(
        "descriptor count overflow sizing a pool for {} instance(s)", instances
    ));

    let sampler_count = set.image_samplers.values()
        .try_fold(0u32, |total, image| total.checked_add(image.array_size))
        .ok_or_else(overflow)?;
    let counts = [
        (DescriptorKind::UniformBuffer, u32::try_from(set.uniform_buffers.len()).map_err(|_| overflow())?),
        (DescriptorKind::StorageBuffer, u32::try_from(set.storage_buffers.len()).map_err(|_| overflow())?),
        (DescriptorKind::CombinedImageSampler, sampler_count),
        (DescriptorKind::StorageImage, u32::try_from(set.storage_images.len()).map_err(|_| overflow())?),
    ];

    counts
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .map(|(kind, count)| {
            count.checked_mul(instances)
                .map(|count| DescriptorPoolSize { kind, count })
                .ok_or_else(overflow)
        })
        .collect()
}

/// Reject a binding index claimed by more than one descriptor kind
pub fn check_binding_conflicts(set_index: u32, set: &ShaderDescriptorSet) -> Result<()> {
    let mut claimed: BTreeMap<u32, DescriptorKind> = BTreeMap::new();

    let bindings = set.uniform_buffers.keys().map(|&b| (b, DescriptorKind::UniformBuffer))
        .chain(set.storage_buffers.keys().map(|&b| (b, DescriptorKind::StorageBuffer)))
        .chain(set.image_samplers.keys().map(|&b| (b, DescriptorKind::CombinedImageSampler)))
        .chain(set.storage_images.keys().map(|&b| (b, DescriptorKind::StorageImage)));

    for (binding, kind) in bindings {
        if let Some(first) = claimed.insert(binding, kind) {
            engine_error!("xero::DescriptorBuilder",
                "Binding {} in set {} is already present as {} (redeclared as {})",
                binding, set_index, first.name(), kind.name());
            return Err(Error::BindingConflict {
                set: set_index,
                binding,
                first: first.name(),
                second: kind.name(),
            });
        }
    }
    Ok(())
}

/// Layout description of one set
pub fn layout_desc(set_index: u32, set: &ShaderDescriptorSet) -> DescriptorSetLayoutDesc {
    let mut entries = Vec::new();

    for (&binding, buffer) in &set.uniform_buffers {
        entries.push(LayoutBindingDesc {
            binding,
            kind: DescriptorKind::UniformBuffer,
            count: 1,
            stage_flags: buffer.stage_flags,
        });
    }
    for (&binding, buffer) in &set.storage_buffers {
        entries.push(LayoutBindingDesc {
            binding,
            kind: DescriptorKind::StorageBuffer,
            count: 1,
            stage_flags: buffer.stage_flags,
        });
    }
    for (&binding, image) in &set.image_samplers {
        entries.push(LayoutBindingDesc {
            binding,
            kind: DescriptorKind::CombinedImageSampler,
            count: image.array_size,
            stage_flags: image.stage_flags,
        });
    }
    for (&binding, image) in &set.storage_images {
        entries.push(LayoutBindingDesc {
            binding,
            kind: DescriptorKind::StorageImage,
            count: 1,
            stage_flags: image.stage_flags,
        });
    }

    DescriptorSetLayoutDesc { set: set_index, entries }
}

/// Write templates of one set, keyed by resource name
pub fn write_templates(set_index: u32, set: &ShaderDescriptorSet) -> BTreeMap<String, WriteDescriptorTemplate> {
    let desc = layout_desc(set_index, set);
    let names = set.uniform_buffers.values().map(|b| &b.name)
        .chain(set.storage_buffers.values().map(|b| &b.name))
        .chain(set.image_samplers.values().map(|i| &i.name))
        .chain(set.storage_images.values().map(|i| &i.name));

    names
        .zip(desc.entries.iter())
        .map(|(name, entry)| {
            (name.clone(), WriteDescriptorTemplate {
                name: name.clone(),
                set: set_index,
                binding: entry.binding,
                kind: entry.kind,
                count: entry.count,
            })
        })
        .collect()
}

// ============================================================================
// Layout creation
// ============================================================================

/// Build pool sizing, write templates and layouts for every non-empty set
///
/// Write templates are stored back into `reflection`. On failure every
/// layout created so far is destroyed again.
pub fn create_descriptor_layouts(
    device: &dyn ShaderDevice,
    reflection: &mut ShaderReflection,
    shader_name: &str,
) -> Result<DescriptorLayouts> {
    let mut output = DescriptorLayouts::default();

    for (index, set) in reflection.descriptor_sets.iter_mut().enumerate() {
        if set.is_empty() {
            continue;
        }
        let set_index = index as u32;

        let result = check_binding_conflicts(set_index, set)
            .and_then(|_| pool_sizes(set, 1))
            .and_then(|sizes| {
                let desc = layout_desc(set_index, set);
                device.create_descriptor_set_layout(&desc).map(|layout| (layout, sizes))
            });

        let (layout, sizes) = match result {
            Ok(created) => created,
            Err(e) => {
                for (_, layout) in std::mem::take(&mut output.layouts) {
                    device.destroy_descriptor_set_layout(layout);
                }
                return Err(e);
            }
        };

        set.write_descriptors = write_templates(set_index, set);
        output.pool_sizes.insert(set_index, sizes);
        output.layouts.insert(set_index, layout);

        engine_debug!("xero::DescriptorBuilder",
            "Created descriptor set layout for set {} of '{}' ({} UB, {} SB, {} IS, {} SI)",
            set_index, shader_name,
            set.uniform_buffers.len(), set.storage_buffers.len(),
            set.image_samplers.len(), set.storage_images.len());
    }

    Ok(output)
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
