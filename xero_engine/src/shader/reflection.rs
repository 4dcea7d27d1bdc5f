/// Reflection: per-stage resource declarations merged into one
/// descriptor-set model
///
/// Backends implement `StageReflector` to turn binary words into
/// `StageResources`. The `Reflector` merges those declarations stage by
/// stage into a `ShaderReflection`, deduplicating buffers through a
/// caller-owned `ReflectionSession`.

use std::collections::BTreeMap;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::shader::compiler::CompiledStages;
use crate::shader::descriptor::WriteDescriptorTemplate;
use crate::shader::uniform::{
    ReflectedType, ShaderBuffer, ShaderResourceDeclaration, ShaderUniform, ShaderUniformType,
};
use crate::shader::{ShaderStage, ShaderStageFlags};
use crate::engine_trace;

// ============================================================================
// Per-stage declarations (backend output)
// ============================================================================

/// Uniform or storage buffer declared by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDeclaration {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    /// Declared struct size in bytes
    pub size: u32,
    pub member_count: u32,
}

/// Member of a push-constant block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMember {
    pub name: String,
    pub ty: ReflectedType,
    /// Absolute offset inside the block
    pub offset: u32,
    pub size: u32,
}

/// Push-constant block declared by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantBlock {
    /// Instance name (empty for anonymous blocks)
    pub name: String,
    /// Declared struct size in bytes
    pub size: u32,
    pub members: Vec<BlockMember>,
}

/// Sampled or storage image declared by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDeclaration {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    /// Array length, 0 when not arrayed
    pub array_size: u32,
}

/// Everything one stage binary declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageResources {
    pub uniform_buffers: Vec<BufferDeclaration>,
    pub storage_buffers: Vec<BufferDeclaration>,
    pub push_constant_blocks: Vec<PushConstantBlock>,
    pub sampled_images: Vec<ImageDeclaration>,
    pub storage_images: Vec<ImageDeclaration>,
}

/// Backend binary introspection (spirq for SPIR-V)
pub trait StageReflector: Send + Sync {
    /// Extract the resource declarations of one stage binary
    fn reflect(&self, stage: ShaderStage, words: &[u32]) -> Result<StageResources>;
}

// ============================================================================
// Merged model
// ============================================================================

/// Uniform or storage buffer binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    /// Largest size declared by any stage
    pub size: u32,
    /// Stages that declared the buffer
    pub declared_in: ShaderStageFlags,
    /// Layout visibility (buffers are visible to all stages)
    pub stage_flags: ShaderStageFlags,
}

/// Combined image sampler or storage image binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    /// Number of descriptors, at least 1
    pub array_size: u32,
    /// Stage that declared the image first
    pub stage: ShaderStage,
    /// Layout visibility (every stage that declared the image)
    pub stage_flags: ShaderStageFlags,
}

/// Push-constant range of one stage
///
/// Only ranges with a non-zero size are recorded, so a block fully covered
/// by earlier stages can appear in `shader_buffers` without a range of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stage: ShaderStage,
    pub offset: u32,
    pub size: u32,
}

/// All bindings of one descriptor set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDescriptorSet {
    pub uniform_buffers: BTreeMap<u32, BufferBinding>,
    pub storage_buffers: BTreeMap<u32, BufferBinding>,
    pub image_samplers: BTreeMap<u32, ImageBinding>,
    pub storage_images: BTreeMap<u32, ImageBinding>,
    /// Write templates keyed by resource name (filled by the descriptor builder)
    pub write_descriptors: BTreeMap<String, WriteDescriptorTemplate>,
}

impl ShaderDescriptorSet {
    /// True when the set holds no binding of any kind
    pub fn is_empty(&self) -> bool {
        self.uniform_buffers.is_empty()
            && self.storage_buffers.is_empty()
            && self.image_samplers.is_empty()
            && self.storage_images.is_empty()
    }
}

/// Merged reflection result of a whole shader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderReflection {
    /// Indexed by set number; sets in between undeclared ones stay empty
    pub descriptor_sets: Vec<ShaderDescriptorSet>,
    /// Flat name -> (binding, count) table for images
    pub resources: FxHashMap<String, ShaderResourceDeclaration>,
    /// User-visible push-constant buffers
    pub buffers: FxHashMap<String, ShaderBuffer>,
    /// Push-constant ranges in stage processing order
    pub push_constant_ranges: Vec<PushConstantRange>,
}

impl ShaderReflection {
    /// Descriptor set `set`, growing the set list on demand
    fn descriptor_set_mut(&mut self, set: u32) -> &mut ShaderDescriptorSet {
        let index = set as usize;
        if index >= self.descriptor_sets.len() {
            self.descriptor_sets.resize_with(index + 1, ShaderDescriptorSet::default);
        }
        &mut self.descriptor_sets[index]
    }
}

// ============================================================================
// Buffer deduplication registry
// ============================================================================

/// Buffer registry shared by every shader reflected in one session
///
/// Buffers are keyed by (set, binding) across shaders: the first
/// declaration names the buffer and later ones can only grow it. Sessions
/// usually live as long as the process; `clear` starts over.
#[derive(Debug, Default)]
pub struct ReflectionSession {
    uniform_buffers: BTreeMap<(u32, u32), BufferBinding>,
    storage_buffers: BTreeMap<(u32, u32), BufferBinding>,
}

impl ReflectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every registered buffer
    pub fn clear(&mut self) {
        self.uniform_buffers.clear();
        self.storage_buffers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.uniform_buffers.is_empty() && self.storage_buffers.is_empty()
    }

    /// Registered uniform buffer at (set, binding)
    pub fn uniform_buffer(&self, set: u32, binding: u32) -> Option<&BufferBinding> {
        self.uniform_buffers.get(&(set, binding))
    }

    /// Registered storage buffer at (set, binding)
    pub fn storage_buffer(&self, set: u32, binding: u32) -> Option<&BufferBinding> {
        self.storage_buffers.get(&(set, binding))
    }

    fn register(
        registry: &mut BTreeMap<(u32, u32), BufferBinding>,
        declaration: &BufferDeclaration,
        stage: ShaderStage,
    ) -> BufferBinding {
        let buffer = registry
            .entry((declaration.set, declaration.binding))
            .and_modify(|existing| {
                existing.size = existing.size.max(declaration.size);
                existing.declared_in |= stage.flag();
            })
            .or_insert_with(|| BufferBinding {
                name: declaration.name.clone(),
                set: declaration.set,
                binding: declaration.binding,
                size: declaration.size,
                declared_in: stage.flag(),
                stage_flags: ShaderStageFlags::ALL_STAGES,
            });
        buffer.clone()
    }
}

// ============================================================================
// Reflector
// ============================================================================

/// Merges stage declarations into a `ShaderReflection`
pub struct Reflector<'a> {
    session: &'a mut ReflectionSession,
    renderer_block_name: &'a str,
}

impl<'a> Reflector<'a> {
    /// `renderer_block_name` is the push-constant block reserved for the renderer
    pub fn new(session: &'a mut ReflectionSession, renderer_block_name: &'a str) -> Self {
        Self { session, renderer_block_name }
    }

    /// Reflect every compiled stage in processing order
    pub fn reflect_all(
        &mut self,
        backend: &dyn StageReflector,
        stages: &CompiledStages,
        shader_name: &str,
    ) -> Result<ShaderReflection> {
        let mut reflection = ShaderReflection::default();
        for (&stage, compiled) in stages {
            let resources = backend.reflect(stage, &compiled.words)?;
            engine_trace!("xero::Reflector", "Reflecting {} stage of '{}'", stage.marker_name(), shader_name);
            self.reflect_stage(&mut reflection, stage, &resources)?;
        }
        Ok(reflection)
    }

    /// Merge one stage's declarations into `reflection`
    pub fn reflect_stage(
        &mut self,
        reflection: &mut ShaderReflection,
        stage: ShaderStage,
        resources: &StageResources,
    ) -> Result<()> {
        for declaration in &resources.uniform_buffers {
            let buffer = ReflectionSession::register(&mut self.session.uniform_buffers, declaration, stage);
            engine_trace!("xero::Reflector", "  uniform buffer {} ({}, {}) members: {} size: {}",
                declaration.name, declaration.set, declaration.binding, declaration.member_count, buffer.size);
            reflection
                .descriptor_set_mut(declaration.set)
                .uniform_buffers
                .insert(declaration.binding, buffer);
        }

        for declaration in &resources.storage_buffers {
            let buffer = ReflectionSession::register(&mut self.session.storage_buffers, declaration, stage);
            engine_trace!("xero::Reflector", "  storage buffer {} ({}, {}) members: {} size: {}",
                declaration.name, declaration.set, declaration.binding, declaration.member_count, buffer.size);
            reflection
                .descriptor_set_mut(declaration.set)
                .storage_buffers
                .insert(declaration.binding, buffer);
        }

        for block in &resources.push_constant_blocks {
            self.reflect_push_constant_block(reflection, stage, block)?;
        }

        for image in &resources.sampled_images {
            let array_size = image.array_size.max(1);
            let set = reflection.descriptor_set_mut(image.set);
            Self::merge_image(&mut set.image_samplers, image, stage, array_size);
            reflection.resources.insert(image.name.clone(), ShaderResourceDeclaration {
                name: image.name.clone(),
                register: image.binding,
                count: array_size,
            });
            engine_trace!("xero::Reflector", "  sampled image {} ({}, {}) array size: {}",
                image.name, image.set, image.binding, array_size);
        }

        for image in &resources.storage_images {
            let set = reflection.descriptor_set_mut(image.set);
            Self::merge_image(&mut set.storage_images, image, stage, 1);
            reflection.resources.insert(image.name.clone(), ShaderResourceDeclaration {
                name: image.name.clone(),
                register: image.binding,
                count: 1,
            });
            engine_trace!("xero::Reflector", "  storage image {} ({}, {})",
                image.name, image.set, image.binding);
        }

        Ok(())
    }

    fn reflect_push_constant_block(
        &mut self,
        reflection: &mut ShaderReflection,
        stage: ShaderStage,
        block: &PushConstantBlock,
    ) -> Result<()> {
        let buffer_offset = reflection
            .push_constant_ranges
            .last()
            .map(|range| range.offset + range.size)
            .unwrap_or(0);
        let size = block.size.saturating_sub(buffer_offset);

        // A block fully covered by earlier stages adds nothing to the layout
        if size > 0 {
            reflection.push_constant_ranges.push(PushConstantRange {
                stage,
                offset: buffer_offset,
                size,
            });
        }

        engine_trace!("xero::Reflector", "  push constant block '{}' offset: {} size: {} members: {}",
            block.name, buffer_offset, size, block.members.len());

        if block.name.is_empty() || block.name == self.renderer_block_name {
            return Ok(());
        }

        let mut buffer = ShaderBuffer {
            name: block.name.clone(),
            size,
            uniforms: FxHashMap::default(),
        };

        for member in &block.members {
            if member.offset < buffer_offset {
                continue;
            }
            let uniform_type = ShaderUniformType::from_reflected(&member.ty)?;
            let uniform_name = format!("{}.{}", block.name, member.name);
            buffer.uniforms.insert(uniform_name.clone(), ShaderUniform {
                name: uniform_name,
                uniform_type,
                size: member.size,
                offset: member.offset - buffer_offset,
            });
        }

        reflection.buffers.insert(block.name.clone(), buffer);
        Ok(())
    }

    fn merge_image(
        images: &mut BTreeMap<u32, ImageBinding>,
        image: &ImageDeclaration,
        stage: ShaderStage,
        array_size: u32,
    ) {
        let stage_flags = match images.get(&image.binding) {
            Some(existing) if existing.name == image.name => existing.stage_flags | stage.flag(),
            _ => stage.flag(),
        };
        let first_stage = match images.get(&image.binding) {
            Some(existing) if existing.name == image.name => existing.stage,
            _ => stage,
        };
        images.insert(image.binding, ImageBinding {
            name: image.name.clone(),
            set: image.set,
            binding: image.binding,
            array_size,
            stage: first_stage,
            stage_flags,
        });
    }
}

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
