//! Unit tests for reflection.rs

use crate::error::Error;
use crate::shader::compiler::{CompiledStage, CompiledStages};
use crate::shader::mock_device::MockReflector;
use crate::shader::reflection::*;
use crate::shader::uniform::{ReflectedType, ScalarKind, ShaderUniformType};
use crate::shader::{ShaderStage, ShaderStageFlags};

const RENDERER_BLOCK: &str = "u_Renderer";

fn ubo(name: &str, set: u32, binding: u32, size: u32) -> BufferDeclaration {
    BufferDeclaration {
        name: name.to_string(),
        set,
        binding,
        size,
        member_count: 1,
    }
}

fn member(name: &str, ty: ReflectedType, offset: u32, size: u32) -> BlockMember {
    BlockMember {
        name: name.to_string(),
        ty,
        offset,
        size,
    }
}

fn image(name: &str, set: u32, binding: u32, array_size: u32) -> ImageDeclaration {
    ImageDeclaration {
        name: name.to_string(),
        set,
        binding,
        array_size,
    }
}

fn mat4() -> ReflectedType {
    ReflectedType::Matrix { scalar: ScalarKind::Float32, columns: 4, rows: 4 }
}

fn vec4() -> ReflectedType {
    ReflectedType::Vector(ScalarKind::Float32, 4)
}

/// Vertex block of 64 bytes, fragment block declared up to 112 bytes
fn push_constant_stages() -> (StageResources, StageResources) {
    let vertex = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: "u_Transform".to_string(),
            size: 64,
            members: vec![member("Model", mat4(), 0, 64)],
        }],
        ..Default::default()
    };
    let fragment = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: "u_Material".to_string(),
            size: 112,
            members: vec![
                member("Color", vec4(), 64, 16),
                member("Emission", vec4(), 80, 16),
                member("Roughness", ReflectedType::Scalar(ScalarKind::Float32), 96, 4),
                member("Flags", ReflectedType::Scalar(ScalarKind::UInt32), 100, 4),
            ],
        }],
        ..Default::default()
    };
    (vertex, fragment)
}

fn compiled(stages: &[ShaderStage]) -> CompiledStages {
    stages
        .iter()
        .map(|&stage| (stage, CompiledStage { stage, words: vec![0x0723_0203], from_cache: false }))
        .collect()
}

// ============================================================================
// PUSH CONSTANTS
// ============================================================================

#[test]
fn test_push_constant_offsets_accumulate_across_stages() {
    let (vertex, fragment) = push_constant_stages();
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment).unwrap();

    assert_eq!(
        reflection.push_constant_ranges,
        vec![
            PushConstantRange { stage: ShaderStage::Vertex, offset: 0, size: 64 },
            PushConstantRange { stage: ShaderStage::Fragment, offset: 64, size: 48 },
        ]
    );
}

#[test]
fn test_push_constant_buffers_and_relative_offsets() {
    let (vertex, fragment) = push_constant_stages();
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment).unwrap();

    let transform = &reflection.buffers["u_Transform"];
    assert_eq!(transform.size, 64);
    let model = &transform.uniforms["u_Transform.Model"];
    assert_eq!(model.uniform_type, ShaderUniformType::Mat4);
    assert_eq!(model.offset, 0);

    let material = &reflection.buffers["u_Material"];
    assert_eq!(material.size, 48);
    assert_eq!(material.uniforms.len(), 4);
    assert_eq!(material.uniforms["u_Material.Color"].offset, 0);
    assert_eq!(material.uniforms["u_Material.Emission"].offset, 16);
    assert_eq!(material.uniforms["u_Material.Roughness"].uniform_type, ShaderUniformType::Float);
    assert_eq!(material.uniforms["u_Material.Flags"].offset, 36);
    assert_eq!(material.uniforms["u_Material.Flags"].uniform_type, ShaderUniformType::UInt);
}

#[test]
fn test_members_before_running_offset_are_hidden() {
    let vertex = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: "u_Transform".to_string(),
            size: 64,
            members: vec![member("Model", mat4(), 0, 64)],
        }],
        ..Default::default()
    };
    let fragment = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: "u_Shared".to_string(),
            size: 80,
            members: vec![member("Model", mat4(), 0, 64), member("Tint", vec4(), 64, 16)],
        }],
        ..Default::default()
    };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment).unwrap();

    let shared = &reflection.buffers["u_Shared"];
    assert_eq!(shared.uniforms.len(), 1);
    assert_eq!(shared.uniforms["u_Shared.Tint"].offset, 0);
}

#[test]
fn test_reserved_and_anonymous_blocks_only_reserve_space() {
    let vertex = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: RENDERER_BLOCK.to_string(),
            size: 64,
            members: vec![member("ViewProjection", mat4(), 0, 64)],
        }],
        ..Default::default()
    };
    let fragment = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: String::new(),
            size: 80,
            members: vec![member("Tint", vec4(), 64, 16)],
        }],
        ..Default::default()
    };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment).unwrap();

    assert!(reflection.buffers.is_empty());
    assert_eq!(reflection.push_constant_ranges.len(), 2);
    assert_eq!(reflection.push_constant_ranges[1].offset, 64);
    assert_eq!(reflection.push_constant_ranges[1].size, 16);
}

#[test]
fn test_block_covered_by_earlier_stage_adds_no_range() {
    let (vertex, _) = push_constant_stages();
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &vertex).unwrap();

    assert_eq!(reflection.push_constant_ranges.len(), 1);
    // The re-declared block is still listed, with nothing visible
    let block = &reflection.buffers[&vertex.push_constant_blocks[0].name];
    assert_eq!(block.size, 0);
    assert!(block.uniforms.is_empty());
}

#[test]
fn test_unsupported_member_type_fails() {
    let vertex = StageResources {
        push_constant_blocks: vec![PushConstantBlock {
            name: "u_Bones".to_string(),
            size: 64,
            members: vec![member("Weights", ReflectedType::Other("array".to_string()), 0, 64)],
        }],
        ..Default::default()
    };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    let result = reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex);
    assert!(matches!(result, Err(Error::UnsupportedType(_))));
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_buffer_declared_in_two_stages_keeps_larger_size() {
    let vertex = StageResources { uniform_buffers: vec![ubo("Camera", 0, 0, 64)], ..Default::default() };
    let fragment = StageResources { uniform_buffers: vec![ubo("Camera", 0, 0, 128)], ..Default::default() };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment).unwrap();

    let buffer = &reflection.descriptor_sets[0].uniform_buffers[&0];
    assert_eq!(buffer.size, 128);
    assert_eq!(buffer.declared_in, ShaderStageFlags::VERTEX_FRAGMENT);
    assert_eq!(buffer.stage_flags, ShaderStageFlags::ALL_STAGES);

    let registered = session.uniform_buffer(0, 0).unwrap();
    assert_eq!(registered.size, 128);
}

#[test]
fn test_session_shares_buffers_across_shaders() {
    let first = StageResources { uniform_buffers: vec![ubo("Camera", 0, 0, 64)], ..Default::default() };
    let second = StageResources { uniform_buffers: vec![ubo("View", 0, 0, 32)], ..Default::default() };
    let mut session = ReflectionSession::new();

    let mut a = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut a, ShaderStage::Vertex, &first)
        .unwrap();
    let mut b = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut b, ShaderStage::Vertex, &second)
        .unwrap();

    let shared = &b.descriptor_sets[0].uniform_buffers[&0];
    assert_eq!(shared.name, "Camera");
    assert_eq!(shared.size, 64);
}

#[test]
fn test_storage_buffers_registered_separately() {
    let compute = StageResources {
        uniform_buffers: vec![ubo("Params", 0, 0, 16)],
        storage_buffers: vec![ubo("Particles", 0, 1, 4096)],
        ..Default::default()
    };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut reflection, ShaderStage::Compute, &compute)
        .unwrap();

    assert!(session.storage_buffer(0, 1).is_some());
    assert!(session.uniform_buffer(0, 1).is_none());
    assert_eq!(reflection.descriptor_sets[0].storage_buffers[&1].size, 4096);
}

#[test]
fn test_sets_grow_on_demand() {
    let vertex = StageResources { uniform_buffers: vec![ubo("Lights", 2, 0, 256)], ..Default::default() };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut reflection, ShaderStage::Vertex, &vertex)
        .unwrap();

    assert_eq!(reflection.descriptor_sets.len(), 3);
    assert!(reflection.descriptor_sets[0].is_empty());
    assert!(reflection.descriptor_sets[1].is_empty());
    assert!(!reflection.descriptor_sets[2].is_empty());
}

// ============================================================================
// IMAGES
// ============================================================================

#[test]
fn test_sampled_image_array_size_defaults_to_one() {
    let fragment = StageResources {
        sampled_images: vec![image("u_Albedo", 1, 0, 0), image("u_Textures", 1, 1, 32)],
        ..Default::default()
    };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut reflection, ShaderStage::Fragment, &fragment)
        .unwrap();

    let set = &reflection.descriptor_sets[1];
    assert_eq!(set.image_samplers[&0].array_size, 1);
    assert_eq!(set.image_samplers[&1].array_size, 32);
    assert_eq!(set.image_samplers[&1].stage_flags, ShaderStageFlags::FRAGMENT);

    let textures = &reflection.resources["u_Textures"];
    assert_eq!(textures.register, 1);
    assert_eq!(textures.count, 32);
    assert_eq!(reflection.resources["u_Albedo"].count, 1);
}

#[test]
fn test_image_declared_in_two_stages_unions_visibility() {
    let stage = StageResources { sampled_images: vec![image("u_Shadow", 0, 3, 0)], ..Default::default() };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    let mut reflector = Reflector::new(&mut session, RENDERER_BLOCK);

    reflector.reflect_stage(&mut reflection, ShaderStage::Vertex, &stage).unwrap();
    reflector.reflect_stage(&mut reflection, ShaderStage::Fragment, &stage).unwrap();

    let shadow = &reflection.descriptor_sets[0].image_samplers[&3];
    assert_eq!(shadow.stage, ShaderStage::Vertex);
    assert_eq!(shadow.stage_flags, ShaderStageFlags::VERTEX_FRAGMENT);
}

#[test]
fn test_storage_image_recorded() {
    let compute = StageResources { storage_images: vec![image("o_Output", 0, 0, 0)], ..Default::default() };
    let mut session = ReflectionSession::new();
    let mut reflection = ShaderReflection::default();
    Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_stage(&mut reflection, ShaderStage::Compute, &compute)
        .unwrap();

    let output = &reflection.descriptor_sets[0].storage_images[&0];
    assert_eq!(output.stage_flags, ShaderStageFlags::COMPUTE);
    assert_eq!(reflection.resources["o_Output"].register, 0);
}

// ============================================================================
// WHOLE SHADER
// ============================================================================

#[test]
fn test_reflect_all_is_deterministic_after_clear() {
    let (vertex, fragment) = push_constant_stages();
    let mut backend = MockReflector::new();
    backend.set(ShaderStage::Vertex, StageResources {
        uniform_buffers: vec![ubo("Camera", 0, 0, 64)],
        ..vertex
    });
    backend.set(ShaderStage::Fragment, StageResources {
        sampled_images: vec![image("u_Albedo", 0, 1, 0)],
        ..fragment
    });
    let stages = compiled(&[ShaderStage::Vertex, ShaderStage::Fragment]);

    let mut session = ReflectionSession::new();
    let first = Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_all(&backend, &stages, "Test")
        .unwrap();

    session.clear();
    assert!(session.is_empty());

    let second = Reflector::new(&mut session, RENDERER_BLOCK)
        .reflect_all(&backend, &stages, "Test")
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.push_constant_ranges[1].offset, 64);
}

#[test]
fn test_reflect_all_propagates_backend_failure() {
    let mut backend = MockReflector::new();
    backend.fail_with(Error::ReflectionFailed("bad magic".to_string()));
    let stages = compiled(&[ShaderStage::Vertex]);

    let mut session = ReflectionSession::new();
    let result = Reflector::new(&mut session, RENDERER_BLOCK).reflect_all(&backend, &stages, "Broken");
    assert_eq!(result, Err(Error::ReflectionFailed("bad magic".to_string())));
}
