#![allow(dead_code)]

use std::sync::Arc;

use ash::vk;
use glvk_core::descriptor::DescriptorSetLayoutBinding;
use glvk_core::diagnostics::CollectingDiagnostics;
use glvk_core::objects::SequentialObjects;
use glvk_core::reflect::{CompiledShader, ResourceCategory, ShaderCompiler, ShaderResource};
use glvk_core::{CoreError, Device, GlvkConfig};

/// Returns a canned reflection result per stage.
pub struct FixedCompiler {
    shaders: Vec<CompiledShader>,
}

impl FixedCompiler {
    pub fn new(shaders: Vec<CompiledShader>) -> Self {
        Self { shaders }
    }
}

impl ShaderCompiler for FixedCompiler {
    fn compile(
        &self,
        _spirv: &[u32],
        stage: vk::ShaderStageFlags,
        _entry_point: &str,
    ) -> Result<CompiledShader, CoreError> {
        self.shaders
            .iter()
            .find(|s| s.stage == stage)
            .cloned()
            .ok_or_else(|| CoreError::ShaderCompilation(format!("no shader for {:?}", stage)))
    }
}

pub struct TestDevice {
    pub device: Device,
    pub objects: Arc<SequentialObjects>,
    pub diagnostics: Arc<CollectingDiagnostics>,
}

pub fn make_device(config: GlvkConfig, shaders: Vec<CompiledShader>) -> TestDevice {
    let objects = Arc::new(SequentialObjects::new());
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let device = Device::new(config, objects.clone(), Arc::new(FixedCompiler::new(shaders)))
        .with_diagnostics(diagnostics.clone());
    TestDevice {
        device,
        objects,
        diagnostics,
    }
}

pub fn shader(stage: vk::ShaderStageFlags, resources: Vec<ShaderResource>) -> CompiledShader {
    CompiledShader {
        stage,
        glsl: format!("// {:?}", stage),
        resources,
        push_constants: Vec::new(),
    }
}

pub fn resource(
    name: &str,
    category: ResourceCategory,
    set: u32,
    binding: u32,
    array_size: u32,
) -> ShaderResource {
    ShaderResource {
        name: name.to_string(),
        category,
        set,
        binding,
        array_size,
        backend_binding: binding,
    }
}

pub fn layout_binding(
    binding: u32,
    descriptor_type: vk::DescriptorType,
    count: u32,
) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding {
        binding,
        descriptor_type,
        count,
        stages: vk::ShaderStageFlags::ALL,
    }
}
