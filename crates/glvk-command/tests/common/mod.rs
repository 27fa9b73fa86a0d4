#![allow(dead_code)]

use std::sync::Arc;

use ash::vk;
use glvk_core::descriptor::DescriptorSetLayoutBinding;
use glvk_core::objects::SequentialObjects;
use glvk_core::pipeline::{
    ComputePipelineDesc, GraphicsPipelineDesc, Pipeline, PipelineLayout, PushConstantRange,
    ShaderStage, VertexAttributeDesc, VertexBindingDesc, VertexInputState,
};
use glvk_core::reflect::{CompiledShader, PushConstantMember, ShaderCompiler, ShaderResource};
use glvk_core::renderpass::{AttachmentDescription, Framebuffer, RenderPass, SubpassDescription};
use glvk_core::resource::{Buffer, BufferDesc, ImageDesc, ImageView, ImageViewDesc};
use glvk_core::{CoreError, Device, GlvkConfig};
use glvk_protocol::{CmdBuffer, Command};

pub struct FixedCompiler {
    shaders: Vec<CompiledShader>,
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

pub fn shader(
    stage: vk::ShaderStageFlags,
    resources: Vec<ShaderResource>,
    push_constants: Vec<PushConstantMember>,
) -> CompiledShader {
    CompiledShader {
        stage,
        glsl: format!("// {:?}", stage),
        resources,
        push_constants,
    }
}

pub fn make_device_with(config: GlvkConfig, shaders: Vec<CompiledShader>) -> Arc<Device> {
    let objects = Arc::new(SequentialObjects::new());
    Arc::new(Device::new(
        config,
        objects,
        Arc::new(FixedCompiler { shaders }),
    ))
}

/// Vertex, fragment and compute shaders without resources.
pub fn make_device() -> Arc<Device> {
    make_device_with(
        GlvkConfig::default(),
        vec![
            shader(vk::ShaderStageFlags::VERTEX, Vec::new(), Vec::new()),
            shader(vk::ShaderStageFlags::FRAGMENT, Vec::new(), Vec::new()),
            shader(vk::ShaderStageFlags::COMPUTE, Vec::new(), Vec::new()),
        ],
    )
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

pub fn empty_layout(device: &Device) -> Arc<PipelineLayout> {
    device.create_pipeline_layout(Vec::new(), Vec::new()).unwrap()
}

pub fn push_layout(device: &Device, size: u32) -> Arc<PipelineLayout> {
    device
        .create_pipeline_layout(
            Vec::new(),
            vec![PushConstantRange {
                stages: vk::ShaderStageFlags::ALL,
                offset: 0,
                size,
            }],
        )
        .unwrap()
}

fn stage(device: &Device, stage: vk::ShaderStageFlags) -> ShaderStage {
    ShaderStage {
        stage,
        module: device.create_shader_module(vec![0x0723_0203]),
        entry_point: "main".into(),
    }
}

/// One binding at slot 0 with a vec4 position, or no vertex input at all.
pub fn vertex_input(with_buffer: bool) -> VertexInputState {
    if !with_buffer {
        return VertexInputState::default();
    }
    VertexInputState {
        bindings: vec![VertexBindingDesc {
            binding: 0,
            stride: 16,
            per_instance: false,
        }],
        attributes: vec![VertexAttributeDesc {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: 0,
        }],
    }
}

pub fn graphics_pipeline(
    device: &Device,
    layout: &Arc<PipelineLayout>,
    input: VertexInputState,
) -> Arc<Pipeline> {
    let mut desc = GraphicsPipelineDesc::new(
        layout.clone(),
        vec![
            stage(device, vk::ShaderStageFlags::VERTEX),
            stage(device, vk::ShaderStageFlags::FRAGMENT),
        ],
    );
    desc.vertex_input = input;
    desc.dynamic_states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    device.create_graphics_pipeline(&desc).unwrap()
}

pub fn compute_pipeline(device: &Device, layout: &Arc<PipelineLayout>) -> Arc<Pipeline> {
    device
        .create_compute_pipeline(&ComputePipelineDesc {
            flags: vk::PipelineCreateFlags::empty(),
            stage: stage(device, vk::ShaderStageFlags::COMPUTE),
            layout: layout.clone(),
        })
        .unwrap()
}

pub fn buffer(device: &Device, size: u64) -> Arc<Buffer> {
    device
        .create_buffer(BufferDesc {
            size,
            usage: vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::INDEX_BUFFER
                | vk::BufferUsageFlags::TRANSFER_DST,
        })
        .unwrap()
}

/// A buffer bound at `offset` of fresh host-visible memory.
pub fn host_buffer(device: &Device, size: u64, offset: u64) -> Arc<Buffer> {
    let buffer = buffer(device, size);
    let memory = device.allocate_memory(
        size + offset,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    );
    device.bind_buffer_memory(&buffer, &memory, offset).unwrap();
    buffer
}

/// Single-subpass pass over one cleared RGBA8 color attachment, plus its framebuffer.
pub fn color_pass(device: &Device, width: u32, height: u32) -> (Arc<RenderPass>, Arc<Framebuffer>) {
    let render_pass = device
        .create_render_pass(
            vec![AttachmentDescription {
                format: vk::Format::R8G8B8A8_UNORM,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            }],
            vec![SubpassDescription {
                color: vec![Some(0)],
                ..Default::default()
            }],
        )
        .unwrap();
    let image = device
        .create_image(ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        })
        .unwrap();
    let view = device
        .create_image_view(
            &image,
            ImageViewDesc {
                view_type: vk::ImageViewType::TYPE_2D,
                format: vk::Format::R8G8B8A8_UNORM,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
            },
        )
        .unwrap();
    let framebuffer = device
        .create_framebuffer(&render_pass, vec![view], width, height, 1)
        .unwrap();
    (render_pass, framebuffer)
}

pub fn full_area(width: u32, height: u32) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D { width, height },
    }
}

pub fn decode(stream: &CmdBuffer) -> Vec<Command> {
    stream.decoder().collect::<Result<Vec<_>, _>>().unwrap()
}

pub fn names(stream: &CmdBuffer) -> Vec<&'static str> {
    decode(stream).iter().map(|c| c.kind().name()).collect()
}

pub fn color_attachment() -> AttachmentDescription {
    AttachmentDescription {
        format: vk::Format::R8G8B8A8_UNORM,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn color_view(device: &Device, width: u32, height: u32) -> Arc<ImageView> {
    let image = device
        .create_image(ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        })
        .unwrap();
    device
        .create_image_view(
            &image,
            ImageViewDesc {
                view_type: vk::ImageViewType::TYPE_2D,
                format: vk::Format::R8G8B8A8_UNORM,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
            },
        )
        .unwrap()
}
