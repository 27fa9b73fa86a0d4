#![allow(dead_code)]

use std::sync::Arc;

use ash::vk;
use glvk_command::{BeginInfo, ClearValue, CommandBuffer, CommandBufferLevel, RenderPassBegin};
use glvk_core::pipeline::{
    GraphicsPipelineDesc, Pipeline, ShaderStage, VertexAttributeDesc, VertexBindingDesc,
    VertexInputState,
};
use glvk_core::reflect::{CompiledShader, ShaderCompiler, ShaderResource};
use glvk_core::renderpass::{AttachmentDescription, Framebuffer, RenderPass, SubpassDescription};
use glvk_core::resource::{Buffer, BufferDesc, ImageDesc, ImageViewDesc};
use glvk_core::{CoreError, Device, GlvkConfig};
use glvk_replay::{CallLog, GlCall, GlContext, Queue};

/// Reports the same resources for every stage it compiles.
#[derive(Default)]
pub struct FixedCompiler {
    pub resources: Vec<ShaderResource>,
}

impl ShaderCompiler for FixedCompiler {
    fn compile(
        &self,
        _spirv: &[u32],
        stage: vk::ShaderStageFlags,
        _entry_point: &str,
    ) -> Result<CompiledShader, CoreError> {
        Ok(CompiledShader {
            stage,
            glsl: format!("// {:?}", stage),
            resources: self.resources.clone(),
            push_constants: Vec::new(),
        })
    }
}

/// A device creating its objects on a recording context, plus a queue for it.
pub struct Harness {
    pub context: Arc<GlContext<CallLog>>,
    pub device: Arc<Device>,
    pub queue: Queue,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GlvkConfig::default())
    }

    pub fn with_config(config: GlvkConfig) -> Self {
        Self::with_compiler(config, FixedCompiler::default())
    }

    pub fn with_compiler(config: GlvkConfig, compiler: FixedCompiler) -> Self {
        let context = Arc::new(GlContext::new(CallLog::new()));
        let device = Arc::new(Device::new(config, context.clone(), Arc::new(compiler)));
        let queue = Queue::new(device.clone());
        Self {
            context,
            device,
            queue,
        }
    }

    /// Calls issued since the previous take, object creation included.
    pub fn take_calls(&self) -> Vec<GlCall> {
        self.context.lock().backend_mut().take_calls()
    }

    pub fn buffer_contents(&self, buffer: &Buffer) -> Vec<u8> {
        self.context
            .lock()
            .backend()
            .buffer_contents(buffer.gl_name)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    pub fn submit(&self, cmd: &CommandBuffer) -> glvk_replay::ReplayStats {
        self.queue.submit(cmd, &self.context).unwrap()
    }
}

pub fn stage(device: &Device, stage: vk::ShaderStageFlags) -> ShaderStage {
    ShaderStage {
        stage,
        module: device.create_shader_module(vec![0x0723_0203]),
        entry_point: "main".into(),
    }
}

/// One vec4 position per vertex from binding 0, or no vertex input.
pub fn graphics_pipeline(device: &Device, with_input: bool) -> Arc<Pipeline> {
    let layout = device
        .create_pipeline_layout(Vec::new(), Vec::new())
        .unwrap();
    let mut desc = GraphicsPipelineDesc::new(
        layout,
        vec![
            stage(device, vk::ShaderStageFlags::VERTEX),
            stage(device, vk::ShaderStageFlags::FRAGMENT),
        ],
    );
    if with_input {
        desc.vertex_input = VertexInputState {
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
        };
    }
    desc.dynamic_states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    device.create_graphics_pipeline(&desc).unwrap()
}

pub fn buffer(device: &Device, size: u64) -> Arc<Buffer> {
    device
        .create_buffer(BufferDesc {
            size,
            usage: vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::TRANSFER_SRC
                | vk::BufferUsageFlags::TRANSFER_DST,
        })
        .unwrap()
}

/// A buffer bound at `offset` of fresh memory with `properties`.
pub fn bound_buffer(
    device: &Device,
    size: u64,
    offset: u64,
    properties: vk::MemoryPropertyFlags,
) -> Arc<Buffer> {
    let buffer = buffer(device, size);
    let memory = device.allocate_memory(size + offset, properties);
    device.bind_buffer_memory(&buffer, &memory, offset).unwrap();
    buffer
}

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

/// A recorded frame: one pass drawing `draws` triangles with `pipeline`,
/// taking vertices from `vertices` when given.
pub fn frame(
    device: &Arc<Device>,
    info: BeginInfo,
    pipeline: &Arc<Pipeline>,
    vertices: Option<&Arc<Buffer>>,
    draws: u32,
) -> CommandBuffer {
    let (render_pass, framebuffer) = color_pass(device, 32, 32);
    let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
    cmd.begin(info).unwrap();
    cmd.begin_render_pass(&RenderPassBegin {
        render_pass,
        framebuffer,
        render_area: vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: 32,
                height: 32,
            },
        },
        clear_values: vec![ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
    })
    .unwrap();
    cmd.bind_pipeline(pipeline).unwrap();
    if let Some(vertices) = vertices {
        cmd.bind_vertex_buffers(0, &[(vertices.clone(), 0)]).unwrap();
    }
    for i in 0..draws {
        cmd.draw(3, 1, 3 * i, 0).unwrap();
    }
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
    cmd
}

pub fn position<F: Fn(&GlCall) -> bool>(calls: &[GlCall], f: F) -> Option<usize> {
    calls.iter().position(f)
}
