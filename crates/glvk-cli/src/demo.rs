//! A small recorded frame: one triangle drawn with a tinted fragment
//! shader, then a fill and a copy into host-visible memory.

use std::sync::Arc;

use anyhow::Context;
use ash::vk;
use glvk_command::{
    BeginInfo, BufferCopy, ClearValue, CommandBuffer, CommandBufferLevel, RenderPassBegin,
};
use glvk_core::pipeline::{
    GraphicsPipelineDesc, PushConstantRange, ShaderStage, VertexAttributeDesc, VertexBindingDesc,
    VertexInputState,
};
use glvk_core::reflect::{CompiledShader, PushConstantMember, ShaderCompiler};
use glvk_core::renderpass::{AttachmentDescription, SubpassDescription};
use glvk_core::resource::{Buffer, BufferDesc, ImageDesc, ImageViewDesc};
use glvk_core::{CoreError, Device, GlvkConfig};
use glvk_protocol::UniformType;
use glvk_replay::{CallLog, GlCall, GlContext, Queue, ReplayStats};
use tracing::info;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const TINT: [f32; 4] = [1.0, 0.5, 0.25, 1.0];
const TRIANGLE: [[f32; 4]; 3] = [
    [-0.5, -0.5, 0.0, 1.0],
    [0.5, -0.5, 0.0, 1.0],
    [0.0, 0.5, 0.0, 1.0],
];
/// Word written over the head of the readback buffer (1.0f32).
pub const FILL_WORD: u32 = 0x3F80_0000;
pub const FILL_BYTES: u64 = 16;

const VERTEX_GLSL: &str = "#version 450
layout(location = 0) in vec4 position;
void main() { gl_Position = position; }
";

const FRAGMENT_GLSL: &str = "#version 450
layout(location = 0) uniform vec4 tint;
layout(location = 0) out vec4 color;
void main() { color = tint; }
";

/// Stands in for the SPIR-V cross-compiler with fixed GLSL per stage.
struct DemoCompiler;

impl ShaderCompiler for DemoCompiler {
    fn compile(
        &self,
        _spirv: &[u32],
        stage: vk::ShaderStageFlags,
        _entry_point: &str,
    ) -> Result<CompiledShader, CoreError> {
        let (glsl, push_constants) = match stage {
            vk::ShaderStageFlags::VERTEX => (VERTEX_GLSL, Vec::new()),
            vk::ShaderStageFlags::FRAGMENT => (
                FRAGMENT_GLSL,
                vec![PushConstantMember {
                    name: "tint".into(),
                    offset: 0,
                    ty: UniformType::Vec4,
                    array_size: 1,
                    location: 0,
                }],
            ),
            other => {
                return Err(CoreError::ShaderCompilation(format!(
                    "demo has no {:?} shader",
                    other
                )))
            }
        };
        Ok(CompiledShader {
            stage,
            glsl: glsl.to_string(),
            resources: Vec::new(),
            push_constants,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DemoOptions {
    pub draws: u32,
    pub one_time: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            draws: 1,
            one_time: true,
        }
    }
}

/// What replaying the demo frame did.
#[derive(Debug)]
pub struct DemoReport {
    pub stats: ReplayStats,
    pub calls: Vec<GlCall>,
    /// Host view of the readback buffer after invalidation.
    pub readback: Vec<u8>,
}

pub struct Demo {
    pub context: Arc<GlContext<CallLog>>,
    pub device: Arc<Device>,
    pub command_buffer: CommandBuffer,
    readback: Arc<Buffer>,
}

fn float_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn triangle_floats() -> Vec<f32> {
    TRIANGLE.iter().flatten().copied().collect()
}

fn create_buffer(device: &Device, size: u64, properties: vk::MemoryPropertyFlags) -> anyhow::Result<Arc<Buffer>> {
    let buffer = device.create_buffer(BufferDesc {
        size,
        usage: vk::BufferUsageFlags::VERTEX_BUFFER
            | vk::BufferUsageFlags::TRANSFER_SRC
            | vk::BufferUsageFlags::TRANSFER_DST,
    })?;
    let memory = device.allocate_memory(size, properties);
    device.bind_buffer_memory(&buffer, &memory, 0)?;
    Ok(buffer)
}

impl Demo {
    /// Create the device objects and record the frame.
    pub fn record(config: GlvkConfig, options: DemoOptions) -> anyhow::Result<Self> {
        let context = Arc::new(GlContext::new(CallLog::new()));
        let device = Arc::new(Device::new(config, context.clone(), Arc::new(DemoCompiler)));

        // ── Resources ──
        let vertices = create_buffer(
            &device,
            std::mem::size_of_val(&TRIANGLE) as u64,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        if let Some(bound) = vertices.memory() {
            let mut mapped = bound.memory.lock(0, vk::WHOLE_SIZE)?;
            mapped
                .as_mut_slice()
                .copy_from_slice(&float_bytes(&triangle_floats()));
        }
        let readback = create_buffer(
            &device,
            FILL_BYTES + vertices.size,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        )?;

        let render_pass = device.create_render_pass(
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
        )?;
        let image = device.create_image(ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: WIDTH,
                height: HEIGHT,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        })?;
        let view = device.create_image_view(
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
        )?;
        let framebuffer = device.create_framebuffer(&render_pass, vec![view], WIDTH, HEIGHT, 1)?;

        // ── Pipeline ──
        let layout = device.create_pipeline_layout(
            Vec::new(),
            vec![PushConstantRange {
                stages: vk::ShaderStageFlags::FRAGMENT,
                offset: 0,
                size: 16,
            }],
        )?;
        let shader_stage = |stage| ShaderStage {
            stage,
            module: device.create_shader_module(vec![0x0723_0203]),
            entry_point: "main".into(),
        };
        let mut desc = GraphicsPipelineDesc::new(
            layout.clone(),
            vec![
                shader_stage(vk::ShaderStageFlags::VERTEX),
                shader_stage(vk::ShaderStageFlags::FRAGMENT),
            ],
        );
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
        desc.dynamic_states = vec![vk::DynamicState::VIEWPORT];
        desc.scissors = vec![vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: WIDTH,
                height: HEIGHT,
            },
        }];
        let pipeline = device.create_graphics_pipeline(&desc)?;

        // ── Recording ──
        let mut cmd = CommandBuffer::new(device.clone(), CommandBufferLevel::Primary);
        cmd.begin(if options.one_time {
            BeginInfo::one_time()
        } else {
            BeginInfo::default()
        })?;
        cmd.begin_render_pass(&RenderPassBegin {
            render_pass,
            framebuffer,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: WIDTH,
                    height: HEIGHT,
                },
            },
            clear_values: vec![ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
        })?;
        cmd.bind_pipeline(&pipeline)?;
        cmd.set_viewport(
            0,
            &[vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: WIDTH as f32,
                height: HEIGHT as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }],
        )?;
        cmd.push_constants(&layout, vk::ShaderStageFlags::FRAGMENT, 0, &float_bytes(&TINT))?;
        cmd.bind_vertex_buffers(0, &[(vertices.clone(), 0)])?;
        for _ in 0..options.draws {
            cmd.draw(3, 1, 0, 0)?;
        }
        cmd.end_render_pass()?;

        cmd.fill_buffer(&readback, 0, FILL_BYTES, FILL_WORD)?;
        cmd.copy_buffer(
            &vertices,
            &readback,
            &[BufferCopy {
                src_offset: 0,
                dst_offset: FILL_BYTES,
                size: vertices.size,
            }],
        )?;
        cmd.end()?;

        info!(
            words = cmd.stream().len(),
            after_words = cmd.after_stream().len(),
            draws = options.draws,
            "demo frame recorded"
        );
        Ok(Self {
            context,
            device,
            command_buffer: cmd,
            readback,
        })
    }

    /// Submit the frame on the recording context and read the host view of
    /// the readback buffer.
    pub fn replay(&self) -> anyhow::Result<DemoReport> {
        self.context.lock().backend_mut().take_calls();
        let queue = Queue::new(self.device.clone());
        let stats = queue
            .submit(&self.command_buffer, &self.context)
            .context("replaying demo frame")?;
        let calls = self.context.lock().backend_mut().take_calls();

        let bound = self
            .readback
            .memory()
            .context("readback buffer has no memory")?;
        let mut mapped = bound.memory.lock(bound.offset, self.readback.size)?;
        mapped.invalidate(bound.offset, self.readback.size)?;
        let readback = mapped.as_slice().to_vec();

        Ok(DemoReport {
            stats,
            calls,
            readback,
        })
    }

    /// The vertex data the readback buffer should hold after its fill word.
    pub fn triangle_bytes() -> Vec<u8> {
        float_bytes(&triangle_floats())
    }
}
