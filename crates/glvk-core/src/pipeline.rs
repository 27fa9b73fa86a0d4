//! Pipeline layouts and pipelines.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ash::vk;
use glvk_protocol::records::{
    PushConstant, SetBlendState, SetDepthState, SetRasterState, BIND_POINT_COMPUTE,
    BIND_POINT_GRAPHICS,
};

use crate::binding::{BindingAssignment, ShaderBindingTable};
use crate::descriptor::DescriptorSetLayout;
use crate::handle::Handle;
use crate::reflect::PushConstantMember;

/// Push-constant blocks are shadowed in a fixed-size array.
pub const MAX_PUSH_CONSTANT_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: vk::ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug)]
pub struct PipelineLayout {
    pub handle: Handle,
    pub set_layouts: Vec<Arc<DescriptorSetLayout>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub binding_table: ShaderBindingTable,
}

impl PipelineLayout {
    pub fn covers_push_constants(&self, offset: u32, size: u32) -> bool {
        let Some(end) = offset.checked_add(size) else {
            return false;
        };
        self.push_constant_ranges
            .iter()
            .any(|r| r.offset <= offset && r.offset.checked_add(r.size).is_some_and(|e| end <= e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBindingDesc {
    pub binding: u32,
    pub stride: u32,
    /// Instance-rate bindings advance once per instance.
    pub per_instance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub binding: u32,
    pub format: vk::Format,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexInputState {
    pub bindings: Vec<VertexBindingDesc>,
    pub attributes: Vec<VertexAttributeDesc>,
}

impl VertexInputState {
    /// Stable digest of the layout; part of every geometry key.
    pub fn layout_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn binding(&self, binding: u32) -> Option<&VertexBindingDesc> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Static viewport, scissor and fixed-function state of a graphics pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub mode: u32,
    pub raster: SetRasterState,
    pub depth: SetDepthState,
    pub blend: Vec<SetBlendState>,
    pub blend_constants: [f32; 4],
    pub line_width: f32,
    /// `(constant, slope, clamp)`, when depth bias is enabled.
    pub depth_bias: Option<(f32, f32, f32)>,
    pub viewports: Vec<vk::Viewport>,
    pub scissors: Vec<vk::Rect2D>,
    pub dynamic_states: Vec<vk::DynamicState>,
}

impl GraphicsState {
    pub fn is_dynamic(&self, state: vk::DynamicState) -> bool {
        self.dynamic_states.contains(&state)
    }
}

/// Push-constant members of every stage of a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushConstantLayout {
    pub members: Vec<PushConstantMember>,
}

impl PushConstantLayout {
    /// Add members, dropping names already present from another stage.
    pub fn merge(&mut self, members: &[PushConstantMember]) {
        for member in members {
            if !self.members.iter().any(|m| m.name == member.name) {
                self.members.push(member.clone());
            }
        }
        self.members.sort_by_key(|m| m.offset);
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Uniform writes for every member element overlapping
    /// `[offset, offset + size)` of the push-constant block `block`.
    pub fn resolve(&self, offset: u32, size: u32, block: &[u8]) -> Vec<PushConstant> {
        let end = offset.saturating_add(size);
        let mut out = Vec::new();
        for member in &self.members {
            let stride = member.stride();
            for element in 0..member.array_size.max(1) {
                let Some(start) = element
                    .checked_mul(stride)
                    .and_then(|o| o.checked_add(member.offset))
                else {
                    break;
                };
                let stop = start.saturating_add(member.ty.block_size());
                if stop <= offset || start >= end {
                    continue;
                }
                let Some(data) = block
                    .get(start as usize..stop as usize)
                    .and_then(|bytes| member.ty.pack(bytes))
                else {
                    continue;
                };
                out.push(PushConstant {
                    location: member.location + element as i32,
                    ty: member.ty as u32,
                    count: member.ty.components(),
                    data,
                    ..Default::default()
                });
            }
        }
        out
    }
}

#[derive(Debug)]
pub struct Pipeline {
    pub handle: Handle,
    pub bind_point: vk::PipelineBindPoint,
    pub flags: vk::PipelineCreateFlags,
    pub program: u32,
    pub layout: Arc<PipelineLayout>,
    pub vertex_input: VertexInputState,
    pub vertex_input_hash: u64,
    pub graphics: Option<GraphicsState>,
    pub push_constants: PushConstantLayout,
    pub assignments: Vec<BindingAssignment>,
}

impl Pipeline {
    /// `BindProgram::bind_point` for this pipeline.
    pub fn bind_point_raw(&self) -> u32 {
        if self.bind_point == vk::PipelineBindPoint::COMPUTE {
            BIND_POINT_COMPUTE
        } else {
            BIND_POINT_GRAPHICS
        }
    }

    pub fn is_compute(&self) -> bool {
        self.bind_point == vk::PipelineBindPoint::COMPUTE
    }
}

/// SPIR-V words handed to the shader compiler at pipeline creation.
#[derive(Debug)]
pub struct ShaderModule {
    pub handle: Handle,
    pub spirv: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ShaderStage {
    pub stage: vk::ShaderStageFlags,
    pub module: Arc<ShaderModule>,
    pub entry_point: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterizationDesc {
    pub depth_clamp: bool,
    pub rasterizer_discard: bool,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    /// `(constant, slope, clamp)`
    pub depth_bias: Option<(f32, f32, f32)>,
    pub line_width: f32,
}

impl Default for RasterizationDesc {
    fn default() -> Self {
        Self {
            depth_clamp: false,
            rasterizer_discard: false,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_bias: None,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub compare_op: vk::CompareOp,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            compare_op: vk::CompareOp::LESS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
    pub src_color: vk::BlendFactor,
    pub dst_color: vk::BlendFactor,
    pub color_op: vk::BlendOp,
    pub src_alpha: vk::BlendFactor,
    pub dst_alpha: vk::BlendFactor,
    pub alpha_op: vk::BlendOp,
    pub write_mask: vk::ColorComponentFlags,
}

impl Default for ColorBlendAttachment {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color: vk::BlendFactor::ONE,
            dst_color: vk::BlendFactor::ZERO,
            color_op: vk::BlendOp::ADD,
            src_alpha: vk::BlendFactor::ONE,
            dst_alpha: vk::BlendFactor::ZERO,
            alpha_op: vk::BlendOp::ADD,
            write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub flags: vk::PipelineCreateFlags,
    pub stages: Vec<ShaderStage>,
    pub vertex_input: VertexInputState,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
    pub viewports: Vec<vk::Viewport>,
    pub scissors: Vec<vk::Rect2D>,
    pub rasterization: RasterizationDesc,
    pub depth_stencil: DepthStencilDesc,
    pub blend_attachments: Vec<ColorBlendAttachment>,
    pub blend_constants: [f32; 4],
    pub dynamic_states: Vec<vk::DynamicState>,
    pub layout: Arc<PipelineLayout>,
}

impl GraphicsPipelineDesc {
    pub fn new(layout: Arc<PipelineLayout>, stages: Vec<ShaderStage>) -> Self {
        Self {
            flags: vk::PipelineCreateFlags::empty(),
            stages,
            vertex_input: VertexInputState::default(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart: false,
            viewports: Vec::new(),
            scissors: Vec::new(),
            rasterization: RasterizationDesc::default(),
            depth_stencil: DepthStencilDesc::default(),
            blend_attachments: vec![ColorBlendAttachment::default()],
            blend_constants: [0.0; 4],
            dynamic_states: Vec::new(),
            layout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub flags: vk::PipelineCreateFlags,
    pub stage: ShaderStage,
    pub layout: Arc<PipelineLayout>,
}
