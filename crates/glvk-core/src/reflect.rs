//! Shader reflection data produced by the external SPIR-V to GLSL compiler.

use ash::vk;
use glvk_protocol::UniformType;
use serde::Serialize;

use crate::error::CoreError;

/// Kind of resource a shader declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceCategory {
    UniformBuffer,
    StorageBuffer,
    /// Combined image + sampler (`sampler2D` and friends).
    SampledImage,
    /// `texture2D` without a sampler.
    SeparateImage,
    SeparateSampler,
    StorageImage,
    SubpassInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub name: String,
    pub category: ResourceCategory,
    pub set: u32,
    pub binding: u32,
    /// 1 for non-arrays.
    pub array_size: u32,
    /// GL binding the compiler emitted; rewritten by binding rework.
    pub backend_binding: u32,
}

/// One member of the push-constant block, lowered to a plain uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantMember {
    pub name: String,
    /// Byte offset inside the push-constant block.
    pub offset: u32,
    pub ty: UniformType,
    pub array_size: u32,
    /// Explicit uniform location emitted by the compiler.
    pub location: i32,
}

impl PushConstantMember {
    /// std430 array stride.
    pub fn stride(&self) -> u32 {
        match self.ty {
            UniformType::Vec3 | UniformType::IVec3 | UniformType::UVec3 => 16,
            ty => ty.block_size(),
        }
    }

    /// Bytes covered in the push-constant block.
    pub fn extent(&self) -> u32 {
        self.stride()
            .saturating_mul(self.array_size.max(1) - 1)
            .saturating_add(self.ty.block_size())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub stage: vk::ShaderStageFlags,
    pub glsl: String,
    pub resources: Vec<ShaderResource>,
    pub push_constants: Vec<PushConstantMember>,
}

/// SPIR-V in, GLSL plus reflection out.
pub trait ShaderCompiler: Send + Sync {
    fn compile(
        &self,
        spirv: &[u32],
        stage: vk::ShaderStageFlags,
        entry_point: &str,
    ) -> Result<CompiledShader, CoreError>;
}
