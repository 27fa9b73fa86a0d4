//! Vulkan state enums to GL enums.

use ash::vk;
use glvk_protocol::gl;

pub fn primitive_mode(topology: vk::PrimitiveTopology) -> u32 {
    match topology {
        vk::PrimitiveTopology::POINT_LIST => gl::POINTS,
        vk::PrimitiveTopology::LINE_LIST => gl::LINES,
        vk::PrimitiveTopology::LINE_STRIP => gl::LINE_STRIP,
        vk::PrimitiveTopology::TRIANGLE_STRIP => gl::TRIANGLE_STRIP,
        vk::PrimitiveTopology::TRIANGLE_FAN => gl::TRIANGLE_FAN,
        vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY => gl::LINES_ADJACENCY,
        vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY => gl::LINE_STRIP_ADJACENCY,
        vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY => gl::TRIANGLES_ADJACENCY,
        vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY => gl::TRIANGLE_STRIP_ADJACENCY,
        vk::PrimitiveTopology::PATCH_LIST => gl::PATCHES,
        _ => gl::TRIANGLES,
    }
}

pub fn compare_func(op: vk::CompareOp) -> u32 {
    match op {
        vk::CompareOp::NEVER => gl::NEVER,
        vk::CompareOp::LESS => gl::LESS,
        vk::CompareOp::EQUAL => gl::EQUAL,
        vk::CompareOp::LESS_OR_EQUAL => gl::LEQUAL,
        vk::CompareOp::GREATER => gl::GREATER,
        vk::CompareOp::NOT_EQUAL => gl::NOTEQUAL,
        vk::CompareOp::GREATER_OR_EQUAL => gl::GEQUAL,
        _ => gl::ALWAYS,
    }
}

pub fn blend_factor(factor: vk::BlendFactor) -> u32 {
    match factor {
        vk::BlendFactor::ZERO => gl::ZERO,
        vk::BlendFactor::ONE => gl::ONE,
        vk::BlendFactor::SRC_COLOR => gl::SRC_COLOR,
        vk::BlendFactor::ONE_MINUS_SRC_COLOR => gl::ONE_MINUS_SRC_COLOR,
        vk::BlendFactor::DST_COLOR => gl::DST_COLOR,
        vk::BlendFactor::ONE_MINUS_DST_COLOR => gl::ONE_MINUS_DST_COLOR,
        vk::BlendFactor::SRC_ALPHA => gl::SRC_ALPHA,
        vk::BlendFactor::ONE_MINUS_SRC_ALPHA => gl::ONE_MINUS_SRC_ALPHA,
        vk::BlendFactor::DST_ALPHA => gl::DST_ALPHA,
        vk::BlendFactor::ONE_MINUS_DST_ALPHA => gl::ONE_MINUS_DST_ALPHA,
        vk::BlendFactor::CONSTANT_COLOR => gl::CONSTANT_COLOR,
        vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR => gl::ONE_MINUS_CONSTANT_COLOR,
        vk::BlendFactor::CONSTANT_ALPHA => gl::CONSTANT_ALPHA,
        vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA => gl::ONE_MINUS_CONSTANT_ALPHA,
        vk::BlendFactor::SRC_ALPHA_SATURATE => gl::SRC_ALPHA_SATURATE,
        _ => gl::ONE,
    }
}

pub fn blend_op(op: vk::BlendOp) -> u32 {
    match op {
        vk::BlendOp::SUBTRACT => gl::FUNC_SUBTRACT,
        vk::BlendOp::REVERSE_SUBTRACT => gl::FUNC_REVERSE_SUBTRACT,
        vk::BlendOp::MIN => gl::MIN,
        vk::BlendOp::MAX => gl::MAX,
        _ => gl::FUNC_ADD,
    }
}

/// `gl::NONE` disables culling.
pub fn cull_face(mode: vk::CullModeFlags) -> u32 {
    if mode == vk::CullModeFlags::FRONT_AND_BACK {
        gl::FRONT_AND_BACK
    } else if mode == vk::CullModeFlags::FRONT {
        gl::FRONT
    } else if mode == vk::CullModeFlags::BACK {
        gl::BACK
    } else {
        gl::NONE
    }
}

/// GL's window origin is bottom-left, so the winding flips.
pub fn front_face(face: vk::FrontFace) -> u32 {
    match face {
        vk::FrontFace::CLOCKWISE => gl::CCW,
        _ => gl::CW,
    }
}

pub fn polygon_mode(mode: vk::PolygonMode) -> u32 {
    match mode {
        vk::PolygonMode::LINE => gl::LINE,
        vk::PolygonMode::POINT => gl::POINT,
        _ => gl::FILL,
    }
}

pub fn min_filter(filter: vk::Filter, mipmap: vk::SamplerMipmapMode, mip_levels: bool) -> u32 {
    if !mip_levels {
        return mag_filter(filter);
    }
    match (filter, mipmap) {
        (vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR) => gl::LINEAR_MIPMAP_LINEAR,
        (vk::Filter::LINEAR, _) => gl::LINEAR_MIPMAP_NEAREST,
        (_, vk::SamplerMipmapMode::LINEAR) => gl::NEAREST_MIPMAP_LINEAR,
        _ => gl::NEAREST_MIPMAP_NEAREST,
    }
}

pub fn mag_filter(filter: vk::Filter) -> u32 {
    match filter {
        vk::Filter::LINEAR => gl::LINEAR,
        _ => gl::NEAREST,
    }
}

pub fn wrap_mode(mode: vk::SamplerAddressMode) -> u32 {
    match mode {
        vk::SamplerAddressMode::MIRRORED_REPEAT => gl::MIRRORED_REPEAT,
        vk::SamplerAddressMode::CLAMP_TO_EDGE => gl::CLAMP_TO_EDGE,
        vk::SamplerAddressMode::CLAMP_TO_BORDER => gl::CLAMP_TO_BORDER,
        vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE => gl::MIRROR_CLAMP_TO_EDGE,
        _ => gl::REPEAT,
    }
}

pub fn image_target(ty: vk::ImageType, layers: u32, samples: vk::SampleCountFlags) -> u32 {
    let multisampled = samples != vk::SampleCountFlags::TYPE_1;
    match ty {
        vk::ImageType::TYPE_1D if layers > 1 => gl::TEXTURE_1D_ARRAY,
        vk::ImageType::TYPE_1D => gl::TEXTURE_1D,
        vk::ImageType::TYPE_3D => gl::TEXTURE_3D,
        _ if multisampled && layers > 1 => gl::TEXTURE_2D_MULTISAMPLE_ARRAY,
        _ if multisampled => gl::TEXTURE_2D_MULTISAMPLE,
        _ if layers > 1 => gl::TEXTURE_2D_ARRAY,
        _ => gl::TEXTURE_2D,
    }
}

pub fn view_target(ty: vk::ImageViewType, samples: vk::SampleCountFlags) -> u32 {
    let multisampled = samples != vk::SampleCountFlags::TYPE_1;
    match ty {
        vk::ImageViewType::TYPE_1D => gl::TEXTURE_1D,
        vk::ImageViewType::TYPE_1D_ARRAY => gl::TEXTURE_1D_ARRAY,
        vk::ImageViewType::TYPE_2D_ARRAY if multisampled => gl::TEXTURE_2D_MULTISAMPLE_ARRAY,
        vk::ImageViewType::TYPE_2D_ARRAY => gl::TEXTURE_2D_ARRAY,
        vk::ImageViewType::TYPE_3D => gl::TEXTURE_3D,
        vk::ImageViewType::CUBE => gl::TEXTURE_CUBE_MAP,
        vk::ImageViewType::CUBE_ARRAY => gl::TEXTURE_CUBE_MAP_ARRAY,
        _ if multisampled => gl::TEXTURE_2D_MULTISAMPLE,
        _ => gl::TEXTURE_2D,
    }
}

/// Query target used by `BeginQuery` for a pool type. Precise occlusion
/// queries count samples; imprecise ones only need any-sample results.
pub fn query_target(ty: vk::QueryType, precise: bool) -> u32 {
    match ty {
        vk::QueryType::OCCLUSION if precise => gl::SAMPLES_PASSED,
        vk::QueryType::OCCLUSION => gl::ANY_SAMPLES_PASSED,
        vk::QueryType::PIPELINE_STATISTICS => gl::PRIMITIVES_GENERATED,
        vk::QueryType::TIMESTAMP => gl::TIMESTAMP,
        _ => gl::TIME_ELAPSED,
    }
}
