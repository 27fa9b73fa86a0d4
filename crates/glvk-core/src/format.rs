//! Vulkan format to GL format translation.

use ash::vk;
use glvk_protocol::gl;

/// How a `vk::Format` maps onto GL texture storage and pixel transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub internal_format: u32,
    pub pixel_format: u32,
    pub pixel_type: u32,
    pub texel_size: u32,
    pub aspects: vk::ImageAspectFlags,
}

impl FormatInfo {
    pub fn has_depth(&self) -> bool {
        self.aspects.contains(vk::ImageAspectFlags::DEPTH)
    }

    pub fn has_stencil(&self) -> bool {
        self.aspects.contains(vk::ImageAspectFlags::STENCIL)
    }

    /// Framebuffer attachment point for a non-color format.
    pub fn depth_stencil_point(&self) -> Option<u32> {
        match (self.has_depth(), self.has_stencil()) {
            (true, true) => Some(gl::DEPTH_STENCIL_ATTACHMENT),
            (true, false) => Some(gl::DEPTH_ATTACHMENT),
            (false, true) => Some(gl::STENCIL_ATTACHMENT),
            (false, false) => None,
        }
    }
}

pub fn format_info(format: vk::Format) -> Option<FormatInfo> {
    let color = vk::ImageAspectFlags::COLOR;
    let (internal_format, pixel_format, pixel_type, texel_size, aspects) = match format {
        vk::Format::R8_UNORM => (gl::R8, gl::RED, gl::UNSIGNED_BYTE, 1, color),
        vk::Format::R8G8_UNORM => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE, 2, color),
        vk::Format::R8G8B8A8_UNORM => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, color),
        vk::Format::R8G8B8A8_SRGB => (gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, color),
        vk::Format::B8G8R8A8_UNORM => (gl::RGBA8, gl::BGRA, gl::UNSIGNED_BYTE, 4, color),
        vk::Format::B8G8R8A8_SRGB => (gl::SRGB8_ALPHA8, gl::BGRA, gl::UNSIGNED_BYTE, 4, color),
        vk::Format::R8G8B8A8_UINT => (gl::RGBA8UI, gl::RGBA_INTEGER, gl::UNSIGNED_BYTE, 4, color),
        vk::Format::R16_SFLOAT => (gl::R16F, gl::RED, gl::HALF_FLOAT, 2, color),
        vk::Format::R16G16_SFLOAT => (gl::RG16F, gl::RG, gl::HALF_FLOAT, 4, color),
        vk::Format::R16G16B16A16_SFLOAT => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT, 8, color),
        vk::Format::R32_SFLOAT => (gl::R32F, gl::RED, gl::FLOAT, 4, color),
        vk::Format::R32G32_SFLOAT => (gl::RG32F, gl::RG, gl::FLOAT, 8, color),
        vk::Format::R32G32B32_SFLOAT => (gl::RGB32F, gl::RGB, gl::FLOAT, 12, color),
        vk::Format::R32G32B32A32_SFLOAT => (gl::RGBA32F, gl::RGBA, gl::FLOAT, 16, color),
        vk::Format::R32_UINT => (gl::R32UI, gl::RED_INTEGER, gl::UNSIGNED_INT, 4, color),
        vk::Format::R32_SINT => (gl::R32I, gl::RED_INTEGER, gl::INT, 4, color),
        vk::Format::R32G32B32A32_UINT => (gl::RGBA32UI, gl::RGBA_INTEGER, gl::UNSIGNED_INT, 16, color),
        vk::Format::R32G32B32A32_SINT => (gl::RGBA32I, gl::RGBA_INTEGER, gl::INT, 16, color),
        vk::Format::D16_UNORM => (
            gl::DEPTH_COMPONENT16,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_SHORT,
            2,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::X8_D24_UNORM_PACK32 => (
            gl::DEPTH_COMPONENT24,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_INT,
            4,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::D32_SFLOAT => (
            gl::DEPTH_COMPONENT32F,
            gl::DEPTH_COMPONENT,
            gl::FLOAT,
            4,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::D24_UNORM_S8_UINT => (
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
            4,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        ),
        vk::Format::D32_SFLOAT_S8_UINT => (
            gl::DEPTH32F_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
            8,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        ),
        _ => return None,
    };
    Some(FormatInfo {
        internal_format,
        pixel_format,
        pixel_type,
        texel_size,
        aspects,
    })
}

/// `glVertexAttrib*Format` parameters for a vertex attribute format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribFormat {
    pub components: u32,
    pub ty: u32,
    pub normalized: bool,
    /// Use `glVertexAttribIFormat`.
    pub integer: bool,
}

pub fn attrib_format(format: vk::Format) -> Option<AttribFormat> {
    let f = |components, ty, normalized, integer| AttribFormat {
        components,
        ty,
        normalized,
        integer,
    };
    Some(match format {
        vk::Format::R32_SFLOAT => f(1, gl::FLOAT, false, false),
        vk::Format::R32G32_SFLOAT => f(2, gl::FLOAT, false, false),
        vk::Format::R32G32B32_SFLOAT => f(3, gl::FLOAT, false, false),
        vk::Format::R32G32B32A32_SFLOAT => f(4, gl::FLOAT, false, false),
        vk::Format::R16G16_SFLOAT => f(2, gl::HALF_FLOAT, false, false),
        vk::Format::R16G16B16A16_SFLOAT => f(4, gl::HALF_FLOAT, false, false),
        vk::Format::R8G8B8A8_UNORM => f(4, gl::UNSIGNED_BYTE, true, false),
        vk::Format::R8G8B8A8_SNORM => f(4, gl::BYTE, true, false),
        vk::Format::R8G8B8A8_UINT => f(4, gl::UNSIGNED_BYTE, false, true),
        vk::Format::R16G16_UNORM => f(2, gl::UNSIGNED_SHORT, true, false),
        vk::Format::R16G16_SNORM => f(2, gl::SHORT, true, false),
        vk::Format::R32_UINT => f(1, gl::UNSIGNED_INT, false, true),
        vk::Format::R32G32_UINT => f(2, gl::UNSIGNED_INT, false, true),
        vk::Format::R32G32B32A32_UINT => f(4, gl::UNSIGNED_INT, false, true),
        vk::Format::R32_SINT => f(1, gl::INT, false, true),
        vk::Format::R32G32B32A32_SINT => f(4, gl::INT, false, true),
        _ => return None,
    })
}

/// GL element type and size in bytes.
pub fn index_type(index_type: vk::IndexType) -> Option<(u32, u32)> {
    match index_type {
        vk::IndexType::UINT16 => Some((gl::UNSIGNED_SHORT, 2)),
        vk::IndexType::UINT32 => Some((gl::UNSIGNED_INT, 4)),
        _ => None,
    }
}
