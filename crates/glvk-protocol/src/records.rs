//! Typed command records.
//!
//! Every record is a `#[repr(C)]` plain-old-data struct whose size is a
//! multiple of 8 bytes. The `define_records!` macro generates, from one
//! table, the [`OpKind`] discriminant, the structs, their [`Record`] impls and
//! the [`Command`] sum type, so "which struct follows a header" is decided in
//! exactly one place.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use crate::op::HEADER_WORDS;

/// A fixed-size record that can be appended to a [`CmdBuffer`](crate::CmdBuffer).
pub trait Record: Pod + Into<Command> {
    const KIND: OpKind;

    /// Encoded size in words, header included.
    const WORDS: u32 = HEADER_WORDS + (std::mem::size_of::<Self>() / 4) as u32;
}

macro_rules! define_records {
    (
        $(
            $(#[$meta:meta])*
            $name:ident = $code:literal {
                $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
            }
        )*
    ) => {
        /// Identifies the record that follows an [`Op`](crate::Op) header.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[repr(u32)]
        pub enum OpKind {
            $( $name = $code, )*
        }

        impl OpKind {
            pub const ALL: &'static [OpKind] = &[ $( OpKind::$name, )* ];

            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $( $code => Some(OpKind::$name), )*
                    _ => None,
                }
            }

            pub fn as_raw(self) -> u32 {
                self as u32
            }

            /// Encoded size of this kind's record in words, header included.
            pub fn words(self) -> u32 {
                match self {
                    $( OpKind::$name => <$name as Record>::WORDS, )*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( OpKind::$name => stringify!($name), )*
                }
            }
        }

        $(
            $(#[$meta])*
            #[repr(C)]
            #[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize)]
            pub struct $name {
                $( $(#[$fmeta])* pub $field: $ty, )*
            }

            const _: () = assert!(std::mem::size_of::<$name>() % 8 == 0);

            impl Record for $name {
                const KIND: OpKind = OpKind::$name;
            }

            impl From<$name> for Command {
                fn from(record: $name) -> Self {
                    Command::$name(record)
                }
            }
        )*

        /// A decoded record: one variant per [`OpKind`].
        #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
        #[serde(tag = "op")]
        pub enum Command {
            $( $name($name), )*
        }

        impl Command {
            pub fn kind(&self) -> OpKind {
                match self {
                    $( Command::$name(_) => OpKind::$name, )*
                }
            }

            /// Rebuild a record from exactly `size_of::<Record>()` payload bytes.
            pub(crate) fn from_payload(
                kind: OpKind,
                payload: &[u8],
            ) -> Result<Command, bytemuck::PodCastError> {
                Ok(match kind {
                    $( OpKind::$name => Command::$name(bytemuck::try_pod_read_unaligned(payload)?), )*
                })
            }

            pub(crate) fn payload(&self) -> &[u8] {
                match self {
                    $( Command::$name(record) => bytemuck::bytes_of(record), )*
                }
            }
        }
    };
}

/// `ClearColor::kind` values.
pub const CLEAR_FLOAT: u32 = 0;
pub const CLEAR_INT: u32 = 1;
pub const CLEAR_UINT: u32 = 2;

/// `BindProgram::bind_point` values.
pub const BIND_POINT_GRAPHICS: u32 = 0;
pub const BIND_POINT_COMPUTE: u32 = 1;

/// `BindGeometry::geometry` value selecting the context's empty vertex array.
pub const DEFAULT_GEOMETRY: u64 = 0;

define_records! {
    BindProgram = 1 {
        program: u32,
        bind_point: u32,
    }

    /// Viewport `index` with its depth range.
    SetViewport = 2 {
        index: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        min_depth: f32,
        max_depth: f32,
        #[serde(skip)]
        _pad: u32,
    }

    SetScissor = 3 {
        index: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        #[serde(skip)]
        _pad: u32,
    }

    SetLineWidth = 4 {
        width: f32,
        #[serde(skip)]
        _pad: u32,
    }

    SetDepthBias = 5 {
        constant_factor: f32,
        slope_factor: f32,
        clamp: f32,
        #[serde(skip)]
        _pad: u32,
    }

    SetBlendConstants = 6 {
        color: [f32; 4],
    }

    /// Fixed-function raster state of a graphics pipeline. `cull_face` is
    /// `gl::NONE` when culling is disabled.
    SetRasterState = 7 {
        cull_face: u32,
        front_face: u32,
        polygon_mode: u32,
        depth_clamp: u32,
        rasterizer_discard: u32,
        primitive_restart: u32,
    }

    SetDepthState = 8 {
        depth_test: u32,
        depth_write: u32,
        depth_func: u32,
        #[serde(skip)]
        _pad: u32,
    }

    SetBlendState = 9 {
        draw_buffer: u32,
        enabled: u32,
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
        op_rgb: u32,
        op_alpha: u32,
        /// RGBA bits 0..4.
        write_mask: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Binds a cached vertex array by geometry-buffer id, or the context's
    /// empty vertex array for [`DEFAULT_GEOMETRY`].
    BindGeometry = 10 {
        geometry: u64,
    }

    BindBufferRange = 11 {
        offset: u64,
        size: u64,
        target: u32,
        index: u32,
        buffer: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Texture on a unit, with an optional sampler object (0 for none).
    BindTexture = 12 {
        unit: u32,
        target: u32,
        texture: u32,
        sampler: u32,
    }

    BindSampler = 13 {
        unit: u32,
        sampler: u32,
    }

    BindImageTexture = 14 {
        unit: u32,
        texture: u32,
        level: i32,
        layered: u32,
        layer: i32,
        access: u32,
        format: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// One uniform write resolved from the push-constant block. `ty` is a
    /// [`UniformType`] discriminant; `count` is the number of used words.
    PushConstant = 15 {
        location: i32,
        ty: u32,
        count: u32,
        #[serde(skip)]
        _pad: u32,
        data: [u32; 16],
    }

    Draw = 16 {
        mode: u32,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        first_instance: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// `offset` is the byte offset of the first index in the bound element buffer.
    DrawIndexed = 17 {
        offset: u64,
        mode: u32,
        index_type: u32,
        index_count: u32,
        instance_count: u32,
        base_vertex: i32,
        first_instance: u32,
    }

    DrawIndirect = 18 {
        offset: u64,
        buffer: u32,
        mode: u32,
        draw_count: u32,
        stride: u32,
    }

    DrawIndexedIndirect = 19 {
        offset: u64,
        buffer: u32,
        mode: u32,
        index_type: u32,
        draw_count: u32,
        stride: u32,
        #[serde(skip)]
        _pad: u32,
    }

    Dispatch = 20 {
        x: u32,
        y: u32,
        z: u32,
        #[serde(skip)]
        _pad: u32,
    }

    DispatchIndirect = 21 {
        offset: u64,
        buffer: u32,
        #[serde(skip)]
        _pad: u32,
    }

    CopyBuffer = 22 {
        src_offset: u64,
        dst_offset: u64,
        size: u64,
        src: u32,
        dst: u32,
    }

    CopyImage = 23 {
        src_texture: u32,
        src_target: u32,
        src_level: i32,
        src_x: i32,
        src_y: i32,
        src_z: i32,
        dst_texture: u32,
        dst_target: u32,
        dst_level: i32,
        dst_x: i32,
        dst_y: i32,
        dst_z: i32,
        width: u32,
        height: u32,
        depth: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Pixel-unpack upload of one image region from a buffer.
    CopyBufferToImage = 24 {
        buffer_offset: u64,
        buffer: u32,
        texture: u32,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        z: i32,
        width: u32,
        height: u32,
        depth: u32,
        row_length: u32,
        image_height: u32,
        format: u32,
        ty: u32,
    }

    /// Pixel-pack download of one image region into a buffer.
    CopyImageToBuffer = 25 {
        buffer_offset: u64,
        buffer: u32,
        texture: u32,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        z: i32,
        width: u32,
        height: u32,
        depth: u32,
        row_length: u32,
        image_height: u32,
        format: u32,
        ty: u32,
    }

    FillBuffer = 26 {
        offset: u64,
        size: u64,
        buffer: u32,
        data: u32,
    }

    MemoryBarrier = 27 {
        bits: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Draw framebuffer plus the number of color attachments to enable.
    BindFramebuffer = 28 {
        framebuffer: u32,
        draw_buffer_count: u32,
    }

    ClearColor = 29 {
        draw_buffer: u32,
        kind: u32,
        value: [u32; 4],
    }

    ClearDepthStencil = 30 {
        depth: f32,
        stencil: u32,
        aspects: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Rectangles are `[x0, y0, x1, y1]`.
    BlitFramebuffer = 31 {
        src_framebuffer: u32,
        dst_framebuffer: u32,
        src: [i32; 4],
        dst: [i32; 4],
        mask: u32,
        filter: u32,
    }

    ResetQuery = 32 {
        query: u32,
        #[serde(skip)]
        _pad: u32,
    }

    BeginQuery = 33 {
        target: u32,
        query: u32,
    }

    EndQuery = 34 {
        target: u32,
        #[serde(skip)]
        _pad: u32,
    }

    WriteTimestamp = 35 {
        query: u32,
        #[serde(skip)]
        _pad: u32,
    }

    SetEvent = 36 {
        event: u64,
    }

    ResetEvent = 37 {
        event: u64,
    }

    /// Copies a GL buffer range back into the device storage of `memory`.
    ReadbackBuffer = 38 {
        buffer_offset: u64,
        memory_offset: u64,
        size: u64,
        memory: u64,
        buffer: u32,
        #[serde(skip)]
        _pad: u32,
    }

    /// Unbinds program, vertex array and draw framebuffer (binds `framebuffer`).
    RestoreDefaults = 39 {
        framebuffer: u32,
        #[serde(skip)]
        _pad: u32,
    }
}

/// Uniform shapes a push-constant member can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum UniformType {
    Float = 0,
    Vec2 = 1,
    Vec3 = 2,
    Vec4 = 3,
    Int = 4,
    IVec2 = 5,
    IVec3 = 6,
    IVec4 = 7,
    Uint = 8,
    UVec2 = 9,
    UVec3 = 10,
    UVec4 = 11,
    Mat2 = 12,
    Mat3 = 13,
    Mat4 = 14,
}

impl UniformType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        use UniformType::*;
        Some(match raw {
            0 => Float,
            1 => Vec2,
            2 => Vec3,
            3 => Vec4,
            4 => Int,
            5 => IVec2,
            6 => IVec3,
            7 => IVec4,
            8 => Uint,
            9 => UVec2,
            10 => UVec3,
            11 => UVec4,
            12 => Mat2,
            13 => Mat3,
            14 => Mat4,
            _ => return None,
        })
    }

    /// Number of scalar components passed to `glUniform*`.
    pub fn components(self) -> u32 {
        use UniformType::*;
        match self {
            Float | Int | Uint => 1,
            Vec2 | IVec2 | UVec2 => 2,
            Vec3 | IVec3 | UVec3 => 3,
            Vec4 | IVec4 | UVec4 | Mat2 => 4,
            Mat3 => 9,
            Mat4 => 16,
        }
    }

    /// Bytes occupied in a std430 push-constant block.
    pub fn block_size(self) -> u32 {
        match self {
            UniformType::Mat3 => 48,
            other => other.components() * 4,
        }
    }

    /// Pack one std430 block element into `glUniform*` component order.
    /// Returns `None` when `block` is shorter than [`block_size`](Self::block_size).
    pub fn pack(self, block: &[u8]) -> Option<[u32; 16]> {
        if block.len() < self.block_size() as usize {
            return None;
        }
        let word = |i: usize| {
            u32::from_ne_bytes([block[i * 4], block[i * 4 + 1], block[i * 4 + 2], block[i * 4 + 3]])
        };
        let mut out = [0u32; 16];
        match self {
            // std430 pads mat3 columns to vec4
            UniformType::Mat3 => {
                for column in 0..3 {
                    for row in 0..3 {
                        out[column * 3 + row] = word(column * 4 + row);
                    }
                }
            }
            other => {
                for (i, slot) in out.iter_mut().take(other.components() as usize).enumerate() {
                    *slot = word(i);
                }
            }
        }
        Some(out)
    }
}
