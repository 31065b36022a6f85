//! External, consumed interfaces (component J's collaborators): the GPU
//! backend (`GpuCtx`) and the media decoding layer (`FrameSource`). Neither
//! is implemented here — this module only declares the boundary this crate
//! calls through. A concrete backend (GL, Vulkan, Metal, …) implements
//! [`GpuCtx`] and is handed to [`crate::context::RenderContext`].

use crate::error::Result;
use crate::format::Format;
use crate::math::Mat4;

/// Opaque handle to a backend-owned resource (buffer, image, or pipeline).
/// The engine never interprets the bits; it only stores and replays them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct GpuHandle(pub u64);

bitflags::bitflags! {
    pub struct ImageUsageFlags: u32 {
        const SAMPLED           = 0b0000_0001;
        const STORAGE           = 0b0000_0010;
        const COLOR_ATTACHMENT  = 0b0000_0100;
        const DEPTH_ATTACHMENT  = 0b0000_1000;
        const INPUT_ATTACHMENT  = 0b0001_0000;
        const TRANSFER_SRC      = 0b0010_0000;
        const TRANSFER_DST      = 0b0100_0000;
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BufferDesc<'a> {
    pub format: Format,
    pub count: u32,
    pub usage: crate::buffer::BufferUsageFlags,
    pub initial_data: Option<&'a [u8]>,
}

#[derive(Copy, Clone, Debug)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: Format,
    pub usage: ImageUsageFlags,
    pub mip_levels: u32,
    pub array_layers: u32,
}

/// Backend resource limits, read once at startup to populate capability
/// reports; the engine never exceeds these without the caller opting in.
#[derive(Copy, Clone, Debug, Default)]
pub struct Limits {
    pub max_color_attachments: u32,
    pub max_texture_dimension_1d: u32,
    pub max_texture_dimension_2d: u32,
    pub max_texture_dimension_3d: u32,
    pub max_texture_dimension_cube: u32,
    pub max_texture_array_layers: u32,
    pub max_compute_work_group_count: [u32; 3],
    pub max_compute_work_group_size: [u32; 3],
    pub max_compute_shared_memory_size: u32,
    pub max_samples: u32,
}

/// Optional capabilities the engine probes for before relying on them (see
/// the texture-storage policy in the design notes).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Feature {
    ImmutableTextureStorage,
    ComputeShaders,
    DepthStencilResolve,
    TextRasterization,
}

/// Backend id/name plus a flat `(enum_id, string_id, value)` row list,
/// matching the wire shape scene-inspection tooling expects.
#[derive(Clone, Debug)]
pub struct CapabilityReport {
    pub backend_id: u32,
    pub backend_name: String,
    pub rows: Vec<(u32, &'static str, i64)>,
    features: Vec<Feature>,
}

impl CapabilityReport {
    pub fn new(backend_id: u32, backend_name: impl Into<String>) -> CapabilityReport {
        CapabilityReport {
            backend_id,
            backend_name: backend_name.into(),
            rows: Vec::new(),
            features: Vec::new(),
        }
    }

    pub fn with_row(mut self, enum_id: u32, string_id: &'static str, value: i64) -> Self {
        self.rows.push((enum_id, string_id, value));
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// The GPU backend boundary. Implemented by a concrete backend crate and
/// handed to a [`crate::context::RenderContext`]; this crate only calls
/// through it.
pub trait GpuCtx {
    fn init(&mut self, width: u32, height: u32) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
    fn wait_idle(&mut self);

    fn set_capture_buffer(&mut self, handle: Option<GpuHandle>) -> Result<()>;

    fn default_rendertarget(&self) -> GpuHandle;
    fn default_rendertarget_layout(&self) -> Format;
    fn default_rendertarget_size(&self) -> (u32, u32);

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<GpuHandle>;
    fn upload_buffer(&mut self, handle: GpuHandle, offset: usize, data: &[u8]) -> Result<()>;
    fn destroy_buffer(&mut self, handle: GpuHandle);

    fn create_image(&mut self, desc: ImageDesc) -> Result<GpuHandle>;
    fn upload_image(&mut self, handle: GpuHandle, data: &[u8]) -> Result<()>;
    fn destroy_image(&mut self, handle: GpuHandle);

    fn begin_update(&mut self);
    fn end_update(&mut self);
    fn begin_draw(&mut self);
    fn end_draw(&mut self);
    fn begin_render_pass(&mut self, target: GpuHandle) -> Result<()>;
    fn end_render_pass(&mut self);
    fn is_render_pass_active(&self) -> bool;

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Post-multiplies a clip-space correction for backends whose depth
    /// range or Y axis differs from this engine's OpenGL-style convention.
    fn transform_projection_matrix(&self, proj: &Mat4) -> Mat4;

    fn query_draw_time(&self) -> Option<std::time::Duration>;

    fn limits(&self) -> &Limits;
    fn capabilities(&self) -> CapabilityReport;
}

/// Pixel formats a [`FrameSource`] may produce.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PixFmt {
    Rgba,
    Bgra,
    Nv12,
    MediaCodec,
    VideoToolbox,
    FloatSamples,
}

/// One decoded media frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub linesize: Vec<u32>,
    pub pix_fmt: PixFmt,
    pub pts: i64,
    pub timestamp_base: (i32, i32),
}

/// The media decoding boundary (consumed, not implemented here).
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
