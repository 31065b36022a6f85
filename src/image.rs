//! Image: a GPU texture (or planar tuple, e.g. NV12) plus the bookkeeping a
//! consumer needs to know whether it must re-sample.

use crate::format::Format;
use crate::gpu::{GpuHandle, PixFmt};
use crate::math::Mat4;
use smallvec::SmallVec;
use std::cell::Cell;
use std::fmt;

/// Dimensions of an image.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Dim1d { width: u32 },
    Dim1dArray { width: u32, array_layers: u32 },
    Dim2d { width: u32, height: u32 },
    Dim2dArray { width: u32, height: u32, array_layers: u32 },
    Dim3d { width: u32, height: u32, depth: u32 },
    Cubemap { size: u32 },
    CubemapArray { size: u32, array_layers: u32 },
}

impl Dimensions {
    #[inline]
    pub fn width(&self) -> u32 {
        match *self {
            Dimensions::Dim1d { width } => width,
            Dimensions::Dim1dArray { width, .. } => width,
            Dimensions::Dim2d { width, .. } => width,
            Dimensions::Dim2dArray { width, .. } => width,
            Dimensions::Dim3d { width, .. } => width,
            Dimensions::Cubemap { size } => size,
            Dimensions::CubemapArray { size, .. } => size,
        }
    }

    #[inline]
    pub fn height(&self) -> u32 {
        match *self {
            Dimensions::Dim1d { .. } | Dimensions::Dim1dArray { .. } => 1,
            Dimensions::Dim2d { height, .. } => height,
            Dimensions::Dim2dArray { height, .. } => height,
            Dimensions::Dim3d { height, .. } => height,
            Dimensions::Cubemap { size } => size,
            Dimensions::CubemapArray { size, .. } => size,
        }
    }

    #[inline]
    pub fn width_height(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        match *self {
            Dimensions::Dim3d { depth, .. } => depth,
            _ => 1,
        }
    }

    #[inline]
    pub fn array_layers(&self) -> u32 {
        match *self {
            Dimensions::Dim1dArray { array_layers, .. } => array_layers,
            Dimensions::Dim2dArray { array_layers, .. } => array_layers,
            Dimensions::CubemapArray { array_layers, .. } => array_layers,
            _ => 1,
        }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Dimensions {
        Dimensions::Dim2d { width, height }
    }
}

impl fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dimensions::Dim1d { width } => write!(f, "[1D {}x1]", width),
            Dimensions::Dim1dArray { width, array_layers } => {
                write!(f, "[1D Array {}x1(x{})]", width, array_layers)
            }
            Dimensions::Dim2d { width, height } => write!(f, "[2D {}x{}]", width, height),
            Dimensions::Dim2dArray { width, height, array_layers } => {
                write!(f, "[2D Array {}x{}(x{})]", width, height, array_layers)
            }
            Dimensions::Dim3d { width, height, depth } => {
                write!(f, "[3D {}x{}x{}]", width, height, depth)
            }
            Dimensions::Cubemap { size } => write!(f, "[Cubemap {}x{}]", size, size),
            Dimensions::CubemapArray { size, array_layers } => {
                write!(f, "[Cubemap Array {}x{}(x{})]", size, size, array_layers)
            }
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum MipmapsCount {
    Log2,
    One,
    Specific(u32),
}

/// `1 + floor(log2(max(w, h, d)))`.
pub fn get_texture_mip_map_count(size: u32) -> u32 {
    1 + f32::floor(f32::log2(size as f32)) as u32
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum SamplerAddressMode {
    Clamp,
    Mirror,
    Wrap,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum SamplerMipmapMode {
    Nearest,
    Linear,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct SamplerDescription {
    pub addr_u: SamplerAddressMode,
    pub addr_v: SamplerAddressMode,
    pub addr_w: SamplerAddressMode,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_mode: SamplerMipmapMode,
}

impl SamplerDescription {
    pub const LINEAR_MIPMAP_LINEAR: SamplerDescription = SamplerDescription {
        addr_u: SamplerAddressMode::Clamp,
        addr_v: SamplerAddressMode::Clamp,
        addr_w: SamplerAddressMode::Clamp,
        mag_filter: Filter::Linear,
        min_filter: Filter::Linear,
        mipmap_mode: SamplerMipmapMode::Linear,
    };

    pub const NEAREST_MIPMAP_NEAREST: SamplerDescription = SamplerDescription {
        addr_u: SamplerAddressMode::Clamp,
        addr_v: SamplerAddressMode::Clamp,
        addr_w: SamplerAddressMode::Clamp,
        mag_filter: Filter::Nearest,
        min_filter: Filter::Nearest,
        mipmap_mode: SamplerMipmapMode::Nearest,
    };

    pub const WRAP_NEAREST_MIPMAP_NEAREST: SamplerDescription = SamplerDescription {
        addr_u: SamplerAddressMode::Wrap,
        addr_v: SamplerAddressMode::Wrap,
        addr_w: SamplerAddressMode::Wrap,
        mag_filter: Filter::Nearest,
        min_filter: Filter::Nearest,
        mipmap_mode: SamplerMipmapMode::Nearest,
    };
}

/// Color space an [`Image`]'s samples are encoded in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColorSpace {
    Srgb,
    Linear,
    Hsv,
}

#[derive(Copy, Clone, Debug)]
pub struct ColorInfo {
    pub space: ColorSpace,
    pub full_range: bool,
}

impl Default for ColorInfo {
    fn default() -> Self {
        ColorInfo {
            space: ColorSpace::Srgb,
            full_range: true,
        }
    }
}

/// Backing GPU storage: either a single texture, or a planar tuple (e.g. two
/// planes for NV12 luma/chroma).
#[derive(Clone, Debug)]
pub enum ImageStorage {
    Single(GpuHandle),
    Planar(SmallVec<[GpuHandle; 3]>),
}

/// A GPU texture (or planar tuple) plus the metadata draw nodes need to
/// decide whether to re-sample: layout, a 4x4 coordinate transform (for
/// planar/cropped sources whose sample coordinates don't map 1:1 to the
/// unit square), color info, and a monotonically increasing revision bumped
/// on every content change.
pub struct Image {
    storage: ImageStorage,
    dimensions: Dimensions,
    format: Format,
    layout: PixFmt,
    coords: Mat4,
    color: ColorInfo,
    revision: Cell<u64>,
    timestamp: Cell<f64>,
}

impl Image {
    pub fn new(storage: ImageStorage, dimensions: Dimensions, format: Format, layout: PixFmt) -> Image {
        Image {
            storage,
            dimensions,
            format,
            layout,
            coords: crate::math::mat4_identity(),
            color: ColorInfo::default(),
            revision: Cell::new(1),
            timestamp: Cell::new(0.0),
        }
    }

    pub fn storage(&self) -> &ImageStorage {
        &self.storage
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn layout(&self) -> PixFmt {
        self.layout
    }

    pub fn coords(&self) -> Mat4 {
        self.coords
    }

    pub fn set_coords(&mut self, m: Mat4) {
        self.coords = m;
    }

    pub fn color(&self) -> ColorInfo {
        self.color
    }

    pub fn set_color(&mut self, color: ColorInfo) {
        self.color = color;
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp.get()
    }

    pub fn set_timestamp(&self, t: f64) {
        self.timestamp.set(t);
    }

    /// Signals a content change (new frame uploaded, render target drawn
    /// into). Consumers compare this against their last-observed value to
    /// decide whether to re-sample.
    pub fn bump_revision(&self) {
        self.revision.set(self.revision.get() + 1);
    }
}
