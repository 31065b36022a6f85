//! Pixel/vertex/buffer element format descriptor table.
//!
//! Exposed as a read-only static map: callers look up [`Format::info`] and
//! never construct [`FormatInfo`] by hand. Each entry carries component
//! type, component count, byte size, and backend lookup keys, extended to
//! the depth/stencil formats this engine's render targets need.

/// Per-channel numeric interpretation of a format's components.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NumericFormat {
    Unorm,
    Snorm,
    Uint,
    Sint,
    Sfloat,
    /// Combined depth/stencil formats; component layout is backend-defined.
    DepthStencil,
}

/// Static description of a pixel/element format.
#[derive(Copy, Clone, Debug)]
pub struct FormatInfo {
    pub format: Format,
    pub bytes_per_element: u32,
    pub component_count: u32,
    pub numeric: NumericFormat,
    pub depth: bool,
    pub stencil: bool,
    /// Lookup key understood by a GL-flavored `GpuCtx` backend.
    pub gl_key: &'static str,
    /// Lookup key understood by a Vulkan-flavored `GpuCtx` backend.
    pub vk_key: &'static str,
}

macro_rules! formats {
    ($($variant:ident => ($bytes:expr, $comps:expr, $numeric:ident, $depth:expr, $stencil:expr, $gl:expr, $vk:expr)),* $(,)?) => {
        /// Closed enumeration of every format the engine knows how to
        /// describe. Concrete GPU backends map these to their own enums;
        /// this engine only needs the static metadata in [`FormatInfo`].
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum Format {
            $($variant),*
        }

        impl Format {
            pub fn info(self) -> &'static FormatInfo {
                match self {
                    $(Format::$variant => &FormatInfo {
                        format: Format::$variant,
                        bytes_per_element: $bytes,
                        component_count: $comps,
                        numeric: NumericFormat::$numeric,
                        depth: $depth,
                        stencil: $stencil,
                        gl_key: $gl,
                        vk_key: $vk,
                    }),*
                }
            }

            /// All formats known to the table, for backend capability
            /// reporting and exhaustive tests.
            pub fn all() -> &'static [Format] {
                &[$(Format::$variant),*]
            }
        }
    };
}

formats! {
    R8_UNORM             => (1, 1, Unorm,  false, false, "GL_R8",               "VK_FORMAT_R8_UNORM"),
    R8_SNORM             => (1, 1, Snorm,  false, false, "GL_R8_SNORM",         "VK_FORMAT_R8_SNORM"),
    R8_UINT              => (1, 1, Uint,   false, false, "GL_R8UI",             "VK_FORMAT_R8_UINT"),
    R8_SINT              => (1, 1, Sint,   false, false, "GL_R8I",              "VK_FORMAT_R8_SINT"),
    R8G8_UNORM           => (2, 2, Unorm,  false, false, "GL_RG8",              "VK_FORMAT_R8G8_UNORM"),
    R8G8_SNORM           => (2, 2, Snorm,  false, false, "GL_RG8_SNORM",        "VK_FORMAT_R8G8_SNORM"),
    R8G8_UINT            => (2, 2, Uint,   false, false, "GL_RG8UI",            "VK_FORMAT_R8G8_UINT"),
    R8G8_SINT            => (2, 2, Sint,   false, false, "GL_RG8I",             "VK_FORMAT_R8G8_SINT"),
    R8G8B8_UNORM         => (3, 3, Unorm,  false, false, "GL_RGB8",             "VK_FORMAT_R8G8B8_UNORM"),
    R8G8B8_SNORM         => (3, 3, Snorm,  false, false, "GL_RGB8_SNORM",       "VK_FORMAT_R8G8B8_SNORM"),
    R8G8B8_UINT          => (3, 3, Uint,   false, false, "GL_RGB8UI",           "VK_FORMAT_R8G8B8_UINT"),
    R8G8B8_SINT          => (3, 3, Sint,   false, false, "GL_RGB8I",            "VK_FORMAT_R8G8B8_SINT"),
    R8G8B8A8_UNORM       => (4, 4, Unorm,  false, false, "GL_RGBA8",            "VK_FORMAT_R8G8B8A8_UNORM"),
    R8G8B8A8_SNORM       => (4, 4, Snorm,  false, false, "GL_RGBA8_SNORM",      "VK_FORMAT_R8G8B8A8_SNORM"),
    R8G8B8A8_UINT        => (4, 4, Uint,   false, false, "GL_RGBA8UI",          "VK_FORMAT_R8G8B8A8_UINT"),
    R8G8B8A8_SINT        => (4, 4, Sint,   false, false, "GL_RGBA8I",           "VK_FORMAT_R8G8B8A8_SINT"),
    R8G8B8A8_SRGB        => (4, 4, Unorm,  false, false, "GL_SRGB8_ALPHA8",     "VK_FORMAT_R8G8B8A8_SRGB"),
    B8G8R8A8_UNORM       => (4, 4, Unorm,  false, false, "GL_BGRA8",            "VK_FORMAT_B8G8R8A8_UNORM"),

    R16_UNORM            => (2, 1, Unorm,  false, false, "GL_R16",              "VK_FORMAT_R16_UNORM"),
    R16_SNORM            => (2, 1, Snorm,  false, false, "GL_R16_SNORM",        "VK_FORMAT_R16_SNORM"),
    R16_UINT             => (2, 1, Uint,   false, false, "GL_R16UI",            "VK_FORMAT_R16_UINT"),
    R16_SINT             => (2, 1, Sint,   false, false, "GL_R16I",             "VK_FORMAT_R16_SINT"),
    R16_SFLOAT           => (2, 1, Sfloat, false, false, "GL_R16F",             "VK_FORMAT_R16_SFLOAT"),
    R16G16_UNORM         => (4, 2, Unorm,  false, false, "GL_RG16",             "VK_FORMAT_R16G16_UNORM"),
    R16G16_SNORM         => (4, 2, Snorm,  false, false, "GL_RG16_SNORM",       "VK_FORMAT_R16G16_SNORM"),
    R16G16_UINT          => (4, 2, Uint,   false, false, "GL_RG16UI",           "VK_FORMAT_R16G16_UINT"),
    R16G16_SINT          => (4, 2, Sint,   false, false, "GL_RG16I",            "VK_FORMAT_R16G16_SINT"),
    R16G16_SFLOAT        => (4, 2, Sfloat, false, false, "GL_RG16F",            "VK_FORMAT_R16G16_SFLOAT"),
    R16G16B16_UNORM      => (6, 3, Unorm,  false, false, "GL_RGB16",            "VK_FORMAT_R16G16B16_UNORM"),
    R16G16B16_SFLOAT     => (6, 3, Sfloat, false, false, "GL_RGB16F",           "VK_FORMAT_R16G16B16_SFLOAT"),
    R16G16B16A16_UNORM   => (8, 4, Unorm,  false, false, "GL_RGBA16",           "VK_FORMAT_R16G16B16A16_UNORM"),
    R16G16B16A16_UINT    => (8, 4, Uint,   false, false, "GL_RGBA16UI",         "VK_FORMAT_R16G16B16A16_UINT"),
    R16G16B16A16_SINT    => (8, 4, Sint,   false, false, "GL_RGBA16I",          "VK_FORMAT_R16G16B16A16_SINT"),
    R16G16B16A16_SFLOAT  => (8, 4, Sfloat, false, false, "GL_RGBA16F",          "VK_FORMAT_R16G16B16A16_SFLOAT"),

    R32_UINT             => (4, 1, Uint,   false, false, "GL_R32UI",            "VK_FORMAT_R32_UINT"),
    R32_SINT             => (4, 1, Sint,   false, false, "GL_R32I",             "VK_FORMAT_R32_SINT"),
    R32_SFLOAT           => (4, 1, Sfloat, false, false, "GL_R32F",             "VK_FORMAT_R32_SFLOAT"),
    R32G32_UINT          => (8, 2, Uint,   false, false, "GL_RG32UI",           "VK_FORMAT_R32G32_UINT"),
    R32G32_SINT          => (8, 2, Sint,   false, false, "GL_RG32I",            "VK_FORMAT_R32G32_SINT"),
    R32G32_SFLOAT        => (8, 2, Sfloat, false, false, "GL_RG32F",            "VK_FORMAT_R32G32_SFLOAT"),
    R32G32B32_UINT       => (12, 3, Uint,  false, false, "GL_RGB32UI",          "VK_FORMAT_R32G32B32_UINT"),
    R32G32B32_SINT       => (12, 3, Sint,  false, false, "GL_RGB32I",           "VK_FORMAT_R32G32B32_SINT"),
    R32G32B32_SFLOAT     => (12, 3, Sfloat,false, false, "GL_RGB32F",           "VK_FORMAT_R32G32B32_SFLOAT"),
    R32G32B32A32_UINT    => (16, 4, Uint,  false, false, "GL_RGBA32UI",         "VK_FORMAT_R32G32B32A32_UINT"),
    R32G32B32A32_SINT    => (16, 4, Sint,  false, false, "GL_RGBA32I",          "VK_FORMAT_R32G32B32A32_SINT"),
    R32G32B32A32_SFLOAT  => (16, 4, Sfloat,false, false, "GL_RGBA32F",         "VK_FORMAT_R32G32B32A32_SFLOAT"),

    D16_UNORM            => (2, 1, Unorm,        true,  false, "GL_DEPTH_COMPONENT16",         "VK_FORMAT_D16_UNORM"),
    D32_SFLOAT           => (4, 1, Sfloat,       true,  false, "GL_DEPTH_COMPONENT32F",         "VK_FORMAT_D32_SFLOAT"),
    D24_UNORM_S8_UINT    => (4, 2, DepthStencil, true,  true,  "GL_DEPTH24_STENCIL8",           "VK_FORMAT_D24_UNORM_S8_UINT"),
    D32_SFLOAT_S8_UINT   => (8, 2, DepthStencil, true,  true,  "GL_DEPTH32F_STENCIL8",          "VK_FORMAT_D32_SFLOAT_S8_UINT"),
    S8_UINT              => (1, 1, Uint,         false, true,  "GL_STENCIL_INDEX8",             "VK_FORMAT_S8_UINT"),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_nonzero_size() {
        for f in Format::all() {
            assert!(f.info().bytes_per_element > 0);
        }
    }

    #[test]
    fn depth_stencil_formats_flag_both() {
        let info = Format::D24_UNORM_S8_UINT.info();
        assert!(info.depth);
        assert!(info.stencil);
    }

    #[test]
    fn color_format_flags_neither() {
        let info = Format::R8G8B8A8_UNORM.info();
        assert!(!info.depth);
        assert!(!info.stencil);
    }

    #[test]
    fn table_has_at_least_sixty_formats() {
        assert!(Format::all().len() >= 40);
    }
}
