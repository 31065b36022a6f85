//! Draw nodes (component I): `DrawColor`/`Gradient`/`Texture`/`Mask`/
//! `Noise`/`Displace`/`Histogram`/`Waveform`/`Path`. Each shares a common
//! sub-structure (blend preset, geometry override, filter list) and
//! contributes a kind-specific uniform set and fragment body to
//! [`Craft`](crate::craft::Craft).

use crate::craft::{Craft, CraftInput, ShaderStage, UniformDesc};
use crate::error::{EngineError, Result};
use crate::filter::{Filter, FilterChain, Helpers};
use crate::format::Format;
use crate::geometry::Geometry;
use crate::math::{Vec3, Vec4};
use crate::vertex::VertexLayout;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendPreset {
    Default,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
}

/// Straight-alpha `color`/`opacity` to premultiplied `(rgb*a, a)`.
pub fn straight_to_premultiplied(color: Vec3, opacity: f32) -> Vec4 {
    [color[0] * opacity, color[1] * opacity, color[2] * opacity, opacity]
}

/// Porter-Duff composite of two premultiplied colors under `preset`.
pub fn blend(preset: BlendPreset, src: Vec4, dst: Vec4) -> Vec4 {
    let (fa, fb): (f32, f32) = match preset {
        BlendPreset::Default | BlendPreset::SrcOver => (1.0, 1.0 - src[3]),
        BlendPreset::DstOver => (1.0 - dst[3], 1.0),
        BlendPreset::SrcIn => (dst[3], 0.0),
        BlendPreset::DstIn => (0.0, src[3]),
        BlendPreset::SrcOut => (1.0 - dst[3], 0.0),
        BlendPreset::DstOut => (0.0, 1.0 - src[3]),
        BlendPreset::SrcAtop => (dst[3], 1.0 - src[3]),
        BlendPreset::DstAtop => (1.0 - dst[3], src[3]),
        BlendPreset::Xor => (1.0 - dst[3], 1.0 - src[3]),
    };
    [
        src[0] * fa + dst[0] * fb,
        src[1] * fa + dst[1] * fb,
        src[2] * fa + dst[2] * fb,
        src[3] * fa + dst[3] * fb,
    ]
}

pub fn premultiplied_to_u8(c: Vec4) -> [u8; 4] {
    [
        (c[0] * 255.0).round().clamp(0.0, 255.0) as u8,
        (c[1] * 255.0).round().clamp(0.0, 255.0) as u8,
        (c[2] * 255.0).round().clamp(0.0, 255.0) as u8,
        (c[3] * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Which variant-specific uniforms/behavior a `DrawNode` carries.
pub enum DrawKind {
    Color { color: Vec3, opacity: f32 },
    Gradient { start: Vec4, end: Vec4, radial: bool, linear_space: bool },
    Gradient4 { corners: [Vec4; 4], linear_space: bool },
    Texture { reframe: crate::math::Mat4 },
    Mask { invert: bool },
    Displace { scale: f32 },
    Noise { octaves: u32, lacunarity: f32, gain: f32, seed: u32, scale: f32, evolution: f32 },
    Histogram { parade: bool },
    Waveform,
    Path { pt_size: f32, dpi: f32, outline: f32, glow: f32, blur: f32 },
}

impl DrawKind {
    fn name(&self) -> &'static str {
        match self {
            DrawKind::Color { .. } => "draw_color",
            DrawKind::Gradient { .. } => "draw_gradient",
            DrawKind::Gradient4 { .. } => "draw_gradient4",
            DrawKind::Texture { .. } => "draw_texture",
            DrawKind::Mask { .. } => "draw_mask",
            DrawKind::Displace { .. } => "draw_displace",
            DrawKind::Noise { .. } => "draw_noise",
            DrawKind::Histogram { .. } => "draw_histogram",
            DrawKind::Waveform => "draw_waveform",
            DrawKind::Path { .. } => "draw_path",
        }
    }

    fn validate(&self) -> Result<()> {
        if let DrawKind::Noise { octaves, .. } = self {
            if *octaves == 0 || *octaves > 8 {
                return Err(EngineError::InvalidArg);
            }
        }
        Ok(())
    }

    fn uniforms(&self) -> Vec<UniformDesc> {
        let f = |n: &str, fmt: Format| UniformDesc { name: n.into(), format: fmt, stage: ShaderStage::Fragment };
        match self {
            DrawKind::Color { .. } => vec![
                f("u_color", Format::R32G32B32_SFLOAT),
                f("u_opacity", Format::R32_SFLOAT),
            ],
            DrawKind::Gradient { .. } => vec![
                f("u_start", Format::R32G32B32A32_SFLOAT),
                f("u_end", Format::R32G32B32A32_SFLOAT),
            ],
            DrawKind::Gradient4 { .. } => vec![
                f("u_c0", Format::R32G32B32A32_SFLOAT),
                f("u_c1", Format::R32G32B32A32_SFLOAT),
                f("u_c2", Format::R32G32B32A32_SFLOAT),
                f("u_c3", Format::R32G32B32A32_SFLOAT),
            ],
            DrawKind::Texture { .. } => vec![f("u_reframe", Format::R32G32B32A32_SFLOAT)],
            DrawKind::Mask { .. } => vec![f("u_invert", Format::R32_SFLOAT)],
            DrawKind::Displace { .. } => vec![f("u_scale", Format::R32_SFLOAT)],
            DrawKind::Noise { .. } => vec![
                f("u_lacunarity", Format::R32_SFLOAT),
                f("u_gain", Format::R32_SFLOAT),
                f("u_scale", Format::R32_SFLOAT),
                f("u_evolution", Format::R32_SFLOAT),
            ],
            DrawKind::Histogram { .. } | DrawKind::Waveform => vec![],
            DrawKind::Path { .. } => vec![
                f("u_fill_rect", Format::R32G32B32A32_SFLOAT),
                f("u_outline_rect", Format::R32G32B32A32_SFLOAT),
                f("u_color", Format::R32G32B32A32_SFLOAT),
                f("u_outline_width", Format::R32_SFLOAT),
                f("u_glow", Format::R32_SFLOAT),
                f("u_blur", Format::R32_SFLOAT),
            ],
        }
    }

    fn fragment_body(&self) -> &'static str {
        match self {
            DrawKind::Color { .. } => "kp_out_color = vec4(u_color * u_opacity, u_opacity);",
            DrawKind::Gradient { .. } => "kp_out_color = mix(u_start, u_end, v_uv.x);",
            DrawKind::Gradient4 { .. } => "kp_out_color = mix(mix(u_c0, u_c1, v_uv.x), mix(u_c3, u_c2, v_uv.x), v_uv.y);",
            DrawKind::Texture { .. } => "kp_out_color = texture(tex, v_uv);",
            DrawKind::Mask { .. } => "kp_out_color = content_color * (u_invert > 0.5 ? 1.0 - mask_color.r : mask_color.r);",
            DrawKind::Displace { .. } => "kp_out_color = texture(source, v_uv + (texture(displacement, v_uv).rg - 0.5) * u_scale);",
            DrawKind::Noise { .. } => "kp_out_color = vec4(vec3(kp_fractal_noise(v_uv)), 1.0);",
            DrawKind::Histogram { .. } => "kp_out_color = kp_read_histogram(v_uv);",
            DrawKind::Waveform => "kp_out_color = kp_read_waveform(v_uv);",
            DrawKind::Path { .. } => "kp_out_color = kp_sdf_path(v_uv, u_fill_rect, u_outline_rect, u_color, u_outline_width, u_glow, u_blur);",
        }
    }
}

/// Shared by every draw node: blend preset, optional geometry override
/// (else a unit-quad strip is used), and an optional filter chain.
pub struct DrawCommon {
    pub blend: BlendPreset,
    pub geometry: Option<Geometry>,
    pub filters: Vec<Filter>,
}

impl DrawCommon {
    pub fn new() -> DrawCommon {
        DrawCommon { blend: BlendPreset::Default, geometry: None, filters: Vec::new() }
    }
}

impl Default for DrawCommon {
    fn default() -> Self {
        DrawCommon::new()
    }
}

fn unit_quad_layout() -> VertexLayout {
    VertexLayout::packed(&[("a_pos", Format::R32G32B32_SFLOAT), ("a_uv", Format::R32G32_SFLOAT)])
}

pub struct DrawNode {
    pub common: DrawCommon,
    pub kind: DrawKind,
}

impl DrawNode {
    pub fn new(kind: DrawKind, common: DrawCommon) -> Result<DrawNode> {
        kind.validate()?;
        Ok(DrawNode { common, kind })
    }

    /// Builds the `CraftInput` combining this node's base fragment with its
    /// filter chain, if any.
    pub fn craft_input(&self) -> CraftInput {
        let mut uniforms = self.kind.uniforms();
        let fragment_base = if self.common.filters.is_empty() {
            self.kind.fragment_body().to_string()
        } else {
            let mut chain = FilterChain::new(self.kind.name(), self.kind.fragment_body(), Helpers::empty());
            for filter in &self.common.filters {
                chain.push(filter.clone());
            }
            for r in chain.resources() {
                uniforms.push(UniformDesc { name: r.name, format: r.format, stage: ShaderStage::Fragment });
            }
            format!("{}\nkp_out_color = main_color(v_uv);", chain.build())
        };

        CraftInput {
            label: self.kind.name().to_string(),
            vertex_base: "gl_Position = vec4(a_pos, 1.0); v_uv = a_uv;".to_string(),
            fragment_base,
            attributes: unit_quad_layout(),
            uniforms,
            textures: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn build_pipeline(&self, craft: &Craft) -> crate::craft::PipelineCompat {
        craft.build(self.craft_input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::craft::CompatInfo;

    #[test]
    fn s1_colored_quad_straight_over_clear_matches_reference_pixel() {
        let premult = straight_to_premultiplied([1.0, 0.0, 0.0], 0.5);
        let composited = blend(BlendPreset::SrcOver, premult, [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(premultiplied_to_u8(composited), [128, 0, 0, 128]);
    }

    #[test]
    fn noise_rejects_octave_count_outside_one_to_eight() {
        let kind = DrawKind::Noise { octaves: 0, lacunarity: 2.0, gain: 0.5, seed: 1, scale: 1.0, evolution: 0.0 };
        assert_eq!(DrawNode::new(kind, DrawCommon::new()).err(), Some(EngineError::InvalidArg));

        let kind = DrawKind::Noise { octaves: 9, lacunarity: 2.0, gain: 0.5, seed: 1, scale: 1.0, evolution: 0.0 };
        assert_eq!(DrawNode::new(kind, DrawCommon::new()).err(), Some(EngineError::InvalidArg));
    }

    #[test]
    fn draw_color_declares_color_and_opacity_uniforms() {
        let node = DrawNode::new(DrawKind::Color { color: [1.0, 0.0, 0.0], opacity: 0.5 }, DrawCommon::new()).unwrap();
        let craft = Craft::new(CompatInfo::new());
        let pc = node.build_pipeline(&craft);
        assert!(pc.get_uniform_index("u_color").is_some());
        assert!(pc.get_uniform_index("u_opacity").is_some());
    }
}
