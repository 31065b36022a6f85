//! End-to-end composition tests: a scene graph driven through a
//! `RenderContext`, and a draw node compiled all the way to a
//! `PipelineCompat` with a populated filter chain. Single-module unit
//! tests already cover each component's own invariants; these exercise
//! the seams between them.

use kelpie_core::anim::{Animation, EasingParams, KeyFrame};
use kelpie_core::context::{RenderConfig, RenderContext};
use kelpie_core::craft::{Craft, CompatInfo};
use kelpie_core::draw::{blend, premultiplied_to_u8, straight_to_premultiplied, BlendPreset, DrawCommon, DrawKind, DrawNode};
use kelpie_core::error::EngineError;
use kelpie_core::filter::{Filter, Helpers};
use kelpie_core::format::Format;
use kelpie_core::gpu::{BufferDesc, CapabilityReport, GpuCtx, GpuHandle, ImageDesc, Limits};
use kelpie_core::math::{self, Mat4};
use kelpie_core::node::NodeKind;

struct MockGpu {
    width: u32,
    height: u32,
    limits: Limits,
}

impl MockGpu {
    fn new() -> MockGpu {
        MockGpu { width: 0, height: 0, limits: Limits::default() }
    }
}

impl GpuCtx for MockGpu {
    fn init(&mut self, width: u32, height: u32) -> kelpie_core::Result<()> {
        self.width = width;
        self.height = height;
        Ok(())
    }
    fn resize(&mut self, w: u32, h: u32) -> kelpie_core::Result<()> {
        self.width = w;
        self.height = h;
        Ok(())
    }
    fn wait_idle(&mut self) {}
    fn set_capture_buffer(&mut self, _handle: Option<GpuHandle>) -> kelpie_core::Result<()> {
        Ok(())
    }
    fn default_rendertarget(&self) -> GpuHandle {
        GpuHandle(0)
    }
    fn default_rendertarget_layout(&self) -> Format {
        Format::R8G8B8A8_UNORM
    }
    fn default_rendertarget_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    fn create_buffer(&mut self, _desc: BufferDesc) -> kelpie_core::Result<GpuHandle> {
        Ok(GpuHandle(1))
    }
    fn upload_buffer(&mut self, _handle: GpuHandle, _offset: usize, _data: &[u8]) -> kelpie_core::Result<()> {
        Ok(())
    }
    fn destroy_buffer(&mut self, _handle: GpuHandle) {}
    fn create_image(&mut self, _desc: ImageDesc) -> kelpie_core::Result<GpuHandle> {
        Ok(GpuHandle(2))
    }
    fn upload_image(&mut self, _handle: GpuHandle, _data: &[u8]) -> kelpie_core::Result<()> {
        Ok(())
    }
    fn destroy_image(&mut self, _handle: GpuHandle) {}
    fn begin_update(&mut self) {}
    fn end_update(&mut self) {}
    fn begin_draw(&mut self) {}
    fn end_draw(&mut self) {}
    fn begin_render_pass(&mut self, _target: GpuHandle) -> kelpie_core::Result<()> {
        Ok(())
    }
    fn end_render_pass(&mut self) {}
    fn is_render_pass_active(&self) -> bool {
        false
    }
    fn set_viewport(&mut self, _x: f32, _y: f32, _w: f32, _h: f32) {}
    fn set_scissor(&mut self, _x: i32, _y: i32, _w: u32, _h: u32) {}
    fn transform_projection_matrix(&self, proj: &Mat4) -> Mat4 {
        *proj
    }
    fn query_draw_time(&self) -> Option<std::time::Duration> {
        None
    }
    fn limits(&self) -> &Limits {
        &self.limits
    }
    fn capabilities(&self) -> CapabilityReport {
        CapabilityReport::new(0, "mock")
    }
}

/// A `Group` with an `AnimatedFloat` leaf feeding a `UniformFloat`, attached
/// to a `RenderContext` and driven through two frames: the uniform tracks
/// the keyframe curve, and releasing the scene frees every node.
#[test]
fn animated_uniform_tracks_source_across_frames_then_releases_cleanly() {
    let mut ctx = RenderContext::new(Box::new(MockGpu::new()));
    ctx.configure(RenderConfig::default(), 64, 64).unwrap();

    let anim = Animation::new(vec![
        KeyFrame { time: 0.0, value: 0.0_f32, easing: EasingParams::default() },
        KeyFrame { time: 1.0, value: 10.0_f32, easing: EasingParams::default() },
    ])
    .unwrap();

    let arena = ctx.arena_mut();
    let source = arena.create(NodeKind::AnimatedFloat { anim }, "drive");
    let uniform = arena.create(NodeKind::UniformFloat { value: 0.0, source: Some(source) }, "u_value");
    let root = arena.create(NodeKind::Group { children: vec![uniform] }, "root");

    ctx.set_scene(root).unwrap();
    ctx.draw(0.0).unwrap();
    let at_zero = match arena_value(&mut ctx, uniform) {
        NodeKind::UniformFloat { value, .. } => value,
        _ => unreachable!(),
    };
    assert_eq!(at_zero, 0.0);

    ctx.draw(0.5).unwrap();
    let at_half = match arena_value(&mut ctx, uniform) {
        NodeKind::UniformFloat { value, .. } => value,
        _ => unreachable!(),
    };
    assert!((at_half - 5.0).abs() < 1e-4, "expected ~5.0, got {at_half}");

    let arena = ctx.arena_mut();
    arena.release(root).unwrap();
    assert!(arena.get(root).is_none());
    assert!(arena.get(uniform).is_none());
    assert!(arena.get(source).is_none());
}

fn arena_value(ctx: &mut RenderContext, id: kelpie_core::node::NodeId) -> NodeKind {
    let node = ctx.arena_mut().get(id).unwrap();
    let borrowed = node.borrow();
    match borrowed.kind() {
        NodeKind::UniformFloat { value, source } => NodeKind::UniformFloat { value: *value, source: *source },
        _ => unreachable!(),
    }
}

/// A reference cycle (two groups pointing at each other) is rejected at
/// `set_scene` time rather than causing a stack overflow or leak.
#[test]
fn set_scene_rejects_a_cyclic_graph() {
    let mut ctx = RenderContext::new(Box::new(MockGpu::new()));
    ctx.configure(RenderConfig::default(), 16, 16).unwrap();

    let arena = ctx.arena_mut();
    let a = arena.create(NodeKind::Group { children: vec![] }, "a");
    let b = arena.create(NodeKind::Group { children: vec![a] }, "b");
    if let NodeKind::Group { children } = arena.get(a).unwrap().borrow_mut().kind_mut() {
        children.push(b);
    }

    assert_eq!(ctx.set_scene(b).err(), Some(EngineError::InvalidUsage));
}

/// A colored quad with an opacity filter and an alpha-premultiply filter
/// compiles through `Craft` with the filter chain's resources folded into
/// the pipeline's uniform set, and the blend math it would execute at
/// draw time matches the documented straight-over-clear result.
#[test]
fn colored_draw_node_with_filter_chain_compiles_and_blends() {
    let mut common = DrawCommon::new();
    common.blend = BlendPreset::SrcOver;
    common.filters.push(Filter::new("opacity", "kp_out_color.a *= u_opacity_mul;", Helpers::empty()));
    common.filters.push(Filter::new("alpha", "kp_out_color.rgb *= kp_out_color.a;", Helpers::MISC));

    let node = DrawNode::new(DrawKind::Color { color: [1.0, 0.0, 0.0], opacity: 0.5 }, common).unwrap();

    let craft = Craft::new(CompatInfo::new());
    let pipeline = node.build_pipeline(&craft);

    assert!(pipeline.get_uniform_index("u_color").is_some());
    assert!(pipeline.get_uniform_index("u_opacity").is_some());
    assert!(pipeline.fragment_source().contains("main_color"));
    assert!(pipeline.fragment_source().contains("opacity_0"));
    assert!(pipeline.fragment_source().contains("alpha_0"));

    let premult = straight_to_premultiplied([1.0, 0.0, 0.0], 0.5);
    let composited = blend(BlendPreset::SrcOver, premult, [0.0, 0.0, 0.0, 0.0]);
    assert_eq!(premultiplied_to_u8(composited), [128, 0, 0, 128]);
}

/// `RenderContext::draw` restores matrix/rendertarget stack depth even when
/// a scene contains a node that fails `init` (a zero-octave noise node),
/// satisfying the always-balanced-stack invariant across an error path
/// reached through the full context, not just a unit-level push/pop.
#[test]
fn draw_with_a_failing_node_still_balances_stacks() {
    let mut ctx = RenderContext::new(Box::new(MockGpu::new()));
    ctx.configure(RenderConfig::default(), 8, 8).unwrap();

    let arena = ctx.arena_mut();
    let bad_noise = arena.create(
        NodeKind::Noise { octaves: 0, lacunarity: 2.0, gain: 0.5, seed: 0, scale: 1.0, evolution: 0.0 },
        "bad_noise",
    );
    let root = arena.create(NodeKind::Group { children: vec![bad_noise] }, "root");
    ctx.set_scene(root).unwrap();

    let before_mv = ctx.modelview_depth();
    let before_rt = ctx.rendertarget_depth();
    let result = ctx.draw(0.0);
    assert!(result.is_err());
    assert_eq!(ctx.modelview_depth(), before_mv);
    assert_eq!(ctx.rendertarget_depth(), before_rt);
}

/// A `DrawColor` node attached as the scene renders through the full
/// `RenderContext::draw` path (node kernel traversal -> `Craft::build` ->
/// `PipelineCompat::draw`), not just as a standalone `blend()` call.
#[test]
fn draw_node_attached_to_scene_renders_through_the_context() {
    let mut ctx = RenderContext::new(Box::new(MockGpu::new()));
    ctx.configure(RenderConfig::default(), 32, 32).unwrap();

    let node = DrawNode::new(DrawKind::Color { color: [1.0, 0.0, 0.0], opacity: 0.5 }, DrawCommon::new()).unwrap();
    let arena = ctx.arena_mut();
    let draw_id = arena.create(NodeKind::Draw(node), "quad");
    let translate = arena.create(NodeKind::Translate { offset: [1.0, 0.0, 0.0], child: Some(draw_id) }, "move");
    ctx.set_scene(translate).unwrap();

    ctx.draw(0.0).unwrap();
    assert_eq!(ctx.modelview_depth(), 1);
}

/// A `MatrixScope` composes with the context's current top rather than
/// resetting it, and nested scopes unwind in reverse order.
#[test]
fn nested_matrix_scopes_compose_and_unwind_in_order() {
    let mut ctx = RenderContext::new(Box::new(MockGpu::new()));
    ctx.configure(RenderConfig::default(), 4, 4).unwrap();

    let translate = math::mat4_translate([1.0, 0.0, 0.0]);
    let depth0 = ctx.modelview_depth();
    {
        let scope1 = ctx.push_modelview(translate);
        let top1 = scope1.top();
        {
            let scope2 = ctx.push_modelview(translate);
            assert_eq!(ctx.modelview_depth(), depth0 + 2);
            let _ = scope2.top();
        }
        assert_eq!(ctx.modelview_depth(), depth0 + 1);
        assert_eq!(ctx.push_modelview(math::mat4_identity()).top(), top1);
    }
    assert_eq!(ctx.modelview_depth(), depth0);
}
