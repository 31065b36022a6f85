//! Render context (component J): the frame driver. Owns the `GpuCtx`, the
//! attached scene, matrix/rendertarget stacks, and a single-worker-thread
//! command queue that serializes configure/resize/draw calls the way the
//! teacher's `swapchain.rs` serializes presentation against the render
//! thread.

use crate::craft::{Craft, CompatInfo};
use crate::error::{EngineError, Result};
use crate::gpu::GpuCtx;
use crate::math::{self, Mat4};
use crate::node::{LifecycleState, NodeArena, NodeId};
use log::{info, warn};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    Auto,
    OpenGl,
    OpenGlEs,
    Vulkan,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PresentMode {
    Vsync,
    Immediate,
}

/// Constructed from a `config` crate `Config` object, or built directly.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub backend: Backend,
    pub present_mode: PresentMode,
    pub hud_enabled: bool,
    pub capture_buffer: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { backend: Backend::Auto, present_mode: PresentMode::Vsync, hud_enabled: false, capture_buffer: false }
    }
}

impl RenderConfig {
    /// Reads `render.backend`/`render.present_mode`/`render.hud`/
    /// `render.capture_buffer` from a loaded `config::Config`, falling back
    /// to defaults for any key that is absent.
    pub fn from_config(cfg: &config::Config) -> RenderConfig {
        let mut out = RenderConfig::default();
        if let Ok(backend) = cfg.get_string("render.backend") {
            out.backend = match backend.as_str() {
                "opengl" => Backend::OpenGl,
                "opengles" => Backend::OpenGlEs,
                "vulkan" => Backend::Vulkan,
                _ => Backend::Auto,
            };
        }
        if let Ok(vsync) = cfg.get_bool("render.vsync") {
            out.present_mode = if vsync { PresentMode::Vsync } else { PresentMode::Immediate };
        }
        if let Ok(hud) = cfg.get_bool("render.hud") {
            out.hud_enabled = hud;
        }
        if let Ok(capture) = cfg.get_bool("render.capture_buffer") {
            out.capture_buffer = capture;
        }
        out
    }
}

/// A scope-based push/pop guard: `pop` runs in `Drop`, so an early return
/// through `?` cannot leave the stack unbalanced.
pub struct MatrixScope<'a> {
    stack: &'a mut Vec<Mat4>,
}

impl<'a> MatrixScope<'a> {
    fn push(stack: &'a mut Vec<Mat4>, m: Mat4) -> MatrixScope<'a> {
        let top = *stack.last().unwrap();
        stack.push(math::mat4_mul(&top, &m));
        MatrixScope { stack }
    }

    pub fn top(&self) -> Mat4 {
        *self.stack.last().unwrap()
    }
}

impl Drop for MatrixScope<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RenderTargetVariant {
    Clear,
    Load,
}

#[derive(Copy, Clone, Debug)]
pub struct RenderTarget {
    pub handle: crate::gpu::GpuHandle,
    pub variant: RenderTargetVariant,
}

/// A scope-based rendertarget-stack guard, mirroring `MatrixScope`.
pub struct RenderTargetScope<'a> {
    stack: &'a mut Vec<RenderTarget>,
}

impl Drop for RenderTargetScope<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Bounded single-item slot guarded by a mutex and two condvars
/// (controller-signals-worker, worker-signals-controller), preserving the
/// "one call at a time, synchronous" semantics the design notes call for
/// instead of a generic multi-item channel.
struct CommandSlot<T> {
    item: Mutex<Option<T>>,
    controller_ready: Condvar,
    worker_done: Condvar,
}

impl<T> CommandSlot<T> {
    fn new() -> CommandSlot<T> {
        CommandSlot { item: Mutex::new(None), controller_ready: Condvar::new(), worker_done: Condvar::new() }
    }

    fn submit(&self, value: T) {
        let mut guard = self.item.lock().unwrap();
        guard.replace(value);
        self.controller_ready.notify_one();
        let _ = self.worker_done.wait_while(guard, |g| g.is_some()).unwrap();
    }

    fn take(&self) -> T {
        let mut guard = self.item.lock().unwrap();
        guard = self.controller_ready.wait_while(guard, |g| g.is_none()).unwrap();
        let value = guard.take().unwrap();
        self.worker_done.notify_one();
        value
    }
}

/// The single-worker-thread command queue the render context dispatches
/// `configure`/`resize`/`draw` through.
pub struct CommandQueue {
    slot: Arc<CommandSlot<Box<dyn FnOnce() + Send>>>,
}

impl CommandQueue {
    pub fn new() -> CommandQueue {
        let slot: Arc<CommandSlot<Box<dyn FnOnce() + Send>>> = Arc::new(CommandSlot::new());
        let worker_slot = slot.clone();
        std::thread::spawn(move || loop {
            let cmd = worker_slot.take();
            cmd();
        });
        CommandQueue { slot }
    }

    /// Runs `f` on the worker thread and blocks the caller until it returns.
    pub fn dispatch<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.slot.submit(Box::new(f));
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        CommandQueue::new()
    }
}

/// Owns the GPU context, the attached scene, and per-frame matrix/
/// rendertarget stacks.
pub struct RenderContext {
    gpu: Box<dyn GpuCtx>,
    arena: NodeArena,
    root: Option<NodeId>,
    craft: Craft,
    config: RenderConfig,
    viewport: Viewport,
    scissor: Option<Viewport>,
    modelview_stack: Vec<Mat4>,
    projection_stack: Vec<Mat4>,
    rendertarget_stack: Vec<RenderTarget>,
    default_rendertarget: Option<RenderTarget>,
}

impl RenderContext {
    pub fn new(gpu: Box<dyn GpuCtx>) -> RenderContext {
        RenderContext {
            gpu,
            arena: NodeArena::new(),
            root: None,
            craft: Craft::new(CompatInfo::new()),
            config: RenderConfig::default(),
            viewport: Viewport::default(),
            scissor: None,
            modelview_stack: vec![math::mat4_identity()],
            projection_stack: vec![math::mat4_identity()],
            rendertarget_stack: Vec::new(),
            default_rendertarget: None,
        }
    }

    /// Selects the backend, initializes the GPU context, and composes the
    /// default projection matrix for the backend's clip-space convention.
    pub fn configure(&mut self, config: RenderConfig, width: u32, height: u32) -> Result<()> {
        self.gpu.init(width, height)?;
        let proj = math::mat4_orthographic(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        self.projection_stack[0] = self.gpu.transform_projection_matrix(&proj);
        self.viewport = Viewport { x: 0, y: 0, width, height };
        self.config = config;
        info!("render context configured for backend {:?}", self.config.backend);
        Ok(())
    }

    /// Attaches `root` as the scene; rejects (`InvalidUsage`) if a scene is
    /// already attached.
    pub fn set_scene(&mut self, root: NodeId) -> Result<()> {
        if self.root.is_some() {
            return Err(EngineError::InvalidUsage);
        }
        self.arena.attach(root)?;
        self.root = Some(root);
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.gpu.resize(width, height)?;
        self.viewport = Viewport { x: 0, y: 0, width, height };
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.gpu.set_viewport(viewport.x as f32, viewport.y as f32, viewport.width as f32, viewport.height as f32);
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn gpu_mut(&mut self) -> &mut dyn GpuCtx {
        &mut *self.gpu
    }

    /// Direct access to the attached node arena, for callers constructing
    /// a scene before `set_scene` or inspecting node state afterward.
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    pub fn push_modelview(&mut self, m: Mat4) -> MatrixScope<'_> {
        MatrixScope::push(&mut self.modelview_stack, m)
    }

    pub fn modelview_depth(&self) -> usize {
        self.modelview_stack.len()
    }

    pub fn push_rendertarget(&mut self, target: RenderTarget) -> RenderTargetScope<'_> {
        self.rendertarget_stack.push(target);
        RenderTargetScope { stack: &mut self.rendertarget_stack }
    }

    pub fn rendertarget_depth(&self) -> usize {
        self.rendertarget_stack.len()
    }

    pub fn current_rendertarget(&self) -> Option<RenderTarget> {
        self.rendertarget_stack.last().copied().or(self.default_rendertarget)
    }

    /// `prepare_draw`: takes the worker slot, runs idle-release bookkeeping,
    /// then `update(t)` on the root.
    pub fn prepare_draw(&mut self, t: f64) -> Result<()> {
        self.arena.flush_idle(t);
        if let Some(root) = self.root {
            self.arena.init(root)?;
            self.arena.prepare(root)?;
            self.arena.visit(root, true, t)?;
            self.arena.update(root, t)?;
        }
        Ok(())
    }

    /// Drives one full frame: prepare, begin a clear pass on the default
    /// rendertarget, draw the root, end the frame. Always restores the
    /// matrix/rendertarget stack depth, even on error.
    pub fn draw(&mut self, t: f64) -> Result<()> {
        let modelview_depth = self.modelview_stack.len();
        let rendertarget_depth = self.rendertarget_stack.len();

        let result = (|| -> Result<()> {
            self.prepare_draw(t)?;
            let target = self.gpu.default_rendertarget();
            self.gpu.begin_draw();
            self.gpu.begin_render_pass(target)?;
            if let Some(root) = self.root {
                self.arena.draw(root, &mut *self.gpu, &self.craft, &mut self.modelview_stack, t)?;
            }
            self.gpu.end_render_pass();
            self.gpu.end_draw();
            Ok(())
        })();

        self.modelview_stack.truncate(modelview_depth);
        self.rendertarget_stack.truncate(rendertarget_depth);

        if let Err(e) = &result {
            warn!("frame at t={} aborted: {:?}", t, e);
        }
        result
    }

    pub fn node_state(&self, id: NodeId) -> Option<LifecycleState> {
        self.arena.get(id).map(|n| n.borrow().state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{BufferDesc, CapabilityReport, GpuHandle, ImageDesc, Limits};

    struct MockGpu {
        width: u32,
        height: u32,
        limits: Limits,
    }

    impl GpuCtx for MockGpu {
        fn init(&mut self, width: u32, height: u32) -> Result<()> {
            self.width = width;
            self.height = height;
            Ok(())
        }
        fn resize(&mut self, w: u32, h: u32) -> Result<()> {
            self.width = w;
            self.height = h;
            Ok(())
        }
        fn wait_idle(&mut self) {}
        fn set_capture_buffer(&mut self, _handle: Option<GpuHandle>) -> Result<()> {
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
        fn create_buffer(&mut self, _desc: BufferDesc) -> Result<GpuHandle> {
            Ok(GpuHandle(1))
        }
        fn upload_buffer(&mut self, _handle: GpuHandle, _offset: usize, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn destroy_buffer(&mut self, _handle: GpuHandle) {}
        fn create_image(&mut self, _desc: ImageDesc) -> Result<GpuHandle> {
            Ok(GpuHandle(2))
        }
        fn upload_image(&mut self, _handle: GpuHandle, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn destroy_image(&mut self, _handle: GpuHandle) {}
        fn begin_update(&mut self) {}
        fn end_update(&mut self) {}
        fn begin_draw(&mut self) {}
        fn end_draw(&mut self) {}
        fn begin_render_pass(&mut self, _target: GpuHandle) -> Result<()> {
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

    use crate::format::Format;

    fn ctx() -> RenderContext {
        RenderContext::new(Box::new(MockGpu { width: 0, height: 0, limits: Limits::default() }))
    }

    #[test]
    fn configure_then_resize_updates_viewport() {
        let mut c = ctx();
        c.configure(RenderConfig::default(), 32, 32).unwrap();
        c.resize(64, 64).unwrap();
        assert_eq!(c.viewport().width, 64);
        assert_eq!(c.viewport().height, 64);
    }

    #[test]
    fn set_scene_twice_on_a_root_rejects_second_attach() {
        let mut c = ctx();
        c.configure(RenderConfig::default(), 32, 32).unwrap();
        let root = c.arena.create(crate::node::NodeKind::Group { children: vec![] }, "root");
        c.set_scene(root).unwrap();
        let root2 = c.arena.create(crate::node::NodeKind::Group { children: vec![] }, "root2");
        assert_eq!(c.set_scene(root2).err(), Some(EngineError::InvalidUsage));
    }

    #[test]
    fn draw_preserves_matrix_and_rendertarget_stack_depth() {
        let mut c = ctx();
        c.configure(RenderConfig::default(), 64, 64).unwrap();
        c.resize(64, 64).unwrap();
        let root = c.arena.create(crate::node::NodeKind::Group { children: vec![] }, "root");
        c.set_scene(root).unwrap();

        let before_mv = c.modelview_depth();
        let before_rt = c.rendertarget_depth();
        c.draw(0.0).unwrap();
        assert_eq!(c.modelview_depth(), before_mv);
        assert_eq!(c.rendertarget_depth(), before_rt);
    }

    #[test]
    fn matrix_scope_pops_on_drop_even_through_early_return() {
        let mut c = ctx();
        let depth_before = c.modelview_depth();
        {
            let _scope = c.push_modelview(math::mat4_identity());
            assert_eq!(c.modelview_depth(), depth_before + 1);
        }
        assert_eq!(c.modelview_depth(), depth_before);
    }

    #[test]
    fn identity_modelview_push_preserves_top_bitwise() {
        let mut c = ctx();
        let top_before = *c.modelview_stack.last().unwrap();
        let scope = c.push_modelview(math::mat4_identity());
        assert_eq!(scope.top(), top_before);
    }
}
