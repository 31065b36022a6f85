//! The node kernel (component F): a closed, tag-dispatched scene-graph node
//! model with explicit lifecycle states, reference counting, and a
//! four-phase evaluation pipeline (init / prepare / visit / update / draw /
//! release / uninit).
//!
//! Polymorphism is modeled the way the design notes prescribe: a single
//! `NodeKind` enum holds every class's data inline (rather than one struct
//! per class behind a vtable), and each lifecycle method is one `match` over
//! the tag. Classes whose runtime shape is identical across many declared
//! variants (every `Buffer*`/`Uniform*` element type, every `Filter*`
//! snippet) are folded into a single generic variant parameterized over
//! [`Format`](crate::format::Format) or [`Filter`](crate::filter::Filter)
//! rather than enumerated one-by-one; this is recorded in `DESIGN.md`.

pub mod param;

use crate::anim::{self, AnimColor, AnimQuat, Animation};
use crate::block::Block;
use crate::buffer::{Buffer, StreamedBuffer};
use crate::craft::Craft;
use crate::draw::DrawNode;
use crate::error::{EngineError, Result};
use crate::filter::Filter;
use crate::geometry::Geometry;
use crate::gpu::GpuCtx;
use crate::image::Image;
use crate::math::{self, Mat4, Vec2, Vec3, Vec4};
use crate::path::Path;
use log::{debug, error};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A generation-tagged slot index into a [`NodeArena`]. Stale handles (the
/// slot was freed and reused) are rejected rather than silently aliased.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Ready,
    Idle,
}

/// Runtime category. Variants whose behavior genuinely differs get their own
/// arm; variants that only differ by element type/value shape share one.
pub enum NodeKind {
    Group { children: Vec<NodeId> },
    Transform { matrix: Mat4, child: Option<NodeId> },
    Rotate { angle: f32, axis: Vec3, anchor: Vec3, child: Option<NodeId> },
    Scale { factor: Vec3, child: Option<NodeId> },
    Translate { offset: Vec3, child: Option<NodeId> },
    Skew { xy: Vec2, child: Option<NodeId> },
    Geometry { geometry: Geometry },
    Path { path: Rc<Path> },
    AnimatedFloat { anim: Animation<f32> },
    AnimatedVec2 { anim: Animation<Vec2> },
    AnimatedVec3 { anim: Animation<Vec3> },
    AnimatedVec4 { anim: Animation<Vec4> },
    AnimatedQuat { anim: Animation<AnimQuat> },
    AnimatedColor { anim: Animation<AnimColor> },
    AnimatedPath { anim: Animation<f32>, path: Rc<Path> },
    Time { scale: f64, offset: f64, value: f64 },
    Buffer { buffer: Rc<RefCell<Buffer>> },
    StreamedBuffer { buffer: StreamedBuffer },
    Block { block: Rc<RefCell<Block>> },
    UniformFloat { value: f32, source: Option<NodeId> },
    UniformVec2 { value: Vec2, source: Option<NodeId> },
    UniformVec3 { value: Vec3, source: Option<NodeId> },
    UniformVec4 { value: Vec4, source: Option<NodeId> },
    UniformMat4 { value: Mat4, source: Option<NodeId> },
    Noise { octaves: u32, lacunarity: f32, gain: f32, seed: u32, scale: f32, evolution: f32 },
    Velocity { of: NodeId, value: Vec4 },
    Texture { image: Option<Image> },
    Filter { filter: Filter },
    Camera { view: Mat4, projection: Mat4 },
    RenderToTexture { target: NodeId, child: Option<NodeId> },
    TimeRangeFilter { start: f64, end: f64, child: Option<NodeId> },
    Scene { child: Option<NodeId> },
    Draw(DrawNode),
}

impl NodeKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            NodeKind::Group { .. } => "Group",
            NodeKind::Transform { .. } => "Transform",
            NodeKind::Rotate { .. } => "Rotate",
            NodeKind::Scale { .. } => "Scale",
            NodeKind::Translate { .. } => "Translate",
            NodeKind::Skew { .. } => "Skew",
            NodeKind::Geometry { .. } => "Geometry",
            NodeKind::Path { .. } => "Path",
            NodeKind::AnimatedFloat { .. } => "AnimatedFloat",
            NodeKind::AnimatedVec2 { .. } => "AnimatedVec2",
            NodeKind::AnimatedVec3 { .. } => "AnimatedVec3",
            NodeKind::AnimatedVec4 { .. } => "AnimatedVec4",
            NodeKind::AnimatedQuat { .. } => "AnimatedQuat",
            NodeKind::AnimatedColor { .. } => "AnimatedColor",
            NodeKind::AnimatedPath { .. } => "AnimatedPath",
            NodeKind::Time { .. } => "Time",
            NodeKind::Buffer { .. } => "Buffer",
            NodeKind::StreamedBuffer { .. } => "StreamedBuffer",
            NodeKind::Block { .. } => "Block",
            NodeKind::UniformFloat { .. } => "UniformFloat",
            NodeKind::UniformVec2 { .. } => "UniformVec2",
            NodeKind::UniformVec3 { .. } => "UniformVec3",
            NodeKind::UniformVec4 { .. } => "UniformVec4",
            NodeKind::UniformMat4 { .. } => "UniformMat4",
            NodeKind::Noise { .. } => "Noise",
            NodeKind::Velocity { .. } => "Velocity",
            NodeKind::Texture { .. } => "Texture",
            NodeKind::Filter { .. } => "Filter",
            NodeKind::Camera { .. } => "Camera",
            NodeKind::RenderToTexture { .. } => "RenderToTexture",
            NodeKind::TimeRangeFilter { .. } => "TimeRangeFilter",
            NodeKind::Scene { .. } => "Scene",
            NodeKind::Draw(_) => "Draw",
        }
    }

    /// The node's immediate children, in evaluation order.
    fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Group { children } => children.clone(),
            NodeKind::Transform { child, .. }
            | NodeKind::Rotate { child, .. }
            | NodeKind::Scale { child, .. }
            | NodeKind::Translate { child, .. }
            | NodeKind::Skew { child, .. }
            | NodeKind::RenderToTexture { child, .. }
            | NodeKind::TimeRangeFilter { child, .. }
            | NodeKind::Scene { child, .. } => child.iter().copied().collect(),
            NodeKind::UniformFloat { source, .. }
            | NodeKind::UniformVec2 { source, .. }
            | NodeKind::UniformVec3 { source, .. }
            | NodeKind::UniformVec4 { source, .. }
            | NodeKind::UniformMat4 { source, .. } => source.iter().copied().collect(),
            NodeKind::Velocity { of, .. } => vec![*of],
            _ => Vec::new(),
        }
    }
}

/// Per-node runtime bookkeeping, shared via `Rc<RefCell<_>>` so that a node
/// may legitimately appear under multiple parents (e.g. a shared buffer).
pub struct NodeData {
    id: NodeId,
    kind: NodeKind,
    label: String,
    refcount: u32,
    state: LifecycleState,
    is_active: bool,
    last_visit_time: f64,
    last_update_time: Option<f64>,
    ctx_attached: bool,
}

impl NodeData {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Owns every node reachable from one attached scene. Handles are
/// generation-tagged so a freed-then-reused slot cannot alias a stale
/// [`NodeId`].
pub struct NodeArena {
    slots: Vec<Option<Rc<RefCell<NodeData>>>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl Default for NodeArena {
    fn default() -> Self {
        NodeArena::new()
    }
}

impl NodeArena {
    pub fn new() -> NodeArena {
        NodeArena { slots: Vec::new(), generations: Vec::new(), free_list: Vec::new() }
    }

    /// Allocates a node in `Uninitialized` state with refcount 0 (the caller
    /// — typically a parent's parameter-set or `set_scene` — bumps it).
    pub fn create(&mut self, kind: NodeKind, label: impl Into<String>) -> NodeId {
        let index = if let Some(index) = self.free_list.pop() {
            index
        } else {
            self.slots.push(None);
            self.generations.push(0);
            (self.slots.len() - 1) as u32
        };
        let generation = self.generations[index as usize];
        let id = NodeId { index, generation };
        let data = NodeData {
            id,
            kind,
            label: label.into(),
            refcount: 0,
            state: LifecycleState::Uninitialized,
            is_active: false,
            last_visit_time: f64::NEG_INFINITY,
            last_update_time: None,
            ctx_attached: false,
        };
        self.slots[index as usize] = Some(Rc::new(RefCell::new(data)));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<Rc<RefCell<NodeData>>> {
        let slot = self.slots.get(id.index as usize)?.as_ref()?;
        if self.generations[id.index as usize] != id.generation {
            return None;
        }
        Some(slot.clone())
    }

    fn require(&self, id: NodeId) -> Result<Rc<RefCell<NodeData>>> {
        self.get(id).ok_or(EngineError::NotFound)
    }

    /// Increments a node's refcount. Called whenever a `NODE`-valued
    /// parameter is set to reference it, and once by `attach` for the root.
    pub fn retain(&mut self, id: NodeId) -> Result<()> {
        let node = self.require(id)?;
        node.borrow_mut().refcount += 1;
        Ok(())
    }

    /// Decrements a node's refcount, running `uninit` and freeing the slot
    /// once it reaches zero.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let node = self.require(id)?;
        let reached_zero = {
            let mut data = node.borrow_mut();
            data.refcount = data.refcount.saturating_sub(1);
            data.refcount == 0
        };
        if reached_zero {
            self.uninit(id)?;
            let index = id.index as usize;
            self.slots[index] = None;
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_list.push(id.index);
        }
        Ok(())
    }

    /// Stamps `ctx_attached` on every node reachable from `root`, bottom-up,
    /// detecting reference cycles along the way (`InvalidUsage`).
    pub fn attach(&mut self, root: NodeId) -> Result<()> {
        let mut visiting = Vec::new();
        let mut visited = std::collections::HashSet::new();
        self.attach_visit(root, &mut visiting, &mut visited)?;
        self.retain(root)
    }

    fn attach_visit(
        &mut self,
        id: NodeId,
        visiting: &mut Vec<NodeId>,
        visited: &mut std::collections::HashSet<NodeId>,
    ) -> Result<()> {
        if visiting.contains(&id) {
            return Err(EngineError::InvalidUsage);
        }
        if visited.contains(&id) {
            return Ok(());
        }
        visiting.push(id);
        let children = {
            let node = self.require(id)?;
            node.borrow().kind.children()
        };
        for child in children {
            self.attach_visit(child, visiting, visited)?;
        }
        visiting.pop();
        visited.insert(id);
        let node = self.require(id)?;
        node.borrow_mut().ctx_attached = true;
        Ok(())
    }

    /// Bottom-up `init`: wires child references and validates parameters
    /// beyond their type tag (e.g. path precision ≥ 1). Runs once per node,
    /// the first time it is reached from an active root.
    pub fn init(&mut self, id: NodeId) -> Result<()> {
        let children = {
            let node = self.require(id)?;
            let already = node.borrow().state != LifecycleState::Uninitialized;
            if already {
                return Ok(());
            }
            node.borrow().kind.children()
        };
        for child in children {
            self.init(child)?;
        }
        let node = self.require(id)?;
        let result = (|| -> Result<()> {
            let mut data = node.borrow_mut();
            match &mut data.kind {
                NodeKind::AnimatedPath { path, .. } => {
                    if path.segments().is_empty() {
                        return Err(EngineError::InvalidArg);
                    }
                }
                NodeKind::Noise { octaves, .. } => {
                    if *octaves == 0 || *octaves > 8 {
                        return Err(EngineError::InvalidArg);
                    }
                }
                _ => {}
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                let mut data = node.borrow_mut();
                data.state = LifecycleState::Initialized;
                debug!("node {:?} ({}) initialized", id, data.kind.class_name());
                Ok(())
            }
            Err(e) => {
                error!("node {:?} init failed: {:?}", id, e);
                Err(e)
            }
        }
    }

    /// `Initialized -> Ready`. Most classes have nothing to prefetch;
    /// GPU-resource-holding classes override in their own `prepare` arm.
    pub fn prepare(&mut self, id: NodeId) -> Result<()> {
        let node = self.require(id)?;
        let mut data = node.borrow_mut();
        if data.state == LifecycleState::Initialized {
            data.state = LifecycleState::Ready;
        }
        Ok(())
    }

    /// Marks `is_active`/`last_visit_time`. Nodes not visited this frame
    /// transition to `Idle` on the next `flush_idle` call.
    pub fn visit(&mut self, id: NodeId, is_active: bool, t: f64) -> Result<()> {
        let node = self.require(id)?;
        let mut data = node.borrow_mut();
        data.is_active = is_active;
        data.last_visit_time = t;
        Ok(())
    }

    /// Sweeps every live node, idling anything not visited at `t`.
    pub fn flush_idle(&mut self, t: f64) {
        for slot in self.slots.iter().flatten() {
            let mut data = slot.borrow_mut();
            if data.last_visit_time != t && data.state == LifecycleState::Ready {
                data.state = LifecycleState::Idle;
            }
        }
    }

    /// Recursive update with a same-`t` cycle guard: children update before
    /// their parent, and a node already updated at `t` short-circuits.
    pub fn update(&mut self, id: NodeId, t: f64) -> Result<()> {
        let (already, children) = {
            let node = self.require(id)?;
            let data = node.borrow();
            (data.last_update_time == Some(t), data.kind.children())
        };
        if already {
            return Ok(());
        }
        for child in children {
            self.update(child, t)?;
        }
        self.update_self(id, t)?;
        let node = self.require(id)?;
        node.borrow_mut().last_update_time = Some(t);
        Ok(())
    }

    fn update_self(&mut self, id: NodeId, t: f64) -> Result<()> {
        let node = self.require(id)?;
        let mut data = node.borrow_mut();
        match &mut data.kind {
            NodeKind::UniformFloat { value, source } => {
                if let Some(src) = source {
                    if let Some(src_node) = self.slots.get(src.index as usize).and_then(|s| s.clone()) {
                        if let NodeKind::AnimatedFloat { anim } = &src_node.borrow().kind {
                            *value = anim.evaluate(t);
                        }
                    }
                }
            }
            NodeKind::UniformVec2 { value, source } => {
                if let Some(src) = source {
                    if let Some(src_node) = self.slots.get(src.index as usize).and_then(|s| s.clone()) {
                        if let NodeKind::AnimatedVec2 { anim } = &src_node.borrow().kind {
                            *value = anim.evaluate(t);
                        }
                    }
                }
            }
            NodeKind::UniformVec3 { value, source } => {
                if let Some(src) = source {
                    if let Some(src_node) = self.slots.get(src.index as usize).and_then(|s| s.clone()) {
                        match &src_node.borrow().kind {
                            NodeKind::AnimatedVec3 { anim } => *value = anim.evaluate(t),
                            NodeKind::AnimatedColor { anim } => {
                                let c = anim.evaluate(t).0;
                                *value = [c[0], c[1], c[2]];
                            }
                            _ => {}
                        }
                    }
                }
            }
            NodeKind::UniformVec4 { value, source } => {
                if let Some(src) = source {
                    if let Some(src_node) = self.slots.get(src.index as usize).and_then(|s| s.clone()) {
                        match &src_node.borrow().kind {
                            NodeKind::AnimatedVec4 { anim } => *value = anim.evaluate(t),
                            NodeKind::AnimatedColor { anim } => *value = anim.evaluate(t).0,
                            NodeKind::AnimatedQuat { anim } => *value = anim.evaluate(t).0,
                            _ => {}
                        }
                    }
                }
            }
            NodeKind::UniformMat4 { value, source } => {
                if let Some(src) = source {
                    if let Some(src_node) = self.slots.get(src.index as usize).and_then(|s| s.clone()) {
                        match &src_node.borrow().kind {
                            NodeKind::Transform { matrix, .. } => *value = *matrix,
                            NodeKind::Camera { view, projection } => *value = math::mat4_mul(projection, view),
                            _ => {}
                        }
                    }
                }
            }
            NodeKind::Time { scale, offset, value } => {
                *value = *scale * t + *offset;
            }
            NodeKind::Velocity { of, value } => {
                if let Some(src_node) = self.slots.get(of.index as usize).and_then(|s| s.clone()) {
                    match &src_node.borrow().kind {
                        NodeKind::AnimatedFloat { anim } => *value = [anim::velocity(anim, t), 0.0, 0.0, 0.0],
                        NodeKind::AnimatedVec2 { anim } => {
                            let v = anim::velocity_vec2(anim, t);
                            *value = [v[0], v[1], 0.0, 0.0];
                        }
                        NodeKind::AnimatedVec3 { anim } => {
                            let v = anim::velocity_vec3(anim, t);
                            *value = [v[0], v[1], v[2], 0.0];
                        }
                        NodeKind::AnimatedVec4 { anim } => *value = anim::velocity_vec4(anim, t),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Recursive draw traversal: Transform-family nodes compose a matrix
    /// onto `modelview` for their subtree, `Draw` leaves build and issue a
    /// pipeline, everything else just recurses.
    pub fn draw(&mut self, id: NodeId, gpu: &mut dyn GpuCtx, craft: &Craft, modelview: &mut Vec<Mat4>, t: f64) -> Result<()> {
        let node = self.require(id)?;
        let local_matrix = {
            let data = node.borrow();
            match &data.kind {
                NodeKind::Transform { matrix, .. } => Some(*matrix),
                NodeKind::Rotate { angle, axis, anchor, .. } => Some(math::mat4_rotate(*angle, *axis, *anchor)),
                NodeKind::Scale { factor, .. } => Some(math::mat4_scale(*factor)),
                NodeKind::Translate { offset, .. } => Some(math::mat4_translate(*offset)),
                NodeKind::Skew { xy, .. } => Some(math::mat4_skew(xy[0], xy[1], 0.0)),
                _ => None,
            }
        };
        if let Some(m) = local_matrix {
            let top = *modelview.last().unwrap();
            modelview.push(math::mat4_mul(&top, &m));
        }

        let children = node.borrow().kind.children();
        for child in children {
            self.draw(child, gpu, craft, modelview, t)?;
        }

        Self::draw_self(&node, gpu, craft)?;

        if local_matrix.is_some() {
            modelview.pop();
        }
        Ok(())
    }

    /// Builds a `Draw` leaf's pipeline fresh each frame and issues its draw
    /// call; falls back to a unit quad when no geometry override is set.
    fn draw_self(node: &Rc<RefCell<NodeData>>, gpu: &mut dyn GpuCtx, craft: &Craft) -> Result<()> {
        let mut data = node.borrow_mut();
        let draw_node = match &mut data.kind {
            NodeKind::Draw(draw_node) => draw_node,
            _ => return Ok(()),
        };
        if draw_node.common.geometry.is_none() {
            draw_node.common.geometry =
                Some(Geometry::quad([-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]));
        }

        let geometry = draw_node.common.geometry.as_ref().unwrap();
        geometry.vertices.sync(gpu)?;
        if let Some((index_buffer, _)) = &geometry.indices {
            index_buffer.sync(gpu)?;
        }

        let pipeline_input = draw_node.craft_input();
        let mut pipeline = craft.build(pipeline_input);

        let geometry = draw_node.common.geometry.as_ref().unwrap();
        if let Some((index_buffer, index_format)) = &geometry.indices {
            pipeline.draw_indexed(gpu, index_buffer, *index_format, index_buffer.count(), 1)
        } else {
            pipeline.draw(gpu, &geometry.vertices, 1, 0)
        }
    }

    fn uninit(&mut self, id: NodeId) -> Result<()> {
        let node = match self.get(id) {
            Some(n) => n,
            None => return Ok(()),
        };
        let children = node.borrow().kind.children();
        for child in children {
            self.release(child)?;
        }
        let mut data = node.borrow_mut();
        debug!("node {:?} ({}) uninit", id, data.kind.class_name());
        data.state = LifecycleState::Uninitialized;
        Ok(())
    }
}

/// A weak back-reference a node holds to its owning render context once
/// attached, used by draw nodes to reach the matrix/rendertarget stacks.
pub type ContextRef = Weak<RefCell<crate::context::RenderContext>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{EasingParams, KeyFrame};

    #[test]
    fn create_starts_uninitialized_with_zero_refcount() {
        let mut arena = NodeArena::new();
        let id = arena.create(NodeKind::Group { children: vec![] }, "root");
        let node = arena.get(id).unwrap();
        assert_eq!(node.borrow().state(), LifecycleState::Uninitialized);
        assert_eq!(node.borrow().refcount(), 0);
    }

    #[test]
    fn retain_and_release_free_the_slot_at_zero() {
        let mut arena = NodeArena::new();
        let id = arena.create(NodeKind::Group { children: vec![] }, "leaf");
        arena.retain(id).unwrap();
        assert_eq!(arena.get(id).unwrap().borrow().refcount(), 1);
        arena.release(id).unwrap();
        assert!(arena.get(id).is_none());
    }

    #[test]
    fn stale_handle_after_free_is_not_found() {
        let mut arena = NodeArena::new();
        let id = arena.create(NodeKind::Group { children: vec![] }, "a");
        arena.retain(id).unwrap();
        arena.release(id).unwrap();
        let id2 = arena.create(NodeKind::Group { children: vec![] }, "b");
        assert_ne!(id, id2);
        assert!(arena.get(id).is_none());
        assert!(arena.get(id2).is_some());
    }

    #[test]
    fn attach_detects_cycles() {
        let mut arena = NodeArena::new();
        let a = arena.create(NodeKind::Group { children: vec![] }, "a");
        let b = arena.create(NodeKind::Group { children: vec![a] }, "b");
        if let NodeKind::Group { children } = &mut arena.get(a).unwrap().borrow_mut().kind {
            children.push(b);
        }
        assert_eq!(arena.attach(b).err(), Some(EngineError::InvalidUsage));
    }

    #[test]
    fn attach_without_cycle_succeeds_and_retains_root() {
        let mut arena = NodeArena::new();
        let leaf = arena.create(NodeKind::Group { children: vec![] }, "leaf");
        let root = arena.create(NodeKind::Group { children: vec![leaf] }, "root");
        arena.attach(root).unwrap();
        assert_eq!(arena.get(root).unwrap().borrow().refcount(), 1);
    }

    #[test]
    fn init_is_idempotent_and_recurses_to_children() {
        let mut arena = NodeArena::new();
        let leaf = arena.create(NodeKind::Group { children: vec![] }, "leaf");
        let root = arena.create(NodeKind::Group { children: vec![leaf] }, "root");
        arena.init(root).unwrap();
        assert_eq!(arena.get(root).unwrap().borrow().state(), LifecycleState::Initialized);
        assert_eq!(arena.get(leaf).unwrap().borrow().state(), LifecycleState::Initialized);
        arena.init(root).unwrap();
        assert_eq!(arena.get(root).unwrap().borrow().state(), LifecycleState::Initialized);
    }

    #[test]
    fn init_rejects_noise_with_zero_octaves() {
        let mut arena = NodeArena::new();
        let noise = arena.create(
            NodeKind::Noise { octaves: 0, lacunarity: 2.0, gain: 0.5, seed: 0, scale: 1.0, evolution: 0.0 },
            "noise",
        );
        assert_eq!(arena.init(noise).err(), Some(EngineError::InvalidArg));
    }

    #[test]
    fn update_with_same_time_short_circuits() {
        let mut arena = NodeArena::new();
        let id = arena.create(NodeKind::Group { children: vec![] }, "a");
        arena.update(id, 1.0).unwrap();
        let after_first = arena.get(id).unwrap().borrow().last_update_time;
        arena.update(id, 1.0).unwrap();
        let after_second = arena.get(id).unwrap().borrow().last_update_time;
        assert_eq!(after_first, after_second);
        assert_eq!(after_first, Some(1.0));
    }

    #[test]
    fn time_node_exposes_the_remapped_time() {
        let mut arena = NodeArena::new();
        let id = arena.create(NodeKind::Time { scale: 2.0, offset: 1.0, value: 0.0 }, "time");
        arena.update(id, 3.0).unwrap();
        match &arena.get(id).unwrap().borrow().kind {
            NodeKind::Time { value, .. } => assert_eq!(*value, 7.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn velocity_node_tracks_an_animated_float_source() {
        let mut arena = NodeArena::new();
        let anim = Animation::new(vec![
            KeyFrame { time: 0.0, value: 0.0_f32, easing: EasingParams::default() },
            KeyFrame { time: 1.0, value: 10.0_f32, easing: EasingParams::default() },
        ])
        .unwrap();
        let source = arena.create(NodeKind::AnimatedFloat { anim }, "drive");
        let vel = arena.create(NodeKind::Velocity { of: source, value: [0.0, 0.0, 0.0, 0.0] }, "vel");
        arena.update(vel, 0.5).unwrap();
        match &arena.get(vel).unwrap().borrow().kind {
            NodeKind::Velocity { value, .. } => assert!((value[0] - 10.0).abs() < 1e-4),
            _ => unreachable!(),
        }
    }

    #[test]
    fn uniform_vec3_tracks_an_animated_color_source() {
        let mut arena = NodeArena::new();
        let anim = Animation::new(vec![
            KeyFrame { time: 0.0, value: AnimColor([0.0, 0.0, 0.0, 1.0]), easing: EasingParams::default() },
            KeyFrame { time: 1.0, value: AnimColor([1.0, 1.0, 1.0, 1.0]), easing: EasingParams::default() },
        ])
        .unwrap();
        let source = arena.create(NodeKind::AnimatedColor { anim }, "drive");
        let uniform = arena.create(NodeKind::UniformVec3 { value: [0.0, 0.0, 0.0], source: Some(source) }, "u_tint");
        arena.update(uniform, 1.0).unwrap();
        match &arena.get(uniform).unwrap().borrow().kind {
            NodeKind::UniformVec3 { value, .. } => assert_eq!(*value, [1.0, 1.0, 1.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn uninit_releases_children() {
        let mut arena = NodeArena::new();
        let leaf = arena.create(NodeKind::Group { children: vec![] }, "leaf");
        let root = arena.create(NodeKind::Group { children: vec![leaf] }, "root");
        arena.retain(leaf).unwrap();
        arena.attach(root).unwrap();
        arena.release(root).unwrap();
        assert!(arena.get(root).is_none());
        assert!(arena.get(leaf).is_none());
    }
}
