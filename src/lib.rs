//! Kelpie core: the node-graph heart of a real-time, declarative 2D/3D
//! rendering engine.
//!
//! Users construct a directed acyclic scene graph of typed nodes
//! (geometries, transforms, textures, animations, uniforms, draw nodes,
//! paths, buffers, ...), hand it to a [`context::RenderContext`], and
//! request frames at arbitrary timestamps. This crate compiles the graph
//! into GPU pipeline state, schedules per-frame updates, and issues draw
//! calls through an abstract [`gpu::GpuCtx`] backend.
//!
//! Concrete GPU backend drivers, media decoding, platform windowing, and
//! text rasterization live outside this crate; [`gpu::GpuCtx`] and
//! [`gpu::FrameSource`] are the narrow interfaces this core consumes from
//! them.

pub mod anim;
pub mod block;
pub mod buffer;
pub mod context;
pub mod craft;
pub mod draw;
pub mod error;
pub mod filter;
pub mod format;
pub mod geometry;
pub mod gpu;
pub mod image;
pub mod math;
pub mod node;
pub mod path;
pub mod vertex;

pub use error::{EngineError, Result};
