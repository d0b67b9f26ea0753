//! Agni engine crate.
//!
//! A minimal real-time rendering harness on top of wgpu: device/queue
//! bootstrap, a per-frame command recording cycle, CPU/GPU synchronization,
//! and simple mesh resources (vertex/index/uniform buffers, shared pipeline
//! state).
//!
//! The harness is deliberately synchronous: every presented frame fully
//! drains the GPU before the next one begins recording. Window creation and
//! the event loop live outside this crate (see the `agni-demo` binary).

pub mod device;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
