//! GPU device/queue bootstrap and low-level synchronization.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - fence-style CPU/GPU synchronization on submitted work
//! - one-shot staging-to-device buffer uploads

mod context;
mod fence;
mod init;
mod upload;

pub(crate) mod surface;

pub use context::Gpu;
pub use fence::GpuFence;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
pub use upload::UploadTransfer;
