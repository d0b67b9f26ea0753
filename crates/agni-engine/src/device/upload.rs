use anyhow::{Context, Result};

use super::{Gpu, GpuFence};

/// One-shot staging-to-device buffer transfer context.
///
/// Uploads CPU bytes into a device-local buffer: the bytes are copied into a
/// mapped staging buffer, a transient command encoder records a
/// buffer-to-buffer copy, and the call blocks on a fence until the GPU has
/// executed it. State transitions around the copy are derived by wgpu from
/// the destination's declared usages.
///
/// Blocking is deliberate: uploads happen at mesh-creation time, never per
/// frame, so correctness wins over throughput here.
pub struct UploadTransfer<'g> {
    gpu: &'g Gpu,
    fence: GpuFence,
}

impl<'g> UploadTransfer<'g> {
    pub fn new(gpu: &'g Gpu) -> Self {
        Self {
            gpu,
            fence: GpuFence::new(),
        }
    }

    /// Copies `bytes` into a new device-local buffer with the given usage.
    ///
    /// The destination additionally gets `COPY_DST` (for this transfer) and
    /// `COPY_SRC` (so [`read_back`](Self::read_back) can observe it). Returns
    /// after the GPU has completed the copy.
    ///
    /// Zero-byte uploads are rejected.
    pub fn copy_to_device(
        &mut self,
        bytes: &[u8],
        usage: wgpu::BufferUsages,
        label: &str,
    ) -> Result<wgpu::Buffer> {
        anyhow::ensure!(!bytes.is_empty(), "refusing zero-byte upload ({label})");

        let device = self.gpu.device();
        let size = bytes.len() as u64;

        // Upload heap: CPU-visible staging buffer, filled synchronously.
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agni upload staging"),
            size,
            usage: wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        });
        staging
            .slice(..)
            .get_mapped_range_mut()
            .copy_from_slice(bytes);
        staging.unmap();

        let dest = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("agni upload encoder"),
        });
        encoder.copy_buffer_to_buffer(&staging, 0, &dest, 0, size);

        let index = self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.fence.observe(index);
        self.fence
            .wait(device)
            .with_context(|| format!("upload of {label} did not complete"))?;

        Ok(dest)
    }

    /// Reads the full contents of a device-local buffer back to the CPU.
    ///
    /// The buffer must carry `COPY_SRC` (buffers created by
    /// [`copy_to_device`](Self::copy_to_device) do). Blocking; intended for
    /// tests and diagnostics, not the frame loop.
    pub fn read_back(&mut self, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let device = self.gpu.device();
        let size = buffer.size();

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agni readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("agni readback encoder"),
        });
        encoder.copy_buffer_to_buffer(buffer, 0, &readback, 0, size);

        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        // Wait for everything, not just the copy: the map request itself must
        // be driven to completion before the channel yields.
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("GPU wait failed during readback")?;

        rx.recv()
            .context("readback map callback dropped")?
            .context("buffer mapping failed")?;

        let bytes = slice.get_mapped_range().to_vec();
        readback.unmap();
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GpuInit;

    fn test_gpu() -> Option<Gpu> {
        match Gpu::new_blocking(&GpuInit::default()) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                eprintln!("no GPU adapter available, skipping: {err:#}");
                None
            }
        }
    }

    #[test]
    fn round_trips_bytes_through_device_memory() {
        let Some(gpu) = test_gpu() else { return };
        let mut upload = UploadTransfer::new(&gpu);

        let bytes: Vec<u8> = (0..=255).collect();
        let buffer = upload
            .copy_to_device(&bytes, wgpu::BufferUsages::VERTEX, "roundtrip vb")
            .unwrap();

        let observed = upload.read_back(&buffer).unwrap();
        assert_eq!(observed, bytes);
    }

    #[test]
    fn rejects_zero_byte_upload() {
        let Some(gpu) = test_gpu() else { return };
        let mut upload = UploadTransfer::new(&gpu);

        let err = upload
            .copy_to_device(&[], wgpu::BufferUsages::VERTEX, "empty vb")
            .unwrap_err();
        assert!(err.to_string().contains("zero-byte"));
    }
}
