use anyhow::{Context, Result};

/// CPU/GPU fence built on wgpu submission indices.
///
/// Wraps a monotonically increasing counter and the most recent submission
/// the counter was signaled against. `wait` blocks the calling thread until
/// the device reports that submission complete — the wgpu analog of
/// "signal the queue, then block on the fence event".
///
/// There is no timeout variant; a hung GPU blocks forever. The harness is
/// synchronous per frame, not pipelined, and treats a lost device during the
/// wait as fatal.
pub struct GpuFence {
    /// Next value to hand out. Only ever increases.
    value: u64,

    /// Highest value known to be complete on the GPU.
    completed: u64,

    /// Signal not yet observed complete: (value, submission it maps to).
    pending: Option<(u64, wgpu::SubmissionIndex)>,
}

impl GpuFence {
    pub fn new() -> Self {
        Self {
            value: 0,
            completed: 0,
            pending: None,
        }
    }

    /// Signals the fence by submitting an empty command buffer.
    ///
    /// Returns the fence value associated with the signal. Because queue
    /// submissions complete in order, waiting on this value also guarantees
    /// completion of everything submitted before it.
    pub fn signal(&mut self, queue: &wgpu::Queue) -> u64 {
        let index = queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
        self.observe(index)
    }

    /// Associates an already-performed submission with the next fence value.
    ///
    /// Used when the caller has just called `queue.submit` itself and wants
    /// the fence to track that submission instead of paying for an extra
    /// empty one.
    pub fn observe(&mut self, index: wgpu::SubmissionIndex) -> u64 {
        self.value += 1;
        self.pending = Some((self.value, index));
        self.value
    }

    /// Blocks until every signaled value has completed on the GPU.
    ///
    /// Returns the completed value. A no-op when nothing is pending.
    pub fn wait(&mut self, device: &wgpu::Device) -> Result<u64> {
        if let Some((value, index)) = self.pending.take() {
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: Some(index),
                    timeout: None,
                })
                .context("GPU wait failed (device lost?)")?;
            debug_assert!(value > self.completed);
            self.completed = value;
        }
        Ok(self.completed)
    }

    /// Signals and immediately blocks until the GPU reaches the signal.
    ///
    /// This is the full-drain primitive used after present and at shutdown.
    pub fn signal_and_wait(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<u64> {
        self.signal(queue);
        self.wait(device)
    }

    /// Last value handed out by a signal.
    pub fn signaled_value(&self) -> u64 {
        self.value
    }

    /// Highest value observed complete.
    pub fn completed_value(&self) -> u64 {
        self.completed
    }
}

impl Default for GpuFence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Gpu, GpuInit};

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
    fn counter_is_monotonic_across_signals() {
        let Some(gpu) = test_gpu() else { return };
        let mut fence = GpuFence::new();

        let mut last = 0;
        for _ in 0..4 {
            let v = fence.signal(gpu.queue());
            assert!(v > last);
            last = v;
        }
    }

    #[test]
    fn wait_observes_every_prior_signal() {
        let Some(gpu) = test_gpu() else { return };
        let mut fence = GpuFence::new();

        let v1 = fence.signal(gpu.queue());
        let v2 = fence.signal(gpu.queue());
        assert!(v1 < v2);

        // Submissions complete in order: waiting on v2 implies v1 is done.
        let completed = fence.wait(gpu.device()).unwrap();
        assert_eq!(completed, v2);
        assert!(fence.completed_value() >= v1);
    }

    #[test]
    fn wait_without_signal_is_a_no_op() {
        let Some(gpu) = test_gpu() else { return };
        let mut fence = GpuFence::new();
        assert_eq!(fence.wait(gpu.device()).unwrap(), 0);
    }
}
