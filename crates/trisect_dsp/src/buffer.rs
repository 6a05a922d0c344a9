//! Planar Audio Buffer
//!
//! Owned multi-channel storage used for the band buffers and scratch space.
//! Capacity is reserved up front; the active length can then shrink and grow
//! within that capacity without touching the allocator.

/// Planar (non-interleaved) multi-channel sample buffer
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Create a zeroed buffer with `num_channels` x `capacity` samples
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            num_samples: capacity,
        }
    }

    /// Resize storage. Allocates only when growing past the current capacity.
    ///
    /// Not real-time safe when growing; call from prepare.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for channel in &mut self.channels {
            channel.resize(num_samples, 0.0);
        }
        self.num_samples = num_samples;
    }

    /// Change the active length without reallocating
    ///
    /// # Panics
    /// Panics (debug builds only) if `num_samples` exceeds the capacity.
    #[inline]
    pub fn set_num_samples(&mut self, num_samples: usize) {
        debug_assert!(num_samples <= self.capacity(), "length exceeds capacity");
        self.num_samples = num_samples.min(self.capacity());
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Samples each channel can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.num_samples]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let len = self.num_samples;
        &mut self.channels[index][..len]
    }

    /// Zero the active region of every channel
    pub fn clear(&mut self) {
        let len = self.num_samples;
        for channel in &mut self.channels {
            channel[..len].fill(0.0);
        }
    }

    /// Copy the active region of `other` into this buffer, adopting its length
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        self.set_num_samples(other.num_samples);
        let len = self.num_samples;
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst[..len].copy_from_slice(&src[..len]);
        }
    }

    /// Mix `other` into this buffer sample by sample
    pub fn add_from(&mut self, other: &AudioBuffer) {
        let len = self.num_samples.min(other.num_samples);
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst[..len].iter_mut().zip(&src[..len]) {
                *d += *s;
            }
        }
    }

    /// Multiply every active sample by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        let len = self.num_samples;
        for channel in &mut self.channels {
            for sample in &mut channel[..len] {
                *sample *= gain;
            }
        }
    }

    /// Absolute peak of one channel's active region
    pub fn peak(&self, index: usize) -> f32 {
        self.channel(index)
            .iter()
            .fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }

    /// Fill from an interleaved slice (`[L0, R0, L1, R1, ...]`)
    ///
    /// Uses `interleaved.len() / num_channels` frames; the caller guarantees
    /// that fits within capacity.
    pub fn read_interleaved(&mut self, interleaved: &[f32]) {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return;
        }
        self.set_num_samples(interleaved.len() / num_channels);
        for (frame_index, frame) in interleaved.chunks_exact(num_channels).enumerate() {
            for (channel, sample) in self.channels.iter_mut().zip(frame) {
                channel[frame_index] = *sample;
            }
        }
    }

    /// Write the active region back out as interleaved frames
    pub fn write_interleaved(&self, interleaved: &mut [f32]) {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return;
        }
        for (frame_index, frame) in interleaved
            .chunks_exact_mut(num_channels)
            .take(self.num_samples)
            .enumerate()
        {
            for (sample, channel) in frame.iter_mut().zip(self.channels.iter()) {
                *sample = channel[frame_index];
            }
        }
    }
}
