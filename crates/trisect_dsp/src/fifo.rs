//! Block Sample FIFO
//!
//! Lock-free single-producer/single-consumer FIFO that moves whole blocks of
//! samples from the audio thread to an analysis thread. Built on an `rtrb`
//! ring sized to an exact number of block slots:
//!
//! - `push` writes a full block or nothing, and never blocks. A push into a
//!   full FIFO is dropped and counted.
//! - `pop` only returns once a full block is available, so a consumer never
//!   sees a partially written block.
//!
//! [`ChannelSampleFifo`] sits in front of the producer and re-chunks host
//! blocks of any size into the FIFO's fixed block size.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::DspError;

/// Create a FIFO holding `slots` blocks of `block_size` samples each
pub fn sample_fifo(
    block_size: usize,
    slots: usize,
) -> Result<(SampleFifoProducer, SampleFifoConsumer), DspError> {
    if block_size == 0 || slots == 0 {
        return Err(DspError::InvalidFifoCapacity { block_size, slots });
    }

    let (producer, consumer) = RingBuffer::<f32>::new(block_size * slots);
    let dropped = Arc::new(AtomicU64::new(0));

    Ok((
        SampleFifoProducer {
            producer,
            block_size,
            dropped: Arc::clone(&dropped),
        },
        SampleFifoConsumer {
            consumer,
            block_size,
            dropped,
        },
    ))
}

/// Audio-thread half of the FIFO
pub struct SampleFifoProducer {
    producer: Producer<f32>,
    block_size: usize,
    dropped: Arc<AtomicU64>,
}

impl SampleFifoProducer {
    /// Push one block. Returns `false` (and counts a drop) if the FIFO is
    /// full; returns `false` without counting if `block` is the wrong size.
    ///
    /// # Real-time Safety
    /// No allocations, no locks, never blocks.
    pub fn push(&mut self, block: &[f32]) -> bool {
        if block.len() != self.block_size {
            return false;
        }

        match self.producer.write_chunk(self.block_size) {
            Ok(mut chunk) => {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                first.copy_from_slice(&block[..split]);
                second.copy_from_slice(&block[split..]);
                chunk.commit_all();
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of whole blocks that can be pushed right now
    pub fn free_blocks(&self) -> usize {
        self.producer.slots() / self.block_size
    }

    /// Blocks dropped because the consumer fell behind
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// True once the consumer half has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

/// Analysis-thread half of the FIFO
pub struct SampleFifoConsumer {
    consumer: Consumer<f32>,
    block_size: usize,
    dropped: Arc<AtomicU64>,
}

impl SampleFifoConsumer {
    /// Number of complete blocks ready to pop
    pub fn num_available_blocks(&self) -> usize {
        self.consumer.slots() / self.block_size
    }

    /// Pop the oldest block into `out`. `out` must be exactly one block long.
    ///
    /// Returns `false` if no full block is available or `out` is mis-sized.
    pub fn pop_into(&mut self, out: &mut [f32]) -> bool {
        if out.len() != self.block_size || self.consumer.slots() < self.block_size {
            return false;
        }

        match self.consumer.read_chunk(self.block_size) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..].copy_from_slice(second);
                chunk.commit_all();
                true
            }
            Err(_) => false,
        }
    }

    /// Pop the oldest block into a fresh vector
    pub fn pop(&mut self) -> Option<Vec<f32>> {
        let mut block = vec![0.0; self.block_size];
        self.pop_into(&mut block).then_some(block)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Blocks the producer had to drop
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// True once the producer half has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.consumer.is_abandoned()
    }
}

/// Re-chunks arbitrary host buffers into fixed-size FIFO blocks
///
/// Samples accumulate in a block-sized staging buffer; each time it fills,
/// the block is pushed. The staging buffer is allocated once up front.
pub struct ChannelSampleFifo {
    producer: SampleFifoProducer,
    staging: Vec<f32>,
    filled: usize,
}

impl ChannelSampleFifo {
    pub fn new(producer: SampleFifoProducer) -> Self {
        let block_size = producer.block_size();
        Self {
            producer,
            staging: vec![0.0; block_size],
            filled: 0,
        }
    }

    /// Feed one channel's samples. Returns the number of blocks pushed.
    ///
    /// # Real-time Safety
    /// No allocations; a full FIFO drops blocks instead of waiting.
    pub fn update(&mut self, samples: &[f32]) -> usize {
        let mut pushed = 0;
        let mut remaining = samples;
        while !remaining.is_empty() {
            let take = (self.staging.len() - self.filled).min(remaining.len());
            self.staging[self.filled..self.filled + take].copy_from_slice(&remaining[..take]);
            self.filled += take;
            remaining = &remaining[take..];

            if self.filled == self.staging.len() {
                if self.producer.push(&self.staging) {
                    pushed += 1;
                }
                self.filled = 0;
            }
        }
        pushed
    }

    /// Discard any partially staged block
    pub fn reset(&mut self) {
        self.filled = 0;
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.producer.dropped_blocks()
    }
}
