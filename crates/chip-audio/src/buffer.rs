//! Per-channel sample queues between a producer thread and the mixer.
//!
//! Each queue is a bounded single-producer/single-consumer ring buffer:
//! the [`BufferWriter`] half belongs to exactly one channel producer, the
//! [`BufferReader`] half to the mixer callback. Neither side ever blocks.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a channel buffer holding at most `capacity` samples.
///
/// A zero capacity is raised to one sample.
pub fn channel_buffer(capacity: usize) -> (BufferWriter, BufferReader) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (BufferWriter { producer }, BufferReader { consumer })
}

/// Tail of a channel buffer. Owned by the channel's producer.
pub struct BufferWriter {
    producer: HeapProd<f32>,
}

impl BufferWriter {
    /// Append as much of `samples` as fits, in order.
    ///
    /// Returns how many samples were stored; the caller retries the rest
    /// once the mixer has drained some space.
    pub fn append(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Free space in samples.
    pub fn vacant(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Maximum number of buffered samples.
    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }
}

/// Head of a channel buffer. Owned by the mixer.
pub struct BufferReader {
    consumer: HeapCons<f32>,
}

impl BufferReader {
    /// Samples ready to be taken.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Move up to `out.len()` samples from the head into `out`.
    ///
    /// Whatever the buffer could not supply is zero-filled in `out`; the
    /// stored samples are untouched. Returns the number of real samples.
    pub fn take_into(&mut self, out: &mut [f32]) -> usize {
        let n = self.consumer.pop_slice(out);
        out[n..].fill(0.0);
        n
    }

    /// Remove exactly `frame_count` samples, zero-padded on shortfall.
    ///
    /// Allocates; the mixer uses [`BufferReader::take_into`] instead.
    pub fn take(&mut self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count];
        self.take_into(&mut out);
        out
    }
}
