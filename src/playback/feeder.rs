//! Capacity-driven audio feeding.
//!
//! The feeder keeps a byte cursor into the audio buffer and, on each control
//! tick, copies exactly as many bytes into the sink as the sink reported
//! free at the start of the tick. Pacing comes from the device draining in
//! real time, not from the clock.

use std::sync::Arc;

use crate::media::descriptor::AudioDescriptor;
use crate::playback::buffer::{ReadOutcome, StreamBuffer};
use crate::playback::sink::AudioSink;

pub struct AudioFeeder {
    descriptor: AudioDescriptor,
    buffer: Arc<StreamBuffer>,
    /// Unit currently being drained.
    unit_index: usize,
    /// Byte offset within that unit.
    unit_offset: usize,
    /// Frame count of the paired video stream; partitions the byte range for
    /// coarse seeking. 1 when there is no meaningful frame grid.
    frame_count: usize,
}

impl AudioFeeder {
    pub fn new(descriptor: AudioDescriptor, buffer: Arc<StreamBuffer>, frame_count: usize) -> Self {
        Self {
            descriptor,
            buffer,
            unit_index: 0,
            unit_offset: 0,
            frame_count: frame_count.max(1),
        }
    }

    /// Feeds the sink up to the free capacity it reports right now.
    /// Capacity is queried once per tick; whatever the device drains during
    /// the copy is picked up on the next tick.
    pub fn tick(&mut self, sink: &mut dyn AudioSink) {
        let mut budget = sink.free_capacity();
        while budget > 0 {
            let unit = match self.buffer.read(self.unit_index) {
                ReadOutcome::Unit(unit) => unit,
                // Underrun or end of stream: write nothing further this tick.
                ReadOutcome::NotYetAvailable | ReadOutcome::OutOfRange => break,
            };
            let remaining = &unit[self.unit_offset..];
            let n = remaining.len().min(budget);
            let written = sink.write(&remaining[..n]);
            self.unit_offset += written;
            budget -= written;
            if self.unit_offset == unit.len() {
                self.unit_index += 1;
                self.unit_offset = 0;
            }
            if written < n {
                break;
            }
        }
    }

    /// All buffered audio has been handed to the sink and no more will come.
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_sealed() && self.unit_index >= self.buffer.len()
    }

    /// Byte length of one seek partition under the current buffer contents.
    /// Until the buffer is sealed the total keeps growing, so the grid is
    /// recomputed on every seek rather than cached.
    fn partition_size(&self) -> usize {
        let total = self.buffer.len() * self.descriptor.chunk_size();
        total / self.frame_count
    }

    /// Coarse seek: jumps the cursor to the partition holding `frame`,
    /// writes that partition into the sink (as much as its free capacity
    /// allows), and leaves the cursor at the start of the next partition.
    pub fn seek_to_frame(&mut self, frame: usize, sink: &mut dyn AudioSink) {
        let partition = self.partition_size();
        if partition == 0 {
            return;
        }
        let start = frame.min(self.frame_count - 1) * partition;
        self.set_cursor(start);

        let mut budget = sink.free_capacity().min(partition);
        while budget > 0 {
            let unit = match self.buffer.read(self.unit_index) {
                ReadOutcome::Unit(unit) => unit,
                ReadOutcome::NotYetAvailable | ReadOutcome::OutOfRange => break,
            };
            let remaining = &unit[self.unit_offset..];
            let n = remaining.len().min(budget);
            let written = sink.write(&remaining[..n]);
            self.unit_offset += written;
            budget -= written;
            if self.unit_offset == unit.len() {
                self.unit_index += 1;
                self.unit_offset = 0;
            }
            if written < n {
                break;
            }
        }
        // Regular feeding resumes from the partition boundary regardless of
        // how much of it actually fit in the sink.
        self.set_cursor(start + partition);
        log::debug!(
            "audio cursor moved to partition {} (byte {})",
            frame,
            start
        );
    }

    fn set_cursor(&mut self, byte_position: usize) {
        let unit_size = self.descriptor.chunk_size();
        self.unit_index = byte_position / unit_size;
        self.unit_offset = byte_position % unit_size;
    }

    /// Current cursor position in bytes from the start of the stream.
    pub fn position_bytes(&self) -> usize {
        self.unit_index * self.descriptor.chunk_size() + self.unit_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::format::SampleFormat;
    use crate::playback::sink::mock::RecordingAudioSink;

    // Tiny synthetic stream: 4 bytes of PCM per buffered unit.
    fn descriptor() -> AudioDescriptor {
        AudioDescriptor {
            channels: 2,
            sample_rate: 2,
            sample_format: SampleFormat::U8,
            duration_seconds: 10.0,
            total_samples: 40,
        }
    }

    fn filled_buffer(units: usize) -> Arc<StreamBuffer> {
        let buffer = StreamBuffer::new();
        for i in 0..units {
            let base = (i * 4) as u8;
            buffer
                .append(vec![base, base + 1, base + 2, base + 3].into())
                .unwrap();
        }
        buffer.seal();
        buffer
    }

    #[test]
    fn never_writes_more_than_free_capacity() {
        let buffer = filled_buffer(10);
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(6);

        feeder.tick(&mut sink);
        // The mock asserts on overflow; the total must equal the capacity.
        assert_eq!(sink.buffered, 6);
        assert_eq!(sink.written, vec![0, 1, 2, 3, 4, 5]);

        // Device drained nothing: the next tick writes nothing.
        feeder.tick(&mut sink);
        assert_eq!(sink.buffered, 6);
    }

    #[test]
    fn resumes_mid_unit_after_drain() {
        let buffer = filled_buffer(10);
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(6);

        feeder.tick(&mut sink);
        sink.drain(3);
        feeder.tick(&mut sink);

        assert_eq!(sink.written, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(feeder.position_bytes(), 9);
    }

    #[test]
    fn underrun_stops_at_the_buffered_boundary() {
        let buffer = StreamBuffer::new();
        buffer.append(vec![0, 1, 2, 3].into()).unwrap();
        let mut feeder = AudioFeeder::new(descriptor(), buffer.clone(), 10);
        let mut sink = RecordingAudioSink::new(100);

        feeder.tick(&mut sink);
        assert_eq!(sink.written.len(), 4);
        assert!(!feeder.is_exhausted());

        buffer.append(vec![4, 5, 6, 7].into()).unwrap();
        buffer.seal();
        feeder.tick(&mut sink);
        assert_eq!(sink.written.len(), 8);
        assert!(feeder.is_exhausted());
    }

    #[test]
    fn seek_writes_the_target_partition() {
        // 10 units of 4 bytes, 10 partitions: partition k covers bytes
        // 4k..4k+4.
        let buffer = filled_buffer(10);
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(100);

        feeder.seek_to_frame(5, &mut sink);
        assert_eq!(sink.written, vec![20, 21, 22, 23]);
        // Cursor sits at the start of partition 6.
        assert_eq!(feeder.position_bytes(), 24);
    }

    #[test]
    fn seek_respects_free_capacity() {
        let buffer = filled_buffer(10);
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(2);

        feeder.seek_to_frame(5, &mut sink);
        assert_eq!(sink.written, vec![20, 21]);
        // The cursor still lands on the partition boundary.
        assert_eq!(feeder.position_bytes(), 24);
    }

    #[test]
    fn seek_past_last_partition_clamps() {
        let buffer = filled_buffer(10);
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(100);

        feeder.seek_to_frame(500, &mut sink);
        assert_eq!(sink.written, vec![36, 37, 38, 39]);
    }

    #[test]
    fn empty_buffer_seek_is_a_no_op() {
        let buffer = StreamBuffer::new();
        let mut feeder = AudioFeeder::new(descriptor(), buffer, 10);
        let mut sink = RecordingAudioSink::new(100);

        feeder.seek_to_frame(3, &mut sink);
        assert!(sink.written.is_empty());
        assert_eq!(feeder.position_bytes(), 0);
    }
}
