//! Background frame producers.
//!
//! One producer per stream turns the continuous decode pipe into fixed-size
//! decoded units appended to a [`StreamBuffer`]. Producers block on the pipe
//! read and never touch scheduler state; consumers observe progress through
//! the buffer length alone.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::media::backend::{ByteSource, SourceStatus};
use crate::playback::buffer::StreamBuffer;

/// How a producer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// The byte source reached a clean end of stream.
    Finished,
    /// The decode process exited abnormally; holds its exit code if known.
    Failed(Option<i32>),
    /// Terminated early by the control thread.
    Cancelled,
}

pub struct FrameProducer {
    handle: Option<JoinHandle<ProducerOutcome>>,
    stop: Arc<AtomicBool>,
    terminate: Box<dyn FnMut() + Send>,
}

impl FrameProducer {
    /// Spawns the producer thread. `unit_size` is fixed for the stream:
    /// one full frame for video, one second of PCM for audio.
    pub fn spawn(
        name: &'static str,
        source: Box<dyn ByteSource>,
        unit_size: usize,
        buffer: Arc<StreamBuffer>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let terminate = source.terminator();
        let handle = thread::spawn(move || run(name, source, unit_size, buffer, stop_flag));
        Self {
            handle: Some(handle),
            stop,
            terminate,
        }
    }

    /// Requests termination: closes the byte source so a blocked read
    /// unblocks. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        (self.terminate)();
    }

    /// Waits for the producer thread to finish and returns how it ended.
    pub fn join(&mut self) -> Option<ProducerOutcome> {
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.join();
        }
    }
}

fn run(
    name: &'static str,
    mut source: Box<dyn ByteSource>,
    unit_size: usize,
    buffer: Arc<StreamBuffer>,
    stop: Arc<AtomicBool>,
) -> ProducerOutcome {
    log::debug!("{} producer started ({} bytes/unit)", name, unit_size);

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let mut unit = vec![0u8; unit_size];
        let filled = fill(source.as_mut(), &mut unit);

        if filled == unit_size {
            match buffer.append(unit.into()) {
                Ok(index) => {
                    if index % 64 == 0 {
                        log::debug!("{} producer: {} units buffered", name, index + 1);
                    }
                }
                Err(e) => {
                    log::error!("{} producer: {}", name, e);
                    break;
                }
            }
        } else {
            // Short read: typically the partial unit at the stream tail.
            // The unit is discarded, never emitted, and the drop is counted.
            if filled > 0 {
                let total = buffer.record_discard();
                log::debug!(
                    "{} producer: discarded short unit ({} of {} bytes, {} discarded total)",
                    name,
                    filled,
                    unit_size,
                    total
                );
            }
            break;
        }
    }

    let status = source.finish();
    if stop.load(Ordering::SeqCst) {
        buffer.seal();
        log::debug!("{} producer cancelled", name);
        return ProducerOutcome::Cancelled;
    }
    match status {
        SourceStatus::Completed => {
            buffer.seal();
            log::info!(
                "{} producer finished: {} units, {} discarded",
                name,
                buffer.len(),
                buffer.discarded()
            );
            ProducerOutcome::Finished
        }
        SourceStatus::Failed(code) => {
            buffer.mark_failed();
            log::error!(
                "{} producer: decode failed (status {:?}), {} units remain readable",
                name,
                code,
                buffer.len()
            );
            ProducerOutcome::Failed(code)
        }
    }
}

/// Reads until `buf` is full or the source hits end-of-stream. Returns the
/// number of bytes actually read.
fn fill(source: &mut dyn ByteSource, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("byte source read error: {}", e);
                break;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// In-memory byte source delivering a scripted stream with a scripted
    /// terminal status.
    pub struct ScriptedByteSource {
        data: std::io::Cursor<Vec<u8>>,
        status: SourceStatus,
    }

    impl ScriptedByteSource {
        pub fn new(data: Vec<u8>, status: SourceStatus) -> Self {
            Self {
                data: std::io::Cursor::new(data),
                status,
            }
        }
    }

    impl ByteSource for ScriptedByteSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }

        fn finish(&mut self) -> SourceStatus {
            self.status
        }

        fn terminator(&self) -> Box<dyn FnMut() + Send> {
            Box::new(|| {})
        }
    }

    #[test]
    fn produces_every_complete_unit() {
        let buffer = StreamBuffer::new();
        let data = vec![7u8; 10 * 16];
        let source = Box::new(ScriptedByteSource::new(data, SourceStatus::Completed));

        let mut producer = FrameProducer::spawn("video", source, 16, buffer.clone());
        assert_eq!(producer.join(), Some(ProducerOutcome::Finished));

        assert_eq!(buffer.len(), 10);
        assert!(buffer.is_sealed());
        assert!(!buffer.has_failed());
        assert_eq!(buffer.discarded(), 0);
    }

    #[test]
    fn short_tail_is_discarded_and_counted() {
        let buffer = StreamBuffer::new();
        // 3 complete units plus 5 trailing bytes
        let data = vec![1u8; 3 * 16 + 5];
        let source = Box::new(ScriptedByteSource::new(data, SourceStatus::Completed));

        let mut producer = FrameProducer::spawn("video", source, 16, buffer.clone());
        assert_eq!(producer.join(), Some(ProducerOutcome::Finished));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.discarded(), 1);
        assert!(buffer.is_sealed());
    }

    #[test]
    fn decode_failure_preserves_buffered_units() {
        let buffer = StreamBuffer::new();
        // 120 of 300 units arrive before the decoder dies
        let data = vec![9u8; 120 * 8];
        let source = Box::new(ScriptedByteSource::new(data, SourceStatus::Failed(Some(1))));

        let mut producer = FrameProducer::spawn("video", source, 8, buffer.clone());
        assert_eq!(producer.join(), Some(ProducerOutcome::Failed(Some(1))));

        assert!(buffer.has_failed());
        assert_eq!(buffer.len(), 120);
        assert!(matches!(
            buffer.read(0),
            crate::playback::buffer::ReadOutcome::Unit(_)
        ));
        assert!(matches!(
            buffer.read(119),
            crate::playback::buffer::ReadOutcome::Unit(_)
        ));
        assert!(matches!(
            buffer.read(150),
            crate::playback::buffer::ReadOutcome::OutOfRange
        ));
    }

    #[test]
    fn stop_cancels_the_run() {
        let buffer = StreamBuffer::new();
        let data = vec![0u8; 4 * 16];
        let source = Box::new(ScriptedByteSource::new(data, SourceStatus::Completed));

        let mut producer = FrameProducer::spawn("video", source, 16, buffer.clone());
        producer.stop();
        // With an instant in-memory source the run may already have finished;
        // either outcome is a clean, sealed shutdown.
        let outcome = producer.join().unwrap();
        assert!(matches!(
            outcome,
            ProducerOutcome::Finished | ProducerOutcome::Cancelled
        ));
        assert!(buffer.is_sealed());
    }
}
