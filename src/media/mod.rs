pub mod backend;
pub mod descriptor;
pub mod format;
pub mod probe;

pub use backend::{ByteSource, DecodeBackend, FfmpegBackend, SourceStatus};
pub use descriptor::{AudioDescriptor, VideoDescriptor};
pub use format::{PixelFormat, SampleFormat};
pub use probe::ProbeResult;
