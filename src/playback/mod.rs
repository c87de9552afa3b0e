pub mod buffer;
pub mod clock;
pub mod feeder;
pub mod player;
pub mod producer;
pub mod scheduler;
pub mod seek;
pub mod sink;
pub mod state;


pub use buffer::{ReadOutcome, StreamBuffer};
pub use clock::PlaybackClock;
pub use feeder::AudioFeeder;
pub use player::Player;
pub use producer::{FrameProducer, ProducerOutcome};
pub use scheduler::VideoScheduler;
pub use seek::{SeekController, SeekTarget};
pub use sink::{
    AudioSink, AudioSinkFactory, CpalAudioSink, CpalSinkFactory, LogVideoSink,
    LogVideoSinkFactory, VideoSink, VideoSinkFactory,
};
pub use state::{PlayerEvent, PlayerState};
