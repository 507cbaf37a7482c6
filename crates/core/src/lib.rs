//! Core library for the ILDA laser show player.
//!
//! A show moves through three stages: [`decode`] turns an ILDA byte stream
//! into frames while tracking one extent over the whole file, [`normalize`]
//! rescales every point into the display's addressable range, and
//! [`playback`] replays the frames at a fixed rate into a [`PlottingSink`].

pub mod config;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod playback;
pub mod show;
pub mod sink;

pub use config::PlayerConfig;
pub use decode::{compress_axis, decode, Decoder, HeaderRecord};
pub use error::{IldaError, Result};
pub use normalize::{normalize, rescale};
pub use playback::{
    beam_states, PlaybackReport, PlaybackScheduler, PlaybackState, ShutdownHandle, SignalGuard,
};
pub use show::{AxisExtent, Coordinate, Frame, FrameHeader, GlobalExtent, RecordFormat, Show, ShowSummary};
pub use sink::{Beam, PlottingSink, RecordingSink, SinkEvent, TekSink, TraceSink};
