//! Process-backed media collaborators: duration probing and still-image video encoding.

pub mod encode;
pub mod probe;
pub(crate) mod process;

pub use encode::{ComposedVideo, EncodeJob, FfmpegEncoder, MediaEncoder, VideoComposer};
pub use probe::{FfprobeProbe, MediaProbe};
pub use process::is_program_available;
