#![forbid(unsafe_code)]
//! Turn a short text script into a vertical video: a fitted cover image, TTS narration,
//! time-aligned subtitles and an MP4 with the subtitles burned in.

pub mod collab;
pub mod config;
pub mod cover;
mod foundation;
pub mod media;
pub mod pipeline;
pub mod script;
pub mod subtitle;

pub use collab::{Availability, EdgeTts, NoTranscriber, Synthesizer, Transcriber, WhisperCli};
pub use config::{CoverConfig, CoverMode, PipelineConfig, SubtitleConfig, ToolsConfig};
pub use cover::layout::{LayoutResult, TextLayoutEngine, TextMeasure};
pub use cover::render::{CoverOutput, CoverRenderer, PostManifest};
pub use cover::shaping::{FontAsset, find_font};
pub use foundation::core::{Canvas, Rgb8};
pub use foundation::error::{PipelineStage, ReelError, ReelResult};
pub use media::{
    ComposedVideo, EncodeJob, FfmpegEncoder, FfprobeProbe, MediaEncoder, MediaProbe,
    VideoComposer, is_program_available,
};
pub use pipeline::{
    ArtifactKind, MediaArtifact, PipelineCoordinator, PostDirectory, RunReport, SubtitleOutcome,
};
pub use script::{TextBlock, sanitize_dir_name, unescape_newlines};
pub use subtitle::{CueSource, SubtitleAligner, SubtitleCue, WordStamp, format_time};
