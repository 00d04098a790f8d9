//! Subtitle cue construction and SRT output.
//!
//! All strategies produce [`SubtitleCue`] sequences through the same finalization and are written
//! with the same [`format_time`].

pub mod align;
pub mod cue;
pub mod foreign;

pub use align::{CueSource, SubtitleAligner, WordStamp, split_sentences};
pub use cue::{SubtitleCue, check_invariants, format_time, to_srt, write_srt};
pub use foreign::parse_timestamp;
